use mongodb::bson::doc;
use rocket::{http::CookieJar, serde::json::Json, Route, State};

use crate::config::Config;
use crate::error::{Error, Result};
use crate::model::{
    api::auth::{AuthToken, Credentials, AUTH_TOKEN_COOKIE},
    db::{admin::Admin, voter::Voter},
    mongodb::Coll,
};

pub fn routes() -> Vec<Route> {
    routes![login_voter, login_admin, logout]
}

#[post("/auth/login", data = "<credentials>", format = "json")]
async fn login_voter(
    credentials: Json<Credentials>,
    cookies: &CookieJar<'_>,
    voters: Coll<Voter>,
    config: &State<Config>,
) -> Result<()> {
    let voter = voters
        .find_one(doc! { "username": &credentials.username }, None)
        .await?;
    // Unknown usernames and wrong passwords are indistinguishable.
    match voter {
        Some(voter) if voter.verify_password(&credentials.password) => {
            cookies.add(AuthToken::new(&voter).into_cookie(config));
            Ok(())
        }
        _ => Err(Error::Unauthorized(
            "invalid username or password".to_string(),
        )),
    }
}

#[post("/auth/login/admin", data = "<credentials>", format = "json")]
async fn login_admin(
    credentials: Json<Credentials>,
    cookies: &CookieJar<'_>,
    admins: Coll<Admin>,
    config: &State<Config>,
) -> Result<()> {
    let admin = admins
        .find_one(doc! { "username": &credentials.username }, None)
        .await?;
    match admin {
        Some(admin) if admin.verify_password(&credentials.password) => {
            cookies.add(AuthToken::new(&admin).into_cookie(config));
            Ok(())
        }
        _ => Err(Error::Unauthorized(
            "invalid username or password".to_string(),
        )),
    }
}

#[post("/auth/logout")]
fn logout(cookies: &CookieJar<'_>) {
    cookies.remove(rocket::http::Cookie::named(AUTH_TOKEN_COOKIE));
}
