use chrono::Utc;
use mongodb::bson::{self, doc};
use rocket::{futures::TryStreamExt, http::CookieJar, serde::json::Json, Route, State};
use serde::{Deserialize, Serialize};

use crate::config::Config;
use crate::error::{Error, Result};
use crate::model::{
    api::{
        access::{AccessDecision, AccessPass, AccessResponse},
        auth::AuthToken,
        election::ElectionSummary,
    },
    common::election::ElectionId,
    db::{election::Election, voter::Voter},
    mongodb::Coll,
};

use super::common::{gated_election, visible_elections_filter, voter_by_token};

pub fn routes() -> Vec<Route> {
    routes![
        list_elections,
        list_public_elections,
        election_detail,
        submit_password,
    ]
}

/// Elections currently open that this voter may see.
#[get("/elections", rank = 1)]
async fn list_elections(
    token: AuthToken<Voter>,
    voters: Coll<Voter>,
    elections: Coll<Election>,
) -> Result<Json<Vec<ElectionSummary>>> {
    let voter = voter_by_token(&token, &voters).await?;

    let now = bson::DateTime::from_chrono(Utc::now());
    let mut filter = visible_elections_filter(&voter);
    filter.insert("start_date", doc! { "$lte": now });
    filter.insert("end_date", doc! { "$gt": now });

    let visible: Vec<Election> = elections.find(filter, None).await?.try_collect().await?;
    Ok(Json(visible.iter().map(ElectionSummary::from).collect()))
}

/// Without a login, only open public elections are listed.
#[get("/elections", rank = 2)]
async fn list_public_elections(elections: Coll<Election>) -> Result<Json<Vec<ElectionSummary>>> {
    let now = bson::DateTime::from_chrono(Utc::now());
    let filter = doc! {
        "visibility": "public",
        "start_date": { "$lte": now },
        "end_date": { "$gt": now },
    };
    let visible: Vec<Election> = elections.find(filter, None).await?.try_collect().await?;
    Ok(Json(visible.iter().map(ElectionSummary::from).collect()))
}

#[get("/elections/<election_id>")]
async fn election_detail(
    token: AuthToken<Voter>,
    election_id: ElectionId,
    cookies: &CookieJar<'_>,
    config: &State<Config>,
    voters: Coll<Voter>,
    elections: Coll<Election>,
) -> Result<Json<AccessResponse>> {
    let voter = voter_by_token(&token, &voters).await?;
    let (election, status) =
        gated_election(election_id, &voter, &elections, cookies, config).await?;

    let election = (status == AccessDecision::Allowed).then(|| election.into());
    Ok(Json(AccessResponse { status, election }))
}

/// The password challenge for a protected election. Success plants an
/// access pass cookie; the caller retries their original request with it.
#[post("/elections/<election_id>/access", data = "<submission>", format = "json")]
async fn submit_password(
    token: AuthToken<Voter>,
    election_id: ElectionId,
    submission: Json<PasswordSubmission>,
    cookies: &CookieJar<'_>,
    config: &State<Config>,
    voters: Coll<Voter>,
    elections: Coll<Election>,
) -> Result<()> {
    let voter = voter_by_token(&token, &voters).await?;
    let (election, _status) =
        gated_election(election_id, &voter, &elections, cookies, config).await?;

    if !election.has_password() {
        return Err(Error::BadRequest(format!(
            "election {election_id} has no password"
        )));
    }
    if !election.verify_password(&submission.password) {
        return Err(Error::WrongPassword);
    }

    cookies.add_private(AccessPass::new(voter.id, election.id).into_cookie(config));
    Ok(())
}

/// A submitted election password.
#[derive(Debug, Serialize, Deserialize)]
struct PasswordSubmission {
    password: String,
}
