use rocket::Route;

mod admin;
mod auth;
mod common;
mod elections;
mod invitations;
mod results;
mod voting;

pub fn routes() -> Vec<Route> {
    let mut routes = Vec::new();
    routes.extend(auth::routes());
    routes.extend(elections::routes());
    routes.extend(voting::routes());
    routes.extend(invitations::routes());
    routes.extend(results::routes());
    routes.extend(admin::routes());
    routes
}
