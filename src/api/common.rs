use chrono::Utc;
use mongodb::bson::doc;
use rocket::http::CookieJar;

use crate::config::Config;
use crate::error::{Error, Result};
use crate::model::{
    api::{
        access::{AccessDecision, AccessPass, AccessRequest},
        auth::AuthToken,
    },
    common::election::{ElectionId, Visibility},
    db::{election::Election, voter::Voter},
    mongodb::{u32_id_filter, Coll},
};

/// Return a Voter from the database via looking up their token ID.
pub async fn voter_by_token(token: &AuthToken<Voter>, voters: &Coll<Voter>) -> Result<Voter> {
    voters
        .find_one(token.id.as_doc(), None)
        .await?
        .ok_or_else(|| Error::not_found(format!("voter {}", token.id)))
}

/// Return an election by ID, or 404.
pub async fn election_by_id(
    election_id: ElectionId,
    elections: &Coll<Election>,
) -> Result<Election> {
    elections
        .find_one(u32_id_filter(election_id), None)
        .await?
        .ok_or_else(|| Error::not_found(format!("election {election_id}")))
}

/// Fetch an election and run the full access gate for this voter.
///
/// Ineligible voters get the same 404 as a missing election, so private
/// elections do not leak their existence. The returned decision is never
/// `Denied`.
pub async fn gated_election(
    election_id: ElectionId,
    voter: &Voter,
    elections: &Coll<Election>,
    cookies: &CookieJar<'_>,
    config: &Config,
) -> Result<(Election, AccessDecision)> {
    let election = election_by_id(election_id, elections).await?;
    let password_passed =
        AccessPass::present(cookies, voter.id, election.id, config);
    let decision = AccessRequest::new(&election, voter, password_passed, Utc::now()).decide();
    if decision == AccessDecision::Denied {
        return Err(Error::not_found(format!("election {election_id}")));
    }
    Ok((election, decision))
}

/// Fetch an election, masking private ones the voter cannot see.
///
/// Unlike [`gated_election`] this ignores the voting window and the
/// password challenge; results and the bulletin stay readable after the
/// window closes.
pub async fn visible_election(
    election_id: ElectionId,
    voter: &Voter,
    elections: &Coll<Election>,
) -> Result<Election> {
    let election = election_by_id(election_id, elections).await?;
    if election.visibility == Visibility::Private
        && !voter.in_any_group(&election.groups)
        && !voter.holds_invitation(election.id)
    {
        return Err(Error::not_found(format!("election {election_id}")));
    }
    Ok(election)
}

/// Filter matching every election this voter may see: public ones, plus
/// private ones they can access via group membership or invitation grant.
pub fn visible_elections_filter(voter: &Voter) -> mongodb::bson::Document {
    doc! {
        "$or": [
            { "visibility": "public" },
            { "groups": { "$in": voter.groups.clone() } },
            { "_id": { "$in": voter.invited_elections.clone() } },
        ]
    }
}
