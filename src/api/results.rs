use std::collections::HashMap;

use mongodb::bson::doc;
use rocket::{futures::TryStreamExt, serde::json::Json, Route};

use crate::error::Result;
use crate::model::{
    api::{auth::AuthToken, election::ElectionResults},
    common::election::ElectionId,
    db::{
        demographic::DemographicGroup, election::Election, vote::Vote, voter::Voter,
        voter_log::VoterLog,
    },
    mongodb::Coll,
};

use super::common::{visible_election, voter_by_token};

pub fn routes() -> Vec<Route> {
    routes![election_results]
}

#[get("/elections/<election_id>/results")]
async fn election_results(
    token: AuthToken<Voter>,
    election_id: ElectionId,
    voters: Coll<Voter>,
    elections: Coll<Election>,
    votes: Coll<Vote>,
    demographic_groups: Coll<DemographicGroup>,
    voter_logs: Coll<VoterLog>,
) -> Result<Json<ElectionResults>> {
    let voter = voter_by_token(&token, &voters).await?;
    let election = visible_election(election_id, &voter, &elections).await?;

    let cast: Vec<Vote> = votes
        .find(doc! { "election_id": election.id }, None)
        .await?
        .try_collect()
        .await?;

    // Resolve the demographic tuples the votes reference.
    let group_ids: Vec<_> = cast
        .iter()
        .filter_map(|vote| vote.demographic_group_id)
        .map(|id| *id)
        .collect();
    let groups: Vec<DemographicGroup> = demographic_groups
        .find(doc! { "_id": { "$in": group_ids } }, None)
        .await?
        .try_collect()
        .await?;
    let demographics: HashMap<_, _> = groups
        .into_iter()
        .map(|group| (group.id, group.demographics))
        .collect();

    // The turnout denominator is the voter log count, not the registered
    // voter count: every voter issued a ballot for this election has a log
    // row, whether or not they completed casting.
    let eligible_voters = voter_logs
        .count_documents(doc! { "election_id": election.id }, None)
        .await?;
    let voters_voted = voter_logs
        .count_documents(
            doc! { "election_id": election.id, "has_voted": true },
            None,
        )
        .await?;

    Ok(Json(ElectionResults::compute(
        &election,
        &cast,
        &demographics,
        eligible_voters,
        voters_voted,
    )))
}
