use std::future::Future;

use mongodb::{
    bson::doc,
    error::Error as DbError,
    options::UpdateOptions,
    Client,
};
use rocket::{futures::TryStreamExt, http::CookieJar, serde::json::Json, Route, State};

use crate::config::Config;
use crate::error::{Error, Result};
use crate::model::{
    api::{
        access::AccessDecision,
        auth::AuthToken,
        ballot::{BulletinEntry, CastRequest, CastResponse, SaltedReceipt, VerifyRequest},
    },
    common::election::{CandidateId, ElectionId},
    db::{
        demographic::DemographicGroup,
        election::Election,
        vote::{NewVote, Vote, VoteCore},
        voter::Voter,
        voter_log::VoterLog,
    },
    mongodb::{is_duplicate_key_error, Coll, Id},
};

use super::common::{election_by_id, gated_election, visible_election, voter_by_token};

/// How many times one cast request may retry its transaction after a
/// receipt hash collision before giving up.
const MAX_CAST_ATTEMPTS: u32 = 3;

pub fn routes() -> Vec<Route> {
    routes![cast_votes, verify_receipt, bulletin]
}

#[post("/elections/<election_id>/votes", data = "<request>", format = "json")]
async fn cast_votes(
    token: AuthToken<Voter>,
    election_id: ElectionId,
    request: Json<CastRequest>,
    cookies: &CookieJar<'_>,
    config: &State<Config>,
    voters: Coll<Voter>,
    elections: Coll<Election>,
    voter_logs: Coll<VoterLog>,
    votes: Coll<NewVote>,
    demographic_groups: Coll<DemographicGroup>,
    db_client: &State<Client>,
) -> Result<Json<CastResponse>> {
    let voter = voter_by_token(&token, &voters).await?;
    let (election, decision) =
        gated_election(election_id, &voter, &elections, cookies, config).await?;
    match decision {
        AccessDecision::Allowed => {}
        AccessDecision::RequiresPassword => return Err(Error::PasswordRequired(election_id)),
        AccessDecision::NotActive => return Err(Error::NotActive(election_id)),
        AccessDecision::Denied => return Err(Error::not_found(format!("election {election_id}"))),
    }
    request.validate(&election)?;

    // The demographic group is a pure get-or-create, so it can safely live
    // outside the casting transaction.
    let group_id = DemographicGroup::get_or_create(&demographic_groups, &voter.demographics).await?;

    // A receipt hash collision aborts the whole transaction, so the retry
    // wraps it entirely, re-salting every vote.
    let client: &Client = db_client;
    let voter_logs = &voter_logs;
    let votes = &votes;
    let election = &election;
    let candidate_ids: &[CandidateId] = &request.candidate_ids;
    let voter_id = voter.id;
    let receipts = cast_with_retries(election_id, move || {
        cast_in_transaction(
            client,
            voter_logs,
            votes,
            voter_id,
            election,
            candidate_ids,
            group_id,
        )
    })
    .await?;

    info!(
        "voter {} cast {} vote(s) in election {}",
        voter.id,
        receipts.len(),
        election_id
    );
    Ok(Json(CastResponse { salts: receipts }))
}

/// Drive casting attempts until one commits or fails for good.
///
/// A prior vote and a database error are terminal; a receipt collision is
/// retried up to [`MAX_CAST_ATTEMPTS`] times before surfacing as a storage
/// error.
async fn cast_with_retries<F, Fut>(
    election_id: ElectionId,
    mut attempt: F,
) -> Result<Vec<SaltedReceipt>>
where
    F: FnMut() -> Fut,
    Fut: Future<Output = Result<Vec<SaltedReceipt>, CastFailure>>,
{
    for _ in 0..MAX_CAST_ATTEMPTS {
        match attempt().await {
            Ok(receipts) => return Ok(receipts),
            Err(CastFailure::AlreadyVoted) => return Err(Error::AlreadyVoted(election_id)),
            Err(CastFailure::ReceiptCollision) => {
                warn!("receipt hash collision in election {election_id}, retrying");
            }
            Err(CastFailure::Db(err)) => return Err(err.into()),
        }
    }
    Err(Error::Storage(format!(
        "failed to cast ballot in election {election_id} after {MAX_CAST_ATTEMPTS} attempts"
    )))
}

/// Why a single casting transaction did not commit.
enum CastFailure {
    /// The voter's `has_voted` flag was already set.
    AlreadyVoted,
    /// A freshly salted receipt hash already existed.
    ReceiptCollision,
    Db(DbError),
}

impl From<DbError> for CastFailure {
    fn from(err: DbError) -> Self {
        Self::Db(err)
    }
}

/// One attempt at the casting transaction.
///
/// Creates the voter log row if missing, claims it via the conditional
/// `has_voted` update, then inserts one freshly salted vote per selection.
/// Any failure aborts, leaving no votes and `has_voted` unchanged.
async fn cast_in_transaction(
    db_client: &Client,
    voter_logs: &Coll<VoterLog>,
    votes: &Coll<NewVote>,
    voter_id: Id,
    election: &Election,
    candidate_ids: &[CandidateId],
    group_id: Id,
) -> Result<Vec<SaltedReceipt>, CastFailure> {
    let mut session = db_client.start_session(None).await?;
    session.start_transaction(None).await?;

    let filter = VoterLog::filter(voter_id, election.id);
    voter_logs
        .update_one_with_session(
            filter,
            doc! {
                "$setOnInsert": {
                    "voter_id": *voter_id,
                    "election_id": election.id,
                    "has_voted": false,
                }
            },
            UpdateOptions::builder().upsert(true).build(),
            &mut session,
        )
        .await?;

    let claimed = voter_logs
        .update_one_with_session(
            doc! {
                "voter_id": *voter_id,
                "election_id": election.id,
                "has_voted": false,
            },
            doc! { "$set": { "has_voted": true } },
            None,
            &mut session,
        )
        .await?;
    if claimed.modified_count == 0 {
        session.abort_transaction().await?;
        return Err(CastFailure::AlreadyVoted);
    }

    let mut new_votes = Vec::with_capacity(candidate_ids.len());
    let mut receipts = Vec::with_capacity(candidate_ids.len());
    for &candidate_id in candidate_ids {
        let (vote, salt) = VoteCore::new(election.id, candidate_id, Some(group_id));
        receipts.push(SaltedReceipt {
            candidate_id,
            salt,
            receipt_hash: vote.receipt_hash.clone(),
        });
        new_votes.push(vote);
    }
    match votes
        .insert_many_with_session(&new_votes, None, &mut session)
        .await
    {
        Ok(_) => {}
        Err(err) if is_duplicate_key_error(&err) => {
            session.abort_transaction().await?;
            return Err(CastFailure::ReceiptCollision);
        }
        Err(err) => return Err(err.into()),
    }

    session.commit_transaction().await?;
    Ok(receipts)
}

/// Check a receipt hash against an election's bulletin. Deliberately
/// unauthenticated: anyone holding a hash may confirm its presence.
#[post("/elections/<election_id>/verify", data = "<request>", format = "json")]
async fn verify_receipt(
    election_id: ElectionId,
    request: Json<VerifyRequest>,
    elections: Coll<Election>,
    votes: Coll<Vote>,
) -> Result<Json<bool>> {
    let election = election_by_id(election_id, &elections).await?;
    let vote = votes
        .find_one(
            doc! {
                "election_id": election.id,
                "receipt_hash": request.normalized(),
            },
            None,
        )
        .await?;
    Ok(Json(vote.is_some()))
}

/// The public bulletin: every `(receipt_hash, candidate_id)` pair cast in
/// an election, in no meaningful order.
#[get("/elections/<election_id>/receipts")]
async fn bulletin(
    token: AuthToken<Voter>,
    election_id: ElectionId,
    voters: Coll<Voter>,
    elections: Coll<Election>,
    votes: Coll<Vote>,
) -> Result<Json<Vec<BulletinEntry>>> {
    let voter = voter_by_token(&token, &voters).await?;
    let election = visible_election(election_id, &voter, &elections).await?;

    let cast: Vec<Vote> = votes
        .find(doc! { "election_id": election.id }, None)
        .await?
        .try_collect()
        .await?;
    let entries = cast
        .into_iter()
        .map(|vote| BulletinEntry {
            receipt_hash: vote.vote.receipt_hash,
            candidate_id: vote.vote.candidate_id,
        })
        .collect();
    Ok(Json(entries))
}

#[cfg(test)]
mod tests {
    use std::cell::Cell;

    use super::*;

    fn receipt() -> SaltedReceipt {
        let (vote, salt) = VoteCore::new(1, 1, None);
        SaltedReceipt {
            candidate_id: 1,
            salt,
            receipt_hash: vote.receipt_hash,
        }
    }

    #[rocket::async_test]
    async fn a_collision_is_retried_until_a_commit() {
        let attempts = Cell::new(0_u32);
        let result = cast_with_retries(1, || {
            let attempt = attempts.get();
            attempts.set(attempt + 1);
            async move {
                if attempt + 1 < MAX_CAST_ATTEMPTS {
                    Err(CastFailure::ReceiptCollision)
                } else {
                    Ok(vec![receipt()])
                }
            }
        })
        .await;

        assert_eq!(result.unwrap().len(), 1);
        assert_eq!(attempts.get(), MAX_CAST_ATTEMPTS);
    }

    #[rocket::async_test]
    async fn collisions_exhaust_the_retry_budget() {
        let attempts = Cell::new(0_u32);
        let result = cast_with_retries(1, || {
            attempts.set(attempts.get() + 1);
            async { Err(CastFailure::ReceiptCollision) }
        })
        .await;

        assert!(matches!(result, Err(Error::Storage(_))));
        assert_eq!(attempts.get(), MAX_CAST_ATTEMPTS);
    }

    #[rocket::async_test]
    async fn a_prior_vote_is_terminal() {
        let attempts = Cell::new(0_u32);
        let result = cast_with_retries(7, || {
            attempts.set(attempts.get() + 1);
            async { Err(CastFailure::AlreadyVoted) }
        })
        .await;

        assert!(matches!(result, Err(Error::AlreadyVoted(7))));
        assert_eq!(attempts.get(), 1);
    }

    #[rocket::async_test]
    async fn a_database_error_is_not_retried() {
        let attempts = Cell::new(0_u32);
        let result = cast_with_retries(1, || {
            attempts.set(attempts.get() + 1);
            async { Err(CastFailure::Db(DbError::custom("connection lost"))) }
        })
        .await;

        assert!(matches!(result, Err(Error::Db(_))));
        assert_eq!(attempts.get(), 1);
    }
}
