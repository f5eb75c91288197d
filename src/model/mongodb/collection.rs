use std::ops::Deref;

use mongodb::{
    bson::doc, error::Error as DbError, options::IndexOptions, Collection, Database, IndexModel,
};
use rocket::{
    request::{self, FromRequest, Request},
    State,
};

use crate::model::db::{
    admin::{Admin, NewAdmin},
    demographic::{DemographicGroup, NewDemographicGroup},
    election::Election,
    invitation::{Invitation, NewInvitation},
    vote::{NewVote, Vote},
    voter::{NewVoter, Voter},
    voter_log::VoterLog,
};

use super::counter::Counter;

/// A type that can be directly inserted/read to/from the database.
pub trait MongoCollection {
    /// The name of the collection.
    const NAME: &'static str;
}

/// A database collection of the given type.
pub struct Coll<T>(Collection<T>);

impl<T> Coll<T>
where
    T: MongoCollection,
{
    /// Get a handle on this collection in the given database.
    pub fn from_db(db: &Database) -> Self {
        Self(db.collection(T::NAME))
    }
}

// `derive(Clone)` would only derive if `T: Clone`, but we don't need that bound.
impl<T> Clone for Coll<T> {
    fn clone(&self) -> Self {
        Self(self.0.clone())
    }
}

impl<T> Deref for Coll<T> {
    type Target = Collection<T>;

    fn deref(&self) -> &Self::Target {
        &self.0
    }
}

#[rocket::async_trait]
impl<'r, T> FromRequest<'r> for Coll<T>
where
    T: MongoCollection,
{
    type Error = ();

    /// Get the database connection from the managed state and wrap it in a collection.
    ///
    /// Panics iff the [`Database`] is not managed by [`rocket::Rocket`].
    async fn from_request(req: &'r Request<'_>) -> request::Outcome<Self, Self::Error> {
        let db = req.guard::<&State<Database>>().await.unwrap();
        request::Outcome::Success(Coll::from_db(db))
    }
}

// Admin collections
const ADMINS: &str = "admins";
impl MongoCollection for Admin {
    const NAME: &'static str = ADMINS;
}
impl MongoCollection for NewAdmin {
    const NAME: &'static str = ADMINS;
}

// Voter collections
const VOTERS: &str = "voters";
impl MongoCollection for Voter {
    const NAME: &'static str = VOTERS;
}
impl MongoCollection for NewVoter {
    const NAME: &'static str = VOTERS;
}

// Election collection
const ELECTIONS: &str = "elections";
impl MongoCollection for Election {
    const NAME: &'static str = ELECTIONS;
}

// Voter log collection
const VOTER_LOGS: &str = "voter_logs";
impl MongoCollection for VoterLog {
    const NAME: &'static str = VOTER_LOGS;
}

// Vote collections
const VOTES: &str = "votes";
impl MongoCollection for Vote {
    const NAME: &'static str = VOTES;
}
impl MongoCollection for NewVote {
    const NAME: &'static str = VOTES;
}

// Demographic group collections
const DEMOGRAPHIC_GROUPS: &str = "demographic_groups";
impl MongoCollection for DemographicGroup {
    const NAME: &'static str = DEMOGRAPHIC_GROUPS;
}
impl MongoCollection for NewDemographicGroup {
    const NAME: &'static str = DEMOGRAPHIC_GROUPS;
}

// Invitation collections
const INVITATIONS: &str = "invitations";
impl MongoCollection for Invitation {
    const NAME: &'static str = INVITATIONS;
}
impl MongoCollection for NewInvitation {
    const NAME: &'static str = INVITATIONS;
}

// Counter collection
const COUNTERS: &str = "counters";
impl MongoCollection for Counter {
    const NAME: &'static str = COUNTERS;
}

/// Ensure that all the required indexes exist on the given database.
///
/// The unique indexes are load-bearing: one voter log per (voter, election),
/// globally unique receipt hashes, unique invitation codes, and de-duplicated
/// demographic tuples are all enforced here rather than in application code.
///
/// This operation is idempotent.
pub async fn ensure_indexes_exist(db: &Database) -> Result<(), DbError> {
    debug!("Ensuring collection indexes exist");

    let unique = IndexOptions::builder().unique(true).build();

    // Voter collection.
    let voter_index = IndexModel::builder()
        .keys(doc! {"username": 1})
        .options(unique.clone())
        .build();
    Coll::<Voter>::from_db(db)
        .create_index(voter_index, None)
        .await?;

    // Admin collection.
    let admin_index = IndexModel::builder()
        .keys(doc! {"username": 1})
        .options(unique.clone())
        .build();
    Coll::<Admin>::from_db(db)
        .create_index(admin_index, None)
        .await?;

    // Voter log collection: the single source of truth for "has voted".
    let voter_log_index = IndexModel::builder()
        .keys(doc! {"voter_id": 1, "election_id": 1})
        .options(unique.clone())
        .build();
    Coll::<VoterLog>::from_db(db)
        .create_index(voter_log_index, None)
        .await?;

    // Vote collection: receipt hashes are unique over the lifetime of the system.
    let receipt_index = IndexModel::builder()
        .keys(doc! {"receipt_hash": 1})
        .options(unique.clone())
        .build();
    Coll::<Vote>::from_db(db)
        .create_index(receipt_index, None)
        .await?;
    // Tally and bulletin reads are per-election.
    let vote_election_index = IndexModel::builder()
        .keys(doc! {"election_id": 1})
        .build();
    Coll::<Vote>::from_db(db)
        .create_index(vote_election_index, None)
        .await?;

    // Demographic group collection: one document per distinct tuple.
    let demographic_index = IndexModel::builder()
        .keys(doc! {"age_group": 1, "gender": 1, "country": 1})
        .options(unique.clone())
        .build();
    Coll::<DemographicGroup>::from_db(db)
        .create_index(demographic_index, None)
        .await?;

    // Invitation collection.
    let invitation_code_index = IndexModel::builder()
        .keys(doc! {"code": 1})
        .options(unique)
        .build();
    Coll::<Invitation>::from_db(db)
        .create_index(invitation_code_index, None)
        .await?;
    let invitation_election_index = IndexModel::builder()
        .keys(doc! {"election_id": 1, "email": 1})
        .build();
    Coll::<Invitation>::from_db(db)
        .create_index(invitation_election_index, None)
        .await?;

    Ok(())
}
