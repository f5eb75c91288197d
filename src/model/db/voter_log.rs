use mongodb::bson::{doc, Document};
use serde::{Deserialize, Serialize};

use crate::model::common::election::ElectionId;
use crate::model::mongodb::Id;

/// The single source of truth for "has this voter already cast a ballot".
///
/// Exactly one document exists per `(voter, election)` pair, enforced by a
/// unique index. It is created lazily on the first cast attempt and never
/// deleted; `has_voted` flips false to true exactly once, inside the
/// casting transaction.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct VoterLog {
    #[serde(rename = "_id")]
    pub id: Id,
    pub voter_id: Id,
    pub election_id: ElectionId,
    pub has_voted: bool,
}

impl VoterLog {
    /// Filter matching the log row for one `(voter, election)` pair.
    pub fn filter(voter_id: Id, election_id: ElectionId) -> Document {
        doc! { "voter_id": *voter_id, "election_id": election_id }
    }
}
