use mongodb::bson::{to_bson, Bson};
use serde::{Deserialize, Serialize};

/// Our election IDs are integers, allocated by an atomic counter.
pub type ElectionId = u32;
/// Our candidate IDs are integers, assigned in insertion order within an election.
pub type CandidateId = u32;

/// Who can see (and potentially vote in) an election.
#[derive(Debug, Copy, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum Visibility {
    /// Visible to everyone; any authenticated voter may cast a ballot.
    Public,
    /// Hidden; requires group membership or a redeemed invitation,
    /// plus the election password.
    Private,
}

impl From<Visibility> for Bson {
    fn from(visibility: Visibility) -> Self {
        to_bson(&visibility).expect("Serialisation is infallible")
    }
}
