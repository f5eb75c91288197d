use std::ops::Deref;

use chrono::{DateTime, Utc};
use data_encoding::HEXLOWER;
use mongodb::bson::serde_helpers::chrono_datetime_as_bson_datetime;
use rand::RngCore;
use serde::{Deserialize, Serialize};
use sha2::{Digest, Sha256};

use crate::model::common::election::{CandidateId, ElectionId};
use crate::model::mongodb::Id;

/// Bytes of entropy in a receipt salt.
const SALT_BYTES: usize = 16;

/// A recorded vote. Deliberately carries no voter reference: the only link
/// back to the voter is the salt they walked away with, which recomputes
/// `receipt_hash` together with the candidate and election IDs.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct VoteCore {
    pub election_id: ElectionId,
    pub candidate_id: CandidateId,
    /// The de-duplicated demographic tuple of the caster, if known.
    pub demographic_group_id: Option<Id>,
    /// `SHA-256("{salt}:{candidate_id}:{election_id}")`, hex-encoded.
    /// Globally unique.
    pub receipt_hash: String,
    #[serde(with = "chrono_datetime_as_bson_datetime")]
    pub cast_at: DateTime<Utc>,
}

impl VoteCore {
    /// Create a vote with a fresh random salt.
    /// Returns the vote and the salt; the salt is never persisted.
    pub fn new(
        election_id: ElectionId,
        candidate_id: CandidateId,
        demographic_group_id: Option<Id>,
    ) -> (Self, String) {
        let salt = generate_salt();
        let vote = Self {
            election_id,
            candidate_id,
            demographic_group_id,
            receipt_hash: receipt_hash(&salt, candidate_id, election_id),
            cast_at: Utc::now(),
        };
        (vote, salt)
    }
}

/// A vote without an ID.
pub type NewVote = VoteCore;

/// A vote from the database, with its unique ID.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct Vote {
    #[serde(rename = "_id")]
    pub id: Id,
    #[serde(flatten)]
    pub vote: VoteCore,
}

impl Deref for Vote {
    type Target = VoteCore;

    fn deref(&self) -> &Self::Target {
        &self.vote
    }
}

/// Generate a fresh random hex salt.
fn generate_salt() -> String {
    let mut bytes = [0_u8; SALT_BYTES];
    rand::thread_rng().fill_bytes(&mut bytes);
    HEXLOWER.encode(&bytes)
}

/// Recompute the receipt hash for a salt/candidate/election triple.
///
/// A voter who kept their salt can present it along with the candidate and
/// election they voted for, and anyone can recompute the hash and look it
/// up on the bulletin.
pub fn receipt_hash(salt: &str, candidate_id: CandidateId, election_id: ElectionId) -> String {
    let mut hasher = Sha256::new();
    hasher.update(format!("{salt}:{candidate_id}:{election_id}").as_bytes());
    HEXLOWER.encode(&hasher.finalize())
}

#[cfg(test)]
mod tests {
    use std::collections::HashSet;

    use super::*;

    #[test]
    fn receipt_hash_is_deterministic() {
        let hash1 = receipt_hash("aabbccdd", 3, 17);
        let hash2 = receipt_hash("aabbccdd", 3, 17);
        assert_eq!(hash1, hash2);
        assert_eq!(hash1.len(), 64);
        assert!(hash1.chars().all(|c| c.is_ascii_hexdigit()));
    }

    #[test]
    fn receipt_hash_binds_all_inputs() {
        let hash = receipt_hash("aabbccdd", 3, 17);
        assert_ne!(hash, receipt_hash("aabbccde", 3, 17));
        assert_ne!(hash, receipt_hash("aabbccdd", 4, 17));
        assert_ne!(hash, receipt_hash("aabbccdd", 3, 18));
    }

    #[test]
    fn salts_are_fresh_per_vote() {
        let mut salts = HashSet::new();
        for _ in 0..100 {
            let (vote, salt) = VoteCore::new(1, 1, None);
            assert_eq!(salt.len(), SALT_BYTES * 2);
            assert_eq!(vote.receipt_hash, receipt_hash(&salt, 1, 1));
            assert!(salts.insert(salt), "salt collision");
        }
    }

    #[test]
    fn voter_can_verify_with_returned_salt() {
        let (vote, salt) = VoteCore::new(5, 2, None);
        // The engine's stored hash matches what the voter recomputes.
        assert_eq!(vote.receipt_hash, receipt_hash(&salt, 2, 5));
        // A made-up salt does not.
        assert_ne!(vote.receipt_hash, receipt_hash("0000", 2, 5));
    }
}
