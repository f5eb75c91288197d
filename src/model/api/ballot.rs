use std::collections::HashSet;

use serde::{Deserialize, Serialize};

use crate::error::{Error, Result};
use crate::model::common::election::CandidateId;
use crate::model::db::election::Election;

/// A ballot: the candidates one voter selects in one election.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct CastRequest {
    pub candidate_ids: Vec<CandidateId>,
}

impl CastRequest {
    /// Check the selection is well-formed for the given election.
    pub fn validate(&self, election: &Election) -> Result<()> {
        if self.candidate_ids.is_empty() {
            return Err(Error::InvalidChoice(
                "a ballot must select at least one candidate".to_string(),
            ));
        }
        if self.candidate_ids.len() > election.max_choices as usize {
            return Err(Error::InvalidChoice(format!(
                "at most {} candidates may be selected",
                election.max_choices
            )));
        }
        let mut seen = HashSet::new();
        for &candidate_id in &self.candidate_ids {
            if election.candidate(candidate_id).is_none() {
                return Err(Error::InvalidChoice(format!(
                    "no candidate with ID {candidate_id}"
                )));
            }
            if !seen.insert(candidate_id) {
                return Err(Error::InvalidChoice(format!(
                    "candidate {candidate_id} selected more than once"
                )));
            }
        }
        Ok(())
    }
}

/// What a voter walks away with after casting: one salt per selection.
/// Salts are never stored; losing them loses the ability to verify.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct CastResponse {
    pub salts: Vec<SaltedReceipt>,
}

/// The verification material for a single vote.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct SaltedReceipt {
    pub candidate_id: CandidateId,
    pub salt: String,
    pub receipt_hash: String,
}

/// A request to check a receipt hash against the bulletin.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct VerifyRequest {
    pub receipt_hash: String,
}

impl VerifyRequest {
    /// The hash as stored: trimmed, lowercase hex.
    pub fn normalized(&self) -> String {
        self.receipt_hash.trim().to_lowercase()
    }
}

/// One row of an election's public bulletin.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct BulletinEntry {
    pub receipt_hash: String,
    pub candidate_id: CandidateId,
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn single_choice_ballots() {
        let election = Election::public_example();
        assert_eq!(election.max_choices, 1);

        let ok = CastRequest {
            candidate_ids: vec![1],
        };
        assert!(ok.validate(&election).is_ok());

        let empty = CastRequest {
            candidate_ids: vec![],
        };
        assert!(empty.validate(&election).is_err());

        let too_many = CastRequest {
            candidate_ids: vec![1, 2],
        };
        assert!(too_many.validate(&election).is_err());
    }

    #[test]
    fn unknown_candidates_are_rejected() {
        let election = Election::public_example();
        let request = CastRequest {
            candidate_ids: vec![99],
        };
        assert!(request.validate(&election).is_err());
    }

    #[test]
    fn duplicate_selections_are_rejected() {
        let election = Election::private_example();
        assert_eq!(election.max_choices, 2);

        let request = CastRequest {
            candidate_ids: vec![1, 1],
        };
        assert!(request.validate(&election).is_err());

        let ok = CastRequest {
            candidate_ids: vec![1, 2],
        };
        assert!(ok.validate(&election).is_ok());
    }

    #[test]
    fn verify_request_normalizes_the_hash() {
        let request = VerifyRequest {
            receipt_hash: "  AbC123  ".to_string(),
        };
        assert_eq!(request.normalized(), "abc123");
    }
}
