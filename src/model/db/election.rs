use std::ops::Deref;

use chrono::{DateTime, Utc};
use mongodb::bson::serde_helpers::chrono_datetime_as_bson_datetime;
use serde::{Deserialize, Serialize};

use crate::model::common::election::{CandidateId, ElectionId, Visibility};
use crate::model::mongodb::Id;

/// A candidate standing in an election.
///
/// Candidates are embedded in their election and assigned IDs in insertion
/// order, which is also the tie-break order for results. Once votes
/// reference a candidate it must not be removed.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct Candidate {
    pub id: CandidateId,
    pub name: String,
}

/// Core election data, as stored in the database.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct ElectionCore {
    pub title: String,
    pub description: String,
    /// Voting opens at this instant.
    #[serde(with = "chrono_datetime_as_bson_datetime")]
    pub start_date: DateTime<Utc>,
    /// Voting closes strictly before this instant.
    #[serde(with = "chrono_datetime_as_bson_datetime")]
    pub end_date: DateTime<Utc>,
    pub visibility: Visibility,
    /// Argon2 hash of the shared election password; always present for
    /// private elections, never for public ones.
    pub password_hash: Option<String>,
    /// How many candidates a single ballot may select.
    pub max_choices: u32,
    /// Names of the groups whose members may access a private election.
    pub groups: Vec<String>,
    pub candidates: Vec<Candidate>,
    /// The admin who configured this election.
    pub created_by: Id,
}

impl ElectionCore {
    /// Is the current time within the `[start, end)` voting window?
    pub fn is_active(&self, now: DateTime<Utc>) -> bool {
        self.start_date <= now && now < self.end_date
    }

    /// Look up a candidate by ID.
    pub fn candidate(&self, id: CandidateId) -> Option<&Candidate> {
        self.candidates.iter().find(|c| c.id == id)
    }

    /// Does entering this election require a password challenge?
    pub fn has_password(&self) -> bool {
        self.password_hash.is_some()
    }

    /// Check a submitted password against the stored hash.
    /// Elections without a password reject every submission.
    pub fn verify_password<T: AsRef<[u8]>>(&self, password: T) -> bool {
        match &self.password_hash {
            Some(hash) => argon2::verify_encoded(hash, password.as_ref()).unwrap_or(false),
            None => false,
        }
    }
}

/// An election from the database. Unlike other collections the ID is a
/// small integer allocated from the counter, so it can appear in URLs.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct Election {
    #[serde(rename = "_id")]
    pub id: ElectionId,
    #[serde(flatten)]
    pub election: ElectionCore,
}

impl Deref for Election {
    type Target = ElectionCore;

    fn deref(&self) -> &Self::Target {
        &self.election
    }
}

/// Example data for tests.
#[cfg(test)]
mod examples {
    use super::*;

    use chrono::Duration;

    use crate::model::api::election::ElectionSpec;

    impl Election {
        /// A public election currently in its voting window.
        pub fn public_example() -> Self {
            ElectionSpec::public_example()
                .into_election(1, Id::new())
                .unwrap()
        }

        /// A password-protected private election currently in its voting window.
        pub fn private_example() -> Self {
            ElectionSpec::private_example()
                .into_election(2, Id::new())
                .unwrap()
        }

        /// A public election whose window closed yesterday.
        pub fn closed_example() -> Self {
            let mut election = Self::public_example();
            election.election.start_date = Utc::now() - Duration::days(8);
            election.election.end_date = Utc::now() - Duration::days(1);
            election
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    use chrono::Duration;

    #[test]
    fn voting_window_is_half_open() {
        let election = Election::public_example();
        assert!(election.is_active(election.start_date));
        assert!(!election.is_active(election.end_date));
        assert!(!election.is_active(election.start_date - Duration::seconds(1)));
        assert!(election.is_active(election.end_date - Duration::seconds(1)));
    }

    #[test]
    fn candidate_lookup() {
        let election = Election::public_example();
        assert!(election.candidate(1).is_some());
        assert!(election.candidate(0).is_none());
        assert!(election
            .candidate(u32::try_from(election.candidates.len()).unwrap())
            .is_some());
    }

    #[test]
    fn password_checks() {
        let public = Election::public_example();
        assert!(!public.has_password());
        assert!(!public.verify_password("anything"));

        let private = Election::private_example();
        assert!(private.has_password());
        assert!(private.verify_password("agora"));
        assert!(!private.verify_password("forum"));
    }
}
