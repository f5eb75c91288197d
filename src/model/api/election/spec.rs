use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};

use crate::error::{Error, Result};
use crate::model::{
    common::election::{CandidateId, ElectionId, Visibility},
    db::election::{Candidate, Election, ElectionCore},
    mongodb::Id,
};

/// An election specification, as submitted by an admin.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct ElectionSpec {
    pub title: String,
    pub description: String,
    /// Voting window start.
    pub start_date: DateTime<Utc>,
    /// Voting window end (exclusive).
    pub end_date: DateTime<Utc>,
    pub visibility: Visibility,
    /// The shared election password, required iff the election is private.
    pub password: Option<String>,
    /// How many candidates a single ballot may select.
    pub max_choices: u32,
    /// Groups granted access; only meaningful for private elections.
    #[serde(default)]
    pub groups: Vec<String>,
    /// Candidate names, in ballot order.
    pub candidates: Vec<String>,
}

impl ElectionSpec {
    /// Check this spec describes a well-formed election.
    pub fn validate(&self) -> Result<()> {
        if self.title.trim().is_empty() {
            return Err(Error::Validation("title must not be empty".to_string()));
        }
        if self.start_date >= self.end_date {
            return Err(Error::Validation(
                "start date must be before end date".to_string(),
            ));
        }
        if self.candidates.is_empty() {
            return Err(Error::Validation(
                "an election needs at least one candidate".to_string(),
            ));
        }
        if self.max_choices < 1 {
            return Err(Error::Validation(
                "max choices must be at least 1".to_string(),
            ));
        }
        if self.max_choices as usize > self.candidates.len() {
            return Err(Error::Validation(
                "max choices cannot exceed the number of candidates".to_string(),
            ));
        }
        match self.visibility {
            Visibility::Private => {
                if self.password.as_deref().map_or(true, str::is_empty) {
                    return Err(Error::Validation(
                        "private elections require a password".to_string(),
                    ));
                }
            }
            Visibility::Public => {
                if self.password.is_some() {
                    return Err(Error::Validation(
                        "public elections cannot have a password".to_string(),
                    ));
                }
                if !self.groups.is_empty() {
                    return Err(Error::Validation(
                        "only private elections can restrict to groups".to_string(),
                    ));
                }
            }
        }
        Ok(())
    }

    /// Convert this spec into a proper election, validating it, hashing the
    /// password, and assigning candidate IDs in submission order.
    pub fn into_election(self, election_id: ElectionId, created_by: Id) -> Result<Election> {
        self.validate()?;
        let password_hash = match &self.password {
            Some(password) => Some(crate::model::db::hash_password(password)?),
            None => None,
        };
        let candidates = self
            .candidates
            .into_iter()
            .enumerate()
            .map(|(i, name)| Candidate {
                // Succeeds for any plausible candidate count.
                id: 1 + CandidateId::try_from(i).expect("usize to u32"),
                name,
            })
            .collect();
        Ok(Election {
            id: election_id,
            election: ElectionCore {
                title: self.title,
                description: self.description,
                start_date: self.start_date,
                end_date: self.end_date,
                visibility: self.visibility,
                password_hash,
                max_choices: self.max_choices,
                groups: self.groups,
                candidates,
                created_by,
            },
        })
    }
}

/// Example data for tests.
#[cfg(test)]
mod examples {
    use super::*;

    use chrono::Duration;

    impl ElectionSpec {
        /// A public election whose window contains the present.
        pub fn public_example() -> Self {
            let start_date = Utc::now() - Duration::days(1);
            Self {
                title: "Club Treasurer 2026".to_string(),
                description: "Annual election of the club treasurer.".to_string(),
                start_date,
                end_date: start_date + Duration::days(8),
                visibility: Visibility::Public,
                password: None,
                max_choices: 1,
                groups: vec![],
                candidates: vec![
                    "Eleni Papadopoulou".to_string(),
                    "Nikos Georgiou".to_string(),
                    "Maria Ioannou".to_string(),
                ],
            }
        }

        /// A private, password-protected election restricted to one group.
        pub fn private_example() -> Self {
            Self {
                title: "Committee Seats".to_string(),
                description: "Two committee seats are up for election.".to_string(),
                visibility: Visibility::Private,
                password: Some("agora".to_string()),
                max_choices: 2,
                groups: vec!["Athens Chess Club".to_string()],
                ..Self::public_example()
            }
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    use chrono::Duration;

    #[test]
    fn examples_are_valid() {
        assert!(ElectionSpec::public_example().validate().is_ok());
        assert!(ElectionSpec::private_example().validate().is_ok());
    }

    #[test]
    fn window_must_be_non_empty() {
        let mut spec = ElectionSpec::public_example();
        spec.end_date = spec.start_date;
        assert!(spec.validate().is_err());
        spec.end_date = spec.start_date - Duration::hours(1);
        assert!(spec.validate().is_err());
    }

    #[test]
    fn max_choices_bounds() {
        let mut spec = ElectionSpec::public_example();
        spec.max_choices = 0;
        assert!(spec.validate().is_err());
        spec.max_choices = 4; // Only three candidates.
        assert!(spec.validate().is_err());
        spec.max_choices = 3;
        assert!(spec.validate().is_ok());
    }

    #[test]
    fn candidates_are_required() {
        let mut spec = ElectionSpec::public_example();
        spec.candidates.clear();
        assert!(spec.validate().is_err());
    }

    #[test]
    fn visibility_and_password_must_agree() {
        let mut public = ElectionSpec::public_example();
        public.password = Some("oops".to_string());
        assert!(public.validate().is_err());

        let mut private = ElectionSpec::private_example();
        private.password = None;
        assert!(private.validate().is_err());
        private.password = Some(String::new());
        assert!(private.validate().is_err());
    }

    #[test]
    fn groups_only_on_private_elections() {
        let mut spec = ElectionSpec::public_example();
        spec.groups = vec!["Athens Chess Club".to_string()];
        assert!(spec.validate().is_err());
    }

    #[test]
    fn candidate_ids_follow_submission_order() {
        let spec = ElectionSpec::public_example();
        let names = spec.candidates.clone();
        let election = spec.into_election(1, Id::new()).unwrap();
        for (i, candidate) in election.candidates.iter().enumerate() {
            assert_eq!(candidate.id, 1 + u32::try_from(i).unwrap());
            assert_eq!(candidate.name, names[i]);
        }
    }

    #[test]
    fn password_is_stored_hashed() {
        let election = ElectionSpec::private_example()
            .into_election(1, Id::new())
            .unwrap();
        let hash = election.password_hash.as_ref().unwrap();
        assert_ne!(hash, "agora");
        assert!(election.verify_password("agora"));
    }
}
