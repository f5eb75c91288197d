use std::ops::{Deref, DerefMut};

use serde::{Deserialize, Serialize};

use crate::error::Result;
use crate::model::common::{demographics::Demographics, election::ElectionId};
use crate::model::mongodb::Id;

/// Core voter user data, as stored in the database.
///
/// Group memberships are plain group names, shared with the `groups` field
/// on private elections. `invited_elections` records every election the
/// voter has unlocked by redeeming an invitation; the access gate treats it
/// as equivalent to group membership.
#[derive(Debug, PartialEq, Eq, Serialize, Deserialize)]
pub struct VoterCore {
    pub username: String,
    pub password_hash: String,
    /// Attributes used only for aggregate result breakdowns.
    #[serde(flatten)]
    pub demographics: Demographics,
    /// Named groups this voter belongs to.
    pub groups: Vec<String>,
    /// Elections unlocked via invitation redemption.
    pub invited_elections: Vec<ElectionId>,
}

impl VoterCore {
    /// Create a new voter, hashing the password.
    pub fn new(
        username: impl Into<String>,
        password: &str,
        demographics: Demographics,
    ) -> Result<Self> {
        Ok(Self {
            username: username.into(),
            password_hash: crate::model::db::hash_password(password)?,
            demographics,
            groups: Vec::new(),
            invited_elections: Vec::new(),
        })
    }

    /// Check whether the given password is correct.
    pub fn verify_password<T: AsRef<[u8]>>(&self, password: T) -> bool {
        argon2::verify_encoded(&self.password_hash, password.as_ref()).unwrap_or(false)
    }

    /// Is this voter a member of any of the given groups?
    pub fn in_any_group<'a>(&self, groups: impl IntoIterator<Item = &'a String>) -> bool {
        groups.into_iter().any(|g| self.groups.contains(g))
    }

    /// Has this voter redeemed an invitation for the given election?
    pub fn holds_invitation(&self, election_id: ElectionId) -> bool {
        self.invited_elections.contains(&election_id)
    }
}

/// A voter without an ID.
pub type NewVoter = VoterCore;

/// A voter user from the database, with its unique ID.
#[derive(Debug, Serialize, Deserialize)]
pub struct Voter {
    #[serde(rename = "_id")]
    pub id: Id,
    #[serde(flatten)]
    pub voter: VoterCore,
}

impl Deref for Voter {
    type Target = VoterCore;

    fn deref(&self) -> &Self::Target {
        &self.voter
    }
}

impl DerefMut for Voter {
    fn deref_mut(&mut self) -> &mut Self::Target {
        &mut self.voter
    }
}

/// Example data for tests.
#[cfg(test)]
mod examples {
    use super::*;

    use crate::model::common::demographics::{AgeGroup, Gender};

    impl VoterCore {
        pub fn example() -> Self {
            let mut voter = Self::new(
                "aris",
                "hunter2hunter2",
                Demographics {
                    age_group: AgeGroup::From26To35,
                    gender: Gender::Male,
                    country: "Greece".to_string(),
                },
            )
            .unwrap();
            voter.groups = vec!["Athens Chess Club".to_string()];
            voter
        }
    }

    impl Voter {
        pub fn example() -> Self {
            Self {
                id: Id::new(),
                voter: VoterCore::example(),
            }
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn group_membership() {
        let voter = VoterCore::example();
        let election_groups = vec![
            "Athens Chess Club".to_string(),
            "Thessaloniki Go Club".to_string(),
        ];
        assert!(voter.in_any_group(&election_groups));
        assert!(!voter.in_any_group(&vec!["Thessaloniki Go Club".to_string()]));
        assert!(!voter.in_any_group(&Vec::new()));
    }

    #[test]
    fn invitation_grants() {
        let mut voter = VoterCore::example();
        assert!(!voter.holds_invitation(7));
        voter.invited_elections.push(7);
        assert!(voter.holds_invitation(7));
        assert!(!voter.holds_invitation(8));
    }
}
