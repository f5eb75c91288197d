use std::ops::Deref;

use chrono::{DateTime, Utc};
use data_encoding::HEXLOWER;
use mongodb::bson::serde_helpers::chrono_datetime_as_bson_datetime;
use rand::RngCore;
use serde::{Deserialize, Serialize};

use crate::config::Config;
use crate::model::common::election::ElectionId;
use crate::model::mongodb::{serde_option_chrono_datetime, Id};

/// Bytes of entropy in an invitation code.
const CODE_BYTES: usize = 16;

/// Whether an invitation can currently be redeemed.
#[derive(Debug, Copy, Clone, PartialEq, Eq)]
pub enum InvitationState {
    Redeemable,
    Expired,
    AlreadyUsed,
}

/// An invitation granting access to a private election.
///
/// A personal invitation (email set) is single-use: `used` flips once and
/// `used_by` records the redeemer. A shared invitation (no email) is a
/// standing "anyone with the link" grant; its `used` flag is never a gate,
/// only expiry applies.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct InvitationCore {
    pub election_id: ElectionId,
    /// Unique random redemption token.
    pub code: String,
    pub email: Option<String>,
    pub used: bool,
    pub used_by: Option<Id>,
    #[serde(with = "chrono_datetime_as_bson_datetime")]
    pub created_at: DateTime<Utc>,
    #[serde(with = "serde_option_chrono_datetime")]
    pub expires_at: Option<DateTime<Utc>>,
}

impl InvitationCore {
    /// Create the standing shared-link invitation for a private election.
    pub fn new_shared(election_id: ElectionId) -> Self {
        Self {
            election_id,
            code: generate_code(),
            email: None,
            used: false,
            used_by: None,
            created_at: Utc::now(),
            expires_at: None,
        }
    }

    /// Create a single-use invitation bound to an email address.
    pub fn new_personal(
        election_id: ElectionId,
        email: impl Into<String>,
        expires_at: Option<DateTime<Utc>>,
    ) -> Self {
        Self {
            election_id,
            code: generate_code(),
            email: Some(email.into()),
            used: false,
            used_by: None,
            created_at: Utc::now(),
            expires_at,
        }
    }

    pub fn is_personal(&self) -> bool {
        self.email.is_some()
    }

    /// The redemption state at the given instant.
    /// Expiry always wins over use state.
    pub fn state(&self, now: DateTime<Utc>) -> InvitationState {
        if let Some(expires_at) = self.expires_at {
            if now > expires_at {
                return InvitationState::Expired;
            }
        }
        if self.is_personal() && self.used {
            return InvitationState::AlreadyUsed;
        }
        InvitationState::Redeemable
    }

    /// The URL a recipient follows to redeem this invitation.
    /// Purely for display; correctness only depends on the code.
    pub fn link(&self, config: &Config) -> String {
        format!(
            "https://{}/invitations/{}/redeem",
            config.hostname(),
            self.code
        )
    }
}

/// An invitation without an ID.
pub type NewInvitation = InvitationCore;

/// An invitation from the database, with its unique ID.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct Invitation {
    #[serde(rename = "_id")]
    pub id: Id,
    #[serde(flatten)]
    pub invitation: InvitationCore,
}

impl Deref for Invitation {
    type Target = InvitationCore;

    fn deref(&self) -> &Self::Target {
        &self.invitation
    }
}

/// Generate a fresh random hex invitation code.
fn generate_code() -> String {
    let mut bytes = [0_u8; CODE_BYTES];
    rand::thread_rng().fill_bytes(&mut bytes);
    HEXLOWER.encode(&bytes)
}

#[cfg(test)]
mod tests {
    use chrono::Duration;

    use super::*;

    #[test]
    fn personal_invitation_is_single_use() {
        let now = Utc::now();
        let mut invitation = InvitationCore::new_personal(1, "voter@example.com", None);
        assert_eq!(invitation.state(now), InvitationState::Redeemable);

        invitation.used = true;
        invitation.used_by = Some(Id::new());
        assert_eq!(invitation.state(now), InvitationState::AlreadyUsed);
    }

    #[test]
    fn shared_invitation_ignores_used_flag() {
        let now = Utc::now();
        let mut invitation = InvitationCore::new_shared(1);
        invitation.used = true;
        assert_eq!(invitation.state(now), InvitationState::Redeemable);
    }

    #[test]
    fn expiry_wins_regardless_of_use_state() {
        let now = Utc::now();
        let expiry = Some(now - Duration::hours(1));

        let mut personal = InvitationCore::new_personal(1, "voter@example.com", expiry);
        assert_eq!(personal.state(now), InvitationState::Expired);
        personal.used = true;
        assert_eq!(personal.state(now), InvitationState::Expired);

        let mut shared = InvitationCore::new_shared(1);
        shared.expires_at = expiry;
        assert_eq!(shared.state(now), InvitationState::Expired);
    }

    #[test]
    fn codes_are_unique_and_hex() {
        let a = InvitationCore::new_shared(1);
        let b = InvitationCore::new_shared(1);
        assert_ne!(a.code, b.code);
        assert_eq!(a.code.len(), CODE_BYTES * 2);
        assert!(a.code.chars().all(|c| c.is_ascii_hexdigit()));
    }
}
