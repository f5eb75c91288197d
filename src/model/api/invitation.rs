use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};

use crate::config::Config;
use crate::model::common::election::ElectionId;
use crate::model::db::invitation::InvitationCore;

/// An admin's request to issue an invitation for a private election.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct InvitationSpec {
    /// The invitee; omit for a shared anyone-with-the-link invitation.
    pub email: Option<String>,
    /// Defaults to the election's end date when omitted.
    pub expires_at: Option<DateTime<Utc>>,
}

/// An API-friendly invitation description, including the redemption link.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct InvitationDescription {
    pub election_id: ElectionId,
    pub code: String,
    pub email: Option<String>,
    pub used: bool,
    pub expires_at: Option<DateTime<Utc>>,
    pub link: String,
}

impl InvitationDescription {
    pub fn new(invitation: &InvitationCore, config: &Config) -> Self {
        Self {
            election_id: invitation.election_id,
            code: invitation.code.clone(),
            email: invitation.email.clone(),
            used: invitation.used,
            expires_at: invitation.expires_at,
            link: invitation.link(config),
        }
    }
}

/// The response to a successful invitation redemption.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct RedeemResponse {
    /// The election the invitation unlocked.
    pub election_id: ElectionId,
}
