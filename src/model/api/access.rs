use chrono::{serde::ts_seconds, DateTime, Utc};
use jsonwebtoken::{
    errors::Error as JwtError, DecodingKey, EncodingKey, Header, TokenData, Validation,
};
use rocket::{
    http::{Cookie, CookieJar, SameSite},
    time::Duration,
};
use serde::{Deserialize, Serialize};

use crate::config::Config;
use crate::model::common::election::{ElectionId, Visibility};
use crate::model::db::{election::Election, voter::Voter};
use crate::model::mongodb::Id;

/// Prefix of the per-election password pass cookie.
pub const ACCESS_PASS_COOKIE_PREFIX: &str = "access_pass_";

/// The outcome of the access gate for one voter and one election.
#[derive(Debug, Copy, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum AccessDecision {
    /// Full access.
    Allowed,
    /// Eligible, but the election password has not been passed yet.
    RequiresPassword,
    /// Eligible, but the voting window is closed.
    NotActive,
    /// Not eligible. Indistinguishable from the election not existing.
    Denied,
}

/// The facts the access gate decides on.
///
/// Collected up front so the decision itself is a pure function, with the
/// ordering fixed: eligibility masks everything, then the window, then the
/// password challenge.
#[derive(Debug, Copy, Clone)]
pub struct AccessRequest {
    pub visibility: Visibility,
    pub in_group: bool,
    pub invited: bool,
    pub has_password: bool,
    pub password_passed: bool,
    pub within_window: bool,
}

impl AccessRequest {
    /// Gather the facts for the given voter, election and instant.
    pub fn new(
        election: &Election,
        voter: &Voter,
        password_passed: bool,
        now: DateTime<Utc>,
    ) -> Self {
        Self {
            visibility: election.visibility,
            in_group: voter.in_any_group(&election.groups),
            invited: voter.holds_invitation(election.id),
            has_password: election.has_password(),
            password_passed,
            within_window: election.is_active(now),
        }
    }

    pub fn decide(self) -> AccessDecision {
        if self.visibility == Visibility::Private && !self.in_group && !self.invited {
            return AccessDecision::Denied;
        }
        if !self.within_window {
            return AccessDecision::NotActive;
        }
        if self.has_password && !self.password_passed {
            return AccessDecision::RequiresPassword;
        }
        AccessDecision::Allowed
    }
}

/// The gated view of a single election.
///
/// The description is only populated once the gate fully opens, so a voter
/// who still owes the password learns nothing beyond the election's
/// existence (which their eligibility already entitles them to).
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct AccessResponse {
    pub status: AccessDecision,
    pub election: Option<crate::model::api::election::ElectionDescription>,
}

/// Proof that a voter passed a particular election's password challenge.
///
/// Issued as a signed token in a per-election private cookie, so passing
/// the challenge once keeps the election unlocked until the pass expires.
#[derive(Debug, Serialize, Deserialize)]
pub struct AccessPass {
    #[serde(rename = "vtr")]
    pub voter_id: Id,
    #[serde(rename = "elc")]
    pub election_id: ElectionId,
}

impl AccessPass {
    pub fn new(voter_id: Id, election_id: ElectionId) -> Self {
        Self {
            voter_id,
            election_id,
        }
    }

    /// The cookie name for the given election's pass.
    pub fn cookie_name(election_id: ElectionId) -> String {
        format!("{ACCESS_PASS_COOKIE_PREFIX}{election_id}")
    }

    // Pass serialization never fails.
    #[allow(clippy::missing_panics_doc)]
    /// Convert into a cookie.
    pub fn into_cookie(self, config: &Config) -> Cookie<'static> {
        let name = Self::cookie_name(self.election_id);
        let claims = Claims {
            pass: self,
            expire_at: Utc::now() + config.pass_ttl(),
        };
        Cookie::build(
            name,
            jsonwebtoken::encode(
                &Header::default(),
                &claims,
                &EncodingKey::from_secret(config.jwt_secret()),
            )
            .unwrap(),
        )
        .max_age(Duration::seconds(config.pass_ttl().num_seconds()))
        .http_only(true)
        .same_site(SameSite::Strict)
        .finish()
    }

    /// Deserialize a pass from a cookie.
    pub fn from_cookie(cookie: &Cookie<'static>, config: &Config) -> Result<Self, JwtError> {
        jsonwebtoken::decode(
            cookie.value(),
            &DecodingKey::from_secret(config.jwt_secret()),
            &Validation::default(),
        )
        .map(|claims: TokenData<Claims>| claims.claims.pass)
    }

    /// Does the request carry a valid pass for this voter and election?
    ///
    /// A missing, expired, forged or mismatched pass all read as "not
    /// passed"; the caller falls back to the password challenge.
    pub fn present(
        cookies: &CookieJar<'_>,
        voter_id: Id,
        election_id: ElectionId,
        config: &Config,
    ) -> bool {
        cookies
            .get_private(&Self::cookie_name(election_id))
            .and_then(|cookie| Self::from_cookie(&cookie, config).ok())
            .map(|pass| pass.voter_id == voter_id && pass.election_id == election_id)
            .unwrap_or(false)
    }
}

/// Cookie claims: the pass itself plus an expiry datetime.
#[derive(Debug, Serialize, Deserialize)]
struct Claims {
    #[serde(flatten)]
    pass: AccessPass,
    #[serde(rename = "exp", with = "ts_seconds")]
    expire_at: DateTime<Utc>,
}

#[cfg(test)]
mod tests {
    use super::*;

    fn request() -> AccessRequest {
        AccessRequest {
            visibility: Visibility::Private,
            in_group: false,
            invited: false,
            has_password: true,
            password_passed: false,
            within_window: true,
        }
    }

    #[test]
    fn public_elections_need_no_eligibility() {
        let decision = AccessRequest {
            visibility: Visibility::Public,
            has_password: false,
            ..request()
        }
        .decide();
        assert_eq!(decision, AccessDecision::Allowed);
    }

    #[test]
    fn ineligible_voters_are_denied() {
        assert_eq!(request().decide(), AccessDecision::Denied);

        // Denial masks everything else, including the closed window.
        let closed = AccessRequest {
            within_window: false,
            ..request()
        };
        assert_eq!(closed.decide(), AccessDecision::Denied);
    }

    #[test]
    fn group_membership_and_invitation_both_grant_eligibility() {
        let member = AccessRequest {
            in_group: true,
            ..request()
        };
        assert_eq!(member.decide(), AccessDecision::RequiresPassword);

        let invited = AccessRequest {
            invited: true,
            ..request()
        };
        assert_eq!(invited.decide(), AccessDecision::RequiresPassword);
    }

    #[test]
    fn window_is_checked_before_the_password() {
        let decision = AccessRequest {
            in_group: true,
            within_window: false,
            ..request()
        }
        .decide();
        assert_eq!(decision, AccessDecision::NotActive);
    }

    #[test]
    fn passed_password_unlocks_access() {
        let decision = AccessRequest {
            in_group: true,
            password_passed: true,
            ..request()
        }
        .decide();
        assert_eq!(decision, AccessDecision::Allowed);
    }

    #[test]
    fn pass_round_trip_binds_voter_and_election() {
        let config = Config::example();
        let voter_id = Id::new();

        let cookie = AccessPass::new(voter_id, 3).into_cookie(&config);
        assert_eq!(cookie.name(), "access_pass_3");

        let pass = AccessPass::from_cookie(&cookie, &config).unwrap();
        assert_eq!(pass.voter_id, voter_id);
        assert_eq!(pass.election_id, 3);
    }
}
