use std::fmt::Display;
use std::marker::PhantomData;

use chrono::{serde::ts_seconds, DateTime, Utc};
use jsonwebtoken::{DecodingKey, EncodingKey, Header, TokenData, Validation};
use mongodb::{error::Error as DbError, Database};
use rocket::{
    http::{Cookie, SameSite, Status},
    outcome::{try_outcome, IntoOutcome},
    request::{FromRequest, Outcome},
    time::Duration,
    Request, State,
};
use serde::{Deserialize, Serialize};
use serde_repr::{Deserialize_repr, Serialize_repr};

use crate::config::Config;
use crate::error::Error;
use crate::model::{
    db::{admin::Admin, voter::Voter},
    mongodb::{Coll, Id},
};

pub const AUTH_TOKEN_COOKIE: &str = "auth_token";

/// The two kinds of account the system mints tokens for. Voters cast
/// ballots; admins configure elections. Neither subsumes the other.
#[derive(Debug, PartialEq, Eq, Clone, Copy, Serialize_repr, Deserialize_repr)]
#[repr(u8)]
pub enum Role {
    Voter = 0,
    Admin = 1,
}

impl Display for Role {
    fn fmt(&self, formatter: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        write!(
            formatter,
            "{}",
            match self {
                Self::Voter => "voter",
                Self::Admin => "admin",
            }
        )
    }
}

/// A database document an auth token can stand for.
#[rocket::async_trait]
pub trait Account {
    /// The role tokens for this account type carry.
    const ROLE: Role;

    /// The account's database ID.
    fn account_id(&self) -> Id;

    /// Is there still an account with this ID?
    /// Tokens outlive account deletion, so guards re-check.
    async fn exists(id: Id, db: &Database) -> Result<bool, DbError>;
}

#[rocket::async_trait]
impl Account for Voter {
    const ROLE: Role = Role::Voter;

    fn account_id(&self) -> Id {
        self.id
    }

    async fn exists(id: Id, db: &Database) -> Result<bool, DbError> {
        let voter = Coll::<Voter>::from_db(db).find_one(id.as_doc(), None).await?;
        Ok(voter.is_some())
    }
}

#[rocket::async_trait]
impl Account for Admin {
    const ROLE: Role = Role::Admin;

    fn account_id(&self) -> Id {
        self.id
    }

    async fn exists(id: Id, db: &Database) -> Result<bool, DbError> {
        let admin = Coll::<Admin>::from_db(db).find_one(id.as_doc(), None).await?;
        Ok(admin.is_some())
    }
}

/// An authentication token for a specific account, carried as a signed JWT
/// in a cookie. The type parameter pins which account type a route accepts.
#[derive(Serialize, Deserialize)]
pub struct AuthToken<U> {
    pub id: Id,
    #[serde(rename = "rol")]
    pub role: Role,
    #[serde(skip)]
    phantom: PhantomData<U>,
}

impl<U> AuthToken<U> {
    /// Does this token grant the given role?
    pub fn grants(&self, role: Role) -> bool {
        self.role == role
    }
}

impl<U> AuthToken<U>
where
    U: Account,
{
    /// Create a new [`AuthToken`] for the given account.
    pub fn new(account: &U) -> Self {
        Self {
            id: account.account_id(),
            role: U::ROLE,
            phantom: PhantomData,
        }
    }

    #[allow(clippy::missing_panics_doc)]
    /// Serialize this token into a cookie.
    pub fn into_cookie(self, config: &Config) -> Cookie<'static> {
        let claims = Claims {
            token: self,
            expire_at: Utc::now() + config.auth_ttl(),
        };

        let token = jsonwebtoken::encode(
            &Header::default(),
            &claims,
            &EncodingKey::from_secret(config.jwt_secret()),
        )
        .expect("JWT encoding is infallible with default settings");

        Cookie::build(AUTH_TOKEN_COOKIE, token)
            .max_age(Duration::seconds(config.auth_ttl().num_seconds()))
            .http_only(true)
            .same_site(SameSite::Strict)
            .finish()
    }

    /// Deserialize a token from a cookie.
    pub fn from_cookie(cookie: &Cookie<'static>, config: &Config) -> Result<Self, Error> {
        let token = jsonwebtoken::decode(
            cookie.value(),
            &DecodingKey::from_secret(config.jwt_secret()),
            &Validation::default(),
        )
        .map(|claims: TokenData<Claims<U>>| claims.claims.token)?;
        Ok(token)
    }
}

/// Cookie claims: the token itself plus an expiry datetime.
#[derive(Serialize, Deserialize)]
struct Claims<U> {
    #[serde(flatten, bound = "")]
    token: AuthToken<U>,
    #[serde(rename = "exp", with = "ts_seconds")]
    expire_at: DateTime<Utc>,
}

#[rocket::async_trait]
impl<'r, U> FromRequest<'r> for AuthToken<U>
where
    U: Account + Send,
{
    type Error = Error;

    /// Get an [`AuthToken`] from the cookie and verify it carries the role
    /// this route's account type requires.
    async fn from_request(req: &'r Request<'_>) -> Outcome<Self, Self::Error> {
        // Unwrap is safe as `Config` is always managed.
        let config = req.guard::<&State<Config>>().await.unwrap();

        // Forward to any routes that do not require an authentication token.
        let cookie = try_outcome!(req.cookies().get(AUTH_TOKEN_COOKIE).or_forward(()));

        // Decode the token.
        let token: Self = try_outcome!(Self::from_cookie(cookie, config).or_forward(()));

        // Check it grants the right role.
        if !token.grants(U::ROLE) {
            return Outcome::Forward(());
        }

        // Check the account still exists.
        // Unwrap is safe as the database is always managed.
        let db = req.guard::<&State<Database>>().await.unwrap();
        match U::exists(token.id, db).await {
            Ok(true) => Outcome::Success(token),
            Ok(false) => Outcome::Forward(()),
            Err(e) => Outcome::Failure((Status::InternalServerError, e.into())),
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn token_survives_the_cookie_round_trip() {
        let config = Config::example();
        let voter = Voter::example();

        let token = AuthToken::new(&voter);
        let cookie = token.into_cookie(&config);

        let decoded = AuthToken::<Voter>::from_cookie(&cookie, &config).unwrap();
        assert_eq!(decoded.id, voter.id);
        assert!(decoded.grants(Role::Voter));
        assert!(!decoded.grants(Role::Admin));
    }

    #[test]
    fn tampered_token_is_rejected() {
        let config = Config::example();
        let voter = Voter::example();

        let cookie = AuthToken::new(&voter).into_cookie(&config);
        let mut tampered = cookie.value().to_string();
        tampered.pop();
        let forged = Cookie::new(AUTH_TOKEN_COOKIE, tampered);

        assert!(AuthToken::<Voter>::from_cookie(&forged, &config).is_err());
    }
}
