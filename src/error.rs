use argon2::Error as Argon2Error;
use jsonwebtoken::errors::Error as JwtError;
use mongodb::error::Error as DbError;
use rocket::{http::Status, response::Responder};
use thiserror::Error;

use crate::model::common::election::ElectionId;

pub type Result<T, E = Error> = std::result::Result<T, E>;

/// Everything that can go wrong at the request boundary.
///
/// All variants are recoverable: they map to an HTTP status and the process
/// carries on. `NotFound` doubles as the response for denied access to a
/// private election, so callers cannot distinguish "hidden from you" from
/// "does not exist".
#[derive(Debug, Error)]
pub enum Error {
    #[error(transparent)]
    Db(#[from] DbError),
    #[error(transparent)]
    Jwt(#[from] JwtError),
    #[error(transparent)]
    Argon2(#[from] Argon2Error),
    #[error("Bad request: {0}")]
    BadRequest(String),
    #[error("Unauthorized: {0}")]
    Unauthorized(String),
    #[error("Not found: {0}")]
    NotFound(String),
    #[error("Invalid election configuration: {0}")]
    Validation(String),
    #[error("Election {0} is not active")]
    NotActive(ElectionId),
    #[error("Voter has already cast a ballot in election {0}")]
    AlreadyVoted(ElectionId),
    #[error("Invalid ballot choices: {0}")]
    InvalidChoice(String),
    #[error("No invitation matches that code")]
    InvitationNotFound,
    #[error("The invitation has expired")]
    InvitationExpired,
    #[error("The invitation has already been redeemed")]
    InvitationAlreadyUsed,
    #[error("Wrong election password")]
    WrongPassword,
    #[error("Election {0} requires a password before casting a ballot")]
    PasswordRequired(ElectionId),
    #[error("Storage failure: {0}")]
    Storage(String),
}

impl Error {
    /// 404 with a nicely-formatted message of what wasn't found.
    pub fn not_found(what: impl Into<String>) -> Self {
        Self::NotFound(what.into())
    }
}

impl<'r, 'o: 'r> Responder<'r, 'o> for Error {
    fn respond_to(self, _: &'r rocket::Request<'_>) -> rocket::response::Result<'o> {
        let status = match &self {
            Self::Db(_) | Self::Jwt(_) | Self::Argon2(_) | Self::Storage(_) => {
                error!("{self}");
                Status::InternalServerError
            }
            Self::BadRequest(_) => Status::BadRequest,
            Self::Unauthorized(_) | Self::WrongPassword => Status::Unauthorized,
            Self::NotFound(_) | Self::InvitationNotFound => Status::NotFound,
            Self::Validation(_) | Self::NotActive(_) | Self::InvalidChoice(_) => {
                Status::UnprocessableEntity
            }
            Self::AlreadyVoted(_) | Self::InvitationAlreadyUsed => Status::Conflict,
            Self::InvitationExpired => Status::Gone,
            Self::PasswordRequired(_) => Status::Forbidden,
        };
        if status != Status::InternalServerError {
            warn!("{self}");
        }
        Err(status)
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn denied_access_is_indistinguishable_from_missing() {
        // Both must render as plain 404s with no extra detail.
        let missing = Error::not_found("Election with ID '42'");
        let denied = Error::not_found("Election with ID '42'");
        assert_eq!(format!("{missing}"), format!("{denied}"));
    }
}
