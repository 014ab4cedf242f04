use argon2::Error as Argon2Error;
use jsonwebtoken::errors::{Error as JwtError, ErrorKind as JwtErrorKind};
use log::{error, warn};
use rocket::{http::Status, response::Responder};
use thiserror::Error;

use crate::model::common::{ElectionId, Nonce, VoterId};

pub type Result<T> = std::result::Result<T, Error>;

#[derive(Debug, Error)]
pub enum Error {
    #[error("Invalid input: {0}")]
    InvalidInput(String),
    #[error("Already exists: {0}")]
    AlreadyExists(String),
    #[error("Not found: {0}")]
    NotFound(String),
    #[error("Invalid state: {0}")]
    InvalidState(String),
    #[error("Unauthorized: {0}")]
    Unauthorized(String),
    #[error("Capacity exceeded: {0}")]
    CapacityExceeded(String),
    #[error("Voter '{0}' has already voted")]
    AlreadyVoted(VoterId),
    #[error("Election {0} is not active")]
    NotActive(ElectionId),
    #[error("Relay not authorized: {0}")]
    NotAuthorized(String),
    #[error("Nonce '{0}' has already been used")]
    NonceReused(Nonce),
    #[error("Election {0} has been deleted")]
    Deleted(ElectionId),
    #[error(transparent)]
    Jwt(#[from] JwtError),
    #[error(transparent)]
    Argon2(#[from] Argon2Error),
}

impl Error {
    pub fn not_found(what: impl Into<String>) -> Self {
        Self::NotFound(what.into())
    }

    pub fn invalid_input(what: impl Into<String>) -> Self {
        Self::InvalidInput(what.into())
    }

    pub fn unauthorized(what: impl Into<String>) -> Self {
        Self::Unauthorized(what.into())
    }

    /// The HTTP status this error is reported with.
    pub fn status(&self) -> Status {
        match self {
            Self::InvalidInput(_) => Status::BadRequest,
            Self::AlreadyExists(_) | Self::AlreadyVoted(_) | Self::NonceReused(_) => {
                Status::Conflict
            }
            Self::NotFound(_) => Status::NotFound,
            Self::InvalidState(_) | Self::CapacityExceeded(_) | Self::NotActive(_) => {
                Status::UnprocessableEntity
            }
            Self::Unauthorized(_) | Self::NotAuthorized(_) => Status::Forbidden,
            Self::Deleted(_) => Status::Gone,
            Self::Jwt(err) => match err.kind() {
                JwtErrorKind::ExpiredSignature | JwtErrorKind::ImmatureSignature => {
                    Status::Unauthorized
                }
                _ => Status::BadRequest,
            },
            Self::Argon2(_) => Status::InternalServerError,
        }
    }
}

impl<'r, 'o: 'r> Responder<'r, 'o> for Error {
    fn respond_to(self, _: &'r rocket::Request<'_>) -> rocket::response::Result<'o> {
        let status = self.status();
        if status.code >= 500 {
            error!("{self}");
        } else {
            warn!("{self}");
        }
        Err(status)
    }
}
