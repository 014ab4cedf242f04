use std::marker::PhantomData;

use chrono::{serde::ts_seconds, DateTime, Utc};
use jsonwebtoken::{DecodingKey, EncodingKey, Header, TokenData, Validation};
use rocket::{
    http::{Cookie, SameSite, Status},
    outcome::{try_outcome, IntoOutcome},
    request::{FromRequest, Outcome},
    time::Duration,
    Request,
};
use serde::{Deserialize, Serialize};

use crate::config::{Config, SharedAccounts};
use crate::error::{Error, Result};
use crate::model::common::{Caller, Principal};

use super::account::Account;
use super::user::{Any, Rights, Role};

pub const AUTH_TOKEN_COOKIE: &str = "auth_token";

/// An authentication token representing a specific principal with specific rights.
/// The role parameter restricts which rights the request guard accepts.
#[derive(Serialize, Deserialize)]
pub struct AuthToken<R = Any> {
    #[serde(rename = "sub")]
    pub principal: Principal,
    #[serde(rename = "rgt")]
    pub rights: Rights,
    #[serde(skip)]
    phantom: PhantomData<R>,
}

impl<R> AuthToken<R> {
    /// Create a new [`AuthToken`] for the given account.
    pub fn new(account: &Account) -> Self {
        Self {
            principal: account.principal(),
            rights: account.rights,
            phantom: PhantomData,
        }
    }

    /// The caller this token authenticates.
    pub fn caller(&self) -> Caller {
        Caller::new(self.principal.clone(), self.rights)
    }

    /// Serialize this token into a cookie.
    pub fn into_cookie(self, config: &Config) -> Result<Cookie<'static>> {
        let claims = Claims {
            token: self,
            expire_at: Utc::now() + config.auth_ttl(),
        };

        let token = jsonwebtoken::encode(
            &Header::default(),
            &claims,
            &EncodingKey::from_secret(config.jwt_secret()),
        )?;

        Ok(Cookie::build(AUTH_TOKEN_COOKIE, token)
            .max_age(Duration::seconds(config.auth_ttl().num_seconds()))
            .http_only(true)
            .same_site(SameSite::Strict)
            .finish())
    }

    /// Deserialize a token from a cookie.
    pub fn from_cookie(cookie: &Cookie<'static>, config: &Config) -> Result<Self> {
        let token = jsonwebtoken::decode(
            cookie.value(),
            &DecodingKey::from_secret(config.jwt_secret()),
            &Validation::default(),
        )
        .map(|claims: TokenData<Claims<R>>| claims.claims.token)?;
        Ok(token)
    }
}

/// Cookie claims: the token itself plus an expiry datetime.
#[derive(Serialize, Deserialize)]
struct Claims<R> {
    #[serde(flatten, bound = "")]
    token: AuthToken<R>,
    #[serde(rename = "exp", with = "ts_seconds")]
    expire_at: DateTime<Utc>,
}

#[rocket::async_trait]
impl<'r, R> FromRequest<'r> for AuthToken<R>
where
    R: Role + Send,
{
    type Error = Error;

    /// Get an [`AuthToken`] from the cookie and verify that its account still exists
    /// and holds the rights this role demands.
    async fn from_request(req: &'r Request<'_>) -> Outcome<Self, Self::Error> {
        let config = try_outcome!(req.rocket().state::<Config>().into_outcome((
            Status::InternalServerError,
            Error::not_found("Application config")
        )));

        let cookie = try_outcome!(req.cookies().get(AUTH_TOKEN_COOKIE).into_outcome((
            Status::Unauthorized,
            Error::unauthorized("No authentication token")
        )));

        let token: Self = match Self::from_cookie(cookie, config) {
            Ok(token) => token,
            Err(e) => return Outcome::Failure((Status::Unauthorized, e)),
        };

        // Check the account actually exists and has not changed rights.
        let accounts = try_outcome!(req.rocket().state::<SharedAccounts>().into_outcome((
            Status::InternalServerError,
            Error::not_found("Account store")
        )));
        let known = accounts
            .lock()
            .await
            .get(token.principal.as_str())
            .map_or(false, |account| account.rights == token.rights);
        if !known {
            return Outcome::Failure((
                Status::Unauthorized,
                Error::unauthorized(format!("Unknown account '{}'", token.principal)),
            ));
        }

        if !R::permits(token.rights) {
            return Outcome::Failure((
                Status::Forbidden,
                Error::unauthorized(format!(
                    "'{}' lacks the rights for this request",
                    token.principal
                )),
            ));
        }

        Outcome::Success(token)
    }
}
