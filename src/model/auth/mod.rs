//! Accounts and authentication tokens: the administrative identity source.

mod account;
mod token;
mod user;

pub use account::{Account, AccountStore, Credentials, MIN_PASSWORD_LENGTH};
pub use token::{AuthToken, AUTH_TOKEN_COOKIE};
pub use user::{Admin, Any, Rights, Role};
