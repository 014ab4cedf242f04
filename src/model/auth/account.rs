use std::collections::HashMap;

use argon2::Config;
use log::info;
use rand::Rng;
use serde::{Deserialize, Serialize};

use crate::error::{Error, Result};
use crate::model::common::Principal;

use super::user::Rights;

pub const MIN_PASSWORD_LENGTH: usize = 8;

/// Raw account credentials, received from a user. These are never stored directly,
/// since the password is in plaintext.
#[derive(Clone, Deserialize, Serialize)]
pub struct Credentials {
    pub username: String,
    pub password: String,
}

/// A registered account. The username doubles as the account's [`Principal`].
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Account {
    pub username: String,
    pub password_hash: String,
    pub rights: Rights,
}

impl Account {
    /// Create an account by hashing the password.
    /// This enforces that the username is non-empty, and the password meets minimum length.
    pub fn new(credentials: Credentials, rights: Rights) -> Result<Self> {
        if credentials.username.is_empty() {
            return Err(Error::invalid_input("Username must not be empty"));
        }
        if credentials.password.len() < MIN_PASSWORD_LENGTH {
            return Err(Error::invalid_input(format!(
                "Password must be at least {MIN_PASSWORD_LENGTH} characters"
            )));
        }

        // 16 bytes is recommended for password hashing:
        //  https://en.wikipedia.org/wiki/Argon2
        let mut salt = [0_u8; 16];
        rand::thread_rng().fill(&mut salt);
        let password_hash =
            argon2::hash_encoded(credentials.password.as_bytes(), &salt, &Config::default())?;
        Ok(Self {
            username: credentials.username,
            password_hash,
            rights,
        })
    }

    /// Check whether the given password is correct.
    pub fn verify_password<T: AsRef<[u8]>>(&self, password: T) -> bool {
        // A malformed hash can only come from outside `Account::new`; treat it as a mismatch.
        argon2::verify_encoded(&self.password_hash, password.as_ref()).unwrap_or(false)
    }

    pub fn principal(&self) -> Principal {
        Principal::new(&self.username)
    }
}

/// All known accounts, by username.
#[derive(Debug, Default)]
pub struct AccountStore {
    accounts: HashMap<String, Account>,
}

impl AccountStore {
    pub fn new() -> Self {
        Self::default()
    }

    /// Register a new account. Usernames are unique.
    pub fn register(&mut self, credentials: Credentials, rights: Rights) -> Result<&Account> {
        if self.accounts.contains_key(&credentials.username) {
            return Err(Error::AlreadyExists(format!(
                "Username already in use: {}",
                credentials.username
            )));
        }
        let account = Account::new(credentials, rights)?;
        info!("Registered {} account '{}'", account.rights, account.username);
        let username = account.username.clone();
        Ok(self.accounts.entry(username).or_insert(account))
    }

    /// Find the account matching the given credentials.
    pub fn authenticate(&self, credentials: &Credentials) -> Result<&Account> {
        self.accounts
            .get(&credentials.username)
            .filter(|account| account.verify_password(&credentials.password))
            .ok_or_else(|| {
                Error::unauthorized("No account found with the provided username and password")
            })
    }

    pub fn get(&self, username: &str) -> Option<&Account> {
        self.accounts.get(username)
    }

    /// Make sure the configured administrator exists, creating it if necessary.
    pub fn ensure_admin_exists(&mut self, credentials: Credentials) -> Result<()> {
        match self.accounts.get(&credentials.username) {
            Some(account) if account.rights == Rights::Admin => Ok(()),
            Some(_) => Err(Error::AlreadyExists(format!(
                "Username '{}' is taken by a non-admin account",
                credentials.username
            ))),
            None => self.register(credentials, Rights::Admin).map(|_| ()),
        }
    }
}


#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn register_and_authenticate() {
        let mut store = AccountStore::new();
        store
            .register(Credentials::example1(), Rights::User)
            .unwrap();

        let account = store.authenticate(&Credentials::example1()).unwrap();
        assert_eq!(account.rights, Rights::User);
        assert_eq!(account.principal(), Principal::new("alice112"));

        let mut wrong = Credentials::example1();
        wrong.password = "not the password".into();
        assert!(matches!(
            store.authenticate(&wrong),
            Err(Error::Unauthorized(_))
        ));
        assert!(store.authenticate(&Credentials::example2()).is_err());
    }

    #[test]
    fn reject_bad_credentials() {
        let mut store = AccountStore::new();
        assert!(matches!(
            store.register(Credentials::empty(), Rights::User),
            Err(Error::InvalidInput(_))
        ));

        let short = Credentials {
            username: "shorty".into(),
            password: "1234".into(),
        };
        assert!(matches!(
            store.register(short, Rights::User),
            Err(Error::InvalidInput(_))
        ));
    }

    #[test]
    fn usernames_are_unique() {
        let mut store = AccountStore::new();
        store
            .register(Credentials::example1(), Rights::User)
            .unwrap();
        assert!(matches!(
            store.register(Credentials::example1(), Rights::Admin),
            Err(Error::AlreadyExists(_))
        ));
    }

    #[test]
    fn ensure_admin_is_idempotent() {
        let mut store = AccountStore::new();
        store.ensure_admin_exists(Credentials::example2()).unwrap();
        store.ensure_admin_exists(Credentials::example2()).unwrap();
        assert_eq!(
            store.get("bobthevoter").map(|account| account.rights),
            Some(Rights::Admin)
        );
    }
}
