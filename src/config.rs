use chrono::Duration;
use log::{error, info};
use rocket::{
    fairing::{Fairing, Info, Kind},
    tokio::sync::Mutex,
    Build, Rocket,
};
use serde::Deserialize;

use crate::model::{
    auth::{AccountStore, Credentials},
    common::{Principal, SystemClock},
    election::ElectionLimits,
    relay::RelayPolicy,
    system::ElectionSystem,
};

/// The election service, shared between request handlers.
pub type SharedSystem = Mutex<ElectionSystem>;
/// The account store, shared between request handlers and the auth guard.
pub type SharedAccounts = Mutex<AccountStore>;

/// Application configuration, derived from `Rocket.toml` and `ROCKET_*`
/// environment variables. This struct becomes managed state and can be
/// inspected by any endpoint.
#[derive(Deserialize)]
pub struct Config {
    // non-secrets
    auth_ttl: u32,
    access_url_base: String,
    relay_principal: String,
    min_election_duration: u32,
    max_election_duration: u32,
    relay_cost_per_vote: u64,
    relay_max_cost_per_call: u64,
    relay_budget_period: u32,
    relay_max_batch_size: usize,
    // secrets
    jwt_secret: String,
    admin_username: String,
    admin_password: String,
}

impl Config {
    /// Valid lifetime of auth token cookies in seconds.
    pub fn auth_ttl(&self) -> Duration {
        Duration::seconds(self.auth_ttl.into())
    }

    /// Secret key used to encrypt JWTs.
    pub fn jwt_secret(&self) -> &[u8] {
        self.jwt_secret.as_bytes()
    }

    /// Prefix of every election's access URL.
    pub fn access_url_base(&self) -> &str {
        &self.access_url_base
    }

    /// The identity under which the relay registers itself on elections.
    pub fn relay_principal(&self) -> Principal {
        Principal::new(&self.relay_principal)
    }

    /// Credentials of the administrator created at launch if missing.
    pub fn admin_credentials(&self) -> Credentials {
        Credentials {
            username: self.admin_username.clone(),
            password: self.admin_password.clone(),
        }
    }

    pub fn election_limits(&self) -> ElectionLimits {
        ElectionLimits {
            min_duration: Duration::seconds(self.min_election_duration.into()),
            max_duration: Duration::seconds(self.max_election_duration.into()),
        }
    }

    pub fn relay_policy(&self) -> RelayPolicy {
        RelayPolicy {
            cost_per_vote: self.relay_cost_per_vote,
            max_cost_per_call: self.relay_max_cost_per_call,
            period: Duration::seconds(self.relay_budget_period.into()),
            max_batch_size: self.relay_max_batch_size,
        }
    }
}

/// A fairing that loads the application config and puts it in managed state.
/// This could easily be achieved using `AdHoc::config`, but is written out
/// explicitly for symmetry with the other fairings and control over error
/// messages.
pub struct ConfigFairing;

#[rocket::async_trait]
impl Fairing for ConfigFairing {
    fn info(&self) -> Info {
        Info {
            name: "Config",
            kind: Kind::Ignite,
        }
    }

    async fn on_ignite(&self, mut rocket: Rocket<Build>) -> rocket::fairing::Result {
        // Load the config.
        let config = match rocket.figment().extract::<Config>() {
            Ok(config) => config,
            Err(e) => {
                error!("Failed to load application config");
                rocket::config::pretty_print_error(e);
                return Err(rocket);
            }
        };

        // Manage the state.
        rocket = rocket.manage(config);
        Ok(rocket)
    }
}

/// A fairing that builds the election service and account store from the
/// application config, makes sure the default administrator exists, and
/// places both into managed state.
pub struct SystemFairing;

#[rocket::async_trait]
impl Fairing for SystemFairing {
    fn info(&self) -> Info {
        Info {
            name: "Election system",
            kind: Kind::Ignite,
        }
    }

    async fn on_ignite(&self, mut rocket: Rocket<Build>) -> rocket::fairing::Result {
        let (system, admin) = match rocket.state::<Config>() {
            Some(config) => (
                ElectionSystem::new(
                    config.election_limits(),
                    config.access_url_base(),
                    config.relay_principal(),
                    config.relay_policy(),
                    Box::new(SystemClock),
                ),
                config.admin_credentials(),
            ),
            None => {
                error!("Application config must be loaded before the election system");
                return Err(rocket);
            }
        };

        let mut accounts = AccountStore::new();
        if let Err(e) = accounts.ensure_admin_exists(admin) {
            error!("Failed to create default admin: {e}");
            return Err(rocket);
        }
        info!(
            "Election system ready, relaying as '{}'",
            system.relay().principal()
        );

        // Manage the state.
        rocket = rocket
            .manage::<SharedSystem>(Mutex::new(system))
            .manage::<SharedAccounts>(Mutex::new(accounts));
        Ok(rocket)
    }
}

/// A figment holding every setting, for use in tests.
#[cfg(test)]
pub fn test_figment() -> rocket::figment::Figment {
    rocket::Config::figment()
        .merge(("auth_ttl", 3600))
        .merge(("access_url_base", "https://vote.example"))
        .merge(("relay_principal", "relay"))
        .merge(("min_election_duration", 3600))
        .merge(("max_election_duration", 31_536_000))
        .merge(("relay_cost_per_vote", 1))
        .merge(("relay_max_cost_per_call", 1000))
        .merge(("relay_budget_period", 86_400))
        .merge(("relay_max_batch_size", 100))
        .merge(("jwt_secret", "test-secret-not-for-production"))
        .merge(("admin_username", TEST_ADMIN_USERNAME))
        .merge(("admin_password", TEST_ADMIN_PASSWORD))
}

#[cfg(test)]
pub const TEST_ADMIN_USERNAME: &str = "admin";
#[cfg(test)]
pub const TEST_ADMIN_PASSWORD: &str = "correct horse battery staple";
