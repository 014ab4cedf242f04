#[macro_use]
extern crate rocket;

#[cfg(test)]
#[macro_use]
extern crate backend_test;

use rocket::{figment::Figment, Build, Rocket};

use crate::config::{ConfigFairing, SystemFairing};
use crate::logging::LoggerFairing;

pub mod api;
pub mod config;
pub mod error;
pub mod logging;
pub mod model;

/// The server, configured from `Rocket.toml` and the environment.
pub fn build() -> Rocket<Build> {
    rocket_for_figment(rocket::Config::figment())
}

/// The server, configured from the given figment.
pub fn rocket_for_figment(figment: Figment) -> Rocket<Build> {
    rocket::custom(figment)
        .attach(LoggerFairing)
        .attach(ConfigFairing)
        .attach(SystemFairing)
        .mount("/", api::routes())
}
