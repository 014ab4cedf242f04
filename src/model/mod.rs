pub mod auth;
pub mod ballot;
pub mod common;
pub mod election;
pub mod event;
pub mod registry;
pub mod relay;
pub mod system;
pub mod vote;
pub mod voter;
