mod registry;
mod voter_core;

pub use registry::VoterRegistry;
pub use voter_core::{KeyHash, NewVoter, Voter, VoterBatch};
