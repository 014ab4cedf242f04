pub use desc::{ElectionCounts, ElectionDescription, ElectionSummary};
pub use election_core::{ConfigSection, Election, ElectionConfig, VoteCredential};
pub use spec::{
    BasicInfo, ElectionLimits, ElectionSpec, Messages, ResultsConfig, Timing, VotingSettings,
};
pub use status::ElectionStatus;

mod desc;
mod election_core;
pub mod spec;
mod status;
