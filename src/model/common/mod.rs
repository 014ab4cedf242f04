//! Identifiers and small types shared by every part of the model.

mod clock;
mod principal;

pub use clock::{Clock, SystemClock};
pub use principal::{Caller, Principal};

#[cfg(test)]
pub use clock::ManualClock;

/// Our election IDs are integers, assigned densely from 1.
pub type ElectionId = u32;
/// Ballot IDs are integers scoped to one election, assigned densely from 1.
pub type BallotId = u32;
/// Voter IDs are caller-chosen strings, unique within one election.
pub type VoterId = String;
/// Opaque identifier of one choice within a vote.
pub type ChoiceId = String;
/// Opaque reference to content held in an external content-addressed store.
pub type ContentRef = String;
/// Single-use token protecting relayed submissions against replay.
pub type Nonce = String;
