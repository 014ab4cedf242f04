mod ballot_core;

pub use ballot_core::{Ballot, BallotCatalog, BallotSpec};
