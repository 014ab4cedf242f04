use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};

use crate::model::common::{ElectionId, Principal};

use super::election_core::{Election, ElectionConfig};
use super::status::ElectionStatus;

/// An API-friendly election description. Voters and votes are not included.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct ElectionDescription {
    pub id: ElectionId,
    pub creator: Principal,
    pub created_at: DateTime<Utc>,
    pub status: ElectionStatus,
    #[serde(flatten)]
    pub config: ElectionConfig,
    /// Relays currently allowed to submit votes.
    pub relays: Vec<Principal>,
    pub counts: ElectionCounts,
}

impl From<&Election> for ElectionDescription {
    fn from(election: &Election) -> Self {
        Self {
            id: election.id(),
            creator: election.creator().clone(),
            created_at: election.created_at(),
            status: election.status(),
            config: election.config().clone(),
            relays: election.relays().cloned().collect(),
            counts: election.into(),
        }
    }
}

/// A summary of an election, shorter than the full `ElectionDescription`.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct ElectionSummary {
    pub id: ElectionId,
    pub title: String,
    pub status: ElectionStatus,
    pub start_time: DateTime<Utc>,
    pub end_time: DateTime<Utc>,
}

impl From<&Election> for ElectionSummary {
    fn from(election: &Election) -> Self {
        let config = election.config();
        Self {
            id: election.id(),
            title: config.info.title.clone(),
            status: election.status(),
            start_time: config.timing.start_time,
            end_time: config.timing.end_time,
        }
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
pub struct ElectionCounts {
    pub ballots: usize,
    pub voters: usize,
    pub votes: usize,
}

impl From<&Election> for ElectionCounts {
    fn from(election: &Election) -> Self {
        Self {
            ballots: election.ballots().len(),
            voters: election.voters().len(),
            votes: election.votes().len(),
        }
    }
}
