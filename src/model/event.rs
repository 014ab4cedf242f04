use chrono::{DateTime, Utc};
use log::info;
use serde::{Deserialize, Serialize};

use crate::model::{
    common::{BallotId, ContentRef, ElectionId, Principal, VoterId},
    election::{ConfigSection, ElectionStatus},
    vote::VotePath,
};

/// Something that happened to an election.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(tag = "type", rename_all = "snake_case")]
pub enum Event {
    ElectionCreated {
        creator: Principal,
        title: String,
    },
    StatusChanged {
        from: ElectionStatus,
        to: ElectionStatus,
    },
    ConfigUpdated {
        section: ConfigSection,
    },
    BallotAdded {
        ballot_id: BallotId,
    },
    VoterAdded {
        voter_id: VoterId,
    },
    VotersBatchAdded {
        count: usize,
        list_ref: ContentRef,
    },
    VoteCast {
        voter_id: VoterId,
        path: VotePath,
    },
    MetadataUpdated {
        metadata_ref: ContentRef,
    },
    AccessUrlUpdated {
        url: String,
    },
    RelayAuthorized {
        quota: u64,
    },
    RelayUnauthorized,
    RelayQuotaUpdated {
        quota: u64,
    },
    RelayCostLimitUpdated {
        cost_limit: Option<u64>,
    },
}

#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct EventRecord {
    pub seq: u64,
    pub election_id: ElectionId,
    pub at: DateTime<Utc>,
    #[serde(flatten)]
    pub event: Event,
}

/// Append-only record of every successful mutation.
#[derive(Debug, Default)]
pub struct EventLog {
    records: Vec<EventRecord>,
}

impl EventLog {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn emit(&mut self, election_id: ElectionId, at: DateTime<Utc>, event: Event) {
        let seq = self.records.len() as u64 + 1;
        info!("Election {election_id} event #{seq}: {event:?}");
        self.records.push(EventRecord {
            seq,
            election_id,
            at,
            event,
        });
    }

    pub fn for_election(&self, election_id: ElectionId) -> impl Iterator<Item = &EventRecord> {
        self.records
            .iter()
            .filter(move |record| record.election_id == election_id)
    }

    pub fn len(&self) -> usize {
        self.records.len()
    }

    pub fn is_empty(&self) -> bool {
        self.records.is_empty()
    }
}
