use std::collections::BTreeMap;
use std::fmt::Display;

use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};

use crate::error::{Error, Result};
use crate::model::common::{ChoiceId, ContentRef, VoterId};

/// How a voter proved who they are.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum VotePath {
    /// The caller is the voter's bound identity.
    Direct,
    /// The caller presented a registered key hash.
    KeyHash,
    /// An authorized relay submitted the vote for the voter.
    Relay,
}

impl Display for VotePath {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        let name = match self {
            Self::Direct => "direct",
            Self::KeyHash => "key hash",
            Self::Relay => "relay",
        };
        write!(f, "{name}")
    }
}

/// A vote, as submitted.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct VoteRequest {
    pub voter_id: VoterId,
    /// Choices in the order given; stored verbatim, never interpreted.
    pub choices: Vec<ChoiceId>,
    /// Reference to the vote receipt in the content store.
    pub receipt_ref: ContentRef,
}

/// A recorded vote. One per voter, never updated.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct Vote {
    pub voter_id: VoterId,
    pub choices: Vec<ChoiceId>,
    pub cast_at: DateTime<Utc>,
    pub receipt_ref: ContentRef,
}

/// All votes cast in one election, keyed by voter.
#[derive(Debug, Clone, Default)]
pub struct VoteLedger {
    votes: BTreeMap<VoterId, Vote>,
}

impl VoteLedger {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn contains(&self, voter_id: &str) -> bool {
        self.votes.contains_key(voter_id)
    }

    pub(crate) fn record(&mut self, request: VoteRequest, now: DateTime<Utc>) -> Result<()> {
        if self.contains(&request.voter_id) {
            return Err(Error::AlreadyVoted(request.voter_id));
        }
        self.votes.insert(
            request.voter_id.clone(),
            Vote {
                voter_id: request.voter_id,
                choices: request.choices,
                cast_at: now,
                receipt_ref: request.receipt_ref,
            },
        );
        Ok(())
    }

    pub fn get(&self, voter_id: &str) -> Option<&Vote> {
        self.votes.get(voter_id)
    }

    pub fn len(&self) -> usize {
        self.votes.len()
    }

    pub fn is_empty(&self) -> bool {
        self.votes.is_empty()
    }
}


#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn one_vote_per_voter() {
        let now = Utc::now();
        let mut ledger = VoteLedger::new();
        ledger.record(VoteRequest::example("voter-a"), now).unwrap();

        let mut second = VoteRequest::example("voter-a");
        second.choices = vec!["candidate-3".to_string()];
        assert!(matches!(
            ledger.record(second, now),
            Err(Error::AlreadyVoted(_))
        ));

        assert_eq!(ledger.len(), 1);
        let vote = ledger.get("voter-a").unwrap();
        assert_eq!(vote.choices, VoteRequest::example("voter-a").choices);
    }
}
