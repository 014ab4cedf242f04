use chrono::{DateTime, Utc};
use log::{debug, warn};
use serde::{Deserialize, Serialize};

use crate::error::{Error, Result};
use crate::model::{
    common::{Caller, ChoiceId, ContentRef, ElectionId, Nonce, VoterId},
    election::VoteCredential,
    registry::ElectionRegistry,
    vote::VoteRequest,
    voter::KeyHash,
};

use super::authorizer::{quota_exhausted, RelayAuthorizer};

/// Many votes for one election, given as parallel arrays.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct RelayBatchRequest {
    pub election_id: ElectionId,
    pub voter_ids: Vec<VoterId>,
    pub key_hashes: Vec<KeyHash>,
    pub choices: Vec<Vec<ChoiceId>>,
    pub receipt_refs: Vec<ContentRef>,
    pub nonces: Vec<Nonce>,
}

impl RelayBatchRequest {
    pub fn len(&self) -> usize {
        self.voter_ids.len()
    }

    pub fn is_empty(&self) -> bool {
        self.voter_ids.is_empty()
    }
}

/// Why one element of a batch was not recorded.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct BatchFailure {
    pub index: usize,
    pub voter_id: VoterId,
    pub reason: String,
}

/// The result of a batch in which at least one vote was recorded.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct BatchOutcome {
    pub succeeded: usize,
    /// Voters whose votes were recorded, in batch order.
    pub accepted: Vec<VoterId>,
    pub failures: Vec<BatchFailure>,
}

impl RelayAuthorizer {
    /// Submit a batch of votes, recording each one that passes its own checks.
    ///
    /// The batch as a whole must fit the per-call ceiling and the period budget.
    /// If no vote is recorded, the first element's error is returned.
    pub fn execute_batch(
        &mut self,
        registry: &mut ElectionRegistry,
        caller: &Caller,
        batch: RelayBatchRequest,
        now: DateTime<Utc>,
    ) -> Result<BatchOutcome> {
        let count = batch.len();
        if count == 0 {
            return Err(Error::invalid_input("Relay batch is empty"));
        }
        if batch.key_hashes.len() != count
            || batch.choices.len() != count
            || batch.receipt_refs.len() != count
            || batch.nonces.len() != count
        {
            return Err(Error::invalid_input("Relay batch arrays differ in length"));
        }
        if count > self.policy().max_batch_size {
            return Err(Error::invalid_input(format!(
                "Relay batch of {count} exceeds the maximum of {}",
                self.policy().max_batch_size
            )));
        }
        let election_id = batch.election_id;
        let record = self.authorized_record(election_id)?;
        self.check_cost(record, count as u64, now)?;
        let remaining = record.quota.saturating_sub(record.processed);
        debug!(
            "'{}' relays {count} votes in election {election_id}",
            caller.principal
        );

        let election = registry.get_mut(election_id)?;
        let mut accepted = Vec::new();
        let mut failures = Vec::new();
        let mut first_error = None;

        let elements = batch
            .voter_ids
            .into_iter()
            .zip(batch.key_hashes)
            .zip(batch.choices)
            .zip(batch.receipt_refs)
            .zip(batch.nonces)
            .enumerate();
        for (index, ((((voter_id, key_hash), choices), receipt_ref), nonce)) in elements {
            let credential = VoteCredential::Relay {
                relay: self.principal(),
                key_hash: &key_hash,
            };
            let result = if accepted.len() as u64 >= remaining {
                Err(quota_exhausted(election_id))
            } else {
                self.check_nonce(&nonce)
                    .and_then(|()| election.check_vote(credential, &voter_id))
                    .and_then(|()| {
                        election.cast_vote(
                            credential,
                            VoteRequest {
                                voter_id: voter_id.clone(),
                                choices,
                                receipt_ref,
                            },
                            now,
                        )
                    })
            };

            match result {
                Ok(()) => {
                    self.used_nonces.insert(nonce);
                    accepted.push(voter_id);
                }
                Err(err) => {
                    warn!("Relay batch element {index} ('{voter_id}') rejected: {err}");
                    failures.push(BatchFailure {
                        index,
                        voter_id,
                        reason: err.to_string(),
                    });
                    first_error.get_or_insert(err);
                }
            }
        }

        if accepted.is_empty() {
            return Err(first_error
                .unwrap_or_else(|| Error::invalid_input("Relay batch recorded no votes")));
        }
        self.account(election_id, accepted.len() as u64, now);
        Ok(BatchOutcome {
            succeeded: accepted.len(),
            accepted,
            failures,
        })
    }
}
