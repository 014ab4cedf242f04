use std::collections::{BTreeMap, HashMap, HashSet};

use chrono::{DateTime, Utc};

use crate::error::{Error, Result};
use crate::model::common::{Principal, VoterId};

use super::voter_core::{KeyHash, NewVoter, Voter, VoterBatch};

/// The voters of one election, indexed both by voter ID and by bound identity,
/// plus the election's set of authentication key hashes.
///
/// Key hashes are not bound to any particular voter: any registered hash
/// authenticates for any voter ID.
#[derive(Debug, Clone, Default)]
pub struct VoterRegistry {
    voters: BTreeMap<VoterId, Voter>,
    by_identity: HashMap<Principal, VoterId>,
    key_hashes: HashSet<KeyHash>,
}

impl VoterRegistry {
    pub fn new() -> Self {
        Self::default()
    }

    /// Register one voter and their key hash, if doing so keeps the registry within `capacity`.
    pub(crate) fn add(
        &mut self,
        new_voter: NewVoter,
        capacity: u32,
        now: DateTime<Utc>,
    ) -> Result<()> {
        check_voter_id(&new_voter.voter_id)?;
        if self.voters.contains_key(&new_voter.voter_id) {
            return Err(Error::AlreadyExists(format!(
                "Voter '{}'",
                new_voter.voter_id
            )));
        }
        if self.voters.len() + 1 > capacity as usize {
            return Err(Error::CapacityExceeded(format!(
                "Election allows at most {capacity} voters"
            )));
        }
        if self.key_hashes.contains(&new_voter.key_hash) {
            return Err(Error::AlreadyExists(format!(
                "Key hash '{}'",
                new_voter.key_hash
            )));
        }

        self.key_hashes.insert(new_voter.key_hash);
        self.insert(new_voter.voter_id, new_voter.identity, new_voter.weight, now);
        Ok(())
    }

    /// Register a whole batch, or nothing at all.
    ///
    /// Capacity is checked against the total after the batch, before anything is written.
    pub(crate) fn add_batch(
        &mut self,
        batch: VoterBatch,
        capacity: u32,
        now: DateTime<Utc>,
    ) -> Result<usize> {
        let count = batch.len();
        if count == 0 {
            return Err(Error::invalid_input("Voter batch is empty"));
        }
        if batch.identities.len() != count || batch.weights.len() != count {
            return Err(Error::invalid_input(format!(
                "Mismatched batch lengths: {} identities, {} voter IDs, {} weights",
                batch.identities.len(),
                count,
                batch.weights.len()
            )));
        }
        if self.voters.len() + count > capacity as usize {
            return Err(Error::CapacityExceeded(format!(
                "Adding {count} voters to {} would exceed the limit of {capacity}",
                self.voters.len()
            )));
        }

        {
            let mut seen = HashSet::with_capacity(count);
            for voter_id in &batch.voter_ids {
                check_voter_id(voter_id)?;
                if self.voters.contains_key(voter_id) || !seen.insert(voter_id) {
                    return Err(Error::AlreadyExists(format!("Voter '{voter_id}'")));
                }
            }
        }

        let entries = batch
            .voter_ids
            .into_iter()
            .zip(batch.identities)
            .zip(batch.weights);
        for ((voter_id, identity), weight) in entries {
            self.insert(voter_id, identity, weight, now);
        }
        Ok(count)
    }

    fn insert(&mut self, voter_id: VoterId, identity: Principal, weight: u32, now: DateTime<Utc>) {
        // Last registration for an identity wins.
        self.by_identity.insert(identity.clone(), voter_id.clone());
        self.voters.insert(
            voter_id.clone(),
            Voter {
                voter_id,
                identity,
                weight,
                has_voted: false,
                registered_at: now,
            },
        );
    }

    pub fn get(&self, voter_id: &str) -> Option<&Voter> {
        self.voters.get(voter_id)
    }

    /// The voter ID most recently registered for this identity.
    pub fn voter_for_identity(&self, identity: &Principal) -> Option<&VoterId> {
        self.by_identity.get(identity)
    }

    pub fn has_key_hash(&self, key_hash: &KeyHash) -> bool {
        self.key_hashes.contains(key_hash)
    }

    /// May this voter still vote with this key hash? Never errors.
    pub fn verify_access(&self, voter_id: &str, key_hash: &KeyHash) -> bool {
        self.get(voter_id)
            .map_or(false, |voter| !voter.has_voted && self.has_key_hash(key_hash))
    }

    /// Set the has-voted flag, which may only happen once.
    pub(crate) fn mark_voted(&mut self, voter_id: &str) -> Result<()> {
        let voter = self
            .voters
            .get_mut(voter_id)
            .ok_or_else(|| Error::not_found(format!("Voter '{voter_id}'")))?;
        if voter.has_voted {
            return Err(Error::AlreadyVoted(voter_id.to_string()));
        }
        voter.has_voted = true;
        Ok(())
    }

    pub fn len(&self) -> usize {
        self.voters.len()
    }

    pub fn is_empty(&self) -> bool {
        self.voters.is_empty()
    }
}

fn check_voter_id(voter_id: &str) -> Result<()> {
    if voter_id.is_empty() {
        return Err(Error::invalid_input("Voter ID must not be empty"));
    }
    Ok(())
}
