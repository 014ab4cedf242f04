use std::collections::{BTreeMap, HashSet};

use chrono::{DateTime, Duration, Utc};
use log::debug;
use serde::{Deserialize, Serialize};

use crate::error::{Error, Result};
use crate::model::{
    common::{Caller, ChoiceId, ContentRef, ElectionId, Nonce, Principal, VoterId},
    election::VoteCredential,
    registry::ElectionRegistry,
    vote::VoteRequest,
    voter::KeyHash,
};

/// Limits applying to every election the relay serves.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct RelayPolicy {
    pub cost_per_vote: u64,
    /// No single call may cost more than this.
    pub max_cost_per_call: u64,
    /// How often each election's spending budget resets.
    pub period: Duration,
    pub max_batch_size: usize,
}

impl Default for RelayPolicy {
    fn default() -> Self {
        Self {
            cost_per_vote: 1,
            max_cost_per_call: 1000,
            period: Duration::days(1),
            max_batch_size: 100,
        }
    }
}

/// What the relay knows about one election.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct RelayRecord {
    pub election_id: ElectionId,
    pub authorized: bool,
    /// Most votes the relay will ever submit for this election.
    pub quota: u64,
    pub processed: u64,
    /// Spending allowed per budget period; `None` is unlimited.
    pub cost_limit: Option<u64>,
    pub period_cost: u64,
    pub period_start: DateTime<Utc>,
}

impl RelayRecord {
    fn remaining_quota(&self) -> u64 {
        self.quota.saturating_sub(self.processed)
    }
}

/// A single vote submitted through the relay.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct RelayVoteRequest {
    pub election_id: ElectionId,
    pub voter_id: VoterId,
    pub key_hash: KeyHash,
    pub choices: Vec<ChoiceId>,
    pub receipt_ref: ContentRef,
    /// Single-use across all elections.
    pub nonce: Nonce,
}

/// Submits votes on voters' behalf, within per-election quotas and spending budgets.
///
/// Every submission is validated in full before anything changes: the nonce, the
/// quota and budget, and the election's own relay-path checks.
#[derive(Debug)]
pub struct RelayAuthorizer {
    principal: Principal,
    policy: RelayPolicy,
    pub(super) records: BTreeMap<ElectionId, RelayRecord>,
    pub(super) used_nonces: HashSet<Nonce>,
    total_processed: u64,
}

impl RelayAuthorizer {
    pub fn new(principal: Principal, policy: RelayPolicy) -> Self {
        Self {
            principal,
            policy,
            records: BTreeMap::new(),
            used_nonces: HashSet::new(),
            total_processed: 0,
        }
    }

    /// The identity the relay registers on elections and votes as.
    pub fn principal(&self) -> &Principal {
        &self.principal
    }

    pub fn policy(&self) -> &RelayPolicy {
        &self.policy
    }

    pub fn record(&self, election_id: ElectionId) -> Result<&RelayRecord> {
        self.records
            .get(&election_id)
            .ok_or_else(|| Error::not_found(format!("Relay record for election {election_id}")))
    }

    pub fn total_processed(&self) -> u64 {
        self.total_processed
    }

    pub fn is_nonce_used(&self, nonce: &str) -> bool {
        self.used_nonces.contains(nonce)
    }

    /// Allow the relay to vote in an election, up to `quota` votes.
    /// Re-authorizing keeps the counters already accumulated.
    pub fn authorize(
        &mut self,
        registry: &mut ElectionRegistry,
        caller: &Caller,
        election_id: ElectionId,
        quota: u64,
        now: DateTime<Utc>,
    ) -> Result<()> {
        ensure_admin(caller)?;
        if election_id == 0 {
            return Err(Error::invalid_input("Election ID must be non-zero"));
        }
        if quota == 0 {
            return Err(Error::invalid_input("Relay quota must be positive"));
        }
        registry
            .get_mut(election_id)?
            .set_relay(caller, &self.principal, true)?;

        let record = self
            .records
            .entry(election_id)
            .or_insert_with(|| RelayRecord {
                election_id,
                authorized: false,
                quota,
                processed: 0,
                cost_limit: None,
                period_cost: 0,
                period_start: now,
            });
        record.authorized = true;
        record.quota = quota;
        Ok(())
    }

    /// Withdraw the relay from an election. A deleted election only loses the relay's side.
    pub fn unauthorize(
        &mut self,
        registry: &mut ElectionRegistry,
        caller: &Caller,
        election_id: ElectionId,
    ) -> Result<()> {
        ensure_admin(caller)?;
        self.authorized_record(election_id)?;
        let election = registry.find_mut(election_id)?;
        if !election.is_deleted() {
            election.set_relay(caller, &self.principal, false)?;
        }
        if let Some(record) = self.records.get_mut(&election_id) {
            record.authorized = false;
        }
        Ok(())
    }

    pub fn update_quota(
        &mut self,
        registry: &ElectionRegistry,
        caller: &Caller,
        election_id: ElectionId,
        quota: u64,
    ) -> Result<()> {
        ensure_admin(caller)?;
        registry.get(election_id)?;
        if quota == 0 {
            return Err(Error::invalid_input("Relay quota must be positive"));
        }
        self.authorized_record_mut(election_id)?.quota = quota;
        Ok(())
    }

    pub fn update_cost_limit(
        &mut self,
        registry: &ElectionRegistry,
        caller: &Caller,
        election_id: ElectionId,
        cost_limit: Option<u64>,
    ) -> Result<()> {
        ensure_admin(caller)?;
        registry.get(election_id)?;
        self.authorized_record_mut(election_id)?.cost_limit = cost_limit;
        Ok(())
    }

    /// Submit one vote on a voter's behalf.
    pub fn execute_vote(
        &mut self,
        registry: &mut ElectionRegistry,
        caller: &Caller,
        request: RelayVoteRequest,
        now: DateTime<Utc>,
    ) -> Result<()> {
        debug!(
            "'{}' relays a vote for '{}' in election {}",
            caller.principal, request.voter_id, request.election_id
        );
        let record = self.authorized_record(request.election_id)?;
        if record.remaining_quota() == 0 {
            return Err(quota_exhausted(request.election_id));
        }
        self.check_nonce(&request.nonce)?;
        self.check_cost(record, 1, now)?;

        let credential = VoteCredential::Relay {
            relay: &self.principal,
            key_hash: &request.key_hash,
        };
        let election = registry.get_mut(request.election_id)?;
        election.check_vote(credential, &request.voter_id)?;

        election.cast_vote(
            credential,
            VoteRequest {
                voter_id: request.voter_id,
                choices: request.choices,
                receipt_ref: request.receipt_ref,
            },
            now,
        )?;
        self.used_nonces.insert(request.nonce);
        self.account(request.election_id, 1, now);
        Ok(())
    }

    pub(super) fn authorized_record(&self, election_id: ElectionId) -> Result<&RelayRecord> {
        self.records
            .get(&election_id)
            .filter(|record| record.authorized)
            .ok_or_else(|| {
                Error::NotAuthorized(format!("Relay is not authorized for election {election_id}"))
            })
    }

    fn authorized_record_mut(&mut self, election_id: ElectionId) -> Result<&mut RelayRecord> {
        self.records
            .get_mut(&election_id)
            .filter(|record| record.authorized)
            .ok_or_else(|| {
                Error::NotAuthorized(format!("Relay is not authorized for election {election_id}"))
            })
    }

    pub(super) fn check_nonce(&self, nonce: &str) -> Result<()> {
        if nonce.is_empty() {
            return Err(Error::invalid_input("Nonce must not be empty"));
        }
        if self.used_nonces.contains(nonce) {
            return Err(Error::NonceReused(nonce.to_string()));
        }
        Ok(())
    }

    /// Would submitting `votes` more votes stay within the per-call ceiling and the period budget?
    pub(super) fn check_cost(&self, record: &RelayRecord, votes: u64, now: DateTime<Utc>) -> Result<()> {
        let cost = votes
            .checked_mul(self.policy.cost_per_vote)
            .ok_or_else(|| Error::invalid_input("Relay cost overflows"))?;
        if cost > self.policy.max_cost_per_call {
            return Err(Error::NotAuthorized(format!(
                "Cost {cost} exceeds the per-call ceiling of {}",
                self.policy.max_cost_per_call
            )));
        }
        if let Some(limit) = record.cost_limit {
            let spent = self.period_cost(record, now);
            if spent.saturating_add(cost) > limit {
                return Err(Error::NotAuthorized(format!(
                    "Cost {cost} exceeds the remaining budget for election {} ({} of {limit} spent)",
                    record.election_id, spent
                )));
            }
        }
        Ok(())
    }

    fn period_cost(&self, record: &RelayRecord, now: DateTime<Utc>) -> u64 {
        if now - record.period_start >= self.policy.period {
            0
        } else {
            record.period_cost
        }
    }

    /// Count `votes` successful submissions against the election's quota and budget.
    pub(super) fn account(&mut self, election_id: ElectionId, votes: u64, now: DateTime<Utc>) {
        let period = self.policy.period;
        let cost = votes.saturating_mul(self.policy.cost_per_vote);
        if let Some(record) = self.records.get_mut(&election_id) {
            if now - record.period_start >= period {
                record.period_start = now;
                record.period_cost = 0;
            }
            record.period_cost = record.period_cost.saturating_add(cost);
            record.processed += votes;
        }
        self.total_processed += votes;
    }
}

fn ensure_admin(caller: &Caller) -> Result<()> {
    if !caller.is_admin() {
        return Err(Error::unauthorized(format!(
            "'{}' may not manage relay authorizations",
            caller.principal
        )));
    }
    Ok(())
}

pub(super) fn quota_exhausted(election_id: ElectionId) -> Error {
    Error::NotAuthorized(format!("Relay quota exhausted for election {election_id}"))
}
