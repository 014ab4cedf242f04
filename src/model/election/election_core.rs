use std::collections::BTreeSet;
use std::fmt::Display;

use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};

use crate::error::{Error, Result};
use crate::model::{
    ballot::{Ballot, BallotCatalog, BallotSpec},
    common::{BallotId, Caller, ContentRef, ElectionId, Principal},
    vote::{Vote, VoteLedger, VotePath, VoteRequest},
    voter::{KeyHash, NewVoter, Voter, VoterBatch, VoterRegistry},
};

use super::spec::{
    check_length, BasicInfo, ElectionLimits, ElectionSpec, Messages, ResultsConfig, Timing,
    VotingSettings, MAX_URL_LENGTH,
};
use super::status::ElectionStatus;

/// Everything about an election that its creator or the registry configures.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct ElectionConfig {
    #[serde(flatten)]
    pub info: BasicInfo,
    pub timing: Timing,
    pub settings: VotingSettings,
    pub messages: Messages,
    pub results: ResultsConfig,
    /// Reference to extra metadata in the content store.
    pub metadata_ref: Option<ContentRef>,
    /// Where voters go to take part.
    pub access_url: String,
}

/// The configuration sections that may only change while in draft.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum ConfigSection {
    Info,
    Timing,
    Settings,
    Messages,
    Results,
}

impl Display for ConfigSection {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        let name = match self {
            Self::Info => "basic info",
            Self::Timing => "timing",
            Self::Settings => "voting settings",
            Self::Messages => "messages",
            Self::Results => "results configuration",
        };
        write!(f, "{name}")
    }
}

/// The proof of identity accompanying a vote.
#[derive(Debug, Clone, Copy)]
pub enum VoteCredential<'a> {
    /// The calling principal, to be matched against the voter's bound identity.
    Direct(&'a Principal),
    /// A pre-shared key hash.
    KeyHash(&'a KeyHash),
    /// A relay vouching for a voter who presented a key hash.
    Relay {
        relay: &'a Principal,
        key_hash: &'a KeyHash,
    },
}

impl VoteCredential<'_> {
    pub fn path(&self) -> VotePath {
        match self {
            Self::Direct(_) => VotePath::Direct,
            Self::KeyHash(_) => VotePath::KeyHash,
            Self::Relay { .. } => VotePath::Relay,
        }
    }
}

/// One election: its configuration, lifecycle status, ballots, voters and votes.
///
/// Every mutation checks, in order: not deleted, caller role, lifecycle status,
/// then its own arguments. Nothing is written unless every check passes.
#[derive(Debug, Clone)]
pub struct Election {
    id: ElectionId,
    creator: Principal,
    created_at: DateTime<Utc>,
    status: ElectionStatus,
    config: ElectionConfig,
    relays: BTreeSet<Principal>,
    ballots: BallotCatalog,
    voters: VoterRegistry,
    votes: VoteLedger,
}

impl Election {
    /// Create a new draft election. The spec must already be validated.
    pub(crate) fn new(
        id: ElectionId,
        creator: Principal,
        spec: ElectionSpec,
        access_url: String,
        now: DateTime<Utc>,
    ) -> Self {
        Self {
            id,
            creator,
            created_at: now,
            status: ElectionStatus::Draft,
            config: ElectionConfig {
                info: spec.info,
                timing: spec.timing,
                settings: spec.settings,
                messages: spec.messages,
                results: spec.results,
                metadata_ref: None,
                access_url,
            },
            relays: BTreeSet::new(),
            ballots: BallotCatalog::new(),
            voters: VoterRegistry::new(),
            votes: VoteLedger::new(),
        }
    }

    pub fn id(&self) -> ElectionId {
        self.id
    }

    pub fn creator(&self) -> &Principal {
        &self.creator
    }

    pub fn created_at(&self) -> DateTime<Utc> {
        self.created_at
    }

    pub fn status(&self) -> ElectionStatus {
        self.status
    }

    pub fn config(&self) -> &ElectionConfig {
        &self.config
    }

    pub fn relays(&self) -> impl Iterator<Item = &Principal> {
        self.relays.iter()
    }

    pub fn is_relay(&self, principal: &Principal) -> bool {
        self.relays.contains(principal)
    }

    pub fn ballots(&self) -> &BallotCatalog {
        &self.ballots
    }

    pub fn voters(&self) -> &VoterRegistry {
        &self.voters
    }

    pub fn votes(&self) -> &VoteLedger {
        &self.votes
    }

    pub fn is_deleted(&self) -> bool {
        self.status == ElectionStatus::Deleted
    }

    fn ensure_live(&self) -> Result<()> {
        if self.is_deleted() {
            return Err(Error::Deleted(self.id));
        }
        Ok(())
    }

    fn ensure_creator(&self, caller: &Caller) -> Result<()> {
        if caller.principal != self.creator {
            return Err(Error::unauthorized(format!(
                "Only the creator may modify election {}",
                self.id
            )));
        }
        Ok(())
    }

    fn ensure_creator_or_registry(&self, caller: &Caller) -> Result<()> {
        if caller.is_admin() {
            return Ok(());
        }
        self.ensure_creator(caller)
    }

    fn ensure_draft(&self, action: impl Display) -> Result<()> {
        if self.status != ElectionStatus::Draft {
            return Err(Error::InvalidState(format!(
                "Cannot change {action} of election {} while {}",
                self.id, self.status
            )));
        }
        Ok(())
    }

    fn ensure_configurable(&self, caller: &Caller, section: ConfigSection) -> Result<()> {
        self.ensure_live()?;
        self.ensure_creator(caller)?;
        self.ensure_draft(section)
    }

    /// Move along one lifecycle edge, returning the previous status.
    /// Deletion is reserved for the creator; other moves may also be made by the registry.
    pub fn transition(&mut self, caller: &Caller, target: ElectionStatus) -> Result<ElectionStatus> {
        self.ensure_live()?;
        if target == ElectionStatus::Deleted {
            self.ensure_creator(caller)?;
        } else {
            self.ensure_creator_or_registry(caller)?;
        }
        if !self.status.can_transition_to(target) {
            return Err(Error::InvalidState(format!(
                "Election {} cannot move from {} to {target}",
                self.id, self.status
            )));
        }
        let previous = self.status;
        self.status = target;
        Ok(previous)
    }

    pub fn update_basic_info(&mut self, caller: &Caller, info: BasicInfo) -> Result<()> {
        self.ensure_configurable(caller, ConfigSection::Info)?;
        info.validate()?;
        self.config.info = info;
        Ok(())
    }

    pub fn update_timing(
        &mut self,
        caller: &Caller,
        timing: Timing,
        limits: &ElectionLimits,
        now: DateTime<Utc>,
    ) -> Result<()> {
        self.ensure_configurable(caller, ConfigSection::Timing)?;
        timing.validate(limits, now)?;
        self.config.timing = timing;
        Ok(())
    }

    pub fn update_voting_settings(&mut self, caller: &Caller, settings: VotingSettings) -> Result<()> {
        self.ensure_configurable(caller, ConfigSection::Settings)?;
        settings.validate()?;
        if (settings.max_voters as usize) < self.voters.len() {
            return Err(Error::invalid_input(format!(
                "Election {} already has {} voters",
                self.id,
                self.voters.len()
            )));
        }
        self.config.settings = settings;
        Ok(())
    }

    pub fn update_messages(&mut self, caller: &Caller, messages: Messages) -> Result<()> {
        self.ensure_configurable(caller, ConfigSection::Messages)?;
        messages.validate()?;
        self.config.messages = messages;
        Ok(())
    }

    pub fn update_results(&mut self, caller: &Caller, results: ResultsConfig) -> Result<()> {
        self.ensure_configurable(caller, ConfigSection::Results)?;
        self.config.results = results;
        Ok(())
    }

    pub fn update_metadata(&mut self, caller: &Caller, metadata_ref: ContentRef) -> Result<()> {
        self.ensure_live()?;
        self.ensure_creator_or_registry(caller)?;
        self.config.metadata_ref = Some(metadata_ref);
        Ok(())
    }

    pub fn update_access_url(&mut self, caller: &Caller, url: String) -> Result<()> {
        self.ensure_live()?;
        self.ensure_creator_or_registry(caller)?;
        if url.trim().is_empty() {
            return Err(Error::invalid_input("Access URL must not be empty"));
        }
        check_length("Access URL", &url, MAX_URL_LENGTH)?;
        self.config.access_url = url;
        Ok(())
    }

    /// Add or remove a relay allowed to submit votes. Returns whether anything changed.
    pub(crate) fn set_relay(
        &mut self,
        caller: &Caller,
        relay: &Principal,
        authorized: bool,
    ) -> Result<bool> {
        self.ensure_live()?;
        self.ensure_creator_or_registry(caller)?;
        Ok(if authorized {
            self.relays.insert(relay.clone())
        } else {
            self.relays.remove(relay)
        })
    }

    pub fn add_ballot(
        &mut self,
        caller: &Caller,
        spec: BallotSpec,
        now: DateTime<Utc>,
    ) -> Result<BallotId> {
        self.ensure_live()?;
        self.ensure_creator(caller)?;
        self.ensure_draft("ballots")?;
        self.ballots.push(spec, now)
    }

    pub fn ballot(&self, id: BallotId) -> Result<&Ballot> {
        self.ballots.get(id)
    }

    // Voter registration stays open in every live status, including ACTIVE.
    pub fn add_voter(&mut self, caller: &Caller, voter: NewVoter, now: DateTime<Utc>) -> Result<()> {
        self.ensure_live()?;
        self.ensure_creator(caller)?;
        self.voters.add(voter, self.config.settings.max_voters, now)
    }

    pub fn add_voters_batch(
        &mut self,
        caller: &Caller,
        batch: VoterBatch,
        now: DateTime<Utc>,
    ) -> Result<usize> {
        self.ensure_live()?;
        self.ensure_creator(caller)?;
        self.voters
            .add_batch(batch, self.config.settings.max_voters, now)
    }

    pub fn voter(&self, voter_id: &str) -> Result<&Voter> {
        self.voters
            .get(voter_id)
            .ok_or_else(|| Error::not_found(format!("Voter '{voter_id}' in election {}", self.id)))
    }

    /// Could this voter vote right now with this key hash? Never errors.
    pub fn verify_access(&self, voter_id: &str, key_hash: &KeyHash) -> bool {
        self.voters.verify_access(voter_id, key_hash)
    }

    /// Check every precondition for `voter_id` voting with `credential`, without changing anything.
    pub fn check_vote(&self, credential: VoteCredential<'_>, voter_id: &str) -> Result<()> {
        self.ensure_live()?;
        if let VoteCredential::Relay { relay, .. } = credential {
            if !self.is_relay(relay) {
                return Err(Error::NotAuthorized(format!(
                    "'{relay}' is not a relay for election {}",
                    self.id
                )));
            }
        }
        if self.status != ElectionStatus::Active {
            return Err(Error::NotActive(self.id));
        }
        let voter = self.voter(voter_id)?;
        if voter.has_voted || self.votes.contains(voter_id) {
            return Err(Error::AlreadyVoted(voter_id.to_string()));
        }

        let authenticated = match credential {
            VoteCredential::Direct(caller) => {
                *caller == voter.identity
                    || self.voters.voter_for_identity(caller).map(String::as_str) == Some(voter_id)
            }
            VoteCredential::KeyHash(key_hash) | VoteCredential::Relay { key_hash, .. } => {
                self.voters.has_key_hash(key_hash)
            }
        };
        if !authenticated {
            return Err(Error::unauthorized(format!(
                "Cannot vote as '{voter_id}' via the {} path",
                credential.path()
            )));
        }
        Ok(())
    }

    /// Record a vote through any of the three authentication paths.
    pub fn cast_vote(
        &mut self,
        credential: VoteCredential<'_>,
        request: VoteRequest,
        now: DateTime<Utc>,
    ) -> Result<()> {
        self.check_vote(credential, &request.voter_id)?;
        self.record_vote(request, now)
    }

    /// The single place a vote is written: has-voted flag, then ledger entry.
    fn record_vote(&mut self, request: VoteRequest, now: DateTime<Utc>) -> Result<()> {
        let voter_id = request.voter_id.clone();
        self.voters.mark_voted(&voter_id)?;
        self.votes.record(request, now)
    }

    pub fn vote(&self, voter_id: &str) -> Result<&Vote> {
        self.votes
            .get(voter_id)
            .ok_or_else(|| Error::not_found(format!("Vote by '{voter_id}' in election {}", self.id)))
    }
}
