use chrono::{DateTime, Utc};
use log::debug;
use rand::thread_rng;

use crate::error::Result;
use crate::model::{
    ballot::{Ballot, BallotSpec},
    common::{BallotId, Caller, Clock, ContentRef, ElectionId, Principal},
    election::{
        BasicInfo, ConfigSection, Election, ElectionCounts, ElectionLimits, ElectionSpec,
        ElectionStatus, ElectionSummary, Messages, ResultsConfig, Timing, VoteCredential,
        VotingSettings,
    },
    event::{Event, EventLog, EventRecord},
    registry::ElectionRegistry,
    relay::{BatchOutcome, RelayAuthorizer, RelayBatchRequest, RelayPolicy, RelayRecord, RelayVoteRequest},
    vote::{Vote, VotePath, VoteRequest},
    voter::{KeyHash, NewVoter, Voter, VoterBatch},
};

/// The whole election service: registry, relay and event log behind one set of operations.
///
/// Each operation reads the clock once, performs all its checks, mutates, then
/// emits its events. A failed operation changes nothing and emits nothing.
pub struct ElectionSystem {
    registry: ElectionRegistry,
    relay: RelayAuthorizer,
    events: EventLog,
    clock: Box<dyn Clock>,
}

impl ElectionSystem {
    pub fn new(
        limits: ElectionLimits,
        access_url_base: impl Into<String>,
        relay_principal: Principal,
        relay_policy: RelayPolicy,
        clock: Box<dyn Clock>,
    ) -> Self {
        Self {
            registry: ElectionRegistry::new(limits, access_url_base),
            relay: RelayAuthorizer::new(relay_principal, relay_policy),
            events: EventLog::new(),
            clock,
        }
    }

    pub fn now(&self) -> DateTime<Utc> {
        self.clock.now()
    }

    fn emit(&mut self, election_id: ElectionId, at: DateTime<Utc>, event: Event) {
        self.events.emit(election_id, at, event);
    }

    pub fn create_election(&mut self, caller: &Caller, spec: ElectionSpec) -> Result<ElectionId> {
        let now = self.now();
        let title = spec.info.title.clone();
        let id = self
            .registry
            .create(caller, spec, now, &mut thread_rng())?;
        self.emit(
            id,
            now,
            Event::ElectionCreated {
                creator: caller.principal.clone(),
                title,
            },
        );
        Ok(id)
    }

    pub fn election(&self, id: ElectionId) -> Result<&Election> {
        self.registry.get(id)
    }

    /// Summaries of the caller's own live elections, oldest first.
    pub fn elections_created_by(&self, principal: &Principal) -> Vec<ElectionSummary> {
        self.registry
            .created_by(principal)
            .into_iter()
            .filter_map(|id| self.registry.get(id).ok())
            .map(ElectionSummary::from)
            .collect()
    }

    pub fn counts(&self, id: ElectionId) -> Result<ElectionCounts> {
        Ok(self.registry.get(id)?.into())
    }

    pub fn delete_election(&mut self, caller: &Caller, id: ElectionId) -> Result<()> {
        let now = self.now();
        let from = self.registry.delete(caller, id)?;
        self.emit(
            id,
            now,
            Event::StatusChanged {
                from,
                to: ElectionStatus::Deleted,
            },
        );
        Ok(())
    }

    pub fn transition(
        &mut self,
        caller: &Caller,
        id: ElectionId,
        target: ElectionStatus,
    ) -> Result<()> {
        let now = self.now();
        let from = self.registry.get_mut(id)?.transition(caller, target)?;
        self.emit(id, now, Event::StatusChanged { from, to: target });
        Ok(())
    }

    pub fn update_basic_info(&mut self, caller: &Caller, id: ElectionId, info: BasicInfo) -> Result<()> {
        let now = self.now();
        self.registry.get_mut(id)?.update_basic_info(caller, info)?;
        self.config_updated(id, now, ConfigSection::Info);
        Ok(())
    }

    pub fn update_timing(&mut self, caller: &Caller, id: ElectionId, timing: Timing) -> Result<()> {
        let now = self.now();
        let limits = *self.registry.limits();
        self.registry
            .get_mut(id)?
            .update_timing(caller, timing, &limits, now)?;
        self.config_updated(id, now, ConfigSection::Timing);
        Ok(())
    }

    pub fn update_voting_settings(
        &mut self,
        caller: &Caller,
        id: ElectionId,
        settings: VotingSettings,
    ) -> Result<()> {
        let now = self.now();
        self.registry
            .get_mut(id)?
            .update_voting_settings(caller, settings)?;
        self.config_updated(id, now, ConfigSection::Settings);
        Ok(())
    }

    pub fn update_messages(&mut self, caller: &Caller, id: ElectionId, messages: Messages) -> Result<()> {
        let now = self.now();
        self.registry.get_mut(id)?.update_messages(caller, messages)?;
        self.config_updated(id, now, ConfigSection::Messages);
        Ok(())
    }

    pub fn update_results(&mut self, caller: &Caller, id: ElectionId, results: ResultsConfig) -> Result<()> {
        let now = self.now();
        self.registry.get_mut(id)?.update_results(caller, results)?;
        self.config_updated(id, now, ConfigSection::Results);
        Ok(())
    }

    fn config_updated(&mut self, id: ElectionId, now: DateTime<Utc>, section: ConfigSection) {
        self.emit(id, now, Event::ConfigUpdated { section });
    }

    pub fn update_metadata(
        &mut self,
        caller: &Caller,
        id: ElectionId,
        metadata_ref: ContentRef,
    ) -> Result<()> {
        let now = self.now();
        self.registry
            .get_mut(id)?
            .update_metadata(caller, metadata_ref.clone())?;
        self.emit(id, now, Event::MetadataUpdated { metadata_ref });
        Ok(())
    }

    pub fn update_access_url(&mut self, caller: &Caller, id: ElectionId, url: String) -> Result<()> {
        let now = self.now();
        self.registry
            .get_mut(id)?
            .update_access_url(caller, url.clone())?;
        self.emit(id, now, Event::AccessUrlUpdated { url });
        Ok(())
    }

    pub fn add_ballot(&mut self, caller: &Caller, id: ElectionId, spec: BallotSpec) -> Result<BallotId> {
        let now = self.now();
        let ballot_id = self.registry.get_mut(id)?.add_ballot(caller, spec, now)?;
        self.emit(id, now, Event::BallotAdded { ballot_id });
        Ok(ballot_id)
    }

    pub fn ballot(&self, id: ElectionId, ballot_id: BallotId) -> Result<&Ballot> {
        self.registry.get(id)?.ballot(ballot_id)
    }

    pub fn add_voter(&mut self, caller: &Caller, id: ElectionId, voter: NewVoter) -> Result<()> {
        let now = self.now();
        let voter_id = voter.voter_id.clone();
        self.registry.get_mut(id)?.add_voter(caller, voter, now)?;
        self.emit(id, now, Event::VoterAdded { voter_id });
        Ok(())
    }

    pub fn add_voters_batch(
        &mut self,
        caller: &Caller,
        id: ElectionId,
        batch: VoterBatch,
    ) -> Result<usize> {
        let now = self.now();
        let list_ref = batch.list_ref.clone();
        let count = self
            .registry
            .get_mut(id)?
            .add_voters_batch(caller, batch, now)?;
        self.emit(id, now, Event::VotersBatchAdded { count, list_ref });
        Ok(count)
    }

    pub fn voter(&self, id: ElectionId, voter_id: &str) -> Result<&Voter> {
        self.registry.get(id)?.voter(voter_id)
    }

    pub fn verify_access(&self, id: ElectionId, voter_id: &str, key_hash: &KeyHash) -> Result<bool> {
        Ok(self.registry.get(id)?.verify_access(voter_id, key_hash))
    }

    /// Vote as the caller's own bound identity.
    pub fn cast_vote_direct(
        &mut self,
        caller: &Caller,
        id: ElectionId,
        request: VoteRequest,
    ) -> Result<()> {
        self.cast_vote(id, VoteCredential::Direct(&caller.principal), request)
    }

    /// Vote by presenting a registered key hash.
    pub fn cast_vote_with_key(
        &mut self,
        id: ElectionId,
        key_hash: &KeyHash,
        request: VoteRequest,
    ) -> Result<()> {
        self.cast_vote(id, VoteCredential::KeyHash(key_hash), request)
    }

    fn cast_vote(
        &mut self,
        id: ElectionId,
        credential: VoteCredential<'_>,
        request: VoteRequest,
    ) -> Result<()> {
        let now = self.now();
        let voter_id = request.voter_id.clone();
        self.registry
            .get_mut(id)?
            .cast_vote(credential, request, now)?;
        self.emit(
            id,
            now,
            Event::VoteCast {
                voter_id,
                path: credential.path(),
            },
        );
        Ok(())
    }

    pub fn vote(&self, id: ElectionId, voter_id: &str) -> Result<&Vote> {
        self.registry.get(id)?.vote(voter_id)
    }

    pub fn events(&self, id: ElectionId) -> Result<Vec<&EventRecord>> {
        self.registry.get(id)?;
        Ok(self.events.for_election(id).collect())
    }

    pub fn relay(&self) -> &RelayAuthorizer {
        &self.relay
    }

    pub fn relay_record(&self, id: ElectionId) -> Result<&RelayRecord> {
        self.registry.get(id)?;
        self.relay.record(id)
    }

    pub fn authorize_relay(&mut self, caller: &Caller, id: ElectionId, quota: u64) -> Result<()> {
        let now = self.now();
        self.relay
            .authorize(&mut self.registry, caller, id, quota, now)?;
        self.emit(id, now, Event::RelayAuthorized { quota });
        Ok(())
    }

    pub fn unauthorize_relay(&mut self, caller: &Caller, id: ElectionId) -> Result<()> {
        let now = self.now();
        self.relay.unauthorize(&mut self.registry, caller, id)?;
        self.emit(id, now, Event::RelayUnauthorized);
        Ok(())
    }

    pub fn update_relay_quota(&mut self, caller: &Caller, id: ElectionId, quota: u64) -> Result<()> {
        let now = self.now();
        self.relay.update_quota(&self.registry, caller, id, quota)?;
        self.emit(id, now, Event::RelayQuotaUpdated { quota });
        Ok(())
    }

    pub fn update_relay_cost_limit(
        &mut self,
        caller: &Caller,
        id: ElectionId,
        cost_limit: Option<u64>,
    ) -> Result<()> {
        let now = self.now();
        self.relay
            .update_cost_limit(&self.registry, caller, id, cost_limit)?;
        self.emit(id, now, Event::RelayCostLimitUpdated { cost_limit });
        Ok(())
    }

    pub fn relay_vote(&mut self, caller: &Caller, request: RelayVoteRequest) -> Result<()> {
        let now = self.now();
        let id = request.election_id;
        let voter_id = request.voter_id.clone();
        self.relay
            .execute_vote(&mut self.registry, caller, request, now)?;
        self.emit(
            id,
            now,
            Event::VoteCast {
                voter_id,
                path: VotePath::Relay,
            },
        );
        Ok(())
    }

    pub fn relay_batch(&mut self, caller: &Caller, batch: RelayBatchRequest) -> Result<BatchOutcome> {
        let now = self.now();
        let id = batch.election_id;
        let outcome = self
            .relay
            .execute_batch(&mut self.registry, caller, batch, now)?;
        for voter_id in &outcome.accepted {
            self.events.emit(
                id,
                now,
                Event::VoteCast {
                    voter_id: voter_id.clone(),
                    path: VotePath::Relay,
                },
            );
        }
        debug!(
            "Relay batch for election {id}: {} recorded, {} rejected",
            outcome.succeeded,
            outcome.failures.len()
        );
        Ok(outcome)
    }
}

/// Example data for tests.
#[cfg(test)]
mod examples {
    use chrono::Utc;

    use super::*;
    use crate::model::common::ManualClock;

    impl ElectionSystem {
        /// A system on a manual clock, returned alongside a handle to that clock.
        pub fn example() -> (Self, ManualClock) {
            let clock = ManualClock::starting_at(Utc::now());
            let system = Self::new(
                ElectionLimits::default(),
                "https://vote.example",
                Principal::new("relay"),
                RelayPolicy::default(),
                Box::new(clock.clone()),
            );
            (system, clock)
        }
    }
}

#[cfg(test)]
mod tests {
    use chrono::Duration;

    use super::*;
    use crate::error::Error;

    fn creator() -> Caller {
        Caller::user("creator")
    }

    fn admin() -> Caller {
        Caller::admin("root")
    }

    /// An active election with voters alice, bob and carol.
    fn active_election(system: &mut ElectionSystem) -> ElectionId {
        let id = system
            .create_election(&creator(), ElectionSpec::with_capacity(system.now(), 5))
            .unwrap();
        system
            .add_ballot(&creator(), id, BallotSpec::example1())
            .unwrap();
        system
            .add_voter(&creator(), id, NewVoter::example("alice"))
            .unwrap();
        system
            .add_voters_batch(
                &creator(),
                id,
                VoterBatch::example(&["bob", "carol"]),
            )
            .unwrap();
        system
            .transition(&creator(), id, ElectionStatus::Scheduled)
            .unwrap();
        system
            .transition(&admin(), id, ElectionStatus::Active)
            .unwrap();
        id
    }

    #[test]
    fn direct_and_key_votes_end_to_end() {
        let (mut system, _) = ElectionSystem::example();
        let id = active_election(&mut system);

        system
            .cast_vote_direct(
                &Caller::user("bob"),
                id,
                VoteRequest::example("voter-bob"),
            )
            .unwrap();
        system
            .cast_vote_with_key(
                id,
                &KeyHash::example("alice"),
                VoteRequest::example("voter-alice"),
            )
            .unwrap();
        assert_eq!(system.counts(id).unwrap().votes, 2);

        assert!(matches!(
            system.cast_vote_direct(
                &Caller::user("alice"),
                id,
                VoteRequest::example("voter-alice")
            ),
            Err(Error::AlreadyVoted(_))
        ));
        assert!(!system
            .verify_access(id, "voter-alice", &KeyHash::example("alice"))
            .unwrap());
        assert_eq!(system.counts(id).unwrap().votes, 2);
        assert_eq!(
            system.vote(id, "voter-bob").unwrap().receipt_ref,
            "bafy-receipt-voter-bob"
        );
    }

    #[test]
    fn every_success_emits_exactly_one_event() {
        let (mut system, _) = ElectionSystem::example();
        let id = active_election(&mut system);
        // created, ballot, voter, batch, two status changes
        assert_eq!(system.events(id).unwrap().len(), 6);

        assert!(system
            .add_ballot(&creator(), id, BallotSpec::example2())
            .is_err());
        assert_eq!(system.events(id).unwrap().len(), 6);

        system
            .cast_vote_with_key(
                id,
                &KeyHash::example("alice"),
                VoteRequest::example("voter-alice"),
            )
            .unwrap();
        let events = system.events(id).unwrap();
        assert_eq!(events.len(), 7);
        assert_eq!(
            events[6].event,
            Event::VoteCast {
                voter_id: "voter-alice".to_string(),
                path: VotePath::KeyHash,
            }
        );
        assert!(events.windows(2).all(|pair| pair[0].seq < pair[1].seq));
    }

    #[test]
    fn ballot_after_scheduling_leaves_catalog_unchanged() {
        let (mut system, _) = ElectionSystem::example();
        let id = system
            .create_election(&creator(), ElectionSpec::example(system.now()))
            .unwrap();
        system
            .add_ballot(&creator(), id, BallotSpec::example1())
            .unwrap();
        system
            .transition(&creator(), id, ElectionStatus::Scheduled)
            .unwrap();
        assert!(matches!(
            system.add_ballot(&creator(), id, BallotSpec::example2()),
            Err(Error::InvalidState(_))
        ));
        assert_eq!(system.counts(id).unwrap().ballots, 1);
    }

    #[test]
    fn relay_authorization_updates_both_sides() {
        let (mut system, _) = ElectionSystem::example();
        let id = active_election(&mut system);
        let relay = system.relay().principal().clone();

        system.authorize_relay(&admin(), id, 2).unwrap();
        assert!(system.election(id).unwrap().is_relay(&relay));
        assert!(system.relay_record(id).unwrap().authorized);

        system.unauthorize_relay(&admin(), id).unwrap();
        assert!(!system.election(id).unwrap().is_relay(&relay));
        assert!(!system.relay_record(id).unwrap().authorized);
    }

    #[test]
    fn deleted_election_hides_relay_record() {
        let (mut system, _) = ElectionSystem::example();
        let id = active_election(&mut system);
        system.authorize_relay(&admin(), id, 3).unwrap();
        system
            .transition(&creator(), id, ElectionStatus::Completed)
            .unwrap();
        system.delete_election(&creator(), id).unwrap();

        assert!(matches!(system.relay_record(id), Err(Error::Deleted(_))));
        assert!(matches!(
            system.update_relay_quota(&admin(), id, 5),
            Err(Error::Deleted(_))
        ));
        assert!(matches!(
            system.update_relay_cost_limit(&admin(), id, Some(1)),
            Err(Error::Deleted(_))
        ));
        // Only the relay's own side can still be torn down.
        system.unauthorize_relay(&admin(), id).unwrap();
        assert!(!system.relay().record(id).unwrap().authorized);
    }

    #[test]
    fn relay_batch_emits_one_event_per_vote() {
        let (mut system, _) = ElectionSystem::example();
        let id = active_election(&mut system);
        system.authorize_relay(&admin(), id, 10).unwrap();
        let before = system.events(id).unwrap().len();

        let mut batch = RelayBatchRequest::example(id, &["alice", "bob", "carol"]);
        // Carol was registered without a key hash; any registered hash will do.
        batch.key_hashes = vec![KeyHash::example("alice"); 3];
        batch.voter_ids[1] = "voter-nobody".to_string();
        let outcome = system
            .relay_batch(&Caller::user("gateway"), batch)
            .unwrap();

        assert_eq!(outcome.succeeded, 2);
        assert_eq!(system.events(id).unwrap().len(), before + 2);
        assert_eq!(system.relay().total_processed(), 2);
    }

    #[test]
    fn timing_is_checked_against_the_clock() {
        let (mut system, clock) = ElectionSystem::example();
        let spec = ElectionSpec::example(system.now());
        let id = system.create_election(&creator(), spec.clone()).unwrap();

        // The original start time has now passed.
        clock.advance(Duration::days(2));
        assert!(matches!(
            system.update_timing(&creator(), id, spec.timing),
            Err(Error::InvalidInput(_))
        ));
        assert!(matches!(
            system.create_election(&creator(), ElectionSpec::example(system.now() - Duration::days(2))),
            Err(Error::InvalidInput(_))
        ));
    }

    #[test]
    fn deleted_election_rejects_reads() {
        let (mut system, _) = ElectionSystem::example();
        let id = system
            .create_election(&creator(), ElectionSpec::example(system.now()))
            .unwrap();
        system.delete_election(&creator(), id).unwrap();

        assert!(matches!(system.election(id), Err(Error::Deleted(_))));
        assert!(matches!(system.events(id), Err(Error::Deleted(_))));
        assert!(matches!(system.counts(id), Err(Error::Deleted(_))));
        assert!(system.elections_created_by(&creator().principal).is_empty());
    }
}
