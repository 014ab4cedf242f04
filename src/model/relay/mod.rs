pub use authorizer::{RelayAuthorizer, RelayPolicy, RelayRecord, RelayVoteRequest};
pub use batch::{BatchFailure, BatchOutcome, RelayBatchRequest};

mod authorizer;
mod batch;


#[cfg(test)]
mod tests {
    use chrono::{Duration, Utc};

    use super::examples::*;
    use super::*;
    use crate::error::Error;
    use crate::model::{
        common::{Caller, Principal},
        election::ElectionStatus,
        voter::KeyHash,
    };

    #[test]
    fn authorize_registers_relay_on_election() {
        let now = Utc::now();
        let (mut registry, id) = active_registry(now);
        let mut relay = RelayAuthorizer::example();

        relay.authorize(&mut registry, &admin(), id, 5, now).unwrap();
        assert!(registry.get(id).unwrap().is_relay(relay.principal()));
        let record = relay.record(id).unwrap();
        assert!(record.authorized);
        assert_eq!(record.quota, 5);
        assert_eq!(record.processed, 0);
    }

    #[test]
    fn authorize_is_admin_only_and_validated() {
        let now = Utc::now();
        let (mut registry, id) = active_registry(now);
        let mut relay = RelayAuthorizer::example();

        assert!(matches!(
            relay.authorize(&mut registry, &creator(), id, 5, now),
            Err(Error::Unauthorized(_))
        ));
        assert!(matches!(
            relay.authorize(&mut registry, &admin(), 0, 5, now),
            Err(Error::InvalidInput(_))
        ));
        assert!(matches!(
            relay.authorize(&mut registry, &admin(), id, 0, now),
            Err(Error::InvalidInput(_))
        ));
        assert!(matches!(
            relay.authorize(&mut registry, &admin(), 42, 5, now),
            Err(Error::NotFound(_))
        ));
        assert!(relay.record(id).is_err());
        assert!(!registry.get(id).unwrap().is_relay(relay.principal()));
    }

    #[test]
    fn relayed_vote_is_recorded_and_counted() {
        let now = Utc::now();
        let (mut registry, id) = active_registry(now);
        let mut relay = RelayAuthorizer::example();
        relay.authorize(&mut registry, &admin(), id, 5, now).unwrap();

        relay
            .execute_vote(
                &mut registry,
                &Caller::user("gateway"),
                RelayVoteRequest::example(id, "alice", "n1"),
                now,
            )
            .unwrap();

        let election = registry.get(id).unwrap();
        assert!(election.voter("voter-alice").unwrap().has_voted);
        assert_eq!(election.votes().len(), 1);
        assert_eq!(relay.record(id).unwrap().processed, 1);
        assert_eq!(relay.total_processed(), 1);
        assert!(relay.is_nonce_used("n1"));
    }

    #[test]
    fn reused_nonce_is_rejected() {
        let now = Utc::now();
        let (mut registry, id) = active_registry(now);
        let mut relay = RelayAuthorizer::example();
        relay.authorize(&mut registry, &admin(), id, 5, now).unwrap();
        let gateway = Caller::user("gateway");

        relay
            .execute_vote(
                &mut registry,
                &gateway,
                RelayVoteRequest::example(id, "alice", "n1"),
                now,
            )
            .unwrap();
        assert!(matches!(
            relay.execute_vote(
                &mut registry,
                &gateway,
                RelayVoteRequest::example(id, "bob", "n1"),
                now
            ),
            Err(Error::NonceReused(_))
        ));
        assert!(!registry
            .get(id)
            .unwrap()
            .voter("voter-bob")
            .unwrap()
            .has_voted);
        assert_eq!(relay.total_processed(), 1);
    }

    #[test]
    fn failed_vote_does_not_consume_nonce() {
        let now = Utc::now();
        let (mut registry, id) = active_registry(now);
        let mut relay = RelayAuthorizer::example();
        relay.authorize(&mut registry, &admin(), id, 5, now).unwrap();
        let gateway = Caller::user("gateway");

        let mut request = RelayVoteRequest::example(id, "alice", "n1");
        request.voter_id = "voter-nobody".to_string();
        assert!(matches!(
            relay.execute_vote(&mut registry, &gateway, request, now),
            Err(Error::NotFound(_))
        ));
        assert!(!relay.is_nonce_used("n1"));
        relay
            .execute_vote(
                &mut registry,
                &gateway,
                RelayVoteRequest::example(id, "alice", "n1"),
                now,
            )
            .unwrap();
    }

    #[test]
    fn exhausted_quota_is_not_authorized() {
        let now = Utc::now();
        let (mut registry, id) = active_registry(now);
        let mut relay = RelayAuthorizer::example();
        relay.authorize(&mut registry, &admin(), id, 1, now).unwrap();
        let gateway = Caller::user("gateway");

        relay
            .execute_vote(
                &mut registry,
                &gateway,
                RelayVoteRequest::example(id, "alice", "n1"),
                now,
            )
            .unwrap();
        assert!(matches!(
            relay.execute_vote(
                &mut registry,
                &gateway,
                RelayVoteRequest::example(id, "bob", "n2"),
                now
            ),
            Err(Error::NotAuthorized(_))
        ));

        relay.update_quota(&registry, &admin(), id, 2).unwrap();
        relay
            .execute_vote(
                &mut registry,
                &gateway,
                RelayVoteRequest::example(id, "bob", "n2"),
                now,
            )
            .unwrap();
        assert_eq!(relay.record(id).unwrap().processed, 2);
    }

    #[test]
    fn reauthorization_keeps_counters() {
        let now = Utc::now();
        let (mut registry, id) = active_registry(now);
        let mut relay = RelayAuthorizer::example();
        relay.authorize(&mut registry, &admin(), id, 3, now).unwrap();
        relay
            .execute_vote(
                &mut registry,
                &Caller::user("gateway"),
                RelayVoteRequest::example(id, "alice", "n1"),
                now,
            )
            .unwrap();

        relay.unauthorize(&mut registry, &admin(), id).unwrap();
        assert!(!registry.get(id).unwrap().is_relay(relay.principal()));
        assert!(matches!(
            relay.unauthorize(&mut registry, &admin(), id),
            Err(Error::NotAuthorized(_))
        ));

        relay.authorize(&mut registry, &admin(), id, 10, now).unwrap();
        let record = relay.record(id).unwrap();
        assert_eq!(record.processed, 1);
        assert_eq!(record.quota, 10);
    }

    #[test]
    fn unauthorized_relay_cannot_vote() {
        let now = Utc::now();
        let (mut registry, id) = active_registry(now);
        let mut relay = RelayAuthorizer::example();
        assert!(matches!(
            relay.execute_vote(
                &mut registry,
                &Caller::user("gateway"),
                RelayVoteRequest::example(id, "alice", "n1"),
                now
            ),
            Err(Error::NotAuthorized(_))
        ));
        assert!(matches!(
            relay.update_quota(&registry, &admin(), id, 3),
            Err(Error::NotAuthorized(_))
        ));
        assert!(matches!(
            relay.update_cost_limit(&registry, &admin(), id, Some(3)),
            Err(Error::NotAuthorized(_))
        ));
    }

    #[test]
    fn unauthorize_deleted_election_clears_relay_side() {
        let now = Utc::now();
        let (mut registry, id) = active_registry(now);
        let mut relay = RelayAuthorizer::example();
        relay.authorize(&mut registry, &admin(), id, 3, now).unwrap();

        let election = registry.get_mut(id).unwrap();
        election
            .transition(&creator(), ElectionStatus::Completed)
            .unwrap();
        registry.delete(&creator(), id).unwrap();

        relay.unauthorize(&mut registry, &admin(), id).unwrap();
        assert!(!relay.record(id).unwrap().authorized);
    }

    #[test]
    fn deleted_election_relay_settings_are_frozen() {
        let now = Utc::now();
        let (mut registry, id) = active_registry(now);
        let mut relay = RelayAuthorizer::example();
        relay.authorize(&mut registry, &admin(), id, 3, now).unwrap();

        registry
            .get_mut(id)
            .unwrap()
            .transition(&creator(), ElectionStatus::Completed)
            .unwrap();
        registry.delete(&creator(), id).unwrap();

        assert!(matches!(
            relay.update_quota(&registry, &admin(), id, 5),
            Err(Error::Deleted(_))
        ));
        assert!(matches!(
            relay.update_cost_limit(&registry, &admin(), id, Some(1)),
            Err(Error::Deleted(_))
        ));
        let record = relay.record(id).unwrap();
        assert_eq!(record.quota, 3);
        assert_eq!(record.cost_limit, None);
    }

    #[test]
    fn budget_limits_spending_and_resets_each_period() {
        let now = Utc::now();
        let (mut registry, id) = active_registry(now);
        let mut relay = RelayAuthorizer::example();
        relay.authorize(&mut registry, &admin(), id, 10, now).unwrap();
        relay.update_cost_limit(&registry, &admin(), id, Some(1)).unwrap();
        let gateway = Caller::user("gateway");

        relay
            .execute_vote(
                &mut registry,
                &gateway,
                RelayVoteRequest::example(id, "alice", "n1"),
                now,
            )
            .unwrap();
        assert!(matches!(
            relay.execute_vote(
                &mut registry,
                &gateway,
                RelayVoteRequest::example(id, "bob", "n2"),
                now + Duration::hours(1)
            ),
            Err(Error::NotAuthorized(_))
        ));
        assert!(!relay.is_nonce_used("n2"));

        let later = now + relay.policy().period;
        relay
            .execute_vote(
                &mut registry,
                &gateway,
                RelayVoteRequest::example(id, "bob", "n2"),
                later,
            )
            .unwrap();
        let record = relay.record(id).unwrap();
        assert_eq!(record.period_start, later);
        assert_eq!(record.period_cost, 1);
    }

    #[test]
    fn call_cost_ceiling_applies() {
        let now = Utc::now();
        let (mut registry, id) = active_registry(now);
        let mut relay = RelayAuthorizer::new(
            Principal::new("relay"),
            RelayPolicy {
                max_cost_per_call: 2,
                ..RelayPolicy::default()
            },
        );
        relay.authorize(&mut registry, &admin(), id, 10, now).unwrap();
        assert!(matches!(
            relay.execute_batch(
                &mut registry,
                &Caller::user("gateway"),
                RelayBatchRequest::example(id, &["alice", "bob", "carol"]),
                now
            ),
            Err(Error::NotAuthorized(_))
        ));
        assert!(registry.get(id).unwrap().votes().is_empty());
    }

    #[test]
    fn batch_continues_past_failures() {
        let now = Utc::now();
        let (mut registry, id) = active_registry(now);
        let mut relay = RelayAuthorizer::example();
        relay.authorize(&mut registry, &admin(), id, 10, now).unwrap();

        let mut batch = RelayBatchRequest::example(id, &["alice", "nobody", "bob"]);
        batch.key_hashes[1] = KeyHash::example("alice");
        let outcome = relay
            .execute_batch(&mut registry, &Caller::user("gateway"), batch, now)
            .unwrap();

        assert_eq!(outcome.succeeded, 2);
        assert_eq!(outcome.accepted, vec!["voter-alice", "voter-bob"]);
        assert_eq!(outcome.failures.len(), 1);
        assert_eq!(outcome.failures[0].index, 1);
        assert_eq!(outcome.failures[0].voter_id, "voter-nobody");
        assert!(!relay.is_nonce_used("nonce-nobody"));
        assert!(relay.is_nonce_used("nonce-bob"));
        assert_eq!(relay.record(id).unwrap().processed, 2);
        assert_eq!(relay.record(id).unwrap().period_cost, 2);
        assert_eq!(registry.get(id).unwrap().votes().len(), 2);
    }

    #[test]
    fn batch_quota_counts_earlier_successes() {
        let now = Utc::now();
        let (mut registry, id) = active_registry(now);
        let mut relay = RelayAuthorizer::example();
        relay.authorize(&mut registry, &admin(), id, 2, now).unwrap();

        let outcome = relay
            .execute_batch(
                &mut registry,
                &Caller::user("gateway"),
                RelayBatchRequest::example(id, &["alice", "bob", "carol"]),
                now,
            )
            .unwrap();
        assert_eq!(outcome.succeeded, 2);
        assert_eq!(outcome.failures[0].index, 2);
        assert!(!registry
            .get(id)
            .unwrap()
            .voter("voter-carol")
            .unwrap()
            .has_voted);
    }

    #[test]
    fn batch_with_no_successes_returns_first_error() {
        let now = Utc::now();
        let (mut registry, id) = active_registry(now);
        let mut relay = RelayAuthorizer::example();
        relay.authorize(&mut registry, &admin(), id, 10, now).unwrap();
        let gateway = Caller::user("gateway");

        relay
            .execute_batch(
                &mut registry,
                &gateway,
                RelayBatchRequest::example(id, &["alice"]),
                now,
            )
            .unwrap();
        let mut batch = RelayBatchRequest::example(id, &["alice", "bob"]);
        batch.nonces[0] = "fresh".to_string();
        batch.nonces[1] = "nonce-alice".to_string();
        assert!(matches!(
            relay.execute_batch(&mut registry, &gateway, batch, now),
            Err(Error::AlreadyVoted(_))
        ));
        assert_eq!(relay.total_processed(), 1);
        assert!(!relay.is_nonce_used("fresh"));
    }

    #[test]
    fn malformed_batches_are_invalid() {
        let now = Utc::now();
        let (mut registry, id) = active_registry(now);
        let mut relay = RelayAuthorizer::new(
            Principal::new("relay"),
            RelayPolicy {
                max_batch_size: 2,
                ..RelayPolicy::default()
            },
        );
        relay.authorize(&mut registry, &admin(), id, 10, now).unwrap();
        let gateway = Caller::user("gateway");

        let empty = RelayBatchRequest::example(id, &[]);
        assert!(matches!(
            relay.execute_batch(&mut registry, &gateway, empty, now),
            Err(Error::InvalidInput(_))
        ));
        let mut uneven = RelayBatchRequest::example(id, &["alice", "bob"]);
        uneven.nonces.pop();
        assert!(matches!(
            relay.execute_batch(&mut registry, &gateway, uneven, now),
            Err(Error::InvalidInput(_))
        ));
        let oversized = RelayBatchRequest::example(id, &["alice", "bob", "carol"]);
        assert!(matches!(
            relay.execute_batch(&mut registry, &gateway, oversized, now),
            Err(Error::InvalidInput(_))
        ));
    }
}
