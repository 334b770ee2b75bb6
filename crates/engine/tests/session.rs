use std::{
    collections::HashMap,
    sync::{Arc, Mutex},
    time::Duration,
};

use chrono::{DateTime, Utc};
use engine::{
    Backend, BackendError, Candidate, ConsumeOutcome, DiscoveryQuery, DispatchResult, Gesture,
    ManualClock, MemoryStore, QUOTA_STORE_KEY, QuotaPolicy, QuotaState, RefillSource, RemoteSync,
    Session, SessionEvent, SwipeAction, SwipeIntent, SwipeVerdict,
};
use tokio::task::JoinSet;

#[derive(Default)]
struct FakeInner {
    discovery: Mutex<Option<Result<Vec<Candidate>, BackendError>>>,
    verdicts: Mutex<HashMap<String, Result<SwipeVerdict, BackendError>>>,
    submitted: Mutex<Vec<(String, SwipeAction)>>,
}

/// Scripted backend. Clones share the same script and call log.
#[derive(Clone, Default)]
struct FakeBackend {
    inner: Arc<FakeInner>,
}

impl FakeBackend {
    fn with_profiles(ids: &[&str]) -> Self {
        let backend = Self::default();
        let deck = ids
            .iter()
            .map(|id| Candidate::remote(*id, format!("Name {id}")))
            .collect();
        *backend.inner.discovery.lock().unwrap() = Some(Ok(deck));
        backend
    }

    fn fail_discovery(&self) {
        *self.inner.discovery.lock().unwrap() =
            Some(Err(BackendError::Network("offline".to_string())));
    }

    fn verdict(&self, candidate_id: &str, verdict: Result<SwipeVerdict, BackendError>) {
        self.inner
            .verdicts
            .lock()
            .unwrap()
            .insert(candidate_id.to_string(), verdict);
    }

    fn submitted(&self) -> Vec<(String, SwipeAction)> {
        self.inner.submitted.lock().unwrap().clone()
    }
}

impl Backend for FakeBackend {
    async fn discover(&self, _query: &DiscoveryQuery) -> Result<Vec<Candidate>, BackendError> {
        self.inner
            .discovery
            .lock()
            .unwrap()
            .clone()
            .unwrap_or_else(|| Ok(Vec::new()))
    }

    async fn submit_swipe(
        &self,
        candidate_id: &str,
        action: SwipeAction,
    ) -> Result<SwipeVerdict, BackendError> {
        self.inner
            .submitted
            .lock()
            .unwrap()
            .push((candidate_id.to_string(), action));
        self.inner
            .verdicts
            .lock()
            .unwrap()
            .get(candidate_id)
            .cloned()
            .unwrap_or(Ok(SwipeVerdict {
                accepted: true,
                is_match: false,
                match_id: None,
            }))
    }
}

type TestSession = Session<FakeBackend, MemoryStore, ManualClock>;

fn t0() -> DateTime<Utc> {
    DateTime::from_timestamp_millis(1_700_000_000_000).unwrap()
}

fn policy(limit: u32, cost: u64) -> QuotaPolicy {
    QuotaPolicy {
        daily_free_limit: limit,
        paid_cost: cost,
        ..QuotaPolicy::default()
    }
}

async fn session_with(
    backend: FakeBackend,
    store: MemoryStore,
    clock: ManualClock,
    policy: QuotaPolicy,
) -> TestSession {
    Session::builder(backend, store)
        .clock(clock)
        .policy(policy)
        .shuffle_seed(42)
        .build()
        .await
}

async fn session(backend: FakeBackend, policy: QuotaPolicy) -> TestSession {
    session_with(backend, MemoryStore::new(), ManualClock::new(t0()), policy).await
}

fn match_verdict(match_id: &str) -> Result<SwipeVerdict, BackendError> {
    Ok(SwipeVerdict {
        accepted: true,
        is_match: true,
        match_id: Some(match_id.to_string()),
    })
}

#[tokio::test]
async fn refill_with_empty_result_loads_fallback_deck() {
    let backend = FakeBackend::with_profiles(&[]);
    let session = session(backend, QuotaPolicy::default()).await;

    let source = session.refill(&DiscoveryQuery::default()).await;
    assert!(matches!(source, RefillSource::Fallback { count, .. } if count > 0));

    let (_, len) = session.deck_position().await;
    assert!(len > 0);
    for _ in 0..len {
        let candidate = session.current_candidate().await.unwrap();
        assert!(candidate.is_fallback);
        session.advance().await;
    }
}

#[tokio::test]
async fn refill_error_loads_fallback_then_recovers() {
    let backend = FakeBackend::with_profiles(&["p-1"]);
    backend.fail_discovery();
    let session = session(backend.clone(), QuotaPolicy::default()).await;

    assert!(matches!(
        session.refill(&DiscoveryQuery::default()).await,
        RefillSource::Fallback { .. }
    ));

    *backend.inner.discovery.lock().unwrap() =
        Some(Ok(vec![Candidate::remote("p-1", "Ana")]));
    assert_eq!(
        session.refill(&DiscoveryQuery::default()).await,
        RefillSource::Backend { count: 1 }
    );
    assert_eq!(session.current_candidate().await.unwrap().id, "p-1");
}

#[tokio::test]
async fn swipe_on_empty_deck_reports_no_candidate() {
    let session = session(FakeBackend::default(), QuotaPolicy::default()).await;
    assert_eq!(
        session.swipe(SwipeIntent::Right).await,
        DispatchResult::NoCandidate
    );
    assert_eq!(session.quota_state().await.free_actions_used_today, 0);
}

#[tokio::test]
async fn denied_commit_never_advances_or_matches() {
    let backend = FakeBackend::with_profiles(&["p-1", "p-2"]);
    backend.verdict("p-1", match_verdict("m-1"));
    let session = session(backend.clone(), policy(0, 5)).await;
    session.refill(&DiscoveryQuery::default()).await;

    let candidate = session.current_candidate().await.unwrap();
    let result = session.dispatch(SwipeIntent::Right, &candidate).await;
    session.settle().await;

    assert_eq!(result, DispatchResult::Blocked);
    assert_eq!(session.deck_position().await, (0, 2));
    assert!(backend.submitted().is_empty());
    assert!(session.matches().await.is_empty());
}

#[tokio::test]
async fn free_then_paid_then_blocked() {
    let backend = FakeBackend::with_profiles(&["p-1", "p-2", "p-3"]);
    let session = session(backend, policy(10, 5)).await;
    session.refresh_balance(5).await;
    session.refill(&DiscoveryQuery::default()).await;

    for _ in 0..10 {
        assert!(matches!(
            session.swipe(SwipeIntent::Left).await,
            DispatchResult::Committed {
                outcome: ConsumeOutcome::Allowed,
                ..
            }
        ));
    }

    assert!(matches!(
        session.swipe(SwipeIntent::Left).await,
        DispatchResult::Committed {
            outcome: ConsumeOutcome::AllowedPaid,
            ..
        }
    ));
    assert_eq!(session.quota_state().await.currency_balance, 0);

    let before = session.quota_state().await;
    let position = session.deck_position().await;
    assert_eq!(session.swipe(SwipeIntent::Left).await, DispatchResult::Blocked);
    assert_eq!(session.quota_state().await, before);
    assert_eq!(session.deck_position().await, position);
    session.settle().await;
}

#[tokio::test]
async fn like_records_match_and_emits_event() {
    let backend = FakeBackend::with_profiles(&["p-1", "p-2"]);
    backend.verdict("p-1", match_verdict("m-1"));
    let session = session(backend.clone(), QuotaPolicy::default()).await;
    let mut events = session.subscribe();
    session.refill(&DiscoveryQuery::default()).await;

    let result = session.handle_gesture(Gesture::CommitRight).await;
    assert_eq!(
        result,
        DispatchResult::Committed {
            action: SwipeAction::Like,
            outcome: ConsumeOutcome::Allowed,
            remote: RemoteSync::Submitted,
        }
    );
    // Optimistic: the deck moved before the backend answered.
    assert_eq!(session.deck_position().await, (1, 2));

    session.settle().await;
    assert_eq!(backend.submitted(), vec![("p-1".to_string(), SwipeAction::Like)]);

    let matches = session.matches().await;
    assert_eq!(matches.len(), 1);
    assert_eq!(matches[0].id, "m-1");
    assert_eq!(matches[0].counterparty_id, "p-1");
    assert_eq!(matches[0].matched_at, t0());

    match events.recv().await.unwrap() {
        SessionEvent::Matched(m) => assert_eq!(m.id, "m-1"),
        other => panic!("unexpected event {other:?}"),
    }
}

#[tokio::test]
async fn duplicate_match_ids_yield_one_match() {
    let backend = FakeBackend::with_profiles(&["p-1"]);
    backend.verdict("p-1", match_verdict("m-dup"));
    let session = session(backend.clone(), QuotaPolicy::default()).await;
    let mut events = session.subscribe();
    session.refill(&DiscoveryQuery::default()).await;

    // Single-card deck: the second swipe wraps back onto the same candidate.
    session.swipe(SwipeIntent::Right).await;
    session.swipe(SwipeIntent::Right).await;
    session.settle().await;

    assert_eq!(backend.submitted().len(), 2);
    assert_eq!(session.matches().await.len(), 1);
    assert!(matches!(events.try_recv(), Ok(SessionEvent::Matched(_))));
    assert!(events.try_recv().is_err());
}

#[tokio::test]
async fn fallback_swipes_never_reach_the_backend() {
    let backend = FakeBackend::default();
    backend.fail_discovery();
    let session = session(backend.clone(), QuotaPolicy::default()).await;
    session.refill(&DiscoveryQuery::default()).await;

    let result = session.swipe(SwipeIntent::Right).await;
    session.settle().await;

    assert!(matches!(
        result,
        DispatchResult::Committed {
            remote: RemoteSync::SkippedFallback,
            ..
        }
    ));
    assert!(backend.submitted().is_empty());
    assert!(session.matches().await.is_empty());
    assert_eq!(session.quota_state().await.free_actions_used_today, 1);
}

#[tokio::test]
async fn backend_failure_keeps_local_commit() {
    let backend = FakeBackend::with_profiles(&["p-1", "p-2"]);
    backend.verdict("p-1", Err(BackendError::Network("reset by peer".to_string())));
    let session = session(backend.clone(), QuotaPolicy::default()).await;
    session.refill(&DiscoveryQuery::default()).await;

    session.swipe(SwipeIntent::Right).await;
    session.settle().await;

    assert_eq!(backend.submitted().len(), 1);
    assert_eq!(session.deck_position().await, (1, 2));
    assert_eq!(session.quota_state().await.free_actions_used_today, 1);
    assert!(session.matches().await.is_empty());
}

#[tokio::test]
async fn tap_and_cancel_change_nothing() {
    let backend = FakeBackend::with_profiles(&["p-1", "p-2"]);
    let session = session(backend.clone(), QuotaPolicy::default()).await;
    session.refill(&DiscoveryQuery::default()).await;

    assert_eq!(session.handle_gesture(Gesture::Tap).await, DispatchResult::Ignored);
    assert_eq!(session.handle_gesture(Gesture::Cancel).await, DispatchResult::Ignored);
    assert_eq!(session.deck_position().await, (0, 2));
    assert_eq!(session.quota_state().await.free_actions_used_today, 0);
}

#[tokio::test(flavor = "multi_thread", worker_threads = 4)]
async fn concurrent_swipes_never_overspend() {
    let backend = FakeBackend::with_profiles(&["p-1", "p-2", "p-3", "p-4"]);
    let session = session(backend, policy(3, 5)).await;
    session.refresh_balance(7).await;
    session.refill(&DiscoveryQuery::default()).await;

    let mut tasks = JoinSet::new();
    for _ in 0..12 {
        let session = session.clone();
        tasks.spawn(async move { session.swipe(SwipeIntent::Left).await });
    }

    let mut committed = 0;
    let mut blocked = 0;
    while let Some(result) = tasks.join_next().await {
        match result.unwrap() {
            DispatchResult::Committed { .. } => committed += 1,
            DispatchResult::Blocked => blocked += 1,
            other => panic!("unexpected result {other:?}"),
        }
    }
    session.settle().await;

    // Three free, one paid (7 / 5), the rest blocked.
    assert_eq!(committed, 4);
    assert_eq!(blocked, 8);
    let state = session.quota_state().await;
    assert_eq!(state.currency_balance, 2);
    assert_eq!(state.free_actions_used_today, 4);
    assert_eq!(session.deck_position().await, (0, 4));
}

#[tokio::test(flavor = "multi_thread", worker_threads = 4)]
async fn concurrent_reset_checks_reset_once() {
    let clock = ManualClock::new(t0());
    let session = session_with(
        FakeBackend::with_profiles(&["p-1"]),
        MemoryStore::new(),
        clock.clone(),
        QuotaPolicy::default(),
    )
    .await;
    session.refill(&DiscoveryQuery::default()).await;
    for _ in 0..4 {
        session.swipe(SwipeIntent::Left).await;
    }

    clock.advance(chrono::Duration::hours(24));
    let mut tasks = JoinSet::new();
    for _ in 0..16 {
        let session = session.clone();
        tasks.spawn(async move { session.check_reset().await });
    }

    let mut resets = 0;
    while let Some(result) = tasks.join_next().await {
        if result.unwrap() {
            resets += 1;
        }
    }
    session.settle().await;

    assert_eq!(resets, 1);
    let state = session.quota_state().await;
    assert_eq!(state.free_actions_used_today, 0);
    assert_eq!(
        state.reset_at_epoch_ms,
        (t0() + chrono::Duration::hours(48)).timestamp_millis()
    );
}

#[tokio::test(start_paused = true)]
async fn reset_watcher_resets_after_deadline() {
    let clock = ManualClock::new(t0());
    let session = session_with(
        FakeBackend::with_profiles(&["p-1"]),
        MemoryStore::new(),
        clock.clone(),
        QuotaPolicy::default(),
    )
    .await;
    let mut events = session.subscribe();
    session.refill(&DiscoveryQuery::default()).await;
    session.swipe(SwipeIntent::Left).await;
    session.spawn_reset_watcher(Duration::from_secs(60)).await;

    tokio::time::sleep(Duration::from_secs(120)).await;
    assert_eq!(session.free_remaining().await, 9);

    clock.advance(chrono::Duration::hours(25));
    tokio::time::sleep(Duration::from_secs(61)).await;
    assert_eq!(session.free_remaining().await, 10);
    assert!(matches!(
        events.recv().await.unwrap(),
        SessionEvent::QuotaReset { .. }
    ));

    session.shutdown().await.unwrap();
}

#[tokio::test]
async fn denied_swipe_after_deadline_still_persists_and_announces_reset() {
    let clock = ManualClock::new(t0());
    let store = MemoryStore::new();
    let session = session_with(
        FakeBackend::with_profiles(&["p-1"]),
        store.clone(),
        clock.clone(),
        policy(0, 5),
    )
    .await;
    let mut events = session.subscribe();
    session.refill(&DiscoveryQuery::default()).await;

    clock.advance(chrono::Duration::hours(25));
    assert_eq!(session.swipe(SwipeIntent::Right).await, DispatchResult::Blocked);

    let expected_reset = t0() + chrono::Duration::hours(49);
    assert_eq!(
        events.try_recv().unwrap(),
        SessionEvent::QuotaReset {
            next_reset_at: expected_reset
        }
    );

    session.suspend().await.unwrap();
    let raw = store.peek(QUOTA_STORE_KEY).unwrap();
    let persisted: QuotaState = serde_json::from_str(&raw).unwrap();
    assert_eq!(persisted.reset_at_epoch_ms, expected_reset.timestamp_millis());
    assert_eq!(persisted.free_actions_used_today, 0);
    assert_eq!(session.deck_position().await, (0, 1));
    session.shutdown().await.unwrap();
}

#[tokio::test]
async fn quota_state_loads_from_store_and_flushes_on_suspend() {
    let stored = QuotaState {
        free_actions_used_today: 4,
        currency_balance: 20,
        reset_at_epoch_ms: (t0() + chrono::Duration::hours(5)).timestamp_millis(),
    };
    let store = MemoryStore::with_entry(QUOTA_STORE_KEY, &serde_json::to_string(&stored).unwrap());
    let session = session_with(
        FakeBackend::with_profiles(&["p-1"]),
        store.clone(),
        ManualClock::new(t0()),
        QuotaPolicy::default(),
    )
    .await;
    assert_eq!(session.quota_state().await, stored);

    session.refill(&DiscoveryQuery::default()).await;
    session.swipe(SwipeIntent::Right).await;
    session.suspend().await.unwrap();

    let raw = store.peek(QUOTA_STORE_KEY).unwrap();
    let persisted: QuotaState = serde_json::from_str(&raw).unwrap();
    assert_eq!(persisted.free_actions_used_today, 5);
    assert_eq!(persisted.currency_balance, 20);
    session.shutdown().await.unwrap();
}

#[tokio::test]
async fn expired_stored_state_resets_on_load() {
    let stored = QuotaState {
        free_actions_used_today: 10,
        currency_balance: 3,
        reset_at_epoch_ms: (t0() - chrono::Duration::hours(1)).timestamp_millis(),
    };
    let store = MemoryStore::with_entry(QUOTA_STORE_KEY, &serde_json::to_string(&stored).unwrap());
    let session = session_with(
        FakeBackend::default(),
        store,
        ManualClock::new(t0()),
        QuotaPolicy::default(),
    )
    .await;

    let state = session.quota_state().await;
    assert_eq!(state.free_actions_used_today, 0);
    assert_eq!(state.currency_balance, 3);
}

#[tokio::test]
async fn unreadable_stored_state_starts_fresh() {
    let store = MemoryStore::with_entry(QUOTA_STORE_KEY, "{not json");
    let session = session_with(
        FakeBackend::default(),
        store,
        ManualClock::new(t0()),
        QuotaPolicy::default(),
    )
    .await;

    assert_eq!(
        session.quota_state().await,
        QuotaState::fresh(t0(), &QuotaPolicy::default())
    );
}

#[tokio::test]
async fn out_of_band_match_notification_is_deduplicated() {
    let backend = FakeBackend::with_profiles(&["p-1"]);
    backend.verdict("p-1", match_verdict("m-7"));
    let session = session(backend, QuotaPolicy::default()).await;
    session.refill(&DiscoveryQuery::default()).await;

    session.swipe(SwipeIntent::Right).await;
    session.settle().await;

    let late = session
        .record_verdict(
            "p-1",
            SwipeVerdict {
                accepted: true,
                is_match: true,
                match_id: Some("m-7".to_string()),
            },
        )
        .await;
    assert!(late.is_none());
    assert_eq!(session.matches().await.len(), 1);
}
