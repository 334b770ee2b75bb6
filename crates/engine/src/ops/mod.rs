use std::{sync::Arc, time::Duration};

use chrono::{DateTime, Utc};
use rand::{SeedableRng, rngs::StdRng};
use tokio::{
    sync::{Mutex, broadcast},
    task::{JoinHandle, JoinSet},
};

use crate::{
    Backend, Candidate, CandidateQueue, Clock, KeyValueStore, Match, MatchList, QUOTA_STORE_KEY,
    QuotaLedger, QuotaPolicy, QuotaState, SystemClock, fallback, persist::DEFAULT_DEBOUNCE,
    persist::Persister,
};

mod deck;
mod dispatch;
mod lifecycle;
mod quota;

pub use dispatch::{DispatchResult, RemoteSync};

const EVENT_CAPACITY: usize = 64;

/// Notifications raised by a session.
#[derive(Clone, Debug, PartialEq, Eq)]
pub enum SessionEvent {
    /// The backend confirmed a new mutual match.
    Matched(Match),
    /// The daily free allowance was reset.
    QuotaReset { next_reset_at: DateTime<Utc> },
}

/// Tunables for a session.
#[derive(Clone, Debug)]
pub struct SessionConfig {
    pub policy: QuotaPolicy,
    /// Coalescing window for quota writes.
    pub debounce: Duration,
    /// Deck loaded when discovery fails or is empty.
    pub fallback_seed: Vec<Candidate>,
    /// Seed for the fallback shuffle. `None` seeds from the OS.
    pub shuffle_seed: Option<u64>,
}

impl Default for SessionConfig {
    fn default() -> Self {
        Self {
            policy: QuotaPolicy::default(),
            debounce: DEFAULT_DEBOUNCE,
            fallback_seed: fallback::default_seed(),
            shuffle_seed: None,
        }
    }
}

/// Per-user swipe session.
///
/// Owns the quota ledger, the candidate deck and the match list. Cloning is
/// cheap and every clone drives the same state, so the gesture layer, the
/// dispatcher and the reset watcher all share one instance. Build one per
/// logged-in user and call [`Session::shutdown`] on logout.
///
/// Must be built and used inside a tokio runtime: persistence, swipe
/// submission and the reset watcher run as spawned tasks.
pub struct Session<B, S, C = SystemClock> {
    inner: Arc<Shared<B, S, C>>,
}

impl<B, S, C> Clone for Session<B, S, C> {
    fn clone(&self) -> Self {
        Self {
            inner: Arc::clone(&self.inner),
        }
    }
}

struct Shared<B, S, C> {
    backend: Arc<B>,
    store: Arc<S>,
    clock: C,
    /// Single lock for `consume`, the daily reset and balance refreshes.
    ledger: Mutex<QuotaLedger>,
    queue: Mutex<CandidateQueue>,
    matches: Mutex<MatchList>,
    rng: Mutex<StdRng>,
    fallback_seed: Vec<Candidate>,
    persister: Persister,
    in_flight: Mutex<JoinSet<()>>,
    reset_watcher: Mutex<Option<JoinHandle<()>>>,
    events: broadcast::Sender<SessionEvent>,
}

impl<B, S, C> Drop for Shared<B, S, C> {
    fn drop(&mut self) {
        if let Some(watcher) = self.reset_watcher.get_mut().take() {
            watcher.abort();
        }
    }
}

impl<B: Backend, S: KeyValueStore> Session<B, S, SystemClock> {
    /// Return a builder for `Session`. Help to build the struct.
    pub fn builder(backend: B, store: S) -> SessionBuilder<B, S, SystemClock> {
        SessionBuilder {
            backend,
            store,
            clock: SystemClock,
            config: SessionConfig::default(),
        }
    }
}

impl<B: Backend, S: KeyValueStore, C: Clock> Session<B, S, C> {
    /// Subscribe to match and reset notifications.
    pub fn subscribe(&self) -> broadcast::Receiver<SessionEvent> {
        self.inner.events.subscribe()
    }

    /// Matches confirmed so far, in arrival order.
    pub async fn matches(&self) -> Vec<Match> {
        self.inner.matches.lock().await.to_vec()
    }

    pub fn backend(&self) -> &B {
        &self.inner.backend
    }

    pub fn store(&self) -> &S {
        &self.inner.store
    }

    pub fn now(&self) -> DateTime<Utc> {
        self.inner.clock.now()
    }

    fn emit(&self, event: SessionEvent) {
        // No receivers is fine: nobody is listening right now.
        let _ = self.inner.events.send(event);
    }
}

/// The builder for `Session`
pub struct SessionBuilder<B, S, C> {
    backend: B,
    store: S,
    clock: C,
    config: SessionConfig,
}

impl<B: Backend, S: KeyValueStore, C: Clock> SessionBuilder<B, S, C> {
    /// Replace the clock (tests use [`ManualClock`](crate::ManualClock)).
    pub fn clock<C2: Clock>(self, clock: C2) -> SessionBuilder<B, S, C2> {
        SessionBuilder {
            backend: self.backend,
            store: self.store,
            clock,
            config: self.config,
        }
    }

    pub fn config(mut self, config: SessionConfig) -> Self {
        self.config = config;
        self
    }

    pub fn policy(mut self, policy: QuotaPolicy) -> Self {
        self.config.policy = policy;
        self
    }

    pub fn debounce(mut self, window: Duration) -> Self {
        self.config.debounce = window;
        self
    }

    /// Deck loaded when discovery fails. An empty seed is ignored.
    pub fn fallback_seed(mut self, seed: Vec<Candidate>) -> Self {
        self.config.fallback_seed = seed;
        self
    }

    pub fn shuffle_seed(mut self, seed: u64) -> Self {
        self.config.shuffle_seed = Some(seed);
        self
    }

    /// Construct `Session`, loading the quota state from the store.
    ///
    /// A missing or unreadable record starts a fresh quota period.
    pub async fn build(self) -> Session<B, S, C> {
        let SessionConfig {
            policy,
            debounce,
            fallback_seed,
            shuffle_seed,
        } = self.config;

        let fallback_seed = if fallback_seed.is_empty() {
            tracing::warn!("empty fallback seed, keeping the built-in deck");
            fallback::default_seed()
        } else {
            fallback_seed
        };

        let now = self.clock.now();
        let state = load_state(&self.store, now, &policy).await;
        let mut ledger = QuotaLedger::new(policy, state);
        let rolled = ledger.roll_over(now);

        let store = Arc::new(self.store);
        let persister = Persister::spawn(Arc::clone(&store), QUOTA_STORE_KEY, debounce);
        if rolled {
            tracing::info!("quota period expired while away, free actions reset");
            persister.schedule(ledger.state());
        }

        let rng = match shuffle_seed {
            Some(seed) => StdRng::seed_from_u64(seed),
            None => StdRng::from_entropy(),
        };
        let (events, _) = broadcast::channel(EVENT_CAPACITY);

        Session {
            inner: Arc::new(Shared {
                backend: Arc::new(self.backend),
                store,
                clock: self.clock,
                ledger: Mutex::new(ledger),
                queue: Mutex::new(CandidateQueue::new()),
                matches: Mutex::new(MatchList::new()),
                rng: Mutex::new(rng),
                fallback_seed,
                persister,
                in_flight: Mutex::new(JoinSet::new()),
                reset_watcher: Mutex::new(None),
                events,
            }),
        }
    }
}

async fn load_state<S: KeyValueStore>(
    store: &S,
    now: DateTime<Utc>,
    policy: &QuotaPolicy,
) -> QuotaState {
    match store.get(QUOTA_STORE_KEY).await {
        Ok(Some(raw)) => match serde_json::from_str::<QuotaState>(&raw) {
            Ok(state) => state,
            Err(err) => {
                tracing::warn!("discarding unreadable quota state: {err}");
                QuotaState::fresh(now, policy)
            }
        },
        Ok(None) => QuotaState::fresh(now, policy),
        Err(err) => {
            tracing::warn!("failed to load quota state, using defaults: {err}");
            QuotaState::fresh(now, policy)
        }
    }
}
