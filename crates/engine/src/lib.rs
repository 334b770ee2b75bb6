//! Swipe-based matching engine.
//!
//! Turns drag gestures into like/pass decisions, charges them against a daily
//! free allowance backed by virtual currency, keeps a cyclic deck of
//! candidates alive across network failures and folds asynchronous backend
//! match verdicts into a deduplicated match list.
//!
//! Everything per user hangs off a [`Session`]; the remote API and device
//! storage are reached through the [`Backend`] and [`KeyValueStore`] traits.

pub use backend::{Backend, DiscoveryQuery, SwipeAction, SwipeVerdict};
pub use clock::{Clock, ManualClock, SystemClock};
pub use error::{BackendError, EngineError, StoreError};
pub use gesture::{Gesture, GestureInterpreter, GestureThresholds, SwipeIntent, classify};
pub use matches::{Match, MatchList};
pub use ops::{DispatchResult, RemoteSync, Session, SessionBuilder, SessionConfig, SessionEvent};
pub use persist::{DEFAULT_DEBOUNCE, Persister};
pub use queue::{Candidate, CandidateQueue, FallbackReason, RefillSource};
pub use quota::{ConsumeOutcome, QUOTA_STORE_KEY, QuotaLedger, QuotaPolicy, QuotaState};
pub use store::{KeyValueStore, MemoryStore};

mod backend;
mod clock;
mod error;
pub mod fallback;
mod gesture;
mod matches;
mod ops;
mod persist;
mod queue;
mod quota;
mod store;
