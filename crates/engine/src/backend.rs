//! Backend API contract consumed by the engine.
//!
//! The engine only knows about the two endpoints it drives: discovery (to
//! refill the candidate queue) and swipe submission (to record a like/pass
//! and learn whether it produced a mutual match).

use std::{fmt, future::Future};

use crate::{BackendError, Candidate};

/// Domain action recorded for a committed swipe.
#[derive(Clone, Copy, Debug, PartialEq, Eq, Hash)]
pub enum SwipeAction {
    Like,
    Pass,
}

impl SwipeAction {
    pub fn as_str(self) -> &'static str {
        match self {
            Self::Like => "like",
            Self::Pass => "pass",
        }
    }
}

impl fmt::Display for SwipeAction {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

/// Backend answer to a swipe submission.
#[derive(Clone, Debug, Default, PartialEq, Eq)]
pub struct SwipeVerdict {
    pub accepted: bool,
    pub is_match: bool,
    pub match_id: Option<String>,
}

/// Filter parameters forwarded to discovery.
#[derive(Clone, Debug, Default, PartialEq, Eq)]
pub struct DiscoveryQuery {
    pub min_age: Option<u8>,
    pub max_age: Option<u8>,
    pub max_distance_km: Option<u32>,
    pub tags: Vec<String>,
    pub limit: Option<u32>,
}

/// Remote collaborator for discovery and swipe submission.
///
/// Submissions may be retried or duplicated by the caller; implementations
/// must tolerate that (the engine never blocks on the answer).
pub trait Backend: Send + Sync + 'static {
    /// Fetch swipeable profiles. An empty list and an error are handled the
    /// same way by the queue.
    fn discover(
        &self,
        query: &DiscoveryQuery,
    ) -> impl Future<Output = Result<Vec<Candidate>, BackendError>> + Send;

    /// Record a like/pass for `candidate_id`.
    fn submit_swipe(
        &self,
        candidate_id: &str,
        action: SwipeAction,
    ) -> impl Future<Output = Result<SwipeVerdict, BackendError>> + Send;
}
