//! Swipe dispatch: quota check, optimistic deck advance, background sync.
//!
//! The local commit is the source of truth. Once the ledger allows an action
//! the deck moves on immediately and the backend call becomes a side channel:
//! its failure is logged and never rolled back, its match verdict is folded
//! into the match list whenever it arrives.

use crate::{
    Backend, Candidate, Clock, ConsumeOutcome, Gesture, KeyValueStore, Match, SwipeAction,
    SwipeIntent, SwipeVerdict,
};

use super::{Session, SessionEvent};

/// Whether the backend heard about a committed swipe.
#[derive(Clone, Copy, Debug, PartialEq, Eq)]
pub enum RemoteSync {
    /// Submission spawned in the background.
    Submitted,
    /// Fallback candidate: never sent.
    SkippedFallback,
}

/// Outcome of a dispatch, as seen by the UI.
#[derive(Clone, Debug, PartialEq, Eq)]
pub enum DispatchResult {
    /// The swipe is committed locally; animate the card away.
    Committed {
        action: SwipeAction,
        outcome: ConsumeOutcome,
        remote: RemoteSync,
    },
    /// Quota denied the action. Keep the card and offer the currency upsell.
    Blocked,
    /// Tap or cancelled drag; nothing changed.
    Ignored,
    /// The deck is empty (no refill yet).
    NoCandidate,
}

impl SwipeIntent {
    pub fn action(self) -> SwipeAction {
        match self {
            Self::Right => SwipeAction::Like,
            Self::Left => SwipeAction::Pass,
        }
    }
}

impl<B: Backend, S: KeyValueStore, C: Clock> Session<B, S, C> {
    /// Commit `intent` against `candidate`.
    ///
    /// Consumes quota first; a denied action returns [`DispatchResult::Blocked`]
    /// with no deck move and no network call. Otherwise the deck advances
    /// before any I/O and, unless `candidate` is a fallback, the backend call
    /// is spawned in the background.
    pub async fn dispatch(&self, intent: SwipeIntent, candidate: &Candidate) -> DispatchResult {
        let action = intent.action();
        let outcome = {
            let mut ledger = self.inner.ledger.lock().await;
            let outcome = self.charge(&mut ledger);
            if outcome == ConsumeOutcome::Denied {
                tracing::info!(candidate = %candidate.id, %action, "swipe blocked by quota");
                return DispatchResult::Blocked;
            }
            self.inner.queue.lock().await.advance();
            outcome
        };

        let remote = self.sync(candidate, action).await;
        DispatchResult::Committed {
            action,
            outcome,
            remote,
        }
    }

    /// Commit `intent` against the candidate on top of the deck.
    ///
    /// Holds the ledger and deck locks together so two concurrent swipes
    /// never act on the same candidate.
    pub async fn swipe(&self, intent: SwipeIntent) -> DispatchResult {
        let action = intent.action();
        let mut ledger = self.inner.ledger.lock().await;
        let mut queue = self.inner.queue.lock().await;
        let Some(candidate) = queue.current().cloned() else {
            return DispatchResult::NoCandidate;
        };

        let outcome = self.charge(&mut ledger);
        if outcome == ConsumeOutcome::Denied {
            tracing::info!(candidate = %candidate.id, %action, "swipe blocked by quota");
            return DispatchResult::Blocked;
        }
        queue.advance();
        drop(queue);
        drop(ledger);

        let remote = self.sync(&candidate, action).await;
        DispatchResult::Committed {
            action,
            outcome,
            remote,
        }
    }

    /// Route a classified gesture. Taps and cancels change nothing.
    pub async fn handle_gesture(&self, gesture: Gesture) -> DispatchResult {
        match gesture.intent() {
            Some(intent) => self.swipe(intent).await,
            None => DispatchResult::Ignored,
        }
    }

    /// Fold a backend verdict for `candidate_id` into the match list.
    ///
    /// Also used for match notifications that arrive out of band. Returns the
    /// new match, or `None` if the verdict is not a match or the match id is
    /// already known.
    pub async fn record_verdict(&self, candidate_id: &str, verdict: SwipeVerdict) -> Option<Match> {
        if !verdict.accepted {
            tracing::warn!(candidate = candidate_id, "backend did not accept swipe");
        }
        if !verdict.is_match {
            return None;
        }

        let entry = Match {
            id: verdict
                .match_id
                .unwrap_or_else(|| format!("match-{candidate_id}")),
            counterparty_id: candidate_id.to_string(),
            matched_at: self.inner.clock.now(),
        };

        if !self.inner.matches.lock().await.insert(entry.clone()) {
            tracing::debug!(match_id = %entry.id, "duplicate match notification dropped");
            return None;
        }

        tracing::info!(match_id = %entry.id, counterparty = candidate_id, "new match");
        self.emit(SessionEvent::Matched(entry.clone()));
        Some(entry)
    }

    async fn sync(&self, candidate: &Candidate, action: SwipeAction) -> RemoteSync {
        if candidate.is_fallback {
            tracing::debug!(candidate = %candidate.id, "fallback candidate, not submitting");
            return RemoteSync::SkippedFallback;
        }

        let session = self.clone();
        let candidate_id = candidate.id.clone();
        let mut in_flight = self.inner.in_flight.lock().await;
        while let Some(finished) = in_flight.try_join_next() {
            if let Err(err) = finished {
                tracing::warn!("swipe submission task failed: {err}");
            }
        }
        in_flight.spawn(async move {
            session.submit(candidate_id, action).await;
        });
        RemoteSync::Submitted
    }

    async fn submit(&self, candidate_id: String, action: SwipeAction) {
        match self.inner.backend.submit_swipe(&candidate_id, action).await {
            Ok(verdict) => {
                self.record_verdict(&candidate_id, verdict).await;
            }
            Err(err) => {
                tracing::warn!(
                    candidate = %candidate_id,
                    %action,
                    "swipe submit failed, keeping local commit: {err}"
                );
            }
        }
    }
}
