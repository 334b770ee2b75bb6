use std::{sync::Arc, time::Duration};

use chrono::{DateTime, Utc};
use tokio::time::{self, MissedTickBehavior};

use crate::{Backend, Clock, ConsumeOutcome, KeyValueStore, QuotaLedger, QuotaState};

use super::{Session, SessionEvent};

impl<B: Backend, S: KeyValueStore, C: Clock> Session<B, S, C> {
    /// Snapshot of the quota counters.
    pub async fn quota_state(&self) -> QuotaState {
        self.inner.ledger.lock().await.state()
    }

    /// Free actions left in the current period.
    pub async fn free_remaining(&self) -> u32 {
        self.inner.ledger.lock().await.free_remaining()
    }

    /// Time until the free allowance resets.
    pub async fn time_until_reset(&self) -> chrono::Duration {
        let now = self.inner.clock.now();
        self.inner.ledger.lock().await.time_until_reset(now)
    }

    /// Pay for one action on an already locked ledger. Every allowed outcome
    /// schedules a persist.
    ///
    /// An expired period is rolled over first and announced like a watcher
    /// reset, even when the action itself is then denied.
    pub(super) fn charge(&self, ledger: &mut QuotaLedger) -> ConsumeOutcome {
        let now = self.inner.clock.now();
        let rolled = ledger.roll_over(now);
        let outcome = ledger.consume(now);
        if rolled || outcome.is_allowed() {
            self.inner.persister.schedule(ledger.state());
        }
        if rolled {
            self.announce_reset(ledger.state(), now);
        }
        tracing::debug!(
            ?outcome,
            free_remaining = ledger.free_remaining(),
            balance = ledger.state().currency_balance,
            "quota consumed"
        );
        outcome
    }

    /// Reset the free allowance if its deadline has passed.
    ///
    /// Takes the same lock as swipe consumption, so a reset never lands in
    /// the middle of a consume. Safe to call from several tasks: only the
    /// first call past a deadline resets. Returns `true` if it did.
    pub async fn check_reset(&self) -> bool {
        let now = self.inner.clock.now();
        let mut ledger = self.inner.ledger.lock().await;
        if !ledger.roll_over(now) {
            return false;
        }
        let state = ledger.state();
        self.inner.persister.schedule(state);
        drop(ledger);

        self.announce_reset(state, now);
        true
    }

    fn announce_reset(&self, state: QuotaState, now: DateTime<Utc>) {
        let next_reset_at = DateTime::from_timestamp_millis(state.reset_at_epoch_ms).unwrap_or(now);
        tracing::info!(%next_reset_at, "daily free swipes reset");
        self.emit(SessionEvent::QuotaReset { next_reset_at });
    }

    /// Poll [`Session::check_reset`] every `interval` in a background task.
    ///
    /// Replaces a previously started watcher. The task only holds a weak
    /// reference: it stops once the last session handle is dropped.
    pub async fn spawn_reset_watcher(&self, interval: Duration) {
        let shared = Arc::downgrade(&self.inner);
        let handle = tokio::spawn(async move {
            let mut ticker = time::interval(interval);
            ticker.set_missed_tick_behavior(MissedTickBehavior::Delay);
            loop {
                ticker.tick().await;
                let Some(inner) = shared.upgrade() else {
                    break;
                };
                Session { inner }.check_reset().await;
            }
        });

        if let Some(previous) = self.inner.reset_watcher.lock().await.replace(handle) {
            previous.abort();
        }
    }

    /// Overwrite the cached currency balance after an out-of-band purchase.
    pub async fn refresh_balance(&self, balance: u64) {
        let mut ledger = self.inner.ledger.lock().await;
        if ledger.refresh_balance(balance) {
            self.inner.persister.schedule(ledger.state());
        }
    }

    /// Add currency to the cached balance.
    pub async fn credit(&self, amount: u64) {
        let mut ledger = self.inner.ledger.lock().await;
        ledger.credit(amount);
        self.inner.persister.schedule(ledger.state());
    }
}
