//! The module contains the `QuotaLedger` and its state.
//!
//! The ledger decides whether a swipe is free, paid with virtual currency, or
//! denied. It is a plain value type: serialization against concurrent callers
//! is provided by the session, which keeps the ledger behind a single lock
//! shared by `consume` and the daily reset check.

use chrono::{DateTime, Duration, Utc};
use serde::{Deserialize, Serialize};

/// Store key the ledger state is persisted under.
pub const QUOTA_STORE_KEY: &str = "swipe_quota";

/// Limits applied by the ledger.
#[derive(Clone, Copy, Debug, PartialEq, Eq)]
pub struct QuotaPolicy {
    /// Free actions available per period.
    pub daily_free_limit: u32,
    /// Currency charged for an action once the free allowance is used.
    pub paid_cost: u64,
    /// Length of a quota period.
    pub reset_period: Duration,
}

impl Default for QuotaPolicy {
    fn default() -> Self {
        Self {
            daily_free_limit: 10,
            paid_cost: 5,
            reset_period: Duration::hours(24),
        }
    }
}

/// Persisted quota counters.
#[derive(Clone, Copy, Debug, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct QuotaState {
    pub free_actions_used_today: u32,
    pub currency_balance: u64,
    pub reset_at_epoch_ms: i64,
}

impl QuotaState {
    /// Fresh state: nothing used, no balance, next reset one period from `now`.
    pub fn fresh(now: DateTime<Utc>, policy: &QuotaPolicy) -> Self {
        Self {
            free_actions_used_today: 0,
            currency_balance: 0,
            reset_at_epoch_ms: (now + policy.reset_period).timestamp_millis(),
        }
    }
}

/// Result of asking the ledger to pay for one action.
#[derive(Clone, Copy, Debug, PartialEq, Eq)]
pub enum ConsumeOutcome {
    /// Covered by the free allowance.
    Allowed,
    /// Free allowance exhausted; currency was debited.
    AllowedPaid,
    /// Neither free allowance nor enough currency. State is unchanged.
    Denied,
}

impl ConsumeOutcome {
    pub fn is_allowed(self) -> bool {
        !matches!(self, Self::Denied)
    }
}

#[derive(Clone, Debug)]
pub struct QuotaLedger {
    policy: QuotaPolicy,
    state: QuotaState,
}

impl QuotaLedger {
    pub fn new(policy: QuotaPolicy, state: QuotaState) -> Self {
        Self { policy, state }
    }

    /// Pay for one action at the policy's price.
    ///
    /// Applies a pending daily rollover first, so a deadline that passed
    /// before the reset watcher ran does not eat a free action.
    pub fn consume(&mut self, now: DateTime<Utc>) -> ConsumeOutcome {
        self.consume_with_cost(now, self.policy.paid_cost)
    }

    /// Pay for one action charging `paid_cost` if the free allowance is gone.
    ///
    /// `Denied` leaves the state untouched apart from the rollover.
    pub fn consume_with_cost(&mut self, now: DateTime<Utc>, paid_cost: u64) -> ConsumeOutcome {
        self.roll_over(now);

        if self.state.free_actions_used_today < self.policy.daily_free_limit {
            self.state.free_actions_used_today += 1;
            return ConsumeOutcome::Allowed;
        }

        match self.state.currency_balance.checked_sub(paid_cost) {
            Some(balance) => {
                self.state.currency_balance = balance;
                // Keep counting so "free remaining" stays monotonic.
                self.state.free_actions_used_today =
                    self.state.free_actions_used_today.saturating_add(1);
                ConsumeOutcome::AllowedPaid
            }
            None => ConsumeOutcome::Denied,
        }
    }

    /// Reset the free counter once `now` reaches the reset deadline.
    ///
    /// Returns `true` if a reset happened. Calling it again before the new
    /// deadline is a no-op.
    pub fn roll_over(&mut self, now: DateTime<Utc>) -> bool {
        let now_ms = now.timestamp_millis();
        if now_ms < self.state.reset_at_epoch_ms {
            return false;
        }
        self.state.free_actions_used_today = 0;
        self.state.reset_at_epoch_ms = (now + self.policy.reset_period).timestamp_millis();
        true
    }

    /// Replace the cached balance with the server's value.
    ///
    /// Returns `true` if the balance changed.
    pub fn refresh_balance(&mut self, balance: u64) -> bool {
        let changed = self.state.currency_balance != balance;
        self.state.currency_balance = balance;
        changed
    }

    /// Add currency to the cached balance.
    pub fn credit(&mut self, amount: u64) {
        self.state.currency_balance = self.state.currency_balance.saturating_add(amount);
    }

    pub fn free_remaining(&self) -> u32 {
        self.policy
            .daily_free_limit
            .saturating_sub(self.state.free_actions_used_today)
    }

    /// Time left before the next reset, zero if it is already due.
    pub fn time_until_reset(&self, now: DateTime<Utc>) -> Duration {
        let remaining = self.state.reset_at_epoch_ms - now.timestamp_millis();
        Duration::milliseconds(remaining.max(0))
    }

    pub fn state(&self) -> QuotaState {
        self.state
    }

    pub fn policy(&self) -> &QuotaPolicy {
        &self.policy
    }
}
