//! Session budget tracking
//!
//! The tracker is the only mutable state shared between concurrent agent
//! invocations. Every check-and-mutate happens under one lock, and amounts are
//! kept as integer nanodollars so concurrent reservations cannot overshoot the
//! cap through floating-point accumulation.

use agent_core::{Error, Result};
use serde::{Deserialize, Serialize};
use std::sync::{Mutex, MutexGuard, PoisonError};
use tracing::{debug, warn};

const NANOS_PER_USD: f64 = 1_000_000_000.0;

fn to_nanos(usd: f64) -> u64 {
    if usd.is_finite() && usd > 0.0 {
        (usd * NANOS_PER_USD).round() as u64
    } else {
        0
    }
}

fn to_usd(nanos: u64) -> f64 {
    nanos as f64 / NANOS_PER_USD
}

/// `budget` section of the configuration file
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct BudgetConfig {
    /// Maximum spend for the session in USD; `None` means unlimited
    pub session_cap_usd: Option<f64>,
}

impl BudgetConfig {
    pub fn with_cap(cap_usd: f64) -> Self {
        Self {
            session_cap_usd: Some(cap_usd),
        }
    }

    pub fn validate(&self) -> Result<()> {
        match self.session_cap_usd {
            Some(cap) if !cap.is_finite() || cap < 0.0 => Err(Error::Config(format!(
                "session_cap_usd must be a non-negative amount, got {cap}"
            ))),
            _ => Ok(()),
        }
    }
}

/// Point-in-time view of the budget
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct BudgetStatus {
    pub cap_usd: Option<f64>,
    pub spent_usd: f64,
    pub reserved_usd: f64,
    /// `None` when unlimited
    pub remaining_usd: Option<f64>,
    /// Spent as a percentage of the cap; `None` when unlimited
    pub percentage_used: Option<f64>,
}

#[derive(Debug, Default)]
struct Ledger {
    spent: u64,
    reserved: u64,
}

/// Tracks cumulative spend against an optional session cap
///
/// Callers [`reserve`](Self::reserve) an estimate before dispatching a call,
/// then either [`commit`](Self::commit) the metered cost or
/// [`release`](Self::release) the hold if the call never completed.
#[derive(Debug)]
pub struct BudgetTracker {
    cap: Option<u64>,
    ledger: Mutex<Ledger>,
}

impl BudgetTracker {
    /// Tracker with an optional cap in USD
    pub fn new(cap_usd: Option<f64>) -> Self {
        Self {
            cap: cap_usd.map(to_nanos),
            ledger: Mutex::new(Ledger::default()),
        }
    }

    pub fn unlimited() -> Self {
        Self::new(None)
    }

    pub fn with_cap(cap_usd: f64) -> Self {
        Self::new(Some(cap_usd))
    }

    pub fn from_config(config: &BudgetConfig) -> Result<Self> {
        config.validate()?;
        Ok(Self::new(config.session_cap_usd))
    }

    fn ledger(&self) -> MutexGuard<'_, Ledger> {
        self.ledger.lock().unwrap_or_else(PoisonError::into_inner)
    }

    pub fn cap(&self) -> Option<f64> {
        self.cap.map(to_usd)
    }

    /// Hold `estimate_usd` if `spent + reserved + estimate <= cap`
    ///
    /// Always succeeds without a cap. Fails once the cap has been reached,
    /// even for a zero estimate.
    pub fn reserve(&self, estimate_usd: f64) -> bool {
        let estimate = to_nanos(estimate_usd);
        let mut ledger = self.ledger();

        if let Some(cap) = self.cap {
            if ledger.spent >= cap {
                debug!(estimate_usd, "Reservation refused: budget exhausted");
                return false;
            }
            let committed = ledger.spent.saturating_add(ledger.reserved);
            if committed.saturating_add(estimate) > cap {
                debug!(
                    estimate_usd,
                    spent_usd = to_usd(ledger.spent),
                    reserved_usd = to_usd(ledger.reserved),
                    "Reservation refused: would exceed cap"
                );
                return false;
            }
        }

        ledger.reserved = ledger.reserved.saturating_add(estimate);
        true
    }

    /// Like [`Self::reserve`], returning a guard that releases the hold on drop
    pub fn try_reserve(&self, estimate_usd: f64) -> Option<Reservation<'_>> {
        self.reserve(estimate_usd).then(|| Reservation {
            tracker: self,
            amount: estimate_usd,
            settled: false,
        })
    }

    /// Release a hold and add the metered cost
    ///
    /// `actual_usd` may exceed the reservation; spend is recorded as metered.
    pub fn commit(&self, reserved_usd: f64, actual_usd: f64) {
        let reserved = to_nanos(reserved_usd);
        let actual = to_nanos(actual_usd);
        let mut ledger = self.ledger();

        ledger.reserved = ledger.reserved.saturating_sub(reserved);
        ledger.spent = ledger.spent.saturating_add(actual);

        if let Some(cap) = self.cap.filter(|&cap| ledger.spent > cap) {
            warn!(
                spent_usd = to_usd(ledger.spent),
                cap_usd = to_usd(cap),
                "Session spend exceeded the cap"
            );
        }
    }

    /// Roll back a hold for a call that produced no metered cost
    pub fn release(&self, reserved_usd: f64) {
        let reserved = to_nanos(reserved_usd);
        let mut ledger = self.ledger();
        ledger.reserved = ledger.reserved.saturating_sub(reserved);
    }

    /// Whether the hard ceiling has been reached
    pub fn is_exhausted(&self) -> bool {
        self.cap.is_some_and(|cap| self.ledger().spent >= cap)
    }

    /// Budget left for new reservations; `None` when unlimited
    pub fn remaining(&self) -> Option<f64> {
        let cap = self.cap?;
        let ledger = self.ledger();
        Some(to_usd(
            cap.saturating_sub(ledger.spent.saturating_add(ledger.reserved)),
        ))
    }

    pub fn spent(&self) -> f64 {
        to_usd(self.ledger().spent)
    }

    pub fn status(&self) -> BudgetStatus {
        let ledger = self.ledger();
        let remaining = self
            .cap
            .map(|cap| to_usd(cap.saturating_sub(ledger.spent.saturating_add(ledger.reserved))));
        let percentage_used = self.cap.map(|cap| {
            if cap == 0 {
                100.0
            } else {
                ledger.spent as f64 / cap as f64 * 100.0
            }
        });

        BudgetStatus {
            cap_usd: self.cap.map(to_usd),
            spent_usd: to_usd(ledger.spent),
            reserved_usd: to_usd(ledger.reserved),
            remaining_usd: remaining,
            percentage_used,
        }
    }

    /// Start a new session: clears spend and outstanding holds
    pub fn reset(&self) {
        let mut ledger = self.ledger();
        *ledger = Ledger::default();
        debug!("Budget reset");
    }
}

impl Default for BudgetTracker {
    fn default() -> Self {
        Self::unlimited()
    }
}

/// An outstanding hold, released on drop unless committed
#[must_use = "dropping a reservation releases it"]
#[derive(Debug)]
pub struct Reservation<'a> {
    tracker: &'a BudgetTracker,
    amount: f64,
    settled: bool,
}

impl Reservation<'_> {
    /// Estimate held by this reservation, in USD
    pub fn amount(&self) -> f64 {
        self.amount
    }

    /// Replace the hold with the metered cost
    pub fn commit(mut self, actual_usd: f64) {
        self.tracker.commit(self.amount, actual_usd);
        self.settled = true;
    }
}

impl Drop for Reservation<'_> {
    fn drop(&mut self) {
        if !self.settled {
            self.tracker.release(self.amount);
        }
    }
}
