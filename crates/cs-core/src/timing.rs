//! Lightweight timing utilities and cooperative deadlines.
//!
//! `AccumulatingTimer`s always record; their summary is printed only when
//! timing is switched on via `CS_TIMING` or `enable_timing`. `Deadline` is the
//! wall-clock budget that long-running symbolic work polls between steps.

use std::sync::atomic::{AtomicBool, AtomicU64, Ordering};
use std::time::{Duration, Instant};

use crate::CsError;

static ENABLED: AtomicBool = AtomicBool::new(false);

/// Turn on stage summaries for the rest of the process.
pub fn enable_timing() {
    ENABLED.store(true, Ordering::Relaxed);
}

pub fn is_enabled() -> bool {
    ENABLED.load(Ordering::Relaxed) || std::env::var_os("CS_TIMING").is_some()
}

/// Lock-free total and call count for one stage.
pub struct AccumulatingTimer {
    total_ns: AtomicU64,
    count: AtomicU64,
}

impl Default for AccumulatingTimer {
    fn default() -> Self {
        Self::new()
    }
}

impl AccumulatingTimer {
    pub const fn new() -> Self {
        Self {
            total_ns: AtomicU64::new(0),
            count: AtomicU64::new(0),
        }
    }

    pub fn record(&self, duration: Duration) {
        let nanos = u64::try_from(duration.as_nanos()).unwrap_or(u64::MAX);
        self.total_ns.fetch_add(nanos, Ordering::Relaxed);
        self.count.fetch_add(1, Ordering::Relaxed);
    }

    pub fn total_seconds(&self) -> f64 {
        self.total_ns.load(Ordering::Relaxed) as f64 / 1e9
    }

    pub fn count(&self) -> u64 {
        self.count.load(Ordering::Relaxed)
    }

    /// Mean seconds per recorded call, zero before the first one.
    pub fn average_seconds(&self) -> f64 {
        let count = self.count();
        if count > 0 {
            self.total_seconds() / count as f64
        } else {
            0.0
        }
    }

    pub fn reset(&self) {
        self.total_ns.store(0, Ordering::Relaxed);
        self.count.store(0, Ordering::Relaxed);
    }
}

/// Derivation stage timers, shared across worker threads.
pub mod derive_timing {
    use super::AccumulatingTimer;

    /// Time spent stamping MNA systems
    pub static STAMP: AccumulatingTimer = AccumulatingTimer::new();
    /// Time spent in fraction-free elimination
    pub static ELIMINATION: AccumulatingTimer = AccumulatingTimer::new();
    /// Time spent cancelling common factors
    pub static REDUCTION: AccumulatingTimer = AccumulatingTimer::new();

    /// Print derivation timing summary.
    pub fn print_summary() {
        if !super::is_enabled() {
            return;
        }

        println!("\n=== Derivation Breakdown ===");
        for (label, timer) in [
            ("stamp", &STAMP),
            ("elimination", &ELIMINATION),
            ("reduction", &REDUCTION),
        ] {
            let count = timer.count();
            if count > 0 {
                println!(
                    "{label:<12} {} calls, {:.3}s total, {:.4}ms avg",
                    count,
                    timer.total_seconds(),
                    timer.average_seconds() * 1000.0
                );
            }
        }
        println!("============================\n");
    }
}

/// Wall-clock budget polled by cooperative long-running work.
///
/// A deadline never interrupts anything on its own; callers invoke
/// [`Deadline::check`] between bounded units of work and bail out on `Err`.
#[derive(Clone, Copy, Debug)]
pub struct Deadline {
    start: Instant,
    budget: Duration,
}

impl Deadline {
    pub fn after(budget: Duration) -> Self {
        Self {
            start: Instant::now(),
            budget,
        }
    }

    /// A deadline that never expires in practice.
    pub fn unbounded() -> Self {
        Self::after(Duration::from_secs(60 * 60 * 24 * 365))
    }

    pub fn budget(&self) -> Duration {
        self.budget
    }

    pub fn elapsed(&self) -> Duration {
        self.start.elapsed()
    }

    pub fn remaining(&self) -> Duration {
        self.budget.saturating_sub(self.elapsed())
    }

    pub fn expired(&self) -> bool {
        self.elapsed() >= self.budget
    }

    /// Returns `DeadlineExceeded` once the budget is spent.
    pub fn check(&self, what: &'static str) -> Result<(), CsError> {
        if self.expired() {
            Err(CsError::DeadlineExceeded {
                what,
                budget_ms: u64::try_from(self.budget.as_millis()).unwrap_or(u64::MAX),
            })
        } else {
            Ok(())
        }
    }
}
