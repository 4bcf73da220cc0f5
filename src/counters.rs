//! Shared step counting for a training worker.
//!
//! One [`StepCounter`] is shared between the controller and whatever the
//! harness hangs off it (summary writers, learning-rate schedules). It is
//! advanced exactly once per `step()` call, on the train and the meta
//! branch alike.

use std::sync::atomic::{AtomicUsize, Ordering};
use std::sync::Arc;

/// Monotonic step counter.
///
/// Increment-only; never reset during a run.
#[derive(Debug, Default)]
pub struct StepCounter {
    steps: AtomicUsize,
}

impl StepCounter {
    /// Create a counter starting at zero.
    pub fn new() -> Self {
        Self::default()
    }

    /// Current step count.
    pub fn get(&self) -> usize {
        self.steps.load(Ordering::Acquire)
    }

    /// Advance by one, returning the previous value.
    pub fn increment(&self) -> usize {
        self.steps.fetch_add(1, Ordering::AcqRel)
    }
}

/// Thread-safe shared step counter.
pub type SharedStepCounter = Arc<StepCounter>;

/// Create a new shared step counter.
pub fn step_counter() -> SharedStepCounter {
    Arc::new(StepCounter::new())
}
