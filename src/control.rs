//! Cancellation (spec.md §5): a deadline and an abort token, checked at
//! layer boundaries (isochrone) or every ~1024 popped nodes (A*). No
//! coroutine scheduling is required — `solve()` never suspends mid-search.

use std::sync::atomic::{AtomicBool, Ordering};
use std::sync::Arc;
use std::time::Instant;

#[derive(Clone, Default)]
pub struct SolveControl {
    pub deadline: Option<Instant>,
    pub abort: Option<Arc<AtomicBool>>,
}

impl SolveControl {
    pub fn new(deadline: Option<Instant>, abort: Option<Arc<AtomicBool>>) -> Self {
        Self { deadline, abort }
    }

    /// True iff the solve should stop now: its deadline has passed, or its
    /// abort token has been set.
    pub fn should_stop(&self) -> bool {
        if let Some(deadline) = self.deadline {
            if Instant::now() >= deadline {
                return true;
            }
        }
        if let Some(abort) = &self.abort {
            if abort.load(Ordering::Relaxed) {
                return true;
            }
        }
        false
    }
}
