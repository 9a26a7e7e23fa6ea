//! Single-execution critical-section guard.
//!
//! Each component owns one [`ReentrancyGuard`]. Every state-mutating entry
//! point enters it for the duration of the top-level call; a nested call
//! into any guarded entry point of the same component (typically from a
//! payout hook) finds the flag set and is rejected.

use std::sync::atomic::{AtomicBool, Ordering};

/// Returned when the guard is already held.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct Reentered;

/// Non-reentrant flag scoped to one component.
///
/// The flag is not tied to a thread. A call from another thread that arrives
/// while a guarded call is running is rejected the same way as a re-entrant
/// callback, and callers should retry once the running call has returned.
#[derive(Debug, Default)]
pub struct ReentrancyGuard {
    entered: AtomicBool,
}

impl ReentrancyGuard {
    pub fn new() -> Self {
        Self { entered: AtomicBool::new(false) }
    }

    /// Enter the critical section. The returned token releases it on drop,
    /// including during unwinding.
    pub fn enter(&self) -> Result<GuardToken<'_>, Reentered> {
        self.entered
            .compare_exchange(false, true, Ordering::AcqRel, Ordering::Acquire)
            .map(|_| GuardToken { guard: self })
            .map_err(|_| Reentered)
    }

    /// Whether a guarded call is currently in progress.
    pub fn is_entered(&self) -> bool {
        self.entered.load(Ordering::Acquire)
    }
}

/// Proof of holding a [`ReentrancyGuard`].
#[derive(Debug)]
pub struct GuardToken<'a> {
    guard: &'a ReentrancyGuard,
}

impl Drop for GuardToken<'_> {
    fn drop(&mut self) {
        self.guard.entered.store(false, Ordering::Release);
    }
}
