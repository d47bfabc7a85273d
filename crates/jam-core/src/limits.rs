//! Resource ceilings and the combined cancellation token.
//!
//! Limits are opt-in: a default [`ExecutionOptions`] installs no limiter and
//! the program runs unbounded, which is appropriate for trusted embeddings.
//! When a wall-clock budget is configured, the execution context arms a
//! deadline at execution start and cancels the token on expiry, so blocking
//! builtins and statement boundaries observe the same signal.

use parking_lot::Mutex;
use std::sync::atomic::{AtomicBool, Ordering};
use std::sync::Arc;
use std::time::{Duration, Instant};

/// Why a token fired.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum CancelReason {
    /// The host cancelled execution.
    Host,
    /// The wall-clock execution budget expired.
    Timeout,
}

/// Per-run resource ceilings. `None` disables the corresponding check.
#[derive(Debug, Clone, Default)]
pub struct ExecutionOptions {
    /// Ceiling on accounted statements.
    pub max_statements: Option<u64>,
    /// Ceiling on cumulative loop iterations across all loops.
    pub max_loop_iterations: Option<u64>,
    /// Ceiling on nested call depth (builtins, host functions, lambdas).
    pub max_call_depth: Option<u32>,
    /// Wall-clock budget for one execution.
    pub max_execution_time: Option<Duration>,
}

impl ExecutionOptions {
    pub fn unbounded() -> Self {
        ExecutionOptions::default()
    }

    pub fn with_max_statements(mut self, max: u64) -> Self {
        self.max_statements = Some(max);
        self
    }

    pub fn with_max_loop_iterations(mut self, max: u64) -> Self {
        self.max_loop_iterations = Some(max);
        self
    }

    pub fn with_max_call_depth(mut self, max: u32) -> Self {
        self.max_call_depth = Some(max);
        self
    }

    pub fn with_max_execution_time(mut self, max: Duration) -> Self {
        self.max_execution_time = Some(max);
        self
    }

    /// True when no ceiling is configured.
    pub fn is_unbounded(&self) -> bool {
        self.max_statements.is_none()
            && self.max_loop_iterations.is_none()
            && self.max_call_depth.is_none()
            && self.max_execution_time.is_none()
    }
}

struct TokenState {
    cancelled: AtomicBool,
    reason: Mutex<Option<CancelReason>>,
}

/// A cooperative cancellation token.
///
/// Cloning yields another handle to the same token. A token created with
/// [`CancellationToken::linked_to`] also observes its parent, so cancelling
/// either handle cancels the combined token - this is how a host-supplied
/// token and the limiter's own timeout are joined.
#[derive(Clone)]
pub struct CancellationToken {
    state: Arc<TokenState>,
    parent: Option<Arc<CancellationToken>>,
}

impl CancellationToken {
    pub fn new() -> Self {
        CancellationToken {
            state: Arc::new(TokenState {
                cancelled: AtomicBool::new(false),
                reason: Mutex::new(None),
            }),
            parent: None,
        }
    }

    /// A token that also fires when `parent` fires.
    pub fn linked_to(parent: &CancellationToken) -> Self {
        CancellationToken {
            state: Arc::new(TokenState {
                cancelled: AtomicBool::new(false),
                reason: Mutex::new(None),
            }),
            parent: Some(Arc::new(parent.clone())),
        }
    }

    /// Cancel on behalf of the host.
    pub fn cancel(&self) {
        self.cancel_with(CancelReason::Host);
    }

    /// Cancel with an explicit reason. The first reason wins.
    pub fn cancel_with(&self, reason: CancelReason) {
        {
            let mut slot = self.state.reason.lock();
            if slot.is_none() {
                *slot = Some(reason);
            }
        }
        // Reason is published before the flag so check() never observes a
        // cancelled token without one.
        self.state.cancelled.store(true, Ordering::Release);
    }

    /// The firing reason, if this token (or a linked parent) has fired.
    pub fn check(&self) -> Option<CancelReason> {
        if self.state.cancelled.load(Ordering::Acquire) {
            return Some(self.state.reason.lock().unwrap_or(CancelReason::Host));
        }
        self.parent.as_ref().and_then(|p| p.check())
    }

    pub fn is_cancelled(&self) -> bool {
        self.check().is_some()
    }

    /// Block for `duration`, polling for cancellation in small slices.
    ///
    /// Returns the cancel reason if the token fired before the duration
    /// elapsed. Blocking builtins use this so cancellation is observed
    /// promptly instead of at the next statement boundary.
    pub fn sleep(&self, duration: Duration) -> Option<CancelReason> {
        const SLICE: Duration = Duration::from_millis(10);
        let deadline = Instant::now() + duration;
        loop {
            if let Some(reason) = self.check() {
                return Some(reason);
            }
            let now = Instant::now();
            if now >= deadline {
                return None;
            }
            std::thread::sleep((deadline - now).min(SLICE));
        }
    }
}

impl Default for CancellationToken {
    fn default() -> Self {
        CancellationToken::new()
    }
}

impl std::fmt::Debug for CancellationToken {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("CancellationToken")
            .field("cancelled", &self.is_cancelled())
            .field("linked", &self.parent.is_some())
            .finish()
    }
}
