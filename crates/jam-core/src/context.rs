//! The per-run execution context.
//!
//! One context exists per execution: it owns the resource counters, the
//! combined cancellation token, the wall-clock deadline, and the completion
//! message set by `return`/`fail`. The executor calls the accounting
//! methods at statement, loop-iteration, and call boundaries; host
//! functions see the context through their invocation handle.

use std::time::Instant;

use crate::diag::codes::MessageCode;
use crate::error::RuntimeError;
use crate::limits::{CancelReason, CancellationToken, ExecutionOptions};

/// Mutable per-run state threaded through the executor.
pub struct ExecutionContext {
    options: ExecutionOptions,
    token: CancellationToken,
    deadline: Option<Instant>,
    statements: u64,
    iterations: u64,
    depth: u32,
    completion_message: Option<String>,
}

impl ExecutionContext {
    /// Context with its own cancellation token.
    pub fn new(options: ExecutionOptions) -> Self {
        ExecutionContext {
            options,
            token: CancellationToken::new(),
            deadline: None,
            statements: 0,
            iterations: 0,
            depth: 0,
            completion_message: None,
        }
    }

    /// Context whose token is linked to a host-supplied one: cancelling
    /// either cancels the combined token.
    pub fn with_host_token(options: ExecutionOptions, host: &CancellationToken) -> Self {
        let mut ctx = ExecutionContext::new(options);
        ctx.token = CancellationToken::linked_to(host);
        ctx
    }

    /// Arm the wall-clock deadline. Called by the executor immediately
    /// before the first statement runs.
    pub fn begin(&mut self) {
        if let Some(budget) = self.options.max_execution_time {
            self.deadline = Some(Instant::now() + budget);
        }
    }

    /// Poll cancellation and the deadline. The deadline cancels the token
    /// so blocking builtins observe it too.
    fn poll(&self) -> Result<(), RuntimeError> {
        if let Some(deadline) = self.deadline {
            if Instant::now() >= deadline && !self.token.is_cancelled() {
                self.token.cancel_with(CancelReason::Timeout);
            }
        }
        match self.token.check() {
            None => Ok(()),
            Some(CancelReason::Timeout) => {
                let ms = self
                    .options
                    .max_execution_time
                    .map(|d| d.as_millis().to_string())
                    .unwrap_or_default();
                Err(RuntimeError::new(
                    MessageCode::ExecutionTimeLimitExceeded,
                    vec![ms],
                ))
            }
            Some(CancelReason::Host) => {
                Err(RuntimeError::new(MessageCode::CancelledByHost, vec![]))
            }
        }
    }

    /// Account one statement. Doubles as the cooperative cancellation poll.
    pub fn track_statement(&mut self) -> Result<(), RuntimeError> {
        self.poll()?;
        self.statements += 1;
        if let Some(max) = self.options.max_statements {
            if self.statements > max {
                return Err(RuntimeError::new(
                    MessageCode::StatementLimitExceeded,
                    vec![max.to_string()],
                ));
            }
        }
        Ok(())
    }

    /// Account one loop iteration. Cumulative across all loops of the run.
    pub fn track_iteration(&mut self) -> Result<(), RuntimeError> {
        self.iterations += 1;
        if let Some(max) = self.options.max_loop_iterations {
            if self.iterations > max {
                return Err(RuntimeError::new(
                    MessageCode::LoopIterationLimitExceeded,
                    vec![max.to_string()],
                ));
            }
        }
        Ok(())
    }

    /// Enter a call (builtin, host function, or lambda invocation).
    ///
    /// On a depth breach the increment is rolled back before returning, so
    /// callers pair [`ExecutionContext::exit_call`] only with a successful
    /// enter.
    pub fn enter_call(&mut self) -> Result<(), RuntimeError> {
        self.depth += 1;
        if let Some(max) = self.options.max_call_depth {
            if self.depth > max {
                self.depth -= 1;
                return Err(RuntimeError::new(
                    MessageCode::CallDepthLimitExceeded,
                    vec![max.to_string()],
                ));
            }
        }
        Ok(())
    }

    /// Leave a call. Paired with every successful [`enter_call`], on every
    /// exit path including errors.
    ///
    /// [`enter_call`]: ExecutionContext::enter_call
    pub fn exit_call(&mut self) {
        self.depth = self.depth.saturating_sub(1);
    }

    /// Record the human-readable completion reason from `return`/`fail`.
    pub fn set_completion_message(&mut self, message: impl Into<String>) {
        self.completion_message = Some(message.into());
    }

    pub fn completion_message(&self) -> Option<&str> {
        self.completion_message.as_deref()
    }

    /// The combined cancellation token; blocking builtins poll this.
    pub fn cancellation_token(&self) -> &CancellationToken {
        &self.token
    }

    pub fn options(&self) -> &ExecutionOptions {
        &self.options
    }

    /// Statements accounted so far.
    pub fn statements(&self) -> u64 {
        self.statements
    }

    /// Loop iterations accounted so far.
    pub fn iterations(&self) -> u64 {
        self.iterations
    }

    /// Current call depth.
    pub fn call_depth(&self) -> u32 {
        self.depth
    }
}
