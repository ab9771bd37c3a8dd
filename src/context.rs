//! Execution Context
//!
//! [`FunctionContext`] is the immutable per-invocation identity handed to the
//! user function: the target block number and hash, decorating an ambient
//! cancellation signal. The signal itself is [`CancelScope`], which every
//! database and remote-client call checks before doing work, so an external
//! cancellation or elapsed deadline aborts the invocation between statements.

use crate::error::ContextError;
use std::time::{Duration, Instant};
use tokio_util::sync::CancellationToken;

/// Cancellation/deadline signal threaded through the invocation.
///
/// Cloning shares the underlying token: cancelling any clone cancels all of
/// them. Child scopes created via [`CancelScope::child_of`] are cancelled
/// when their parent is.
#[derive(Debug, Clone)]
pub struct CancelScope {
    token: CancellationToken,
    deadline: Option<Instant>,
}

impl CancelScope {
    /// A fresh root scope with no deadline.
    pub fn root() -> Self {
        Self {
            token: CancellationToken::new(),
            deadline: None,
        }
    }

    /// A scope cancelled whenever `parent` is, inheriting its deadline.
    pub fn child_of(parent: &CancelScope) -> Self {
        Self {
            token: parent.token.child_token(),
            deadline: parent.deadline,
        }
    }

    /// Attach an absolute deadline.
    pub fn with_deadline(mut self, deadline: Instant) -> Self {
        self.deadline = Some(deadline);
        self
    }

    /// Attach a deadline relative to now.
    pub fn with_timeout(self, timeout: Duration) -> Self {
        self.with_deadline(Instant::now() + timeout)
    }

    /// Cancel this scope (and every clone and child of it).
    pub fn cancel(&self) {
        self.token.cancel();
    }

    pub fn is_cancelled(&self) -> bool {
        self.token.is_cancelled()
    }

    pub fn deadline(&self) -> Option<Instant> {
        self.deadline
    }

    /// Time left until the deadline, if one is set.
    pub fn remaining(&self) -> Option<Duration> {
        self.deadline
            .map(|deadline| deadline.saturating_duration_since(Instant::now()))
    }

    /// Fail if the scope has been cancelled or its deadline has passed.
    pub fn check(&self) -> Result<(), ContextError> {
        if self.token.is_cancelled() {
            return Err(ContextError::Cancelled);
        }
        if let Some(deadline) = self.deadline {
            if Instant::now() >= deadline {
                return Err(ContextError::DeadlineExceeded);
            }
        }
        Ok(())
    }
}

impl Default for CancelScope {
    fn default() -> Self {
        Self::root()
    }
}

/// Per-invocation execution context.
///
/// Constructed once by the invocation driver after context resolution and
/// never mutated. It decorates the parent [`CancelScope`] rather than
/// introducing a new cancellation source of its own.
#[derive(Debug, Clone)]
pub struct FunctionContext {
    scope: CancelScope,
    block_number: i64,
    block_hash: String,
}

impl FunctionContext {
    pub fn new(parent: &CancelScope, block_number: i64, block_hash: impl Into<String>) -> Self {
        Self {
            scope: CancelScope::child_of(parent),
            block_number,
            block_hash: block_hash.into(),
        }
    }

    /// The block of on-chain data this invocation operates against.
    pub fn block_number(&self) -> i64 {
        self.block_number
    }

    /// Hash of the target block.
    pub fn block_hash(&self) -> &str {
        &self.block_hash
    }

    /// The cancellation signal to pass into database and client calls.
    pub fn scope(&self) -> &CancelScope {
        &self.scope
    }

    pub fn check(&self) -> Result<(), ContextError> {
        self.scope.check()
    }

    pub fn is_cancelled(&self) -> bool {
        self.scope.is_cancelled()
    }

    pub fn deadline(&self) -> Option<Instant> {
        self.scope.deadline()
    }
}
