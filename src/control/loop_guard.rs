//! Iteration guard against runaway loops.

use dashmap::DashMap;
use std::sync::atomic::{AtomicU32, Ordering};
use std::sync::Arc;
use thiserror::Error;

/// Fatal programming-safety error; should never fire in normal operation.
#[derive(Debug, Error)]
pub enum LoopError {
    #[error(
        "Too many iterations: {operation} (context={context_id}, count={count}, limit={limit})"
    )]
    MaxIterationsExceeded {
        context_id: String,
        operation: String,
        count: u32,
        limit: u32,
    },
}

/// Iteration counter for one logical context (e.g., a task id).
#[derive(Debug)]
pub struct LoopGuard {
    context_id: String,
    max_iterations: u32,
    count: AtomicU32,
}

impl LoopGuard {
    pub fn new(context_id: impl Into<String>, max_iterations: u32) -> Self {
        Self {
            context_id: context_id.into(),
            max_iterations,
            count: AtomicU32::new(0),
        }
    }

    /// Increment the counter; error once it exceeds the limit.
    pub fn check(&self, operation: &str) -> Result<(), LoopError> {
        let count = self.count.fetch_add(1, Ordering::SeqCst) + 1;

        if count > self.max_iterations {
            let err = LoopError::MaxIterationsExceeded {
                context_id: self.context_id.clone(),
                operation: operation.to_string(),
                count,
                limit: self.max_iterations,
            };
            tracing::error!(context = %self.context_id, operation, count, "Iteration limit exceeded");
            return Err(err);
        }

        if count == self.max_iterations {
            tracing::warn!(
                context = %self.context_id,
                operation,
                count,
                "Iteration limit reached"
            );
        }

        Ok(())
    }

    /// Zero the counter.
    pub fn reset(&self) {
        tracing::debug!(context = %self.context_id, "Loop guard reset");
        self.count.store(0, Ordering::SeqCst);
    }

    pub fn count(&self) -> u32 {
        self.count.load(Ordering::SeqCst)
    }
}

/// Maps context id -> guard lazily; supports removal so long-running
/// processes don't accumulate stale contexts.
pub struct LoopGuardRegistry {
    guards: DashMap<String, Arc<LoopGuard>>,
    max_iterations: u32,
}

impl LoopGuardRegistry {
    pub fn new(max_iterations: u32) -> Self {
        Self {
            guards: DashMap::new(),
            max_iterations,
        }
    }

    /// Get or create the guard for a context.
    pub fn get(&self, context_id: &str) -> Arc<LoopGuard> {
        self.guards
            .entry(context_id.to_string())
            .or_insert_with(|| Arc::new(LoopGuard::new(context_id, self.max_iterations)))
            .clone()
    }

    /// Drop a context's guard.
    pub fn remove(&self, context_id: &str) {
        if self.guards.remove(context_id).is_some() {
            tracing::debug!(context = context_id, "Loop guard removed");
        }
    }

    /// Drop every guard.
    pub fn clear(&self) {
        tracing::debug!(count = self.guards.len(), "Clearing all loop guards");
        self.guards.clear();
    }
}
