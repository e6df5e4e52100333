//! Bulkhead for upstream model calls.
//!
//! At most `max_concurrent` calls run at once; up to `queue_size` more may
//! wait for a slot, each for at most `queue_timeout`. Anything beyond that is
//! rejected immediately.

use pitchpulse_core::GatewayError;
use std::sync::atomic::{AtomicU32, Ordering};
use std::sync::Arc;
use std::time::Duration;
use tokio::sync::{OwnedSemaphorePermit, Semaphore};
use tracing::{debug, warn};

/// Bulkhead configuration
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct BulkheadConfig {
    /// Maximum concurrent upstream calls
    pub max_concurrent: u32,
    /// Callers allowed to wait when every slot is taken
    pub queue_size: u32,
    /// How long a waiting caller may wait for a slot
    pub queue_timeout: Duration,
}

impl Default for BulkheadConfig {
    fn default() -> Self {
        Self {
            max_concurrent: 32,
            queue_size: 64,
            queue_timeout: Duration::from_secs(2),
        }
    }
}

/// Bounded pool of upstream call slots
#[derive(Debug)]
pub struct Bulkhead {
    /// Identifier used in logs and errors
    id: String,
    config: BulkheadConfig,
    semaphore: Arc<Semaphore>,
    waiting: AtomicU32,
}

impl Bulkhead {
    /// Create a new bulkhead
    #[must_use]
    pub fn new(id: impl Into<String>, config: BulkheadConfig) -> Self {
        Self {
            id: id.into(),
            semaphore: Arc::new(Semaphore::new(config.max_concurrent as usize)),
            waiting: AtomicU32::new(0),
            config,
        }
    }

    /// Create with default configuration
    #[must_use]
    pub fn with_defaults(id: impl Into<String>) -> Self {
        Self::new(id, BulkheadConfig::default())
    }

    /// Get the bulkhead ID
    #[must_use]
    pub fn id(&self) -> &str {
        &self.id
    }

    /// Acquire a slot for one upstream call.
    ///
    /// The slot is released when the returned permit is dropped, including
    /// when the future holding it is cancelled.
    ///
    /// # Errors
    /// Returns a retryable provider error if the queue is full or the queue
    /// timeout elapses.
    pub async fn acquire(&self) -> Result<BulkheadPermit, GatewayError> {
        if let Ok(permit) = Arc::clone(&self.semaphore).try_acquire_owned() {
            return Ok(self.permit(permit));
        }

        let queued = self.waiting.fetch_add(1, Ordering::AcqRel);
        let _waiting = WaitingGuard(&self.waiting);
        if queued >= self.config.queue_size {
            warn!(
                bulkhead = %self.id,
                waiting = queued,
                "Bulkhead queue full"
            );
            return Err(self.rejected("Bulkhead queue full - too many concurrent generations"));
        }

        debug!(
            bulkhead = %self.id,
            waiting = queued + 1,
            max_concurrent = self.config.max_concurrent,
            "Generation queued in bulkhead"
        );

        match tokio::time::timeout(
            self.config.queue_timeout,
            Arc::clone(&self.semaphore).acquire_owned(),
        )
        .await
        {
            Ok(Ok(permit)) => Ok(self.permit(permit)),
            Ok(Err(_)) => Err(GatewayError::internal("Bulkhead semaphore closed")),
            Err(_) => {
                warn!(
                    bulkhead = %self.id,
                    timeout_ms = self.config.queue_timeout.as_millis(),
                    "Bulkhead queue timeout"
                );
                Err(self.rejected("Bulkhead queue timeout - too many concurrent generations"))
            }
        }
    }

    /// Try to acquire a slot without waiting
    ///
    /// # Errors
    /// Returns error if no slot is free
    pub fn try_acquire(&self) -> Result<BulkheadPermit, GatewayError> {
        Arc::clone(&self.semaphore)
            .try_acquire_owned()
            .map(|permit| self.permit(permit))
            .map_err(|_| self.rejected("Bulkhead full - no permits available"))
    }

    /// Number of free slots
    #[must_use]
    pub fn available_permits(&self) -> usize {
        self.semaphore.available_permits()
    }

    /// Number of calls currently holding a slot
    #[must_use]
    pub fn active_calls(&self) -> u32 {
        let available = u32::try_from(self.semaphore.available_permits()).unwrap_or(u32::MAX);
        self.config.max_concurrent.saturating_sub(available)
    }

    /// Get current statistics
    #[must_use]
    pub fn stats(&self) -> BulkheadStats {
        BulkheadStats {
            active_calls: self.active_calls(),
            waiting: self.waiting.load(Ordering::Acquire),
            max_concurrent: self.config.max_concurrent,
            queue_size: self.config.queue_size,
        }
    }

    fn permit(&self, permit: OwnedSemaphorePermit) -> BulkheadPermit {
        debug!(bulkhead = %self.id, active = self.active_calls(), "Bulkhead permit acquired");
        BulkheadPermit {
            _permit: permit,
            bulkhead_id: self.id.clone(),
        }
    }

    fn rejected(&self, message: &str) -> GatewayError {
        GatewayError::provider(self.id.clone(), message, Some(503), true)
    }
}

struct WaitingGuard<'a>(&'a AtomicU32);

impl Drop for WaitingGuard<'_> {
    fn drop(&mut self) {
        self.0.fetch_sub(1, Ordering::AcqRel);
    }
}

/// A slot in a bulkhead, released on drop
#[derive(Debug)]
pub struct BulkheadPermit {
    _permit: OwnedSemaphorePermit,
    bulkhead_id: String,
}

impl BulkheadPermit {
    /// Get the bulkhead ID this permit belongs to
    #[must_use]
    pub fn bulkhead_id(&self) -> &str {
        &self.bulkhead_id
    }
}

impl Drop for BulkheadPermit {
    fn drop(&mut self) {
        debug!(bulkhead = %self.bulkhead_id, "Bulkhead permit released");
    }
}

/// Bulkhead statistics
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct BulkheadStats {
    /// Calls holding a slot
    pub active_calls: u32,
    /// Callers waiting for a slot
    pub waiting: u32,
    /// Maximum concurrent calls
    pub max_concurrent: u32,
    /// Queue size
    pub queue_size: u32,
}

impl BulkheadStats {
    /// Slot utilisation as a percentage
    #[must_use]
    pub fn utilization(&self) -> f64 {
        if self.max_concurrent == 0 {
            0.0
        } else {
            f64::from(self.active_calls) / f64::from(self.max_concurrent) * 100.0
        }
    }
}
