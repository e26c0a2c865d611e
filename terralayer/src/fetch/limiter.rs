//! Concurrency ceiling for outstanding tile requests.
//!
//! A request holds a [`LimiterPermit`] for as long as
//! it is in flight; dropping the permit (completion, timeout, or a cancelled
//! future) releases the slot.

use std::sync::atomic::{AtomicUsize, Ordering};
use std::sync::Arc;

use tokio::sync::{OwnedSemaphorePermit, Semaphore};

/// Default number of simultaneous tile requests.
pub const DEFAULT_MAX_CONCURRENT_REQUESTS: usize = 10;

/// Semaphore-backed limiter with in-flight accounting.
#[derive(Debug)]
pub struct ConcurrencyLimiter {
    semaphore: Arc<Semaphore>,
    max_concurrent: usize,
    in_flight: Arc<AtomicUsize>,
    peak: Arc<AtomicUsize>,
    label: String,
}

impl ConcurrencyLimiter {
    /// Creates a limiter admitting at most `max_concurrent` holders.
    ///
    /// A ceiling of zero is raised to one.
    pub fn new(max_concurrent: usize, label: impl Into<String>) -> Self {
        let max_concurrent = max_concurrent.max(1);
        let label = label.into();

        tracing::debug!(max_concurrent, label = %label, "Created concurrency limiter");

        Self {
            semaphore: Arc::new(Semaphore::new(max_concurrent)),
            max_concurrent,
            in_flight: Arc::new(AtomicUsize::new(0)),
            peak: Arc::new(AtomicUsize::new(0)),
            label,
        }
    }

    /// Waits for a free slot.
    pub async fn acquire(&self) -> LimiterPermit {
        let permit = Arc::clone(&self.semaphore)
            .acquire_owned()
            .await
            .expect("limiter semaphore is never closed");

        let now = self.in_flight.fetch_add(1, Ordering::SeqCst) + 1;
        self.peak.fetch_max(now, Ordering::SeqCst);

        LimiterPermit {
            _permit: permit,
            in_flight: Arc::clone(&self.in_flight),
        }
    }

    /// Number of permits currently held.
    pub fn in_flight(&self) -> usize {
        self.in_flight.load(Ordering::SeqCst)
    }

    /// Highest number of permits ever held at once.
    pub fn peak(&self) -> usize {
        self.peak.load(Ordering::SeqCst)
    }

    /// The configured ceiling.
    pub fn max_concurrent(&self) -> usize {
        self.max_concurrent
    }

    pub fn label(&self) -> &str {
        &self.label
    }
}

/// A held slot. Releases the slot when dropped.
#[derive(Debug)]
pub struct LimiterPermit {
    _permit: OwnedSemaphorePermit,
    in_flight: Arc<AtomicUsize>,
}

impl Drop for LimiterPermit {
    fn drop(&mut self) {
        self.in_flight.fetch_sub(1, Ordering::SeqCst);
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::time::Duration;

    #[tokio::test]
    async fn test_acquire_and_release() {
        let limiter = ConcurrencyLimiter::new(2, "test");
        let a = limiter.acquire().await;
        let b = limiter.acquire().await;
        assert_eq!(limiter.in_flight(), 2);

        drop(a);
        assert_eq!(limiter.in_flight(), 1);
        drop(b);
        assert_eq!(limiter.in_flight(), 0);
        assert_eq!(limiter.peak(), 2);
    }

    #[tokio::test]
    async fn test_blocks_at_ceiling() {
        let limiter = ConcurrencyLimiter::new(1, "test");
        let held = limiter.acquire().await;

        let blocked = tokio::time::timeout(Duration::from_millis(20), limiter.acquire()).await;
        assert!(blocked.is_err(), "second acquire should wait");

        drop(held);
        let permit = tokio::time::timeout(Duration::from_millis(200), limiter.acquire()).await;
        assert!(permit.is_ok());
    }

    #[test]
    fn test_zero_ceiling_is_raised() {
        let limiter = ConcurrencyLimiter::new(0, "test");
        assert_eq!(limiter.max_concurrent(), 1);
        assert_eq!(limiter.label(), "test");
    }
}
