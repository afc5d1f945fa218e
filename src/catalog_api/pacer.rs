//! Request pacing for outbound catalog calls.
//!
//! Keeps a minimum interval between consecutive requests of one adapter
//! instance, shared by every task that calls through it.

use std::sync::Arc;
use std::time::{Duration, Instant};

use async_trait::async_trait;
use tokio::sync::Mutex;
use tracing::trace;

/// Abstraction over waiting, so pacing and backoff can be observed in tests.
#[async_trait]
pub trait Sleeper: Send + Sync {
    async fn sleep(&self, duration: Duration);
}

/// Sleeps on the tokio timer.
#[derive(Debug, Default, Clone, Copy)]
pub struct TokioSleeper;

#[async_trait]
impl Sleeper for TokioSleeper {
    async fn sleep(&self, duration: Duration) {
        tokio::time::sleep(duration).await;
    }
}

pub struct RequestPacer {
    min_interval: Duration,
    last_request: Mutex<Option<Instant>>,
    sleeper: Arc<dyn Sleeper>,
}

impl RequestPacer {
    pub fn new(min_interval: Duration, sleeper: Arc<dyn Sleeper>) -> Self {
        Self {
            min_interval,
            last_request: Mutex::new(None),
            sleeper,
        }
    }

    pub fn min_interval(&self) -> Duration {
        self.min_interval
    }

    /// Wait until this caller may send its request.
    ///
    /// The lock is held across the wait so concurrent callers queue up
    /// behind each other instead of all firing once the interval elapses.
    pub async fn wait_turn(&self) {
        let mut last = self.last_request.lock().await;
        if let Some(previous) = *last {
            let elapsed = previous.elapsed();
            if elapsed < self.min_interval {
                let wait = self.min_interval - elapsed;
                trace!("Pacing catalog request, waiting {:?}", wait);
                self.sleeper.sleep(wait).await;
            }
        }
        *last = Some(Instant::now());
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::catalog_api::mock::RecordingSleeper;

    #[tokio::test]
    async fn test_first_request_is_not_delayed() {
        let sleeper = Arc::new(RecordingSleeper::default());
        let pacer = RequestPacer::new(Duration::from_secs(10), sleeper.clone());

        pacer.wait_turn().await;

        assert!(sleeper.recorded().is_empty());
    }

    #[tokio::test]
    async fn test_back_to_back_requests_are_spaced() {
        let sleeper = Arc::new(RecordingSleeper::default());
        let pacer = RequestPacer::new(Duration::from_secs(10), sleeper.clone());

        pacer.wait_turn().await;
        pacer.wait_turn().await;
        pacer.wait_turn().await;

        let waits = sleeper.recorded();
        assert_eq!(waits.len(), 2);
        for wait in waits {
            assert!(wait > Duration::from_secs(9));
            assert!(wait <= Duration::from_secs(10));
        }
    }

    #[tokio::test]
    async fn test_zero_interval_never_sleeps() {
        let sleeper = Arc::new(RecordingSleeper::default());
        let pacer = RequestPacer::new(Duration::ZERO, sleeper.clone());

        for _ in 0..5 {
            pacer.wait_turn().await;
        }

        assert!(sleeper.recorded().is_empty());
    }
}
