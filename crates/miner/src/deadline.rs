use crate::error::{MinerError, Result};
use std::future::Future;
use std::time::Duration;
use tokio::time::Instant;

/// A wall-clock budget shared by every upstream call made for one repository.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct Deadline {
    at: Instant,
}

impl Deadline {
    pub fn after(budget: Duration) -> Self {
        Self {
            at: Instant::now() + budget,
        }
    }

    pub fn at(&self) -> Instant {
        self.at
    }

    pub fn remaining(&self) -> Duration {
        self.at.saturating_duration_since(Instant::now())
    }

    pub fn is_expired(&self) -> bool {
        Instant::now() >= self.at
    }

    /// Run `fut` until it finishes or the deadline passes, whichever comes first.
    /// On expiry the future is dropped, so in-flight work is discarded.
    pub async fn race<F: Future>(&self, fut: F) -> Result<F::Output> {
        tokio::time::timeout_at(self.at, fut)
            .await
            .map_err(|_| MinerError::DeadlineExceeded)
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[tokio::test(start_paused = true)]
    async fn race_returns_output_before_deadline() {
        let deadline = Deadline::after(Duration::from_secs(5));
        let value = deadline
            .race(async {
                tokio::time::sleep(Duration::from_secs(1)).await;
                7
            })
            .await
            .unwrap();
        assert_eq!(value, 7);
        assert!(!deadline.is_expired());
    }

    #[tokio::test(start_paused = true)]
    async fn race_fails_after_deadline() {
        let deadline = Deadline::after(Duration::from_secs(1));
        let result = deadline
            .race(tokio::time::sleep(Duration::from_secs(10)))
            .await;
        assert!(matches!(result, Err(MinerError::DeadlineExceeded)));
        assert!(deadline.is_expired());
        assert_eq!(deadline.remaining(), Duration::ZERO);
    }
}
