use crate::error::Result;
use async_trait::async_trait;
use std::collections::HashMap;
use tokio::sync::mpsc;
use wordminer_protocol::{WireToken, WordCount};

/// Counts after one token was recorded.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct TokenCounts {
    pub language: u64,
    pub all: u64,
}

/// Keyed counter store shared by the aggregator (sole writer) and dashboard readers.
#[async_trait]
pub trait CounterStore: Send + Sync {
    /// Increment one field of a hash, returning the new value.
    async fn increment_field(&self, key: &str, field: &str) -> Result<u64>;

    async fn get_all_fields(&self, key: &str) -> Result<HashMap<String, u64>>;

    /// Count one token in its language partition and in the combined partition,
    /// and remember its repository, as a single atomic step.
    async fn record_token(&self, token: &WireToken) -> Result<TokenCounts>;

    async fn set_last_repo(&self, repository: &str) -> Result<()>;

    async fn last_repo(&self) -> Result<Option<String>>;
}

/// Publish side of the token transport.
#[async_trait]
pub trait TokenPublisher: Send + Sync {
    async fn publish(&self, payload: &str) -> Result<()>;
}

/// Subscribe side of the token transport.
#[async_trait]
pub trait TokenSubscriber: Send + Sync {
    /// Fails when the backend is unreachable; callers do not retry.
    async fn subscribe(&self) -> Result<Subscription>;
}

pub(crate) const SUBSCRIPTION_BUFFER: usize = 1024;

/// Live stream of raw transport payloads.
pub struct Subscription {
    rx: mpsc::Receiver<String>,
}

impl Subscription {
    pub(crate) fn new(rx: mpsc::Receiver<String>) -> Self {
        Self { rx }
    }

    /// Next payload, or `None` once the transport is gone.
    pub async fn next(&mut self) -> Option<String> {
        self.rx.recv().await
    }
}

/// Highest counts first, ties broken alphabetically.
pub fn top_words(counts: HashMap<String, u64>, limit: usize) -> Vec<WordCount> {
    let mut ranked: Vec<WordCount> = counts
        .into_iter()
        .map(|(word, count)| WordCount { word, count })
        .collect();
    ranked.sort_by(|a, b| b.count.cmp(&a.count).then_with(|| a.word.cmp(&b.word)));
    ranked.truncate(limit);
    ranked
}

#[cfg(test)]
mod tests {
    use super::*;
    use pretty_assertions::assert_eq;

    #[test]
    fn top_words_orders_and_truncates() {
        let counts = HashMap::from([
            ("get".to_string(), 7),
            ("set".to_string(), 7),
            ("make".to_string(), 9),
            ("run".to_string(), 1),
        ]);
        let ranked = top_words(counts, 3);
        let words: Vec<_> = ranked.iter().map(|w| w.word.as_str()).collect();
        assert_eq!(words, vec!["make", "get", "set"]);
    }
}
