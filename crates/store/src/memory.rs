use crate::backend::{
    CounterStore, Subscription, TokenCounts, TokenPublisher, TokenSubscriber, SUBSCRIPTION_BUFFER,
};
use crate::error::Result;
use async_trait::async_trait;
use std::collections::HashMap;
use std::sync::Arc;
use tokio::sync::{broadcast, mpsc, Mutex};
use wordminer_protocol::{word_counts_key, WireToken, ALL_LANGUAGES, LAST_REPO_KEY};

const CHANNEL_CAPACITY: usize = 4096;

#[derive(Default)]
struct MemoryState {
    hashes: HashMap<String, HashMap<String, u64>>,
    scalars: HashMap<String, String>,
}

impl MemoryState {
    fn increment(&mut self, key: &str, field: &str) -> u64 {
        let slot = self
            .hashes
            .entry(key.to_string())
            .or_default()
            .entry(field.to_string())
            .or_insert(0);
        *slot += 1;
        *slot
    }
}

/// In-process store and transport.
///
/// Used by tests and when both halves run in one process without Redis. Like the
/// real transport it delivers at most once and only to current subscribers.
#[derive(Clone)]
pub struct MemoryBackend {
    state: Arc<Mutex<MemoryState>>,
    channel: broadcast::Sender<String>,
}

impl MemoryBackend {
    pub fn new() -> Self {
        let (channel, _) = broadcast::channel(CHANNEL_CAPACITY);
        Self {
            state: Arc::new(Mutex::new(MemoryState::default())),
            channel,
        }
    }
}

impl Default for MemoryBackend {
    fn default() -> Self {
        Self::new()
    }
}

#[async_trait]
impl CounterStore for MemoryBackend {
    async fn increment_field(&self, key: &str, field: &str) -> Result<u64> {
        Ok(self.state.lock().await.increment(key, field))
    }

    async fn get_all_fields(&self, key: &str) -> Result<HashMap<String, u64>> {
        let guard = self.state.lock().await;
        Ok(guard.hashes.get(key).cloned().unwrap_or_default())
    }

    async fn record_token(&self, token: &WireToken) -> Result<TokenCounts> {
        let mut guard = self.state.lock().await;
        let language = guard.increment(&word_counts_key(&token.language), &token.word);
        let all = guard.increment(&word_counts_key(ALL_LANGUAGES), &token.word);
        guard
            .scalars
            .insert(LAST_REPO_KEY.to_string(), token.repository.clone());
        Ok(TokenCounts { language, all })
    }

    async fn set_last_repo(&self, repository: &str) -> Result<()> {
        self.state
            .lock()
            .await
            .scalars
            .insert(LAST_REPO_KEY.to_string(), repository.to_string());
        Ok(())
    }

    async fn last_repo(&self) -> Result<Option<String>> {
        Ok(self.state.lock().await.scalars.get(LAST_REPO_KEY).cloned())
    }
}

#[async_trait]
impl TokenPublisher for MemoryBackend {
    async fn publish(&self, payload: &str) -> Result<()> {
        // No subscribers means nobody hears it, same as pub/sub.
        let _ = self.channel.send(payload.to_string());
        Ok(())
    }
}

#[async_trait]
impl TokenSubscriber for MemoryBackend {
    async fn subscribe(&self) -> Result<Subscription> {
        let mut source = self.channel.subscribe();
        let (tx, rx) = mpsc::channel(SUBSCRIPTION_BUFFER);
        tokio::spawn(async move {
            loop {
                match source.recv().await {
                    Ok(payload) => {
                        if tx.send(payload).await.is_err() {
                            break;
                        }
                    }
                    Err(broadcast::error::RecvError::Lagged(skipped)) => {
                        log::warn!("Memory transport subscriber lagged, dropped {skipped} messages");
                    }
                    Err(broadcast::error::RecvError::Closed) => break,
                }
            }
        });
        Ok(Subscription::new(rx))
    }
}
