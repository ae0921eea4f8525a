use tokio::sync::broadcast;
use wordminer_protocol::WordBroadcast;

pub const DEFAULT_HUB_CAPACITY: usize = 1024;

/// In-process fan-out of counted words to live listeners.
///
/// Sending never waits: with no listeners the word is dropped, and a listener
/// that falls behind loses the oldest words instead of slowing the counter.
#[derive(Clone)]
pub struct BroadcastHub {
    tx: broadcast::Sender<WordBroadcast>,
}

impl BroadcastHub {
    pub fn new(capacity: usize) -> Self {
        let (tx, _) = broadcast::channel(capacity.max(1));
        Self { tx }
    }

    pub fn subscribe(&self) -> broadcast::Receiver<WordBroadcast> {
        self.tx.subscribe()
    }

    /// Returns how many listeners received the word.
    pub fn publish(&self, word: WordBroadcast) -> usize {
        self.tx.send(word).unwrap_or(0)
    }

    pub fn listener_count(&self) -> usize {
        self.tx.receiver_count()
    }
}

impl Default for BroadcastHub {
    fn default() -> Self {
        Self::new(DEFAULT_HUB_CAPACITY)
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use pretty_assertions::assert_eq;

    fn word(w: &str) -> WordBroadcast {
        WordBroadcast {
            word: w.to_string(),
            language: "python".to_string(),
            repository: "a/b".to_string(),
        }
    }

    #[test]
    fn publish_without_listeners_is_dropped() {
        let hub = BroadcastHub::default();
        assert_eq!(hub.publish(word("lost")), 0);
        assert_eq!(hub.listener_count(), 0);
    }

    #[tokio::test]
    async fn every_listener_gets_a_copy() {
        let hub = BroadcastHub::new(8);
        let mut first = hub.subscribe();
        let mut second = hub.subscribe();

        assert_eq!(hub.publish(word("make")), 2);
        assert_eq!(first.recv().await.unwrap().word, "make");
        assert_eq!(second.recv().await.unwrap().word, "make");
    }

    #[tokio::test]
    async fn slow_listener_lags_instead_of_blocking() {
        let hub = BroadcastHub::new(2);
        let mut slow = hub.subscribe();
        for w in ["aa", "bb", "cc", "dd"] {
            hub.publish(word(w));
        }
        assert!(matches!(
            slow.recv().await,
            Err(broadcast::error::RecvError::Lagged(2))
        ));
        assert_eq!(slow.recv().await.unwrap().word, "cc");
    }
}
