use crate::hub::BroadcastHub;
use std::sync::Arc;
use wordminer_protocol::{WireToken, WordBroadcast};
use wordminer_store::{CounterStore, Subscription, TokenSubscriber};

/// Totals of one aggregator run.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq)]
pub struct AggregatorStats {
    pub received: u64,
    pub counted: u64,
    pub dropped: u64,
    pub failed: u64,
}

/// Sole writer of the word counters.
///
/// Consumes the transport, counts every token in its language partition and in
/// the combined partition, then rebroadcasts it to live listeners.
pub struct Aggregator {
    subscriber: Arc<dyn TokenSubscriber>,
    store: Arc<dyn CounterStore>,
    hub: BroadcastHub,
}

impl Aggregator {
    pub fn new(
        subscriber: Arc<dyn TokenSubscriber>,
        store: Arc<dyn CounterStore>,
        hub: BroadcastHub,
    ) -> Self {
        Self {
            subscriber,
            store,
            hub,
        }
    }

    pub fn hub(&self) -> &BroadcastHub {
        &self.hub
    }

    /// Subscribe and consume until the transport ends.
    ///
    /// If the subscription cannot be made the error is logged and the run ends
    /// at once; there is no retry.
    pub async fn run(&self) -> AggregatorStats {
        let subscription = match self.subscriber.subscribe().await {
            Ok(subscription) => subscription,
            Err(err) => {
                log::error!("Aggregator could not subscribe to the token stream: {err}");
                return AggregatorStats::default();
            }
        };
        log::info!("Aggregator listening for tokens");
        self.consume(subscription).await
    }

    pub async fn consume(&self, mut subscription: Subscription) -> AggregatorStats {
        let mut stats = AggregatorStats::default();
        while let Some(payload) = subscription.next().await {
            stats.received += 1;
            self.handle(&payload, &mut stats).await;
        }
        log::info!(
            "Token stream ended: received={} counted={} dropped={} failed={}",
            stats.received,
            stats.counted,
            stats.dropped,
            stats.failed
        );
        stats
    }

    async fn handle(&self, payload: &str, stats: &mut AggregatorStats) {
        let token = WireToken::decode(payload);
        if token.word.is_empty() {
            log::debug!("Dropping payload without a word: {payload:?}");
            stats.dropped += 1;
            return;
        }

        match self.store.record_token(&token).await {
            Ok(counts) => {
                stats.counted += 1;
                log::debug!(
                    "Counted word={} language={} count={} all={}",
                    token.word,
                    token.language,
                    counts.language,
                    counts.all
                );
                self.hub.publish(WordBroadcast::from(token));
            }
            Err(err) => {
                stats.failed += 1;
                log::error!("Failed to count word={}: {err}", token.word);
            }
        }
    }
}
