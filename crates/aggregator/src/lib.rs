//! # Word Miner Aggregator
//!
//! The consuming half: counts tokens arriving over the transport and shows the
//! totals on a small dashboard.
//!
//! ```text
//! TokenSubscriber ──> Aggregator ──record_token──> CounterStore
//!                        │                              │
//!                        └──> BroadcastHub              │
//!                               │                       │
//!                               └──> /api/stream   /api/words, /api/last-repo
//! ```

mod aggregator;
mod dashboard;
mod hub;

pub use aggregator::{Aggregator, AggregatorStats};
pub use dashboard::{router, DashboardState, LastRepoResponse, WordsQuery};
pub use hub::{BroadcastHub, DEFAULT_HUB_CAPACITY};
