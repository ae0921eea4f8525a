//! # Word Miner Store
//!
//! The counter store and the token transport, behind traits so the mining and
//! aggregating halves never depend on a concrete backend.
//!
//! ```text
//! TokenPublisher ──payload──> transport ──> TokenSubscriber
//!                                              │
//!                                              └─> CounterStore
//!                                                    ├─ word_counts:<language>
//!                                                    ├─ word_counts:all
//!                                                    └─ last_repo
//! ```
//!
//! Two backends are provided: [`RedisBackend`] (hashes + pub/sub) and
//! [`MemoryBackend`] (in-process, used by tests and single-process runs).

mod backend;
mod error;
mod memory;
mod redis_backend;

pub use backend::{
    top_words, CounterStore, Subscription, TokenCounts, TokenPublisher, TokenSubscriber,
};
pub use error::{Result, StoreError};
pub use memory::MemoryBackend;
pub use redis_backend::{RedisBackend, RedisConfig};
