//! # Word Miner Protocol
//!
//! Types shared by the mining side and the aggregating side. The two halves never
//! call each other; they only agree on what travels over the transport channel and
//! which keys live in the counter store.
//!
//! ```text
//! miner ──TokenEvent──> "repository|language|word" ──> aggregator
//!                                                        ├─> word_counts:<language>
//!                                                        ├─> word_counts:all
//!                                                        └─> last_repo
//! ```

use serde::{Deserialize, Serialize};

mod language;
mod wire;

pub use language::{Language, UnknownLanguage};
pub use wire::{TokenEvent, WireToken, UNKNOWN_LANGUAGE, UNKNOWN_REPOSITORY, WIRE_DELIMITER};

/// Pub/sub channel carrying encoded token events.
pub const WORD_STREAM_CHANNEL: &str = "word_stream";

/// Scalar key holding the most recently started repository.
pub const LAST_REPO_KEY: &str = "last_repo";

/// Partition name of the combined counter.
pub const ALL_LANGUAGES: &str = "all";

const WORD_COUNTS_PREFIX: &str = "word_counts:";

/// Counter hash key for a language partition (`word_counts:python`) or for the
/// combined partition (`word_counts:all`).
pub fn word_counts_key(partition: &str) -> String {
    format!("{WORD_COUNTS_PREFIX}{partition}")
}

/// Payload rebroadcast to live dashboard listeners for every counted token.
#[derive(Debug, Serialize, Deserialize, Clone, PartialEq, Eq)]
pub struct WordBroadcast {
    pub word: String,
    pub language: String,
    pub repository: String,
}

impl From<WireToken> for WordBroadcast {
    fn from(token: WireToken) -> Self {
        Self {
            word: token.word,
            language: token.language,
            repository: token.repository,
        }
    }
}

/// One entry of a ranked word listing.
#[derive(Debug, Serialize, Deserialize, Clone, PartialEq, Eq)]
pub struct WordCount {
    pub word: String,
    pub count: u64,
}
