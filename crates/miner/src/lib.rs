//! # Word Miner Miner
//!
//! The producing half: finds popular repositories, walks their trees for source
//! files, extracts words and publishes one token event per word.
//!
//! ```text
//! Scheduler (cycle per language list)
//!     │
//!     ├──> RepositorySource::search_repositories
//!     │
//!     └──> RepositoryProcessor (one Deadline per repository)
//!           ├─> FileDiscoverer (depth-first listing walk)
//!           ├─> RepositorySource::read_file
//!           ├─> NameExtractor + split_identifier
//!           └─> TokenPublisher ("repository|language|word")
//! ```
//!
//! [`GithubClient`] talks to the real hosting API; [`MemorySource`] serves
//! repositories from memory for offline runs and tests.

mod config;
mod deadline;
mod discovery;
mod error;
mod github;
mod memory_source;
mod processor;
mod scheduler;
mod source;

pub use config::{parse_languages, MinerConfig};
pub use deadline::Deadline;
pub use discovery::FileDiscoverer;
pub use error::{MinerError, Result};
pub use github::{GithubClient, GithubConfig};
pub use memory_source::MemorySource;
pub use processor::{ProcessOutcome, RepositoryProcessor};
pub use scheduler::{CycleReport, LanguageReport, Scheduler};
pub use source::{
    Entry, EntryKind, FileContent, FileRef, RateLimitStatus, RepositoryRef, RepositorySource,
};
