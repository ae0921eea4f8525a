use crate::error::Result;
use async_trait::async_trait;
use serde::{Deserialize, Serialize};
use wordminer_protocol::Language;

/// A repository picked for one mining pass.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct RepositoryRef {
    pub full_name: String,
    pub star_count: u64,
}

impl RepositoryRef {
    pub fn new(full_name: impl Into<String>, star_count: u64) -> Self {
        Self {
            full_name: full_name.into(),
            star_count,
        }
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum EntryKind {
    File,
    Dir,
    /// Symlinks, submodules and anything else discovery does not follow
    Other,
}

/// One child of a repository directory listing.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Entry {
    pub name: String,
    pub path: String,
    pub kind: EntryKind,
    pub size_bytes: u64,
}

/// A source file candidate produced by discovery.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct FileRef {
    pub path: String,
    pub size_bytes: u64,
}

#[derive(Debug, Clone, PartialEq, Eq)]
pub struct FileContent {
    pub bytes: Vec<u8>,
    pub size: u64,
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Deserialize)]
pub struct RateLimitStatus {
    pub remaining: u64,
    pub limit: u64,
}

/// The rate-limited upstream hosting repositories.
///
/// Every call costs quota; callers pace themselves.
#[async_trait]
pub trait RepositorySource: Send + Sync {
    /// Most starred repositories of a language, best first.
    async fn search_repositories(
        &self,
        language: Language,
        limit: usize,
    ) -> Result<Vec<RepositoryRef>>;

    /// Direct children of `path` (`""` is the repository root).
    async fn list_children(&self, repository: &str, path: &str) -> Result<Vec<Entry>>;

    async fn read_file(&self, repository: &str, path: &str) -> Result<FileContent>;

    /// Diagnostic only.
    async fn rate_limit(&self) -> Result<RateLimitStatus>;
}
