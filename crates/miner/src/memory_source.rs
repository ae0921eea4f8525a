use crate::error::{MinerError, Result};
use crate::source::{Entry, EntryKind, FileContent, RateLimitStatus, RepositoryRef, RepositorySource};
use async_trait::async_trait;
use std::collections::{BTreeMap, HashMap, HashSet};
use std::sync::atomic::{AtomicUsize, Ordering};
use std::time::Duration;
use wordminer_protocol::Language;

const NOMINAL_QUOTA: u64 = 5_000;

/// In-memory repository host for offline runs and tests.
///
/// Directory listings are derived from the registered file paths, sorted by name.
/// Individual listings, reads and searches can be made to fail, and every call
/// can be given a latency to exercise deadlines.
#[derive(Default)]
pub struct MemorySource {
    repositories: HashMap<Language, Vec<RepositoryRef>>,
    files: HashMap<String, BTreeMap<String, Vec<u8>>>,
    failing_listings: HashSet<(String, String)>,
    failing_reads: HashSet<(String, String)>,
    failing_searches: HashSet<Language>,
    latency: Duration,
    listing_calls: AtomicUsize,
    read_calls: AtomicUsize,
    search_calls: AtomicUsize,
}

impl MemorySource {
    pub fn new() -> Self {
        Self::default()
    }

    /// Register a repository as the next search hit for `language`.
    pub fn with_repository(mut self, language: Language, repository: RepositoryRef) -> Self {
        self.files.entry(repository.full_name.clone()).or_default();
        self.repositories.entry(language).or_default().push(repository);
        self
    }

    pub fn with_file(
        mut self,
        repository: &str,
        path: &str,
        contents: impl Into<Vec<u8>>,
    ) -> Self {
        self.files
            .entry(repository.to_string())
            .or_default()
            .insert(path.trim_matches('/').to_string(), contents.into());
        self
    }

    pub fn with_failing_listing(mut self, repository: &str, path: &str) -> Self {
        self.failing_listings
            .insert((repository.to_string(), path.to_string()));
        self
    }

    pub fn with_failing_read(mut self, repository: &str, path: &str) -> Self {
        self.failing_reads
            .insert((repository.to_string(), path.to_string()));
        self
    }

    pub fn with_failing_search(mut self, language: Language) -> Self {
        self.failing_searches.insert(language);
        self
    }

    pub fn with_latency(mut self, latency: Duration) -> Self {
        self.latency = latency;
        self
    }

    pub fn listing_calls(&self) -> usize {
        self.listing_calls.load(Ordering::Relaxed)
    }

    pub fn read_calls(&self) -> usize {
        self.read_calls.load(Ordering::Relaxed)
    }

    pub fn search_calls(&self) -> usize {
        self.search_calls.load(Ordering::Relaxed)
    }

    async fn simulate_latency(&self) {
        if !self.latency.is_zero() {
            tokio::time::sleep(self.latency).await;
        }
    }

    fn not_found(repository: &str, path: &str) -> MinerError {
        MinerError::Upstream {
            status: 404,
            url: format!("memory://{repository}/{path}"),
        }
    }
}

#[async_trait]
impl RepositorySource for MemorySource {
    async fn search_repositories(
        &self,
        language: Language,
        limit: usize,
    ) -> Result<Vec<RepositoryRef>> {
        self.search_calls.fetch_add(1, Ordering::Relaxed);
        if self.failing_searches.contains(&language) {
            return Err(MinerError::Upstream {
                status: 503,
                url: format!("memory://search/{language}"),
            });
        }
        Ok(self
            .repositories
            .get(&language)
            .map(|repos| repos.iter().take(limit).cloned().collect())
            .unwrap_or_default())
    }

    async fn list_children(&self, repository: &str, path: &str) -> Result<Vec<Entry>> {
        self.listing_calls.fetch_add(1, Ordering::Relaxed);
        self.simulate_latency().await;

        if self
            .failing_listings
            .contains(&(repository.to_string(), path.to_string()))
        {
            return Err(MinerError::Upstream {
                status: 500,
                url: format!("memory://{repository}/{path}"),
            });
        }

        let files = self
            .files
            .get(repository)
            .ok_or_else(|| Self::not_found(repository, path))?;
        let prefix = if path.is_empty() {
            String::new()
        } else {
            format!("{}/", path.trim_matches('/'))
        };

        let mut children: BTreeMap<String, Entry> = BTreeMap::new();
        for (file_path, contents) in files.range(prefix.clone()..) {
            let Some(rest) = file_path.strip_prefix(&prefix) else {
                break;
            };
            let entry = match rest.split_once('/') {
                Some((dir, _)) => Entry {
                    name: dir.to_string(),
                    path: format!("{prefix}{dir}"),
                    kind: EntryKind::Dir,
                    size_bytes: 0,
                },
                None => Entry {
                    name: rest.to_string(),
                    path: file_path.clone(),
                    kind: EntryKind::File,
                    size_bytes: contents.len() as u64,
                },
            };
            children.entry(entry.name.clone()).or_insert(entry);
        }

        if children.is_empty() && !path.is_empty() {
            return Err(Self::not_found(repository, path));
        }
        Ok(children.into_values().collect())
    }

    async fn read_file(&self, repository: &str, path: &str) -> Result<FileContent> {
        self.read_calls.fetch_add(1, Ordering::Relaxed);
        self.simulate_latency().await;

        if self
            .failing_reads
            .contains(&(repository.to_string(), path.to_string()))
        {
            return Err(MinerError::Upstream {
                status: 500,
                url: format!("memory://{repository}/{path}"),
            });
        }

        let bytes = self
            .files
            .get(repository)
            .and_then(|files| files.get(path))
            .cloned()
            .ok_or_else(|| Self::not_found(repository, path))?;
        Ok(FileContent {
            size: bytes.len() as u64,
            bytes,
        })
    }

    async fn rate_limit(&self) -> Result<RateLimitStatus> {
        let used = (self.listing_calls() + self.read_calls() + self.search_calls()) as u64;
        Ok(RateLimitStatus {
            remaining: NOMINAL_QUOTA.saturating_sub(used),
            limit: NOMINAL_QUOTA,
        })
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use pretty_assertions::assert_eq;

    #[tokio::test]
    async fn listing_derives_directories_from_paths() {
        let source = MemorySource::new()
            .with_file("o/r", "setup.py", "x")
            .with_file("o/r", "pkg/core.py", "x")
            .with_file("o/r", "pkg/sub/deep.py", "x")
            .with_file("o/r", "pkg.txt", "x");

        let root = source.list_children("o/r", "").await.unwrap();
        let listed: Vec<_> = root.iter().map(|e| (e.path.as_str(), e.kind)).collect();
        assert_eq!(
            listed,
            vec![
                ("pkg", EntryKind::Dir),
                ("pkg.txt", EntryKind::File),
                ("setup.py", EntryKind::File),
            ]
        );

        let pkg = source.list_children("o/r", "pkg").await.unwrap();
        let listed: Vec<_> = pkg.iter().map(|e| e.path.as_str()).collect();
        assert_eq!(listed, vec!["pkg/core.py", "pkg/sub"]);
    }

    #[tokio::test]
    async fn unknown_paths_are_not_found() {
        let source = MemorySource::new().with_file("o/r", "a.py", "x");
        assert!(source.list_children("o/r", "missing").await.is_err());
        assert!(source.list_children("other/repo", "").await.is_err());
        assert!(source.read_file("o/r", "b.py").await.is_err());
    }
}
