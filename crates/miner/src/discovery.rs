use crate::deadline::Deadline;
use crate::error::Result;
use crate::source::{Entry, EntryKind, FileRef, RepositorySource};
use std::sync::Arc;
use wordminer_protocol::Language;

/// Walks a repository through the listing API looking for source files.
#[derive(Clone)]
pub struct FileDiscoverer {
    source: Arc<dyn RepositorySource>,
}

impl FileDiscoverer {
    pub fn new(source: Arc<dyn RepositorySource>) -> Self {
        Self { source }
    }

    /// Depth-first search for files of `language`, stopping at `max_files`.
    ///
    /// Entries are visited in listing order, descending into each directory as it
    /// is met, using an explicit stack instead of recursion. A path whose listing
    /// fails is logged and treated as empty. Only the deadline aborts the walk.
    pub async fn discover(
        &self,
        repository: &str,
        language: Language,
        max_files: usize,
        deadline: &Deadline,
    ) -> Result<Vec<FileRef>> {
        let mut found = Vec::new();
        if max_files == 0 {
            return Ok(found);
        }

        let mut pending: Vec<Entry> = Vec::new();
        self.push_children(repository, "", deadline, &mut pending)
            .await?;

        while let Some(entry) = pending.pop() {
            match entry.kind {
                EntryKind::Dir => {
                    self.push_children(repository, &entry.path, deadline, &mut pending)
                        .await?;
                }
                EntryKind::File if language.matches_path(&entry.path) => {
                    found.push(FileRef {
                        path: entry.path,
                        size_bytes: entry.size_bytes,
                    });
                    if found.len() >= max_files {
                        break;
                    }
                }
                _ => {}
            }
        }

        log::debug!(
            "Discovered {} {} files in {repository}",
            found.len(),
            language
        );
        Ok(found)
    }

    async fn push_children(
        &self,
        repository: &str,
        path: &str,
        deadline: &Deadline,
        pending: &mut Vec<Entry>,
    ) -> Result<()> {
        match deadline
            .race(self.source.list_children(repository, path))
            .await?
        {
            Ok(children) => pending.extend(children.into_iter().rev()),
            Err(err) => {
                log::warn!("Skipping path repo={repository} path={path:?}: {err}");
            }
        }
        Ok(())
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::memory_source::MemorySource;
    use crate::MinerError;
    use pretty_assertions::assert_eq;
    use std::time::Duration;

    const REPO: &str = "pallets/flask";

    fn source() -> MemorySource {
        MemorySource::new()
            .with_file(REPO, "README.md", "# flask")
            .with_file(REPO, "docs/conf.py", "def setup(app): pass")
            .with_file(REPO, "src/flask/app.py", "def run(): pass")
            .with_file(REPO, "src/flask/json/provider.py", "def dumps(): pass")
            .with_file(REPO, "src/Main.java", "class Main {}")
            .with_file(REPO, "tests/test_app.py", "def test_run(): pass")
            .with_file(REPO, "setup.py", "def main(): pass")
    }

    async fn discover(source: MemorySource, language: Language, max: usize) -> Vec<String> {
        let discoverer = FileDiscoverer::new(Arc::new(source));
        let deadline = Deadline::after(Duration::from_secs(60));
        discoverer
            .discover(REPO, language, max, &deadline)
            .await
            .unwrap()
            .into_iter()
            .map(|f| f.path)
            .collect()
    }

    #[tokio::test]
    async fn walks_depth_first_in_listing_order() {
        let found = discover(source(), Language::Python, 100).await;
        assert_eq!(
            found,
            vec![
                "docs/conf.py",
                "setup.py",
                "src/flask/app.py",
                "src/flask/json/provider.py",
                "tests/test_app.py",
            ]
        );
    }

    #[tokio::test]
    async fn filters_by_language() {
        let found = discover(source(), Language::Java, 100).await;
        assert_eq!(found, vec!["src/Main.java"]);
    }

    #[tokio::test]
    async fn stops_at_max_files() {
        for max in 0..7 {
            let found = discover(source(), Language::Python, max).await;
            assert_eq!(found.len(), max.min(5), "max_files={max}");
        }
    }

    #[tokio::test]
    async fn zero_max_files_makes_no_calls() {
        let source = Arc::new(source());
        let discoverer = FileDiscoverer::new(source.clone());
        let deadline = Deadline::after(Duration::from_secs(60));
        let found = discoverer
            .discover(REPO, Language::Python, 0, &deadline)
            .await
            .unwrap();
        assert!(found.is_empty());
        assert_eq!(source.listing_calls(), 0);
    }

    #[tokio::test]
    async fn failed_listing_skips_only_that_path() {
        let found = discover(
            source().with_failing_listing(REPO, "src/flask"),
            Language::Python,
            100,
        )
        .await;
        assert_eq!(
            found,
            vec!["docs/conf.py", "setup.py", "tests/test_app.py"]
        );
    }

    #[tokio::test]
    async fn failed_root_listing_finds_nothing() {
        let found = discover(source().with_failing_listing(REPO, ""), Language::Python, 10).await;
        assert!(found.is_empty());
    }

    #[tokio::test(start_paused = true)]
    async fn deadline_aborts_the_walk() {
        let source = source().with_latency(Duration::from_secs(10));
        let discoverer = FileDiscoverer::new(Arc::new(source));
        let deadline = Deadline::after(Duration::from_secs(25));
        let result = discoverer
            .discover(REPO, Language::Python, 100, &deadline)
            .await;
        assert!(matches!(result, Err(MinerError::DeadlineExceeded)));
    }
}
