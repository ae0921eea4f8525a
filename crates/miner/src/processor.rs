use crate::deadline::Deadline;
use crate::discovery::FileDiscoverer;
use crate::error::{MinerError, Result};
use crate::source::{RepositoryRef, RepositorySource};
use std::sync::Arc;
use std::time::{Duration, Instant};
use wordminer_extract::{extractor_for, words_from_source, NameExtractor};
use wordminer_protocol::{Language, TokenEvent};
use wordminer_store::TokenPublisher;

/// Result of mining one repository.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum ProcessOutcome {
    Completed { tokens: usize, files: usize },
    /// The deadline fired; tokens published before it stay published
    TimedOut,
    Failed,
}

impl ProcessOutcome {
    pub fn tokens(&self) -> usize {
        match self {
            ProcessOutcome::Completed { tokens, .. } => *tokens,
            ProcessOutcome::TimedOut | ProcessOutcome::Failed => 0,
        }
    }
}

#[derive(Debug, Default)]
struct RepoStats {
    tokens: usize,
    files: usize,
    skipped: usize,
}

/// Discovery, extraction and emission for a single repository under a deadline.
#[derive(Clone)]
pub struct RepositoryProcessor {
    source: Arc<dyn RepositorySource>,
    discoverer: FileDiscoverer,
    publisher: Option<Arc<dyn TokenPublisher>>,
    timeout: Duration,
    max_file_bytes: u64,
}

impl RepositoryProcessor {
    /// Without a publisher tokens are still counted but go nowhere.
    pub fn new(
        source: Arc<dyn RepositorySource>,
        publisher: Option<Arc<dyn TokenPublisher>>,
        timeout: Duration,
        max_file_bytes: u64,
    ) -> Self {
        Self {
            discoverer: FileDiscoverer::new(Arc::clone(&source)),
            source,
            publisher,
            timeout,
            max_file_bytes,
        }
    }

    /// Mine up to `file_limit` files of `repository`.
    ///
    /// Never fails: a timeout or any error inside is logged and reported as an
    /// outcome worth zero tokens.
    pub async fn process(
        &self,
        repository: &RepositoryRef,
        language: Language,
        file_limit: usize,
    ) -> ProcessOutcome {
        let started = Instant::now();
        let deadline = Deadline::after(self.timeout);
        let name = repository.full_name.clone();

        let worker = self.clone();
        let task_name = name.clone();
        let mut handle = tokio::spawn(async move {
            worker
                .process_files(&task_name, language, file_limit, &deadline)
                .await
        });

        let joined = match tokio::time::timeout_at(deadline.at(), &mut handle).await {
            Ok(joined) => joined,
            Err(_) => {
                handle.abort();
                log::warn!(
                    "Timeout repo={name} language={language} after {}s; moving on",
                    self.timeout.as_secs()
                );
                return ProcessOutcome::TimedOut;
            }
        };

        match joined {
            Ok(Ok(stats)) => {
                log::info!(
                    "Processed repo={name} language={language} files={} skipped={} tokens={} elapsed_ms={}",
                    stats.files,
                    stats.skipped,
                    stats.tokens,
                    started.elapsed().as_millis()
                );
                ProcessOutcome::Completed {
                    tokens: stats.tokens,
                    files: stats.files,
                }
            }
            Ok(Err(MinerError::DeadlineExceeded)) => {
                log::warn!(
                    "Timeout repo={name} language={language} after {}s; moving on",
                    self.timeout.as_secs()
                );
                ProcessOutcome::TimedOut
            }
            Ok(Err(err)) => {
                log::error!("Failed repo={name} language={language}: {err}");
                ProcessOutcome::Failed
            }
            Err(err) => {
                log::error!("Processing task for repo={name} crashed: {err}");
                ProcessOutcome::Failed
            }
        }
    }

    async fn process_files(
        &self,
        repository: &str,
        language: Language,
        file_limit: usize,
        deadline: &Deadline,
    ) -> Result<RepoStats> {
        let extractor = extractor_for(language);
        // Over-fetch so a few rejected candidates do not starve the listing.
        let candidates = self
            .discoverer
            .discover(repository, language, file_limit.saturating_mul(2), deadline)
            .await?;

        let mut stats = RepoStats::default();
        for file in candidates.into_iter().take(file_limit) {
            if file.size_bytes > self.max_file_bytes {
                log::debug!(
                    "Skipping large file {repository}/{} ({} bytes > {})",
                    file.path,
                    file.size_bytes,
                    self.max_file_bytes
                );
                stats.skipped += 1;
                continue;
            }

            let content = match deadline
                .race(self.source.read_file(repository, &file.path))
                .await?
            {
                Ok(content) => content,
                Err(err) => {
                    log::warn!("Skipping file {repository}/{}: {err}", file.path);
                    stats.skipped += 1;
                    continue;
                }
            };
            if content.size > self.max_file_bytes {
                log::debug!(
                    "Skipping large file {repository}/{} ({} bytes)",
                    file.path,
                    content.size
                );
                stats.skipped += 1;
                continue;
            }

            let text = String::from_utf8_lossy(&content.bytes);
            stats.tokens += self
                .emit_words(repository, extractor.as_ref(), &text, deadline)
                .await?;
            stats.files += 1;
        }

        Ok(stats)
    }

    /// Publish one event per word; returns how many were emitted.
    ///
    /// Stops with `DeadlineExceeded` as soon as the budget is spent, even when
    /// the publisher never yields.
    async fn emit_words(
        &self,
        repository: &str,
        extractor: &dyn NameExtractor,
        text: &str,
        deadline: &Deadline,
    ) -> Result<usize> {
        let language = extractor.language();
        let mut emitted = 0;
        for word in words_from_source(extractor, text) {
            if deadline.is_expired() {
                return Err(MinerError::DeadlineExceeded);
            }
            let event = TokenEvent::new(repository, language, word);
            match &self.publisher {
                Some(publisher) => match publisher.publish(&event.encode()).await {
                    Ok(()) => emitted += 1,
                    Err(err) => {
                        log::warn!("Dropped token {:?} from {repository}: {err}", event.word);
                    }
                },
                None => emitted += 1,
            }
        }
        Ok(emitted)
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::memory_source::MemorySource;
    use crate::source::{Entry, EntryKind, FileContent, RateLimitStatus};
    use async_trait::async_trait;
    use pretty_assertions::assert_eq;
    use std::sync::Mutex;

    /// Lists one Python file whose read panics.
    struct PanickingReads;

    #[async_trait]
    impl RepositorySource for PanickingReads {
        async fn search_repositories(
            &self,
            _language: Language,
            _limit: usize,
        ) -> Result<Vec<RepositoryRef>> {
            Ok(Vec::new())
        }

        async fn list_children(&self, _repository: &str, _path: &str) -> Result<Vec<Entry>> {
            Ok(vec![Entry {
                name: "boom.py".to_string(),
                path: "boom.py".to_string(),
                kind: EntryKind::File,
                size_bytes: 10,
            }])
        }

        async fn read_file(&self, _repository: &str, path: &str) -> Result<FileContent> {
            panic!("corrupt payload for {path}");
        }

        async fn rate_limit(&self) -> Result<RateLimitStatus> {
            Err(MinerError::other("not tracked"))
        }
    }

    #[derive(Default)]
    struct RecordingPublisher {
        payloads: Mutex<Vec<String>>,
    }

    #[async_trait]
    impl TokenPublisher for RecordingPublisher {
        async fn publish(&self, payload: &str) -> wordminer_store::Result<()> {
            self.payloads.lock().unwrap().push(payload.to_string());
            Ok(())
        }
    }

    const REPO: &str = "psf/requests";

    fn processor(source: MemorySource, max_file_bytes: u64) -> RepositoryProcessor {
        RepositoryProcessor::new(
            Arc::new(source),
            None,
            Duration::from_secs(120),
            max_file_bytes,
        )
    }

    #[tokio::test]
    async fn counts_tokens_without_publisher() {
        let source = MemorySource::new().with_file(REPO, "code.py", "def make_response(): pass");
        let outcome = processor(source, 1024)
            .process(&RepositoryRef::new(REPO, 1), Language::Python, 1)
            .await;
        assert_eq!(outcome, ProcessOutcome::Completed { tokens: 2, files: 1 });
    }

    #[tokio::test]
    async fn oversized_and_unreadable_files_are_skipped() {
        let big = format!("def {}(): pass\n", "x".repeat(64));
        let source = MemorySource::new()
            .with_file(REPO, "a_big.py", big)
            .with_file(REPO, "b_broken.py", "def lost_words(): pass")
            .with_file(REPO, "c_ok.py", "def keep_going(): pass")
            .with_failing_read(REPO, "b_broken.py");
        let outcome = processor(source, 40)
            .process(&RepositoryRef::new(REPO, 1), Language::Python, 3)
            .await;
        assert_eq!(outcome, ProcessOutcome::Completed { tokens: 2, files: 1 });
    }

    #[tokio::test]
    async fn invalid_utf8_is_decoded_lossily() {
        let mut bytes = b"def read_bytes():\n    return b'".to_vec();
        bytes.extend_from_slice(&[0xff, 0xfe]);
        bytes.extend_from_slice(b"'\n");
        let source = MemorySource::new().with_file(REPO, "bin.py", bytes);
        let outcome = processor(source, 1024)
            .process(&RepositoryRef::new(REPO, 1), Language::Python, 1)
            .await;
        assert_eq!(outcome.tokens(), 2);
    }

    #[tokio::test]
    async fn only_file_limit_files_are_read() {
        let mut source = MemorySource::new();
        for i in 0..6 {
            source = source.with_file(REPO, &format!("m{i}.py"), "def run_task(): pass");
        }
        let source = Arc::new(source);
        let processor = RepositoryProcessor::new(
            source.clone(),
            None,
            Duration::from_secs(120),
            1024,
        );
        let outcome = processor
            .process(&RepositoryRef::new(REPO, 1), Language::Python, 2)
            .await;
        assert_eq!(outcome, ProcessOutcome::Completed { tokens: 4, files: 2 });
        assert_eq!(source.read_calls(), 2);
    }

    #[tokio::test]
    async fn panicking_read_fails_only_that_repository() {
        let processor = RepositoryProcessor::new(
            Arc::new(PanickingReads),
            None,
            Duration::from_secs(120),
            1024,
        );
        let outcome = processor
            .process(&RepositoryRef::new(REPO, 1), Language::Python, 5)
            .await;
        assert_eq!(outcome, ProcessOutcome::Failed);
        assert_eq!(outcome.tokens(), 0);
    }

    #[tokio::test(start_paused = true)]
    async fn spent_deadline_publishes_nothing() {
        let publisher = Arc::new(RecordingPublisher::default());
        let processor = RepositoryProcessor::new(
            Arc::new(MemorySource::new()),
            Some(publisher.clone() as Arc<dyn TokenPublisher>),
            Duration::from_secs(120),
            1024,
        );
        let extractor = extractor_for(Language::Python);
        let live = Deadline::after(Duration::from_secs(1));
        let emitted = processor
            .emit_words(REPO, extractor.as_ref(), "def make_response(): pass", &live)
            .await
            .unwrap();
        assert_eq!(emitted, 2);

        tokio::time::advance(Duration::from_secs(2)).await;
        let result = processor
            .emit_words(REPO, extractor.as_ref(), "def never_sent(): pass", &live)
            .await;
        assert!(matches!(result, Err(MinerError::DeadlineExceeded)));
        assert_eq!(publisher.payloads.lock().unwrap().len(), 2);
    }

    #[tokio::test]
    async fn missing_repository_completes_empty() {
        let outcome = processor(MemorySource::new(), 1024)
            .process(&RepositoryRef::new("ghost/repo", 0), Language::Java, 5)
            .await;
        assert_eq!(outcome, ProcessOutcome::Completed { tokens: 0, files: 0 });
    }
}
