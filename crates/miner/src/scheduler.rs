use crate::config::MinerConfig;
use crate::processor::{ProcessOutcome, RepositoryProcessor};
use crate::source::{RepositoryRef, RepositorySource};
use std::sync::Arc;
use std::time::{Duration, Instant};
use tokio::sync::watch;
use wordminer_protocol::Language;
use wordminer_store::{CounterStore, TokenPublisher};

/// Per-language totals of one cycle.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct LanguageReport {
    pub language: Language,
    pub repositories: usize,
    pub timed_out: usize,
    pub failed: usize,
    pub tokens: usize,
}

impl LanguageReport {
    fn new(language: Language) -> Self {
        Self {
            language,
            repositories: 0,
            timed_out: 0,
            failed: 0,
            tokens: 0,
        }
    }

    fn record(&mut self, outcome: ProcessOutcome) {
        self.repositories += 1;
        self.tokens += outcome.tokens();
        match outcome {
            ProcessOutcome::TimedOut => self.timed_out += 1,
            ProcessOutcome::Failed => self.failed += 1,
            ProcessOutcome::Completed { .. } => {}
        }
    }
}

#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct CycleReport {
    pub languages: Vec<LanguageReport>,
}

impl CycleReport {
    pub fn total_tokens(&self) -> usize {
        self.languages.iter().map(|l| l.tokens).sum()
    }

    pub fn repositories(&self) -> usize {
        self.languages.iter().map(|l| l.repositories).sum()
    }
}

/// Drives mining cycles over every configured language, forever.
pub struct Scheduler {
    source: Arc<dyn RepositorySource>,
    processor: RepositoryProcessor,
    status: Option<Arc<dyn CounterStore>>,
    config: MinerConfig,
}

impl Scheduler {
    pub fn new(
        config: MinerConfig,
        source: Arc<dyn RepositorySource>,
        publisher: Option<Arc<dyn TokenPublisher>>,
        status: Option<Arc<dyn CounterStore>>,
    ) -> Self {
        let processor = RepositoryProcessor::new(
            Arc::clone(&source),
            publisher,
            config.repo_timeout,
            config.max_file_bytes,
        );
        Self {
            source,
            processor,
            status,
            config,
        }
    }

    pub fn config(&self) -> &MinerConfig {
        &self.config
    }

    /// One pass over all languages. Errors stay inside: a failed search skips
    /// its language, a failed repository counts as zero tokens.
    pub async fn run_cycle(&self) -> CycleReport {
        let mut report = CycleReport::default();

        for (index, &language) in self.config.languages.iter().enumerate() {
            if index > 0 {
                tokio::time::sleep(self.config.language_pause).await;
            }
            report.languages.push(self.mine_language(language).await);
        }

        report
    }

    async fn mine_language(&self, language: Language) -> LanguageReport {
        let mut summary = LanguageReport::new(language);
        log::info!(
            "Fetching top {} {language} repositories",
            self.config.repo_limit
        );

        let repositories = match self
            .source
            .search_repositories(language, self.config.repo_limit)
            .await
        {
            Ok(repositories) => repositories,
            Err(err) => {
                log::error!("Repository search failed for {language}: {err}");
                return summary;
            }
        };

        for (index, repository) in repositories
            .into_iter()
            .take(self.config.repo_limit)
            .enumerate()
        {
            if index > 0 {
                tokio::time::sleep(self.config.repo_pause).await;
            }
            self.mark_started(&repository).await;
            log::info!(
                "Mining repo={} stars={} language={language}",
                repository.full_name,
                repository.star_count
            );
            let outcome = self
                .processor
                .process(&repository, language, self.config.file_limit)
                .await;
            summary.record(outcome);
        }

        summary
    }

    async fn mark_started(&self, repository: &RepositoryRef) {
        let Some(status) = &self.status else {
            return;
        };
        if let Err(err) = status.set_last_repo(&repository.full_name).await {
            log::warn!("Could not record last repo {}: {err}", repository.full_name);
        }
    }

    async fn log_rate_limit(&self) {
        match self.source.rate_limit().await {
            Ok(rate) => log::info!(
                "Upstream quota remaining={} limit={}",
                rate.remaining,
                rate.limit
            ),
            Err(err) => log::debug!("Rate limit status unavailable: {err}"),
        }
    }

    /// Run cycles until `shutdown` flips to `true`.
    ///
    /// Shutdown is honoured between cycles, including during the pause. A cycle
    /// that crashes is logged and retried after the error backoff.
    pub async fn run_forever(self: Arc<Self>, mut shutdown: watch::Receiver<bool>) {
        let mut cycle = 0u64;
        loop {
            if *shutdown.borrow() {
                break;
            }
            cycle += 1;
            self.log_rate_limit().await;

            let started = Instant::now();
            let scheduler = Arc::clone(&self);
            let pause = match tokio::spawn(async move { scheduler.run_cycle().await }).await {
                Ok(report) => {
                    log::info!(
                        "Cycle {cycle} complete: repositories={} tokens={} elapsed_s={}",
                        report.repositories(),
                        report.total_tokens(),
                        started.elapsed().as_secs()
                    );
                    self.config.cycle_pause
                }
                Err(err) => {
                    log::error!(
                        "Cycle {cycle} crashed: {err}; retrying in {}s",
                        self.config.error_backoff.as_secs()
                    );
                    self.config.error_backoff
                }
            };

            if wait_or_shutdown(pause, &mut shutdown).await {
                break;
            }
        }
        log::info!("Mining loop stopped after {cycle} cycles");
    }
}

/// Sleep for `pause`; returns `true` if shutdown was requested meanwhile.
async fn wait_or_shutdown(pause: Duration, shutdown: &mut watch::Receiver<bool>) -> bool {
    let sleep = tokio::time::sleep(pause);
    tokio::pin!(sleep);
    loop {
        tokio::select! {
            _ = &mut sleep => return *shutdown.borrow(),
            changed = shutdown.changed() => {
                if changed.is_err() {
                    // Sender gone: nobody can ask us to stop any more.
                    sleep.as_mut().await;
                    return false;
                }
                if *shutdown.borrow() {
                    return true;
                }
            }
        }
    }
}
