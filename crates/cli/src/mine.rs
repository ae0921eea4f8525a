use crate::settings::MineArgs;
use anyhow::{Context as AnyhowContext, Result};
use std::sync::Arc;
use tokio::sync::watch;
use wordminer_miner::{GithubClient, Scheduler};
use wordminer_store::{CounterStore, RedisBackend, TokenPublisher};

pub async fn run(args: MineArgs) -> Result<()> {
    let config = args.miner_config()?;
    let github = GithubClient::new(args.github_config()).context("Failed to build GitHub client")?;

    let redis = args.redis.config();
    let (publisher, status): (Option<Arc<dyn TokenPublisher>>, Option<Arc<dyn CounterStore>>) =
        match RedisBackend::connect(&redis).await {
            Ok(backend) => {
                let backend = Arc::new(backend);
                (
                    Some(backend.clone() as Arc<dyn TokenPublisher>),
                    Some(backend as Arc<dyn CounterStore>),
                )
            }
            Err(err) => {
                log::warn!("{err}; mining without publishing tokens");
                (None, None)
            }
        };

    log::info!(
        "Mining languages={} repo_limit={} file_limit={} timeout_s={}",
        config
            .languages
            .iter()
            .map(|l| l.as_str())
            .collect::<Vec<_>>()
            .join(","),
        config.repo_limit,
        config.file_limit,
        config.repo_timeout.as_secs()
    );

    let scheduler = Arc::new(Scheduler::new(config, Arc::new(github), publisher, status));
    let (shutdown_tx, shutdown_rx) = watch::channel(false);
    tokio::spawn(watch_ctrl_c(shutdown_tx));

    scheduler.run_forever(shutdown_rx).await;
    Ok(())
}

/// First Ctrl-C asks the loop to stop after the current cycle, the second exits.
async fn watch_ctrl_c(shutdown: watch::Sender<bool>) {
    if let Err(err) = tokio::signal::ctrl_c().await {
        log::warn!("Ctrl-C handler unavailable: {err}");
        return;
    }
    log::warn!("Stopping after the current cycle; press Ctrl-C again to exit now");
    let _ = shutdown.send(true);

    if tokio::signal::ctrl_c().await.is_ok() {
        log::warn!("Exiting immediately");
        std::process::exit(130);
    }
}
