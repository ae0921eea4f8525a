use crate::settings::ServeArgs;
use anyhow::{Context as AnyhowContext, Result};
use std::sync::Arc;
use wordminer_aggregator::{router, Aggregator, BroadcastHub, DashboardState};
use wordminer_store::RedisBackend;

pub async fn run(args: ServeArgs) -> Result<()> {
    let redis = args.redis.config();
    let backend = Arc::new(
        RedisBackend::connect(&redis)
            .await
            .context("Aggregator cannot start without the counter store")?,
    );

    let hub = BroadcastHub::default();
    let aggregator = Aggregator::new(backend.clone(), backend.clone(), hub.clone());
    let counting = tokio::spawn(async move { aggregator.run().await });

    let app = router(DashboardState {
        store: backend,
        hub,
    });
    let listener = tokio::net::TcpListener::bind(&args.addr)
        .await
        .with_context(|| format!("Failed to bind dashboard on {}", args.addr))?;
    log::info!("Serving dashboard on http://{}", args.addr);

    axum::serve(listener, app)
        .with_graceful_shutdown(ctrl_c())
        .await
        .context("Dashboard server failed")?;

    counting.abort();
    log::info!("Dashboard stopped");
    Ok(())
}

async fn ctrl_c() {
    if let Err(err) = tokio::signal::ctrl_c().await {
        log::warn!("Ctrl-C handler unavailable: {err}");
        std::future::pending::<()>().await;
    }
}
