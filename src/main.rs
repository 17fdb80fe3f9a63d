use std::path::Path;
use std::sync::Arc;

use anyhow::Context;
use tracing_appender::non_blocking::WorkerGuard;
use tracing_subscriber::prelude::*;
use tracing_subscriber::{EnvFilter, fmt};

use inbox_harvester::config::HarvesterConfig;
use inbox_harvester::extract::{DocumentExtractor, OfficeExtractor};
use inbox_harvester::mailbox::{GraphMailbox, Mailbox};
use inbox_harvester::worker::{Poller, spawn_harvester};

#[tokio::main]
async fn main() -> anyhow::Result<()> {
    // Seed the environment from .env if present
    dotenvy::dotenv().ok();

    let config = HarvesterConfig::from_env().unwrap_or_else(|e| {
        eprintln!("Error: {e}");
        eprintln!("  Required: HARVESTER_TENANT_ID, HARVESTER_CLIENT_ID,");
        eprintln!("            HARVESTER_CLIENT_SECRET, HARVESTER_MAILBOX");
        std::process::exit(1);
    });

    // Keep the guard alive so buffered file logs are flushed on exit
    let _log_guard = init_tracing(config.log_dir.as_deref());

    eprintln!("📬 Inbox Harvester v{}", env!("CARGO_PKG_VERSION"));
    eprintln!("   Mailbox: {} (folder: {})", config.graph.mailbox, config.graph.folder);
    eprintln!("   Downloads: {}", config.poller.download_dir.display());
    eprintln!(
        "   Keywords: {}",
        if config.poller.keywords.is_empty() {
            "none".to_string()
        } else {
            config.poller.keywords.join(", ")
        }
    );
    eprintln!(
        "   Poll interval: {}s, archive folder: {}\n",
        config.poller.poll_interval.as_secs(),
        config.poller.archive_folder
    );

    // ── Wiring ──────────────────────────────────────────────────────────
    let extractor: Arc<dyn DocumentExtractor> = Arc::new(OfficeExtractor::new());
    let mailbox: Arc<dyn Mailbox> = Arc::new(GraphMailbox::new(config.graph.clone(), extractor));
    let poller = Arc::new(Poller::new(mailbox, config.poller.clone()));

    let (handle, cancel) = spawn_harvester(poller);

    shutdown_signal().await;
    tracing::info!("Shutdown requested; finishing current cycle");
    cancel.cancel();

    handle.await.context("harvester task failed")?;
    Ok(())
}

/// Console logging, plus daily-rolling files when `log_dir` is set.
fn init_tracing(log_dir: Option<&Path>) -> Option<WorkerGuard> {
    let filter = EnvFilter::try_from_default_env().unwrap_or_else(|_| EnvFilter::new("info"));
    let console = fmt::layer().with_target(false);

    match log_dir {
        Some(dir) => {
            let appender = tracing_appender::rolling::daily(dir, "inbox-harvester.log");
            let (writer, guard) = tracing_appender::non_blocking(appender);
            tracing_subscriber::registry()
                .with(filter)
                .with(console)
                .with(
                    fmt::layer()
                        .with_target(false)
                        .with_ansi(false)
                        .with_writer(writer),
                )
                .init();
            Some(guard)
        }
        None => {
            tracing_subscriber::registry()
                .with(filter)
                .with(console)
                .init();
            None
        }
    }
}

/// Resolves on Ctrl-C, or SIGTERM on unix.
async fn shutdown_signal() {
    let ctrl_c = async {
        if let Err(e) = tokio::signal::ctrl_c().await {
            tracing::error!(error = %e, "Failed to listen for Ctrl-C");
            std::future::pending::<()>().await;
        }
    };

    #[cfg(unix)]
    let terminate = async {
        use tokio::signal::unix::{SignalKind, signal};
        match signal(SignalKind::terminate()) {
            Ok(mut sig) => {
                sig.recv().await;
            }
            Err(e) => {
                tracing::error!(error = %e, "Failed to listen for SIGTERM");
                std::future::pending::<()>().await;
            }
        }
    };

    #[cfg(not(unix))]
    let terminate = std::future::pending::<()>();

    tokio::select! {
        _ = ctrl_c => {}
        _ = terminate => {}
    }
}
