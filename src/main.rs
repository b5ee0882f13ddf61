use std::sync::Arc;

use child_discovery::utils::file_io;
use child_discovery::ChildDiscoveryService;
use child_discovery::DiscoveryConfig;
use child_discovery::DiscoveryEvent;
use child_discovery::InMemoryResultStore;
use child_discovery::InMemoryThingRegistry;
use child_discovery::LoggingConfig;
use child_discovery::Result;
use child_discovery::ServiceDependencies;
use child_discovery::SystemError;
use child_discovery::ThreadSafeCaller;
use tokio::signal::unix::signal;
use tokio::signal::unix::SignalKind;
use tokio::sync::broadcast::error::RecvError;
use tokio::sync::watch;
use tracing::error;
use tracing::info;
use tracing::warn;
use tracing_appender::non_blocking::WorkerGuard;
use tracing_subscriber::layer::SubscriberExt;
use tracing_subscriber::util::SubscriberInitExt;
use tracing_subscriber::EnvFilter;
use tracing_subscriber::Layer;

#[tokio::main(flavor = "multi_thread", worker_threads = 2)]
async fn main() -> Result<()> {
    let settings = DiscoveryConfig::new()?.validate()?;

    // Initializing Logs
    let _guard = init_observability(&settings.logging)?;

    // Initializing Shutdown Signal
    let (graceful_tx, mut graceful_rx) = watch::channel(());

    let registry = Arc::new(InMemoryThingRegistry::new());
    let store = Arc::new(InMemoryResultStore::new());
    let service = ChildDiscoveryService::new(settings.child.clone(), store.clone())?;

    let mut events = store.subscribe();
    tokio::spawn(async move {
        loop {
            match events.recv().await {
                Ok(DiscoveryEvent::Discovered(result)) => {
                    info!(uid = %result.thing_uid(), label = result.label(), "thing discovered");
                }
                Ok(DiscoveryEvent::Removed(uid)) => {
                    info!(%uid, "thing removed");
                }
                Err(RecvError::Lagged(skipped)) => {
                    warn!("discovery event consumer lagged, skipped {} events", skipped);
                }
                Err(RecvError::Closed) => break,
            }
        }
    });

    let handle = service
        .start(ServiceDependencies::new(registry, Arc::new(ThreadSafeCaller::new())))
        .await?;

    info!("Application started. Waiting for CTRL+C signal...");
    // Listen on Shutdown Signal
    tokio::spawn(async {
        if let Err(e) = graceful_shutdown(graceful_tx).await {
            error!("Failed to shutdown: {:?}", e);
        }
    });

    if graceful_rx.changed().await.is_err() {
        warn!("shutdown signal sender dropped");
    }

    handle.stop();
    info!("Exiting program.");
    Ok(())
}

async fn graceful_shutdown(graceful_tx: watch::Sender<()>) -> Result<()> {
    let mut sigint = signal(SignalKind::interrupt()).map_err(SystemError::Io)?;
    let mut sigterm = signal(SignalKind::terminate()).map_err(SystemError::Io)?;
    tokio::select! {
        _ = sigint.recv() => {
            info!("SIGINT detected.");
        },
        _ = sigterm.recv() => {
            info!("SIGTERM detected.");
        },
        _ = tokio::signal::ctrl_c() => {
            info!("Ctrl+C detected.");
        },
    }

    graceful_tx.send(()).map_err(|e| {
        error!("Failed to send shutdown signal: {}", e);
        SystemError::SignalSenderClosed(format!("Failed to send shutdown signal: {}", e))
    })?;

    info!("Shutdown completed");
    Ok(())
}

pub fn init_observability(logging: &LoggingConfig) -> Result<WorkerGuard> {
    let log_file = file_io::open_file_for_append(&logging.log_file())?;

    let (non_blocking, guard) = tracing_appender::non_blocking(log_file);
    let base_subscriber = tracing_subscriber::fmt::layer()
        .with_writer(non_blocking)
        .with_filter(EnvFilter::from_default_env());
    tracing_subscriber::registry().with(base_subscriber).init();

    Ok(guard)
}
