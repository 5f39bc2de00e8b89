//! `hassnotify run`: the long-running notifier.

use tokio_util::sync::CancellationToken;
use tracing::{info, warn};

use hassnotify_api::HassClient;
use hassnotify_core::Notifier;

use crate::cli::GlobalOpts;
use crate::error::CliError;

pub async fn handle(global: &GlobalOpts) -> Result<(), CliError> {
    let loaded = super::load(global)?;

    info!(
        config = %loaded.path.display(),
        server = %loaded.options.url,
        "starting hassnotify"
    );
    if loaded.notifier.household.people.is_empty() {
        warn!("no people configured, no notifications will be sent");
    }

    let client = HassClient::connect(loaded.options);
    let notifier = Notifier::new(loaded.notifier);
    let shutdown = CancellationToken::new();

    let signals = {
        let shutdown = shutdown.clone();
        tokio::spawn(async move {
            wait_for_signal().await;
            info!("received shutdown signal");
            shutdown.cancel();
        })
    };

    notifier.run(&client, &shutdown).await;

    signals.abort();
    client.close().await;
    info!("hassnotify stopped");
    Ok(())
}

#[cfg(unix)]
async fn wait_for_signal() {
    use tokio::signal::unix::{SignalKind, signal};

    match signal(SignalKind::terminate()) {
        Ok(mut terminate) => {
            tokio::select! {
                _ = tokio::signal::ctrl_c() => {}
                _ = terminate.recv() => {}
            }
        }
        Err(e) => {
            warn!(error = %e, "cannot listen for SIGTERM");
            ctrl_c().await;
        }
    }
}

#[cfg(not(unix))]
async fn wait_for_signal() {
    ctrl_c().await;
}

async fn ctrl_c() {
    if let Err(e) = tokio::signal::ctrl_c().await {
        warn!(error = %e, "cannot listen for Ctrl-C");
        std::future::pending::<()>().await;
    }
}
