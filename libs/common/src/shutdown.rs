//! Graceful shutdown utilities
//!
//! A sync run stops between units, never inside a transaction. The CLI turns
//! Ctrl+C / SIGTERM into a cancelled [`CancellationToken`] and the engine checks
//! it before starting each unit.

use tokio_util::sync::CancellationToken;
use tracing::warn;

/// Wait for shutdown signal (Ctrl+C or SIGTERM on Unix)
pub async fn wait_for_shutdown() {
    #[cfg(unix)]
    {
        use tokio::signal::unix::{signal, SignalKind};

        let term_signal = match signal(SignalKind::terminate()) {
            Ok(sig) => Some(sig),
            Err(e) => {
                warn!(
                    "Failed to install SIGTERM handler: {}. Only Ctrl+C will stop the run",
                    e
                );
                None
            },
        };

        tokio::select! {
            _ = tokio::signal::ctrl_c() => {},
            _ = async {
                if let Some(mut sig) = term_signal {
                    sig.recv().await;
                } else {
                    std::future::pending::<()>().await
                }
            } => {},
        }
    }
    #[cfg(not(unix))]
    {
        let _ = tokio::signal::ctrl_c().await;
    }
}

/// Cancel `token` on the first shutdown signal
///
/// The watcher task exits on its own once the token is cancelled elsewhere.
pub fn cancel_on_shutdown(token: CancellationToken) -> tokio::task::JoinHandle<()> {
    tokio::spawn(async move {
        tokio::select! {
            _ = wait_for_shutdown() => {
                warn!("Shutdown requested, finishing in-flight units");
                token.cancel();
            },
            _ = token.cancelled() => {},
        }
    })
}
