use tokio_util::sync::CancellationToken;
use tracing::info;

/// Flips the token once the process receives an interrupt, ending the
/// reminder loop cleanly.
pub async fn detect_shutdown(cancelation: CancellationToken) {
    if tokio::signal::ctrl_c().await.is_ok() {
        info!("Received an interrupt, shutting down");
    }
    cancelation.cancel();
}
