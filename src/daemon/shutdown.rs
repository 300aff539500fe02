use tokio::select;
use tokio_util::sync::CancellationToken;

/// Resolves once the OS asks the process to stop, cancelling the token so every module winds
/// down. Listens for ctrl-c everywhere and additionally SIGTERM on unix, which is what `down`
/// and service managers send.
///
/// On Windows detached processes can't detect signals sent to them, so `down` falls back to
/// killing the process outright.
pub async fn detect_shutdown(cancellation: CancellationToken) {
    select! {
        _ = tokio::signal::ctrl_c() => {
            cancellation.cancel();
        },
        _ = terminate() => {
            cancellation.cancel();
        },
    };
}

#[cfg(unix)]
async fn terminate() {
    use tokio::signal::unix::{signal, SignalKind};

    match signal(SignalKind::terminate()) {
        Ok(mut terminate) => {
            terminate.recv().await;
        }
        Err(_) => std::future::pending().await,
    }
}

#[cfg(not(unix))]
async fn terminate() {
    std::future::pending::<()>().await
}
