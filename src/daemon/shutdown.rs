use tokio::select;
use tokio_util::sync::CancellationToken;
use tracing::info;

/// Detects signals sent to the process and cancels `cancelation` on the first one. Returns early
/// if something else cancels the token.
///
/// On Windows detached processes can't detect signals sent to them, so there the tracker is only
/// stopped by killing it.
pub async fn detect_shutdown(cancelation: CancellationToken) {
    select! {
        _ = tokio::signal::ctrl_c() => {
            info!("Received interrupt, shutting down");
            cancelation.cancel();
        },
        _ = terminate() => {
            info!("Received termination request, shutting down");
            cancelation.cancel();
        },
        _ = cancelation.cancelled() => (),
    };
}

#[cfg(unix)]
async fn terminate() {
    use tokio::signal::unix::{signal, SignalKind};

    match signal(SignalKind::terminate()) {
        Ok(mut stream) => {
            stream.recv().await;
        }
        Err(e) => {
            tracing::warn!("Can't listen for SIGTERM {e:?}");
            std::future::pending::<()>().await
        }
    }
}

#[cfg(not(unix))]
async fn terminate() {
    std::future::pending::<()>().await
}

#[cfg(test)]
mod tests {
    use std::time::Duration;

    use tokio_util::sync::CancellationToken;

    use super::detect_shutdown;

    #[tokio::test(start_paused = true)]
    async fn test_returns_when_cancelled_elsewhere() {
        let token = CancellationToken::new();
        let (_, _) = tokio::join!(detect_shutdown(token.clone()), async {
            tokio::time::sleep(Duration::from_secs(1)).await;
            token.cancel();
        });
        assert!(token.is_cancelled());
    }
}
