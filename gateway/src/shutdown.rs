//! Shutdown signalling for the daemon.
//!
//! A `watch` channel rather than a broadcast: anything that starts waiting
//! after the signal has fired still sees it.

use tokio::signal;
use tokio::sync::watch;

pub struct ShutdownController {
    tx: watch::Sender<bool>,
}

impl ShutdownController {
    pub fn new() -> Self {
        let (tx, _) = watch::channel(false);
        Self { tx }
    }

    /// Resolves once shutdown has been triggered.
    pub fn signalled(&self) -> impl std::future::Future<Output = ()> + Send + 'static {
        let mut rx = self.tx.subscribe();
        async move {
            // An error means the controller is gone, which is a shutdown too.
            let _ = rx.wait_for(|stopping| *stopping).await;
        }
    }

    pub fn is_shutting_down(&self) -> bool {
        *self.tx.borrow()
    }

    pub fn shutdown(&self) {
        self.tx.send_replace(true);
    }

    /// Wait for SIGTERM or SIGINT, then trigger shutdown.
    pub async fn wait_for_signal(&self) {
        let ctrl_c = signal::ctrl_c();

        #[cfg(unix)]
        let terminate = async {
            match signal::unix::signal(signal::unix::SignalKind::terminate()) {
                Ok(mut sigterm) => {
                    sigterm.recv().await;
                }
                Err(e) => {
                    tracing::warn!(error = %e, "failed to install SIGTERM handler");
                    std::future::pending::<()>().await;
                }
            }
        };

        #[cfg(not(unix))]
        let terminate = std::future::pending::<()>();

        tokio::select! {
            _ = ctrl_c => { tracing::info!("received SIGINT, shutting down"); }
            _ = terminate => { tracing::info!("received SIGTERM, shutting down"); }
        }

        self.shutdown();
    }
}

impl Default for ShutdownController {
    fn default() -> Self {
        Self::new()
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[tokio::test]
    async fn waiters_are_released_by_shutdown() {
        let controller = ShutdownController::new();
        let first = tokio::spawn(controller.signalled());
        let second = tokio::spawn(controller.signalled());
        assert!(!controller.is_shutting_down());
        controller.shutdown();
        first.await.unwrap();
        second.await.unwrap();
        assert!(controller.is_shutting_down());
    }

    #[tokio::test]
    async fn late_waiter_sees_earlier_shutdown() {
        let controller = ShutdownController::new();
        controller.shutdown();
        controller.signalled().await;
    }
}
