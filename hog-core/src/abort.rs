//! Abort signal plumbing.
//!
//! SIGINT, SIGTERM and programmatic aborts all cancel the same
//! [`CancellationToken`]. The orchestrator checks it before injecting and
//! selects on it while supervising.

use tokio::task::JoinHandle;
use tokio_util::sync::CancellationToken;

/// One-shot broadcast abort signal for a run.
#[derive(Debug, Clone, Default)]
pub struct AbortWatcher {
    token: CancellationToken,
}

impl AbortWatcher {
    /// Create a watcher that has not fired.
    pub fn new() -> Self {
        Self::default()
    }

    /// Token to hand to the orchestrator.
    pub fn token(&self) -> CancellationToken {
        self.token.clone()
    }

    /// Abort the run programmatically.
    pub fn trigger(&self) {
        self.token.cancel();
    }

    /// Returns true once an abort has been observed.
    pub fn is_aborted(&self) -> bool {
        self.token.is_cancelled()
    }

    /// Relay SIGINT and SIGTERM into the token.
    ///
    /// The listener exits after the first signal or when the token is
    /// cancelled by other means.
    pub fn listen_for_signals(&self) -> JoinHandle<()> {
        let token = self.token.clone();
        tokio::spawn(async move {
            tokio::select! {
                result = wait_for_termination() => match result {
                    Ok(()) => {
                        tracing::warn!("termination signal received, aborting experiment");
                        token.cancel();
                    }
                    Err(e) => {
                        tracing::error!("failed to install signal handlers: {}", e);
                    }
                },
                _ = token.cancelled() => {}
            }
        })
    }
}

#[cfg(unix)]
async fn wait_for_termination() -> std::io::Result<()> {
    use tokio::signal::unix::{signal, SignalKind};

    let mut terminate = signal(SignalKind::terminate())?;
    tokio::select! {
        result = tokio::signal::ctrl_c() => result,
        _ = terminate.recv() => Ok(()),
    }
}

#[cfg(not(unix))]
async fn wait_for_termination() -> std::io::Result<()> {
    tokio::signal::ctrl_c().await
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::time::Duration;

    #[test]
    fn trigger_is_observed_by_clones() {
        let watcher = AbortWatcher::new();
        let token = watcher.token();
        let other = watcher.clone();
        assert!(!token.is_cancelled());
        other.trigger();
        assert!(watcher.is_aborted());
        assert!(token.is_cancelled());
    }

    #[tokio::test]
    async fn cancelled_future_resolves_after_trigger() {
        let watcher = AbortWatcher::new();
        let token = watcher.token();
        let waiter = tokio::spawn(async move { token.cancelled().await });
        watcher.trigger();
        tokio::time::timeout(Duration::from_secs(1), waiter)
            .await
            .expect("waiter should wake")
            .unwrap();
    }

    #[tokio::test]
    async fn signal_listener_stops_when_token_cancelled() {
        let watcher = AbortWatcher::new();
        let handle = watcher.listen_for_signals();
        watcher.trigger();
        tokio::time::timeout(Duration::from_secs(1), handle)
            .await
            .expect("listener should exit")
            .expect("listener should not panic");
    }
}
