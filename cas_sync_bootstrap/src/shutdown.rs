// /////////////////////////////////////////////////////////////////////////////
// Cas Sync
// Copyright (c) 2025 Michael Gardner, A Bit of Help, Inc.
// SPDX-License-Identifier: BSD-3-Clause
// See LICENSE file in the project root.
// /////////////////////////////////////////////////////////////////////////////

//! # Shutdown Coordination
//!
//! A cancellation token plus grace period, wired to Ctrl-C / SIGTERM so an
//! in-flight push/pull/fetch batch gets a chance to finish its current
//! transfers rather than leaving a partially-written object in the cache.

use std::sync::atomic::{AtomicBool, Ordering};
use std::sync::Arc;
use std::time::Duration;
use tokio::sync::Notify;

pub const DEFAULT_GRACE_PERIOD_SECS: u64 = 5;

#[derive(Clone)]
pub struct CancellationToken {
    cancelled: Arc<AtomicBool>,
    notify: Arc<Notify>,
}

impl CancellationToken {
    fn new() -> Self {
        Self {
            cancelled: Arc::new(AtomicBool::new(false)),
            notify: Arc::new(Notify::new()),
        }
    }

    pub fn cancel(&self) {
        self.cancelled.store(true, Ordering::SeqCst);
        self.notify.notify_waiters();
    }

    pub fn is_cancelled(&self) -> bool {
        self.cancelled.load(Ordering::SeqCst)
    }

    pub async fn cancelled(&self) {
        if self.is_cancelled() {
            return;
        }
        self.notify.notified().await;
    }
}

/// Grace-period shutdown coordinator shared across the transfer engine's
/// worker tasks.
#[derive(Clone)]
pub struct ShutdownCoordinator {
    token: CancellationToken,
    grace_period: Duration,
    shutdown_initiated: Arc<AtomicBool>,
    shutdown_complete: Arc<Notify>,
}

impl ShutdownCoordinator {
    pub fn new(grace_period: Duration) -> Self {
        Self {
            token: CancellationToken::new(),
            grace_period,
            shutdown_initiated: Arc::new(AtomicBool::new(false)),
            shutdown_complete: Arc::new(Notify::new()),
        }
    }

    pub fn token(&self) -> CancellationToken {
        self.token.clone()
    }

    pub fn is_shutting_down(&self) -> bool {
        self.shutdown_initiated.load(Ordering::SeqCst)
    }

    pub fn initiate_shutdown(&self) {
        if self
            .shutdown_initiated
            .compare_exchange(false, true, Ordering::SeqCst, Ordering::SeqCst)
            .is_ok()
        {
            tracing::info!("initiating graceful shutdown (grace period: {:?})", self.grace_period);
            self.token.cancel();
        }
    }

    pub async fn wait_for_shutdown(&self) -> bool {
        if !self.is_shutting_down() {
            tracing::warn!("wait_for_shutdown called but shutdown not initiated");
            return true;
        }

        tokio::select! {
            _ = self.shutdown_complete.notified() => {
                tracing::info!("shutdown completed gracefully");
                true
            }
            _ = tokio::time::sleep(self.grace_period) => {
                tracing::warn!("shutdown grace period expired, forcing shutdown");
                false
            }
        }
    }

    pub fn complete_shutdown(&self) {
        self.shutdown_complete.notify_waiters();
    }

    pub async fn wait_with_timeout(&self, timeout: Duration) -> bool {
        if !self.is_shutting_down() {
            return true;
        }

        tokio::select! {
            _ = self.shutdown_complete.notified() => true,
            _ = tokio::time::sleep(timeout) => false,
        }
    }

    /// Listen for Ctrl-C (and, on Unix, SIGTERM) and initiate shutdown on
    /// the first of either. Spawned once from `main`, runs for the life of
    /// the process.
    pub fn spawn_signal_listener(&self) {
        let coordinator = self.clone();
        tokio::spawn(async move {
            #[cfg(unix)]
            {
                let mut sigterm = match tokio::signal::unix::signal(tokio::signal::unix::SignalKind::terminate()) {
                    Ok(sig) => sig,
                    Err(err) => {
                        tracing::warn!("failed to install SIGTERM handler: {err}");
                        tokio::select! {
                            _ = tokio::signal::ctrl_c() => {}
                        }
                        coordinator.initiate_shutdown();
                        return;
                    }
                };
                tokio::select! {
                    _ = tokio::signal::ctrl_c() => {}
                    _ = sigterm.recv() => {}
                }
            }
            #[cfg(not(unix))]
            {
                let _ = tokio::signal::ctrl_c().await;
            }
            coordinator.initiate_shutdown();
        });
    }
}

impl Default for ShutdownCoordinator {
    fn default() -> Self {
        Self::new(Duration::from_secs(DEFAULT_GRACE_PERIOD_SECS))
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn cancellation_token_starts_uncancelled() {
        let token = CancellationToken::new();
        assert!(!token.is_cancelled());
    }

    #[test]
    fn cancellation_token_cancel_is_visible() {
        let token = CancellationToken::new();
        token.cancel();
        assert!(token.is_cancelled());
    }

    #[test]
    fn cancellation_token_clone_shares_state() {
        let token1 = CancellationToken::new();
        let token2 = token1.clone();

        token1.cancel();
        assert!(token2.is_cancelled());
    }

    #[tokio::test]
    async fn cancelled_future_resolves_immediately_if_already_cancelled() {
        let token = CancellationToken::new();
        token.cancel();
        token.cancelled().await;
        assert!(token.is_cancelled());
    }

    #[tokio::test]
    async fn cancelled_future_resolves_on_later_cancel() {
        let token = CancellationToken::new();
        let token_clone = token.clone();

        tokio::spawn(async move {
            tokio::time::sleep(Duration::from_millis(50)).await;
            token_clone.cancel();
        });

        token.cancelled().await;
        assert!(token.is_cancelled());
    }

    #[test]
    fn coordinator_starts_not_shutting_down() {
        let coordinator = ShutdownCoordinator::new(Duration::from_secs(5));
        assert!(!coordinator.is_shutting_down());
    }

    #[test]
    fn coordinator_initiate_cancels_its_token() {
        let coordinator = ShutdownCoordinator::new(Duration::from_secs(5));
        coordinator.initiate_shutdown();
        assert!(coordinator.is_shutting_down());
        assert!(coordinator.token().is_cancelled());
    }

    #[tokio::test]
    async fn wait_for_shutdown_returns_true_on_complete() {
        let coordinator = ShutdownCoordinator::new(Duration::from_secs(5));
        coordinator.initiate_shutdown();

        let coordinator_clone = coordinator.clone();
        tokio::spawn(async move {
            tokio::time::sleep(Duration::from_millis(50)).await;
            coordinator_clone.complete_shutdown();
        });

        let result = tokio::time::timeout(Duration::from_millis(200), coordinator.wait_for_shutdown()).await;
        assert!(result.is_ok());
        assert!(result.unwrap());
    }

    #[tokio::test]
    async fn wait_for_shutdown_returns_false_on_timeout() {
        let coordinator = ShutdownCoordinator::new(Duration::from_millis(50));
        coordinator.initiate_shutdown();
        let result = coordinator.wait_for_shutdown().await;
        assert!(!result);
    }
}
