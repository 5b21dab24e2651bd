//! # Graceful Shutdown Module
//!
//! Signal handling for the relay server. On SIGINT or SIGTERM the server stops
//! accepting connections and waits for open relay streams to finish.

use std::sync::atomic::{AtomicBool, Ordering};
use std::sync::Arc;
use tokio_util::sync::CancellationToken;
use tracing::{error, info};

/// # Graceful Shutdown Manager
///
/// Cloneable trigger shared between the signal listener and the server.
#[derive(Clone, Default)]
pub struct GracefulShutdown {
    shutdown_initiated: Arc<AtomicBool>,
    token: CancellationToken,
}

impl GracefulShutdown {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn is_shutdown_initiated(&self) -> bool {
        self.shutdown_initiated.load(Ordering::Relaxed)
    }

    /// Initiate shutdown. Idempotent.
    pub fn initiate_shutdown(&self) {
        if !self.shutdown_initiated.swap(true, Ordering::Relaxed) {
            info!("🛑 Graceful shutdown initiated");
        }
        self.token.cancel();
    }

    /// Resolves once shutdown has been initiated.
    pub async fn wait(&self) {
        self.token.cancelled().await
    }

    /// Wait for SIGINT or SIGTERM and initiate shutdown.
    pub async fn wait_for_shutdown_signal(&self) -> std::io::Result<()> {
        wait_for_signal().await?;
        self.initiate_shutdown();
        Ok(())
    }

    /// Spawn a task that initiates shutdown on the first signal.
    pub fn listen_for_signals(&self) {
        let shutdown = self.clone();
        tokio::spawn(async move {
            if let Err(e) = shutdown.wait_for_shutdown_signal().await {
                error!("❌ Error waiting for shutdown signal: {}", e);
            }
        });
    }
}

/// Resolve on the first SIGINT (Ctrl+C) or, on Unix, SIGTERM.
pub async fn wait_for_signal() -> std::io::Result<()> {
    #[cfg(unix)]
    {
        use tokio::signal::unix::{signal, SignalKind};
        let mut sigterm = signal(SignalKind::terminate())?;

        tokio::select! {
            result = tokio::signal::ctrl_c() => {
                result?;
                info!("📡 Received SIGINT (Ctrl+C)");
            }
            _ = sigterm.recv() => {
                info!("📡 Received SIGTERM");
            }
        }
        Ok(())
    }

    #[cfg(not(unix))]
    {
        tokio::signal::ctrl_c().await?;
        info!("📡 Received Ctrl+C");
        Ok(())
    }
}
