use anyhow::Result;
use tokio::signal;
use tokio_util::sync::CancellationToken;
use tracing::{info, warn};

#[cfg(unix)]
use signal::unix::{signal, SignalKind};

/// Signal types that can trigger shutdown
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum ShutdownSignal {
    /// SIGTERM - container or service manager shutdown
    Terminate,
    /// SIGINT - Ctrl+C interactive shutdown
    Interrupt,
    /// SIGQUIT - Quit signal
    Quit,
    /// Internal - the shutdown token was cancelled by the application itself
    Internal,
}

impl std::fmt::Display for ShutdownSignal {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        match self {
            ShutdownSignal::Terminate => write!(f, "SIGTERM"),
            ShutdownSignal::Interrupt => write!(f, "SIGINT"),
            ShutdownSignal::Quit => write!(f, "SIGQUIT"),
            ShutdownSignal::Internal => write!(f, "INTERNAL"),
        }
    }
}

/// Turns process signals into a cancelled [`CancellationToken`].
///
/// The orchestrator watches the token: it stops dispatching, then gives in-flight units
/// the configured shutdown timeout before aborting them.
pub struct SignalHandler {
    shutdown_signal: Option<ShutdownSignal>,
    token: CancellationToken,
}

impl SignalHandler {
    pub fn new(token: CancellationToken) -> Self {
        Self { shutdown_signal: None, token }
    }

    /// Wait for any shutdown signal, cancel the token and return which signal it was
    pub async fn wait_for_shutdown(&mut self) -> Result<ShutdownSignal> {
        let signal = self.wait_for_signal().await?;
        self.shutdown_signal = Some(signal);
        info!("Received shutdown signal: {}", signal);
        self.token.cancel();
        Ok(signal)
    }

    /// Get the signal that triggered shutdown (if any)
    pub fn shutdown_signal(&self) -> Option<ShutdownSignal> {
        self.shutdown_signal
    }

    #[cfg(unix)]
    async fn wait_for_signal(&self) -> Result<ShutdownSignal> {
        let mut sigterm = signal(SignalKind::terminate())?;
        let mut sigint = signal(SignalKind::interrupt())?;
        let mut sigquit = signal(SignalKind::quit())?;

        info!("Signal handler initialized, listening for SIGTERM, SIGINT and SIGQUIT");

        let received = tokio::select! {
            _ = sigterm.recv() => {
                info!("Graceful shutdown initiated (SIGTERM)");
                ShutdownSignal::Terminate
            }
            _ = sigint.recv() => {
                info!("Interactive shutdown initiated (SIGINT/Ctrl+C)");
                ShutdownSignal::Interrupt
            }
            _ = sigquit.recv() => {
                warn!("Quit signal received (SIGQUIT)");
                ShutdownSignal::Quit
            }
            _ = self.token.cancelled() => ShutdownSignal::Internal,
        };
        Ok(received)
    }

    #[cfg(not(unix))]
    async fn wait_for_signal(&self) -> Result<ShutdownSignal> {
        info!("Signal handler initialized, listening for Ctrl+C");

        let received = tokio::select! {
            result = signal::ctrl_c() => {
                result?;
                info!("Interactive shutdown initiated (Ctrl+C)");
                ShutdownSignal::Interrupt
            }
            _ = self.token.cancelled() => ShutdownSignal::Internal,
        };
        Ok(received)
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[tokio::test]
    async fn cancelled_token_reports_internal_shutdown() {
        let token = CancellationToken::new();
        let mut handler = SignalHandler::new(token.clone());
        token.cancel();

        let signal = handler.wait_for_shutdown().await.unwrap();
        assert_eq!(signal, ShutdownSignal::Internal);
        assert_eq!(handler.shutdown_signal(), Some(ShutdownSignal::Internal));
    }

    #[test]
    fn signals_display_their_names() {
        assert_eq!(ShutdownSignal::Terminate.to_string(), "SIGTERM");
        assert_eq!(ShutdownSignal::Quit.to_string(), "SIGQUIT");
    }
}
