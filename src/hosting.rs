//! Adapter between a [`Bootstrapper`] and the process hosting it.

use crate::app::Bootstrapper;
use crate::error::{BootstrapError, Result};
use std::fmt;
use std::future::Future;
use std::sync::Arc;
use tokio::signal;
use tokio_util::sync::CancellationToken;
use tracing::{error, info, warn};

/// Why the host is shutting down
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum ShutdownReason {
    Signal(&'static str),
    Requested,
}

impl fmt::Display for ShutdownReason {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            ShutdownReason::Signal(name) => write!(f, "received {}", name),
            ShutdownReason::Requested => f.write_str("shutdown requested"),
        }
    }
}

/// Runs the bootstrapper as part of a host's own start and stop
pub struct HostedBootstrapper {
    bootstrapper: Arc<Bootstrapper>,
}

impl HostedBootstrapper {
    pub fn new(bootstrapper: Arc<Bootstrapper>) -> Self {
        Self { bootstrapper }
    }

    pub fn bootstrapper(&self) -> &Arc<Bootstrapper> {
        &self.bootstrapper
    }

    /// Start all initializers; a failed startup is fatal to the host
    pub async fn on_host_start(&self, cancel: &CancellationToken) -> Result<()> {
        if self.bootstrapper.begin_startup(cancel).await? {
            info!("Host startup completed");
            Ok(())
        } else {
            error!("Bootstrapper startup did not complete, examine the logs for details");
            Err(BootstrapError::Host { phase: "startup" })
        }
    }

    /// Stop all initializers; a failed shutdown is fatal to the host
    pub async fn on_host_stop(&self, cancel: &CancellationToken) -> Result<()> {
        if self.bootstrapper.begin_shutdown(cancel).await? {
            info!("Host shutdown completed");
            Ok(())
        } else {
            error!("Bootstrapper shutdown did not complete, examine the logs for details");
            Err(BootstrapError::Host { phase: "shutdown" })
        }
    }

    /// Start, wait for `shutdown`, then stop; returns the process exit code
    pub async fn run_until<F>(&self, shutdown: F) -> Result<i32>
    where
        F: Future<Output = ShutdownReason>,
    {
        self.on_host_start(&CancellationToken::new()).await?;
        info!("Bootstrapper is running");

        let reason = shutdown.await;
        info!("Shutdown initiated: {}", reason);

        match self.on_host_stop(&CancellationToken::new()).await {
            Ok(()) => Ok(0),
            Err(BootstrapError::Host { phase }) => {
                warn!("Exiting after failed {}", phase);
                Ok(1)
            }
            Err(e) => Err(e),
        }
    }

    /// [`run_until`](Self::run_until) SIGINT or SIGTERM
    pub async fn run_until_signal(&self) -> Result<i32> {
        self.run_until(shutdown_signal()).await
    }
}

/// Resolve on Ctrl+C, or SIGTERM on unix
pub async fn shutdown_signal() -> ShutdownReason {
    let interrupt = async {
        if let Err(e) = signal::ctrl_c().await {
            warn!("Failed to listen for SIGINT: {}", e);
            std::future::pending::<()>().await;
        }
    };

    #[cfg(unix)]
    let terminate = async {
        match signal::unix::signal(signal::unix::SignalKind::terminate()) {
            Ok(mut stream) => {
                stream.recv().await;
            }
            Err(e) => {
                warn!("Failed to register SIGTERM handler: {}", e);
                std::future::pending::<()>().await;
            }
        }
    };

    #[cfg(not(unix))]
    let terminate = std::future::pending::<()>();

    tokio::select! {
        _ = interrupt => {
            info!("Received SIGINT signal (Ctrl+C)");
            ShutdownReason::Signal("SIGINT")
        }
        _ = terminate => {
            info!("Received SIGTERM signal");
            ShutdownReason::Signal("SIGTERM")
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::app::BootstrapperState;
    use crate::initializer::{Initializer, UnitDeclaration};
    use crate::simulated::{SimulatedHandler, SimulatedUnit};
    use crate::registry::BootstrapperBuilder;

    fn hosted(units: Vec<Arc<dyn Initializer>>) -> HostedBootstrapper {
        let bootstrapper = BootstrapperBuilder::new()
            .configure(|registry| {
                registry.add_initializers(units);
            })
            .build()
            .unwrap();
        HostedBootstrapper::new(Arc::new(bootstrapper))
    }

    fn failing_on_stop(id: &str) -> Arc<dyn Initializer> {
        let handler = SimulatedHandler::new(id.into()).failing(false, true);
        Arc::new(SimulatedUnit::new(UnitDeclaration::new(id), handler))
    }

    #[tokio::test]
    async fn test_host_start_and_stop() {
        let host = hosted(vec![Arc::new(SimulatedUnit::instant(UnitDeclaration::new("a")))]);
        let cancel = CancellationToken::new();

        host.on_host_start(&cancel).await.unwrap();
        assert_eq!(host.bootstrapper().state(), BootstrapperState::Started);

        host.on_host_stop(&cancel).await.unwrap();
        assert_eq!(host.bootstrapper().state(), BootstrapperState::Stopped);
    }

    #[tokio::test]
    async fn test_failed_startup_is_fatal() {
        let handler = SimulatedHandler::new("broken".into()).failing(true, false);
        let host = hosted(vec![Arc::new(SimulatedUnit::new(
            UnitDeclaration::new("broken"),
            handler,
        ))]);

        let error = host.on_host_start(&CancellationToken::new()).await.unwrap_err();

        assert!(matches!(error, BootstrapError::Host { phase: "startup" }));
        assert!(error.to_string().contains("examine the logs"));
        assert_eq!(host.bootstrapper().state(), BootstrapperState::Faulted);
    }

    #[tokio::test]
    async fn test_guard_errors_propagate() {
        let host = hosted(Vec::new());

        let error = host.on_host_stop(&CancellationToken::new()).await.unwrap_err();
        assert!(error.is_invalid_state());
    }

    #[tokio::test]
    async fn test_run_until_returns_exit_code() {
        let host = hosted(vec![Arc::new(SimulatedUnit::instant(UnitDeclaration::new("a")))]);
        let code = host
            .run_until(async { ShutdownReason::Requested })
            .await
            .unwrap();
        assert_eq!(code, 0);

        let host = hosted(vec![failing_on_stop("b")]);
        let code = host
            .run_until(async { ShutdownReason::Requested })
            .await
            .unwrap();
        assert_eq!(code, 1);
        assert_eq!(host.bootstrapper().state(), BootstrapperState::Faulted);
    }
}
