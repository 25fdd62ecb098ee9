//! Supervision of the application process the membrane fronts.

use std::fmt;
use std::time::Duration;

use membrane_common::Shutdown;
use tokio::net::TcpStream;
use tokio::process::Command;
use tokio::task::JoinHandle;
use tokio::time::Instant;
use tracing::{info, warn};

use crate::error::{MembraneError, Result};

const POLL_INTERVAL: Duration = Duration::from_millis(100);

#[derive(Debug, Clone, PartialEq, Eq)]
pub enum ChildExit {
    /// The process ended on its own.
    Exited(String),
    /// The process was killed because the membrane stopped.
    Stopped,
    /// The supervising task itself failed.
    Failed(String),
}

impl fmt::Display for ChildExit {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            ChildExit::Exited(status) => write!(f, "child process exited ({status})"),
            ChildExit::Stopped => write!(f, "child process stopped"),
            ChildExit::Failed(reason) => write!(f, "child supervision failed: {reason}"),
        }
    }
}

/// A running child process, killed once `shutdown` fires.
pub struct ChildProcess {
    exit: JoinHandle<ChildExit>,
}

impl ChildProcess {
    pub fn spawn(command: &[String], shutdown: Shutdown) -> Result<Self> {
        let (program, args) = command
            .split_first()
            .ok_or_else(|| MembraneError::Construction("child command is empty".into()))?;

        let mut child = Command::new(program)
            .args(args)
            .kill_on_drop(true)
            .spawn()
            .map_err(|e| MembraneError::Serving(format!("failed to start child '{program}': {e}")))?;

        info!(pid = ?child.id(), program = %program, "Started child process");

        let exit = tokio::spawn(async move {
            let exited = tokio::select! {
                status = child.wait() => Some(status),
                _ = shutdown.wait() => None,
            };

            match exited {
                Some(Ok(status)) => ChildExit::Exited(status.to_string()),
                Some(Err(e)) => ChildExit::Failed(e.to_string()),
                None => {
                    if let Err(e) = child.kill().await {
                        warn!(error = %e, "Failed to kill child process");
                    }
                    ChildExit::Stopped
                }
            }
        });

        Ok(Self { exit })
    }

    /// Wait until `address` accepts TCP connections.
    pub async fn wait_until_available(&self, address: &str, timeout: Duration) -> Result<()> {
        let deadline = Instant::now() + timeout;
        loop {
            if TcpStream::connect(address).await.is_ok() {
                info!(address, "Child is accepting connections");
                return Ok(());
            }
            if self.exit.is_finished() {
                return Err(MembraneError::Serving(format!(
                    "child exited before listening on {address}"
                )));
            }
            if Instant::now() >= deadline {
                return Err(MembraneError::Serving(format!(
                    "child did not listen on {address} within {}s",
                    timeout.as_secs()
                )));
            }
            tokio::time::sleep(POLL_INTERVAL).await;
        }
    }

    /// Resolves when the process has ended. Must not be awaited again afterwards.
    pub async fn exited(&mut self) -> ChildExit {
        match (&mut self.exit).await {
            Ok(exit) => exit,
            Err(e) => ChildExit::Failed(e.to_string()),
        }
    }
}
