//! Process lifecycle: race the membrane's serving result against a
//! termination signal, then stop.

use std::future::Future;
use std::io;
use std::process::ExitCode;
use std::sync::Arc;
use std::time::Duration;

use tokio::sync::oneshot;
use tracing::{error, info, warn};

use crate::membrane::Membrane;

/// Why the process is exiting.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum ExitReason {
    /// An operator requested shutdown with the named signal.
    Signal(String),
    /// A serving surface failed.
    ServingError(String),
}

impl ExitReason {
    pub fn is_failure(&self) -> bool {
        matches!(self, ExitReason::ServingError(_))
    }

    pub fn exit_code(&self) -> ExitCode {
        if self.is_failure() {
            ExitCode::FAILURE
        } else {
            ExitCode::SUCCESS
        }
    }
}

/// Interrupt and terminate handlers, registered as soon as this is built so
/// no signal is lost while the membrane starts.
#[cfg(unix)]
pub struct TerminationSignals {
    interrupt: tokio::signal::unix::Signal,
    terminate: tokio::signal::unix::Signal,
}

#[cfg(unix)]
impl TerminationSignals {
    pub fn register() -> io::Result<Self> {
        use tokio::signal::unix::{signal, SignalKind};

        Ok(Self {
            interrupt: signal(SignalKind::interrupt())?,
            terminate: signal(SignalKind::terminate())?,
        })
    }

    /// Resolves with the name of the first signal received.
    pub async fn recv(mut self) -> String {
        tokio::select! {
            _ = self.interrupt.recv() => "SIGINT".to_string(),
            _ = self.terminate.recv() => "SIGTERM".to_string(),
        }
    }
}

#[cfg(not(unix))]
pub struct TerminationSignals;

#[cfg(not(unix))]
impl TerminationSignals {
    pub fn register() -> io::Result<Self> {
        Ok(Self)
    }

    pub async fn recv(self) -> String {
        match tokio::signal::ctrl_c().await {
            Ok(()) => "ctrl-c".to_string(),
            Err(e) => {
                warn!(error = %e, "Failed to listen for ctrl-c");
                std::future::pending().await
            }
        }
    }
}

/// Start `membrane` in the background and wait for whichever comes first:
/// its serving result or `termination`. Always stops the membrane before
/// returning.
///
/// Only the first event is observed. After a signal, the serving task gets
/// `grace` to drain.
pub async fn run<S>(membrane: Arc<Membrane>, termination: S, grace: Duration) -> ExitReason
where
    S: Future<Output = String>,
{
    let (done_tx, done_rx) = oneshot::channel();
    let serving = membrane.clone();
    let start_task = tokio::spawn(async move {
        let _ = done_tx.send(serving.start().await);
    });

    let reason = tokio::select! {
        result = done_rx => {
            let message = match result {
                Ok(Ok(())) => "membrane stopped serving".to_string(),
                Ok(Err(e)) => e.to_string(),
                Err(_) => "membrane task ended without a result".to_string(),
            };
            error!(error = %message, "Membrane error, exiting");
            ExitReason::ServingError(message)
        }
        signal = termination => {
            info!(signal = %signal, "Received signal, exiting");
            ExitReason::Signal(signal)
        }
    };

    membrane.stop().await;

    if tokio::time::timeout(grace, start_task).await.is_err() {
        warn!(grace_secs = grace.as_secs(), "Membrane did not drain within grace period");
    }

    reason
}
