//! The membrane: owns one backend per capability and the serving surfaces
//! built from them.
//!
//! Lifecycle is `Created → Running → Stopped`. [`Membrane::start`] blocks for
//! as long as serving is healthy; [`Membrane::stop`] may be called from any
//! state, any number of times.

use std::fmt;
use std::net::SocketAddr;
use std::sync::{Arc, Mutex, MutexGuard, OnceLock};
use std::time::Duration;

use membrane_common::{Config, Shutdown};
use membrane_plugins::{
    DocumentService, EmailService, EventService, GatewayService, QueueService, StorageService,
    TriggerHandler,
};
use tokio::net::TcpListener;
use tokio::task::JoinError;
use tracing::{debug, error, info, warn};

use crate::child::{ChildExit, ChildProcess};
use crate::error::{MembraneError, Result};
use crate::forwarder::ChildForwarder;
use crate::resources::{self, Resources};

/// Everything needed to build a [`Membrane`].
///
/// Capabilities left as `None` make construction fail. Fill gaps with the
/// `Unimplemented*` backends before constructing.
pub struct MembraneOptions {
    pub service_address: String,
    pub child_address: String,
    pub child_command: Option<Vec<String>>,
    pub child_timeout: Duration,

    pub document: Option<Arc<dyn DocumentService>>,
    pub events: Option<Arc<dyn EventService>>,
    pub gateway: Option<Arc<dyn GatewayService>>,
    pub queue: Option<Arc<dyn QueueService>>,
    pub storage: Option<Arc<dyn StorageService>>,
    pub emails: Option<Arc<dyn EmailService>>,
}

impl Default for MembraneOptions {
    fn default() -> Self {
        Self {
            service_address: "127.0.0.1:50051".to_string(),
            child_address: "127.0.0.1:8080".to_string(),
            child_command: None,
            child_timeout: Duration::from_secs(10),
            document: None,
            events: None,
            gateway: None,
            queue: None,
            storage: None,
            emails: None,
        }
    }
}

impl MembraneOptions {
    /// Serving settings from config; capabilities are left unset.
    pub fn from_config(config: &Config) -> Self {
        Self {
            service_address: config.service_address.clone(),
            child_address: config.child_address.clone(),
            child_command: config.child_command.clone(),
            child_timeout: config.child_timeout,
            ..Default::default()
        }
    }

    pub fn with_document(mut self, document: Arc<dyn DocumentService>) -> Self {
        self.document = Some(document);
        self
    }

    pub fn with_events(mut self, events: Arc<dyn EventService>) -> Self {
        self.events = Some(events);
        self
    }

    pub fn with_gateway(mut self, gateway: Arc<dyn GatewayService>) -> Self {
        self.gateway = Some(gateway);
        self
    }

    pub fn with_queue(mut self, queue: Arc<dyn QueueService>) -> Self {
        self.queue = Some(queue);
        self
    }

    pub fn with_storage(mut self, storage: Arc<dyn StorageService>) -> Self {
        self.storage = Some(storage);
        self
    }

    pub fn with_emails(mut self, emails: Arc<dyn EmailService>) -> Self {
        self.emails = Some(emails);
        self
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum MembraneState {
    Created,
    Running,
    Stopped,
}

/// Which owned surface ended a serving run.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
enum Surface {
    Gateway,
    Resources,
    Child,
}

impl fmt::Display for Surface {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Surface::Gateway => write!(f, "gateway"),
            Surface::Resources => write!(f, "resource service"),
            Surface::Child => write!(f, "child process"),
        }
    }
}

pub struct Membrane {
    service_address: String,
    child_address: String,
    child_command: Option<Vec<String>>,
    child_timeout: Duration,

    document: Arc<dyn DocumentService>,
    events: Arc<dyn EventService>,
    gateway: Arc<dyn GatewayService>,
    queue: Arc<dyn QueueService>,
    storage: Arc<dyn StorageService>,
    emails: Arc<dyn EmailService>,

    state: Mutex<MembraneState>,
    shutdown: Shutdown,
    service_addr: OnceLock<SocketAddr>,
}

fn required<T: ?Sized>(plugin: Option<Arc<T>>, capability: &str) -> Result<Arc<T>> {
    plugin.ok_or_else(|| MembraneError::Construction(format!("missing {capability} plugin")))
}

impl Membrane {
    pub fn new(options: MembraneOptions) -> Result<Self> {
        if options.service_address.trim().is_empty() {
            return Err(MembraneError::Construction("service address is empty".into()));
        }
        if options
            .child_command
            .as_ref()
            .is_some_and(|command| command.is_empty())
        {
            return Err(MembraneError::Construction("child command is empty".into()));
        }

        Ok(Self {
            document: required(options.document, "document")?,
            events: required(options.events, "events")?,
            gateway: required(options.gateway, "gateway")?,
            queue: required(options.queue, "queue")?,
            storage: required(options.storage, "storage")?,
            emails: required(options.emails, "emails")?,
            service_address: options.service_address,
            child_address: options.child_address,
            child_command: options.child_command,
            child_timeout: options.child_timeout,
            state: Mutex::new(MembraneState::Created),
            shutdown: Shutdown::new(),
            service_addr: OnceLock::new(),
        })
    }

    pub fn state(&self) -> MembraneState {
        *self.lock_state()
    }

    /// Address the resource service is bound to, once `start` has bound it.
    pub fn service_addr(&self) -> Option<SocketAddr> {
        self.service_addr.get().copied()
    }

    pub fn events(&self) -> &Arc<dyn EventService> {
        &self.events
    }

    pub fn document(&self) -> &Arc<dyn DocumentService> {
        &self.document
    }

    pub fn queue(&self) -> &Arc<dyn QueueService> {
        &self.queue
    }

    pub fn storage(&self) -> &Arc<dyn StorageService> {
        &self.storage
    }

    pub fn emails(&self) -> &Arc<dyn EmailService> {
        &self.emails
    }

    fn lock_state(&self) -> MutexGuard<'_, MembraneState> {
        self.state.lock().unwrap_or_else(|poisoned| poisoned.into_inner())
    }

    fn enter_running(&self) -> Result<()> {
        let mut state = self.lock_state();
        match *state {
            MembraneState::Created => {
                *state = MembraneState::Running;
                Ok(())
            }
            other => Err(MembraneError::Serving(format!(
                "cannot start a membrane in {other:?} state"
            ))),
        }
    }

    fn resources(&self) -> Resources {
        Resources {
            document: self.document.clone(),
            events: self.events.clone(),
            queue: self.queue.clone(),
            storage: self.storage.clone(),
            emails: self.emails.clone(),
        }
    }

    /// Serve until a surface fails or [`stop`](Membrane::stop) is called.
    ///
    /// Returns `Ok(())` only after an orderly stop; any other end of serving
    /// is a [`MembraneError::Serving`].
    pub async fn start(&self) -> Result<()> {
        self.enter_running()?;
        info!("Starting membrane");

        let listener = TcpListener::bind(&self.service_address).await.map_err(|e| {
            MembraneError::Serving(format!(
                "failed to bind resource service on {}: {e}",
                self.service_address
            ))
        })?;
        if let Ok(addr) = listener.local_addr() {
            let _ = self.service_addr.set(addr);
            info!(addr = %addr, "Resource service bound");
        }

        let mut child = match &self.child_command {
            Some(command) => {
                let child = ChildProcess::spawn(command, self.shutdown.clone())?;
                if let Err(e) = child
                    .wait_until_available(&self.child_address, self.child_timeout)
                    .await
                {
                    // Stopping kills the child, which also ends the wait.
                    if self.shutdown.is_triggered() {
                        info!("Membrane stopped during startup");
                        return Ok(());
                    }
                    return Err(e);
                }
                Some(child)
            }
            None => None,
        };

        if self.shutdown.is_triggered() {
            info!("Membrane stopped during startup");
            return Ok(());
        }

        let handler: Arc<dyn TriggerHandler> = Arc::new(ChildForwarder::new(&self.child_address)?);
        let gateway = self.gateway.clone();
        let mut gateway_task = tokio::spawn(async move { gateway.start(handler).await });

        let app = resources::router(self.resources());
        let shutdown = self.shutdown.clone();
        let mut resource_task = tokio::spawn(async move {
            axum::serve(listener, app)
                .with_graceful_shutdown(async move { shutdown.wait().await })
                .await
        });

        info!("Membrane serving");

        let (surface, failure) = tokio::select! {
            res = &mut gateway_task => (Surface::Gateway, task_failure(res)),
            res = &mut resource_task => (Surface::Resources, task_failure(res)),
            exit = child_exit(&mut child) => (Surface::Child, Some(exit.to_string())),
        };

        if self.shutdown.is_triggered() {
            debug!(first = %surface, "Draining serving surfaces");
            if surface != Surface::Gateway {
                log_drain(Surface::Gateway, task_failure(gateway_task.await));
            }
            if surface != Surface::Resources {
                log_drain(Surface::Resources, task_failure(resource_task.await));
            }
            if surface != Surface::Child {
                if let Some(child) = child.as_mut() {
                    let exit = child.exited().await;
                    debug!(exit = %exit, "Child process drained");
                }
            }
            info!("Membrane stopped");
            return Ok(());
        }

        let reason = match failure {
            Some(reason) => format!("{surface}: {reason}"),
            None => format!("{surface} stopped unexpectedly"),
        };
        error!(surface = %surface, reason = %reason, "Serving surface failed");
        Err(MembraneError::Serving(reason))
    }

    /// Stop serving and release every owned resource.
    ///
    /// Idempotent and infallible: failures are logged and shutdown continues
    /// with the remaining surfaces.
    pub async fn stop(&self) {
        let previous = std::mem::replace(&mut *self.lock_state(), MembraneState::Stopped);
        if previous == MembraneState::Stopped {
            debug!("Membrane already stopped");
            return;
        }

        info!(from = ?previous, "Stopping membrane");
        self.shutdown.trigger();

        if let Err(e) = self.gateway.stop().await {
            warn!(error = %e, "Gateway shutdown failed");
        }
    }
}

async fn child_exit(child: &mut Option<ChildProcess>) -> ChildExit {
    match child {
        Some(child) => child.exited().await,
        None => std::future::pending().await,
    }
}

/// `None` for a clean exit, otherwise why the task ended.
fn task_failure<E: fmt::Display>(
    res: std::result::Result<std::result::Result<(), E>, JoinError>,
) -> Option<String> {
    match res {
        Ok(Ok(())) => None,
        Ok(Err(e)) => Some(e.to_string()),
        Err(e) => Some(format!("task failed: {e}")),
    }
}

fn log_drain(surface: Surface, failure: Option<String>) {
    match failure {
        None => debug!(surface = %surface, "Surface drained"),
        Some(reason) => warn!(surface = %surface, reason = %reason, "Surface ended with error during shutdown"),
    }
}
