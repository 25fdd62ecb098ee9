use std::process::ExitCode;
use std::sync::Arc;

use anyhow::{Context, Result};
use tracing::info;
use tracing_subscriber::EnvFilter;

use membrane_common::Config;
use membrane_plugins::{
    DevEventsService, EventService, HttpGateway, UnimplementedDocumentService,
    UnimplementedEmailService, UnimplementedEventService, UnimplementedQueueService,
    UnimplementedStorageService,
};
use membrane_server::{lifecycle, Membrane, MembraneOptions, TerminationSignals};

#[tokio::main]
async fn main() -> Result<ExitCode> {
    init_tracing()?;

    // Register before anything starts so no signal is missed during startup.
    let signals = TerminationSignals::register().context("Failed to register signal handlers")?;

    let config = Config::from_env()?;
    config.log_summary();

    let membrane = Arc::new(build_membrane(&config).await?);

    let reason = lifecycle::run(membrane, signals.recv(), config.shutdown_grace).await;
    info!(reason = ?reason, "Membrane exited");
    Ok(reason.exit_code())
}

fn init_tracing() -> Result<()> {
    let filter = EnvFilter::try_from_default_env()
        .or_else(|_| EnvFilter::try_new("membrane=info"))?;

    let json = std::env::var("LOG_FORMAT").is_ok_and(|format| format.eq_ignore_ascii_case("json"));
    if json {
        tracing_subscriber::fmt().with_env_filter(filter).json().init();
    } else {
        tracing_subscriber::fmt().with_env_filter(filter).init();
    }
    Ok(())
}

/// Wire one backend per capability. Capabilities without a local backend get
/// the unimplemented default.
async fn build_membrane(config: &Config) -> Result<Membrane> {
    let events: Arc<dyn EventService> = match DevEventsService::from_config(config)? {
        Some(dev) => {
            info!(policy = %dev.policy(), "Local event dispatcher enabled");
            Arc::new(dev)
        }
        None => {
            info!("No LOCAL_SUBSCRIPTIONS set, events disabled");
            Arc::new(UnimplementedEventService)
        }
    };

    let gateway = HttpGateway::bind(&config.gateway_address).await?;
    info!(addr = %gateway.local_addr(), "Gateway bound");

    let options = MembraneOptions::from_config(config)
        .with_document(Arc::new(UnimplementedDocumentService))
        .with_events(events)
        .with_gateway(Arc::new(gateway))
        .with_queue(Arc::new(UnimplementedQueueService))
        .with_storage(Arc::new(UnimplementedStorageService))
        .with_emails(Arc::new(UnimplementedEmailService));

    Membrane::new(options).context("There was an error initialising the membrane")
}
