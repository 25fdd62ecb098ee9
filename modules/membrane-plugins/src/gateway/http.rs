use std::net::SocketAddr;
use std::sync::{Arc, Mutex};

use async_trait::async_trait;
use axum::{
    body::{Body, Bytes},
    extract::State,
    http::{HeaderMap, Method, StatusCode, Uri},
    response::{IntoResponse, Response},
    Router,
};
use membrane_common::Shutdown;
use tokio::net::TcpListener;
use tracing::{info, warn};

use super::{GatewayService, HttpTrigger, Trigger, TriggerHandler, TriggerResponse};
use crate::error::{PluginError, Result};

/// Headers that describe the framing of one hop and must not be copied onto
/// a re-framed response.
const HOP_BY_HOP: &[&str] = &["connection", "content-length", "transfer-encoding", "keep-alive"];

/// HTTP gateway: every inbound request becomes a [`Trigger`].
pub struct HttpGateway {
    listener: Mutex<Option<TcpListener>>,
    local_addr: SocketAddr,
    shutdown: Shutdown,
}

impl HttpGateway {
    /// Bind the gateway address. Serving begins on [`GatewayService::start`].
    pub async fn bind(addr: &str) -> Result<Self> {
        let listener = TcpListener::bind(addr)
            .await
            .map_err(|e| PluginError::Gateway(format!("failed to bind {addr}: {e}")))?;
        let local_addr = listener
            .local_addr()
            .map_err(|e| PluginError::Gateway(e.to_string()))?;

        Ok(Self {
            listener: Mutex::new(Some(listener)),
            local_addr,
            shutdown: Shutdown::new(),
        })
    }

    pub fn local_addr(&self) -> SocketAddr {
        self.local_addr
    }

    fn take_listener(&self) -> Result<TcpListener> {
        let mut slot = self
            .listener
            .lock()
            .map_err(|_| PluginError::Gateway("listener lock poisoned".into()))?;
        slot.take()
            .ok_or_else(|| PluginError::Gateway("gateway already started".into()))
    }
}

#[async_trait]
impl GatewayService for HttpGateway {
    async fn start(&self, handler: Arc<dyn TriggerHandler>) -> Result<()> {
        let listener = self.take_listener()?;
        if self.shutdown.is_triggered() {
            return Ok(());
        }

        let app = Router::new()
            .fallback(handle_trigger)
            .with_state(handler)
            .layer(tower_http::trace::TraceLayer::new_for_http().make_span_with(
                |request: &axum::http::Request<_>| {
                    tracing::info_span!(
                        "gateway_request",
                        method = %request.method(),
                        path = %request.uri().path(),
                    )
                },
            ));

        info!(addr = %self.local_addr, "Gateway accepting triggers");

        let shutdown = self.shutdown.clone();
        axum::serve(listener, app)
            .with_graceful_shutdown(async move { shutdown.wait().await })
            .await
            .map_err(|e| PluginError::Gateway(e.to_string()))?;

        info!(addr = %self.local_addr, "Gateway stopped");
        Ok(())
    }

    async fn stop(&self) -> Result<()> {
        if self.shutdown.trigger() {
            info!(addr = %self.local_addr, "Gateway stopping");
        }
        Ok(())
    }
}

async fn handle_trigger(
    State(handler): State<Arc<dyn TriggerHandler>>,
    method: Method,
    uri: Uri,
    headers: HeaderMap,
    body: Bytes,
) -> Response {
    let request = HttpTrigger {
        method: method.to_string(),
        path: uri.path().to_string(),
        query: uri.query().map(String::from),
        headers: headers
            .iter()
            .filter_map(|(name, value)| {
                value
                    .to_str()
                    .ok()
                    .map(|value| (name.as_str().to_string(), value.to_string()))
            })
            .collect(),
        body: body.to_vec(),
    };

    match handler.handle(Trigger::from_http(request)).await {
        Ok(response) => into_http_response(response),
        Err(e) => {
            warn!(error = %e, path = %uri.path(), "Trigger handler failed");
            (StatusCode::BAD_GATEWAY, e.to_string()).into_response()
        }
    }
}

fn into_http_response(response: TriggerResponse) -> Response {
    let status = StatusCode::from_u16(response.status).unwrap_or(StatusCode::BAD_GATEWAY);
    let mut builder = Response::builder().status(status);
    for (name, value) in &response.headers {
        if HOP_BY_HOP.iter().any(|h| name.eq_ignore_ascii_case(h)) {
            continue;
        }
        builder = builder.header(name.as_str(), value.as_str());
    }

    builder
        .body(Body::from(response.body))
        .unwrap_or_else(|e| {
            warn!(error = %e, "Application returned an unrepresentable response");
            StatusCode::BAD_GATEWAY.into_response()
        })
}
