//! Resource-access surface: exposes the non-gateway capabilities to the
//! application as JSON over HTTP.

use std::sync::Arc;

use axum::{
    body::Bytes,
    extract::{Path, Query, State},
    http::{header, StatusCode},
    response::{IntoResponse, Response},
    routing::{get, post, put},
    Json, Router,
};
use membrane_common::{NitricEvent, Payload};
use membrane_plugins::{
    DocumentService, EmailMessage, EmailService, EventService, NitricTask, PluginError,
    QueueService, StorageService,
};
use serde::Deserialize;
use serde_json::json;
use tracing::warn;

/// Capabilities reachable through the resource surface.
#[derive(Clone)]
pub struct Resources {
    pub document: Arc<dyn DocumentService>,
    pub events: Arc<dyn EventService>,
    pub queue: Arc<dyn QueueService>,
    pub storage: Arc<dyn StorageService>,
    pub emails: Arc<dyn EmailService>,
}

pub fn router(resources: Resources) -> Router {
    Router::new()
        // Events
        .route("/v1/topics", get(list_topics))
        .route("/v1/topics/{topic}/events", post(publish))
        // Documents
        .route(
            "/v1/documents/{collection}/{key}",
            get(get_document).put(set_document).delete(delete_document),
        )
        // Queues
        .route("/v1/queues/{queue}/task", post(send_task))
        .route("/v1/queues/{queue}/tasks", post(send_tasks))
        .route("/v1/queues/{queue}/receive", post(receive_tasks))
        .route(
            "/v1/queues/{queue}/leases/{lease_id}",
            axum::routing::delete(complete_task),
        )
        // Storage keys are path-like and may span segments
        .route(
            "/v1/buckets/{bucket}/files/{*key}",
            put(put_file).get(get_file).delete(delete_file),
        )
        // Email
        .route("/v1/emails", post(send_email))
        .with_state(resources)
        .layer(
            tower_http::trace::TraceLayer::new_for_http().make_span_with(
                |request: &axum::http::Request<_>| {
                    tracing::info_span!(
                        "resource_request",
                        method = %request.method(),
                        path = %request.uri().path(),
                    )
                },
            ),
        )
}

// --- Errors ---

pub struct ApiError(PluginError);

impl From<PluginError> for ApiError {
    fn from(err: PluginError) -> Self {
        ApiError(err)
    }
}

impl ApiError {
    fn status(&self) -> StatusCode {
        match &self.0 {
            PluginError::NotImplemented { .. } => StatusCode::NOT_IMPLEMENTED,
            PluginError::PublishTargetNotFound(_) | PluginError::NotFound(_) => StatusCode::NOT_FOUND,
            PluginError::InvalidArgument(_) => StatusCode::BAD_REQUEST,
            PluginError::DeliveryFailed { .. } | PluginError::Network(_) | PluginError::Gateway(_) => {
                StatusCode::BAD_GATEWAY
            }
        }
    }
}

impl IntoResponse for ApiError {
    fn into_response(self) -> Response {
        let status = self.status();
        if status.is_server_error() && status != StatusCode::NOT_IMPLEMENTED {
            warn!(error = %self.0, "Resource request failed");
        }
        (status, Json(json!({ "error": self.0.to_string() }))).into_response()
    }
}

type ApiResult<T> = std::result::Result<T, ApiError>;

// --- Events ---

async fn list_topics(State(res): State<Resources>) -> ApiResult<impl IntoResponse> {
    let topics = res.events.list_topics().await?;
    Ok(Json(json!({ "topics": topics })))
}

async fn publish(
    State(res): State<Resources>,
    Path(topic): Path<String>,
    Json(event): Json<NitricEvent>,
) -> ApiResult<impl IntoResponse> {
    res.events.publish(&topic, &event).await?;
    Ok((StatusCode::ACCEPTED, Json(json!({ "id": event.id }))))
}

// --- Documents ---

async fn get_document(
    State(res): State<Resources>,
    Path((collection, key)): Path<(String, String)>,
) -> ApiResult<Json<Payload>> {
    Ok(Json(res.document.get(&collection, &key).await?))
}

async fn set_document(
    State(res): State<Resources>,
    Path((collection, key)): Path<(String, String)>,
    Json(value): Json<Payload>,
) -> ApiResult<StatusCode> {
    res.document.set(&collection, &key, value).await?;
    Ok(StatusCode::NO_CONTENT)
}

async fn delete_document(
    State(res): State<Resources>,
    Path((collection, key)): Path<(String, String)>,
) -> ApiResult<StatusCode> {
    res.document.delete(&collection, &key).await?;
    Ok(StatusCode::NO_CONTENT)
}

// --- Queues ---

#[derive(Deserialize)]
struct ReceiveQuery {
    depth: Option<u32>,
}

async fn send_task(
    State(res): State<Resources>,
    Path(queue): Path<String>,
    Json(task): Json<NitricTask>,
) -> ApiResult<StatusCode> {
    res.queue.send(&queue, task).await?;
    Ok(StatusCode::ACCEPTED)
}

async fn send_tasks(
    State(res): State<Resources>,
    Path(queue): Path<String>,
    Json(tasks): Json<Vec<NitricTask>>,
) -> ApiResult<impl IntoResponse> {
    let failed = res.queue.send_batch(&queue, tasks).await?;
    Ok(Json(json!({ "failedTasks": failed })))
}

async fn receive_tasks(
    State(res): State<Resources>,
    Path(queue): Path<String>,
    Query(query): Query<ReceiveQuery>,
) -> ApiResult<Json<Vec<NitricTask>>> {
    let depth = query.depth.unwrap_or(1);
    if depth == 0 {
        return Err(PluginError::InvalidArgument("depth must be at least 1".into()).into());
    }
    Ok(Json(res.queue.receive(&queue, depth).await?))
}

async fn complete_task(
    State(res): State<Resources>,
    Path((queue, lease_id)): Path<(String, String)>,
) -> ApiResult<StatusCode> {
    res.queue.complete(&queue, &lease_id).await?;
    Ok(StatusCode::NO_CONTENT)
}

// --- Storage ---

async fn put_file(
    State(res): State<Resources>,
    Path((bucket, key)): Path<(String, String)>,
    body: Bytes,
) -> ApiResult<StatusCode> {
    res.storage.put(&bucket, &key, body.to_vec()).await?;
    Ok(StatusCode::NO_CONTENT)
}

async fn get_file(
    State(res): State<Resources>,
    Path((bucket, key)): Path<(String, String)>,
) -> ApiResult<impl IntoResponse> {
    let data = res.storage.get(&bucket, &key).await?;
    Ok(([(header::CONTENT_TYPE, "application/octet-stream")], data))
}

async fn delete_file(
    State(res): State<Resources>,
    Path((bucket, key)): Path<(String, String)>,
) -> ApiResult<StatusCode> {
    res.storage.delete(&bucket, &key).await?;
    Ok(StatusCode::NO_CONTENT)
}

// --- Email ---

async fn send_email(
    State(res): State<Resources>,
    Json(message): Json<EmailMessage>,
) -> ApiResult<StatusCode> {
    if message.to.is_empty() && message.cc.is_empty() && message.bcc.is_empty() {
        return Err(PluginError::InvalidArgument("email has no recipients".into()).into());
    }
    res.emails.send(&message).await?;
    Ok(StatusCode::ACCEPTED)
}
