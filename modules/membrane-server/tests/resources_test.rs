//! Resource-access surface routed in-process.

use std::collections::HashMap;
use std::sync::{Arc, Mutex};

use async_trait::async_trait;
use axum::{
    body::{to_bytes, Body},
    http::{Request, StatusCode},
    response::Response,
    Router,
};
use membrane_common::Payload;
use membrane_plugins::{
    DevEventsService, DocumentService, FailedTask, NitricTask, OutboundRequest, PluginError,
    QueueService, Result, StorageService, SubscriberClient, UnimplementedDocumentService,
    UnimplementedEmailService, UnimplementedEventService, UnimplementedQueueService,
    UnimplementedStorageService,
};
use membrane_server::resources::{router, Resources};
use serde_json::{json, Value};
use tower::ServiceExt;

// ---------------------------------------------------------------------------
// In-memory backends
// ---------------------------------------------------------------------------

#[derive(Default)]
struct MemoryDocuments {
    docs: Mutex<HashMap<(String, String), Payload>>,
}

#[async_trait]
impl DocumentService for MemoryDocuments {
    async fn get(&self, collection: &str, key: &str) -> Result<Payload> {
        self.docs
            .lock()
            .unwrap()
            .get(&(collection.to_string(), key.to_string()))
            .cloned()
            .ok_or_else(|| PluginError::NotFound(format!("{collection}/{key}")))
    }

    async fn set(&self, collection: &str, key: &str, value: Payload) -> Result<()> {
        self.docs
            .lock()
            .unwrap()
            .insert((collection.to_string(), key.to_string()), value);
        Ok(())
    }

    async fn delete(&self, collection: &str, key: &str) -> Result<()> {
        self.docs
            .lock()
            .unwrap()
            .remove(&(collection.to_string(), key.to_string()));
        Ok(())
    }
}

/// Accepts tasks with a non-empty payload type and rejects the rest.
#[derive(Default)]
struct PickyQueue {
    tasks: Mutex<Vec<NitricTask>>,
}

#[async_trait]
impl QueueService for PickyQueue {
    async fn send(&self, _queue: &str, task: NitricTask) -> Result<()> {
        self.tasks.lock().unwrap().push(task);
        Ok(())
    }

    async fn send_batch(&self, _queue: &str, tasks: Vec<NitricTask>) -> Result<Vec<FailedTask>> {
        let (accepted, rejected): (Vec<_>, Vec<_>) =
            tasks.into_iter().partition(|t| !t.payload_type.is_empty());
        self.tasks.lock().unwrap().extend(accepted);
        Ok(rejected
            .into_iter()
            .map(|task| FailedTask {
                task,
                message: "missing payload type".into(),
            })
            .collect())
    }

    async fn receive(&self, _queue: &str, depth: u32) -> Result<Vec<NitricTask>> {
        let mut tasks = self.tasks.lock().unwrap();
        let take = (depth as usize).min(tasks.len());
        Ok(tasks
            .drain(..take)
            .map(|mut task| {
                task.lease_id = Some(format!("lease-{}", task.id));
                task
            })
            .collect())
    }

    async fn complete(&self, _queue: &str, _lease_id: &str) -> Result<()> {
        Ok(())
    }
}

#[derive(Default)]
struct MemoryStorage {
    files: Mutex<HashMap<String, Vec<u8>>>,
}

#[async_trait]
impl StorageService for MemoryStorage {
    async fn put(&self, bucket: &str, key: &str, data: Vec<u8>) -> Result<()> {
        self.files.lock().unwrap().insert(format!("{bucket}/{key}"), data);
        Ok(())
    }

    async fn get(&self, bucket: &str, key: &str) -> Result<Vec<u8>> {
        self.files
            .lock()
            .unwrap()
            .get(&format!("{bucket}/{key}"))
            .cloned()
            .ok_or_else(|| PluginError::NotFound(format!("{bucket}/{key}")))
    }

    async fn delete(&self, bucket: &str, key: &str) -> Result<()> {
        self.files.lock().unwrap().remove(&format!("{bucket}/{key}"));
        Ok(())
    }
}

struct AcceptingClient;

#[async_trait]
impl SubscriberClient for AcceptingClient {
    async fn post(&self, _request: OutboundRequest) -> Result<u16> {
        Ok(204)
    }
}

// ---------------------------------------------------------------------------
// Helpers
// ---------------------------------------------------------------------------

fn unimplemented() -> Resources {
    Resources {
        document: Arc::new(UnimplementedDocumentService),
        events: Arc::new(UnimplementedEventService),
        queue: Arc::new(UnimplementedQueueService),
        storage: Arc::new(UnimplementedStorageService),
        emails: Arc::new(UnimplementedEmailService),
    }
}

fn in_memory() -> Resources {
    Resources {
        document: Arc::new(MemoryDocuments::default()),
        events: Arc::new(DevEventsService::with_client(
            Arc::new(AcceptingClient),
            HashMap::from([("orders".to_string(), vec!["http://a/".to_string()])]),
        )),
        queue: Arc::new(PickyQueue::default()),
        storage: Arc::new(MemoryStorage::default()),
        ..unimplemented()
    }
}

async fn call(app: &Router, method: &str, uri: &str, body: Option<Value>) -> Response {
    let builder = Request::builder().method(method).uri(uri);
    let request = match body {
        Some(json) => builder
            .header("content-type", "application/json")
            .body(Body::from(json.to_string()))
            .unwrap(),
        None => builder.body(Body::empty()).unwrap(),
    };
    app.clone().oneshot(request).await.unwrap()
}

async fn json_body(resp: Response) -> Value {
    let bytes = to_bytes(resp.into_body(), usize::MAX).await.unwrap();
    serde_json::from_slice(&bytes).unwrap()
}

// ---------------------------------------------------------------------------
// Default backends
// ---------------------------------------------------------------------------

#[tokio::test]
async fn unimplemented_capabilities_answer_501() {
    let app = router(unimplemented());

    let resp = call(&app, "GET", "/v1/topics", None).await;
    assert_eq!(resp.status(), StatusCode::NOT_IMPLEMENTED);
    let body = json_body(resp).await;
    assert!(body["error"].as_str().unwrap().contains("not implemented"));

    let resp = call(&app, "GET", "/v1/documents/users/1", None).await;
    assert_eq!(resp.status(), StatusCode::NOT_IMPLEMENTED);

    let resp = call(&app, "POST", "/v1/queues/jobs/receive?depth=2", None).await;
    assert_eq!(resp.status(), StatusCode::NOT_IMPLEMENTED);

    let resp = call(&app, "DELETE", "/v1/buckets/images/files/cat.png", None).await;
    assert_eq!(resp.status(), StatusCode::NOT_IMPLEMENTED);

    let email = json!({ "from": "a@example.com", "to": ["b@example.com"], "subject": "hi" });
    let resp = call(&app, "POST", "/v1/emails", Some(email)).await;
    assert_eq!(resp.status(), StatusCode::NOT_IMPLEMENTED);
}

#[tokio::test]
async fn email_without_recipients_is_rejected() {
    let app = router(unimplemented());
    let email = json!({ "from": "a@example.com", "to": [], "subject": "hi" });

    let resp = call(&app, "POST", "/v1/emails", Some(email)).await;
    assert_eq!(resp.status(), StatusCode::BAD_REQUEST);
}

// ---------------------------------------------------------------------------
// Events
// ---------------------------------------------------------------------------

#[tokio::test]
async fn publish_maps_unknown_topic_to_404() {
    let app = router(in_memory());
    let event = json!({ "id": "42", "payloadType": "OrderCreated", "payload": { "id": 1 } });

    let resp = call(&app, "POST", "/v1/topics/orders/events", Some(event.clone())).await;
    assert_eq!(resp.status(), StatusCode::ACCEPTED);
    assert_eq!(json_body(resp).await["id"], "42");

    let resp = call(&app, "POST", "/v1/topics/refunds/events", Some(event)).await;
    assert_eq!(resp.status(), StatusCode::NOT_FOUND);
}

// ---------------------------------------------------------------------------
// Documents, queues, storage
// ---------------------------------------------------------------------------

#[tokio::test]
async fn documents_round_trip() {
    let app = router(in_memory());

    let resp = call(&app, "GET", "/v1/documents/users/1", None).await;
    assert_eq!(resp.status(), StatusCode::NOT_FOUND);

    let resp = call(&app, "PUT", "/v1/documents/users/1", Some(json!({ "name": "Ada" }))).await;
    assert_eq!(resp.status(), StatusCode::NO_CONTENT);

    let resp = call(&app, "GET", "/v1/documents/users/1", None).await;
    assert_eq!(resp.status(), StatusCode::OK);
    assert_eq!(json_body(resp).await, json!({ "name": "Ada" }));

    let resp = call(&app, "DELETE", "/v1/documents/users/1", None).await;
    assert_eq!(resp.status(), StatusCode::NO_CONTENT);
}

#[tokio::test]
async fn queue_batches_report_failed_tasks() {
    let app = router(in_memory());
    let tasks = json!([
        { "id": "1", "payloadType": "Job", "payload": { "n": 1 } },
        { "id": "2", "payload": { "n": 2 } },
    ]);

    let resp = call(&app, "POST", "/v1/queues/jobs/tasks", Some(tasks)).await;
    assert_eq!(resp.status(), StatusCode::OK);
    let body = json_body(resp).await;
    let failed = body["failedTasks"].as_array().unwrap();
    assert_eq!(failed.len(), 1);
    assert_eq!(failed[0]["task"]["id"], "2");

    let resp = call(&app, "POST", "/v1/queues/jobs/receive?depth=5", None).await;
    assert_eq!(resp.status(), StatusCode::OK);
    let leased = json_body(resp).await;
    assert_eq!(leased.as_array().unwrap().len(), 1);
    assert_eq!(leased[0]["leaseId"], "lease-1");

    let resp = call(&app, "DELETE", "/v1/queues/jobs/leases/lease-1", None).await;
    assert_eq!(resp.status(), StatusCode::NO_CONTENT);
}

#[tokio::test]
async fn single_task_send_is_accepted() {
    let app = router(in_memory());
    let task = json!({ "id": "9", "payloadType": "Job" });

    let resp = call(&app, "POST", "/v1/queues/jobs/task", Some(task)).await;
    assert_eq!(resp.status(), StatusCode::ACCEPTED);
}

#[tokio::test]
async fn zero_depth_receive_is_rejected() {
    let app = router(in_memory());

    let resp = call(&app, "POST", "/v1/queues/jobs/receive?depth=0", None).await;
    assert_eq!(resp.status(), StatusCode::BAD_REQUEST);
}

#[tokio::test]
async fn storage_serves_raw_bytes() {
    let app = router(in_memory());

    let request = Request::builder()
        .method("PUT")
        .uri("/v1/buckets/images/files/cat.png")
        .body(Body::from(vec![0u8, 1, 2, 3]))
        .unwrap();
    let resp = app.clone().oneshot(request).await.unwrap();
    assert_eq!(resp.status(), StatusCode::NO_CONTENT);

    let resp = call(&app, "GET", "/v1/buckets/images/files/cat.png", None).await;
    assert_eq!(resp.status(), StatusCode::OK);
    assert_eq!(resp.headers()["content-type"], "application/octet-stream");
    let bytes = to_bytes(resp.into_body(), usize::MAX).await.unwrap();
    assert_eq!(&bytes[..], &[0u8, 1, 2, 3]);
}

#[tokio::test]
async fn storage_keys_may_span_path_segments() {
    let storage = Arc::new(MemoryStorage::default());
    let app = router(Resources {
        storage: storage.clone(),
        ..in_memory()
    });

    let request = Request::builder()
        .method("PUT")
        .uri("/v1/buckets/images/files/2024/cat.png")
        .body(Body::from(b"meow".to_vec()))
        .unwrap();
    let resp = app.clone().oneshot(request).await.unwrap();
    assert_eq!(resp.status(), StatusCode::NO_CONTENT);
    assert!(storage
        .files
        .lock()
        .unwrap()
        .contains_key("images/2024/cat.png"));

    let resp = call(&app, "GET", "/v1/buckets/images/files/2024/cat.png", None).await;
    assert_eq!(resp.status(), StatusCode::OK);
    let bytes = to_bytes(resp.into_body(), usize::MAX).await.unwrap();
    assert_eq!(&bytes[..], b"meow");

    let resp = call(&app, "DELETE", "/v1/buckets/images/files/2024/cat.png", None).await;
    assert_eq!(resp.status(), StatusCode::NO_CONTENT);
    assert!(storage.files.lock().unwrap().is_empty());
}
