//! HTTP gateway serving real requests on loopback.

use std::sync::{Arc, Mutex};
use std::time::Duration;

use async_trait::async_trait;
use membrane_plugins::{
    GatewayService, HttpGateway, PluginError, Result, Trigger, TriggerHandler, TriggerResponse,
};

// ---------------------------------------------------------------------------
// Recording handler
// ---------------------------------------------------------------------------

#[derive(Default)]
struct RecordingHandler {
    triggers: Mutex<Vec<Trigger>>,
    fail: bool,
}

#[async_trait]
impl TriggerHandler for RecordingHandler {
    async fn handle(&self, trigger: Trigger) -> Result<TriggerResponse> {
        self.triggers.lock().unwrap().push(trigger);
        if self.fail {
            return Err(PluginError::Network("child unavailable".into()));
        }
        Ok(TriggerResponse {
            status: 201,
            headers: vec![("x-handled-by".into(), "recorder".into())],
            body: b"handled".to_vec(),
        })
    }
}

async fn start_gateway(
    handler: Arc<RecordingHandler>,
) -> (Arc<HttpGateway>, String, tokio::task::JoinHandle<Result<()>>) {
    let gateway = Arc::new(HttpGateway::bind("127.0.0.1:0").await.unwrap());
    let base = format!("http://{}", gateway.local_addr());

    let serving = gateway.clone();
    let task = tokio::spawn(async move { serving.start(handler).await });
    (gateway, base, task)
}

// ---------------------------------------------------------------------------
// Tests
// ---------------------------------------------------------------------------

#[tokio::test]
async fn http_requests_reach_the_handler() {
    let handler = Arc::new(RecordingHandler::default());
    let (gateway, base, task) = start_gateway(handler.clone()).await;

    let resp = reqwest::Client::new()
        .put(format!("{base}/orders/7?expand=true"))
        .header("x-custom", "yes")
        .body("hello")
        .send()
        .await
        .unwrap();

    assert_eq!(resp.status().as_u16(), 201);
    assert_eq!(resp.headers()["x-handled-by"], "recorder");
    assert_eq!(resp.text().await.unwrap(), "handled");

    {
        let triggers = handler.triggers.lock().unwrap();
        assert_eq!(triggers.len(), 1);
        match &triggers[0] {
            Trigger::Http(request) => {
                assert_eq!(request.method, "PUT");
                assert_eq!(request.path, "/orders/7");
                assert_eq!(request.query.as_deref(), Some("expand=true"));
                assert_eq!(request.header("x-custom"), Some("yes"));
                assert_eq!(request.body, b"hello");
            }
            other => panic!("expected http trigger, got {other:?}"),
        }
    }

    gateway.stop().await.unwrap();
    tokio::time::timeout(Duration::from_secs(5), task)
        .await
        .expect("gateway should stop")
        .unwrap()
        .unwrap();
}

#[tokio::test]
async fn subscription_deliveries_become_event_triggers() {
    let handler = Arc::new(RecordingHandler::default());
    let (gateway, base, _task) = start_gateway(handler.clone()).await;

    reqwest::Client::new()
        .post(format!("{base}/"))
        .header("x-nitric-request-id", "42")
        .header("x-nitric-payload-type", "OrderCreated")
        .header("x-nitric-source-type", "SUBSCRIPTION")
        .header("x-nitric-source", "orders")
        .body(r#"{"id":1}"#)
        .send()
        .await
        .unwrap();

    {
        let triggers = handler.triggers.lock().unwrap();
        match &triggers[0] {
            Trigger::Event { topic, event } => {
                assert_eq!(topic, "orders");
                assert_eq!(event.id, "42");
                assert_eq!(event.payload["id"], 1);
            }
            other => panic!("expected event trigger, got {other:?}"),
        }
    }

    gateway.stop().await.unwrap();
}

#[tokio::test]
async fn handler_errors_become_bad_gateway() {
    let handler = Arc::new(RecordingHandler {
        fail: true,
        ..Default::default()
    });
    let (gateway, base, _task) = start_gateway(handler).await;

    let resp = reqwest::get(format!("{base}/anything")).await.unwrap();
    assert_eq!(resp.status().as_u16(), 502);

    gateway.stop().await.unwrap();
}

#[tokio::test]
async fn stop_is_idempotent() {
    let gateway = HttpGateway::bind("127.0.0.1:0").await.unwrap();
    gateway.stop().await.unwrap();
    gateway.stop().await.unwrap();
}
