use std::collections::HashMap;
use std::time::Duration;

use bytes::Bytes;
use serde_json::{json, Value};
use tokio::task::JoinHandle;

use actionrt_frame::Multipart;
use actionrt_server::{
    Component, LateReplyPolicy, ReactorStats, ReplyEnvelope, ReplySink, RequestState, Server,
    ServerConfig, ServerError,
};
use actionrt_transport::{DealerSocket, Endpoint, TransportContext, TransportError};

const TITLE: &str = "service \"users\" (1.0.0)";
const QUIET: Duration = Duration::from_millis(300);

struct Harness {
    context: TransportContext,
    endpoint: Endpoint,
    stats: std::sync::Arc<ReactorStats>,
    task: JoinHandle<Result<(), ServerError>>,
}

impl Harness {
    async fn start(config: ServerConfig) -> Self {
        let server = Server::new(component(), config);
        let stats = server.stats();
        let context = TransportContext::new();
        let bound = server.bind(&context).await.unwrap();
        let endpoint = bound.local_endpoint().clone();
        let task = tokio::spawn(bound.run());
        Self {
            context,
            endpoint,
            stats,
            task,
        }
    }

    async fn spawn() -> Self {
        Self::start(config()).await
    }

    async fn client(&self) -> DealerSocket {
        DealerSocket::connect(&self.endpoint).await.unwrap()
    }

    async fn stop(self) {
        self.context.terminate();
        let result = tokio::time::timeout(Duration::from_secs(3), self.task)
            .await
            .expect("server did not stop")
            .unwrap();
        assert!(result.is_ok());
    }
}

fn config() -> ServerConfig {
    ServerConfig::new(TITLE, Endpoint::tcp_local(0))
        .with_timeout(Duration::from_millis(200))
        .with_poll_interval(Duration::from_millis(50))
}

fn component() -> Component {
    Component::new()
        .action("echo", |state: RequestState, sink: ReplySink| async move {
            sink.reply(&Value::Object(state.command().params.clone()));
        })
        .action("delayed", |state: RequestState, sink: ReplySink| async move {
            let ms = state
                .command()
                .param("ms")
                .and_then(Value::as_u64)
                .unwrap_or(0);
            tokio::time::sleep(Duration::from_millis(ms)).await;
            sink.reply(&json!({"request_id": state.request_id()}));
        })
        .action("hang", |_state: RequestState, sink: ReplySink| async move {
            tokio::time::sleep(Duration::from_secs(30)).await;
            sink.reply(&"never");
        })
        .action("schema", |state: RequestState, sink: ReplySink| async move {
            sink.reply(&**state.schemas());
        })
        .action("fail", |_state: RequestState, sink: ReplySink| async move {
            sink.fail("user not found");
        })
        .action("forget", |_state: RequestState, _sink: ReplySink| async move {})
        .action("tuple-keys", |_state: RequestState, sink: ReplySink| async move {
            // JSON object keys must be strings.
            let result: HashMap<(i32, i32), i32> = HashMap::from([((1, 2), 3)]);
            sink.reply(&result);
        })
}

fn request(request_id: &str, action: &str, schema: Option<Value>, params: Option<Value>) -> Multipart {
    let mut message = Multipart::from_parts([
        Bytes::new(),
        Bytes::copy_from_slice(request_id.as_bytes()),
        Bytes::copy_from_slice(action.as_bytes()),
    ]);
    if schema.is_some() || params.is_some() {
        message.push(
            schema
                .map(|schema| Bytes::from(schema.to_string()))
                .unwrap_or_default(),
        );
    }
    if let Some(params) = params {
        message.push(Bytes::from(json!({ "name": action, "params": params }).to_string()));
    }
    message
}

async fn reply(client: &mut DealerSocket) -> ReplyEnvelope {
    let message = client.recv_timeout(Duration::from_secs(3)).await.unwrap();
    let parts = message.into_parts();
    assert_eq!(parts.len(), 2, "reply must be [<empty>, body]");
    assert!(parts[0].is_empty());
    serde_json::from_slice(&parts[1]).unwrap()
}

async fn assert_silent(client: &mut DealerSocket) {
    match client.recv_timeout(QUIET).await {
        Err(TransportError::Timeout(_)) => {}
        other => panic!("expected no reply, got {other:?}"),
    }
}

#[tokio::test]
async fn happy_path_returns_handler_reply_for_same_request() {
    let harness = Harness::spawn().await;
    let mut client = harness.client().await;

    client
        .send(request("r-1", "echo", None, Some(json!({"text": "hi"}))))
        .await
        .unwrap();

    let envelope = reply(&mut client).await;
    assert_eq!(envelope.request_id, "r-1");
    assert_eq!(envelope.result, Some(json!({"text": "hi"})));
    assert!(envelope.error.is_none());
    assert_silent(&mut client).await;
    assert_eq!(harness.stats.replies_sent(), 1);

    harness.stop().await;
}

#[tokio::test]
async fn unknown_action_gets_one_error_reply_naming_component_and_action() {
    let harness = Harness::spawn().await;
    let mut client = harness.client().await;

    client.send(request("r-2", "drop", None, None)).await.unwrap();

    let envelope = reply(&mut client).await;
    assert_eq!(envelope.request_id, "r-2");
    assert!(envelope.result.is_none());
    let error = envelope.error.unwrap();
    assert_eq!(
        error.message,
        format!("Invalid action for component {TITLE}: \"drop\"")
    );
    assert_eq!(error.status, "500 Internal Server Error");
    assert_silent(&mut client).await;
    assert_eq!(harness.stats.error_replies(), 1);
    assert_eq!(harness.stats.requests_dispatched(), 0);

    harness.stop().await;
}

#[tokio::test]
async fn undecodable_payload_gets_error_reply() {
    let harness = Harness::spawn().await;
    let mut client = harness.client().await;

    let mut message = request("r-3", "echo", None, None);
    message.push(Bytes::new());
    message.push(Bytes::from_static(b"{not json"));
    client.send(message).await.unwrap();

    let envelope = reply(&mut client).await;
    assert_eq!(
        envelope.error.unwrap().message,
        format!("Invalid payload for component {TITLE}: \"echo\"")
    );

    harness.stop().await;
}

#[tokio::test]
async fn unaddressable_messages_are_dropped_silently() {
    let harness = Harness::spawn().await;
    let mut client = harness.client().await;

    client
        .send(Multipart::from_parts(["only-one-frame"]))
        .await
        .unwrap();
    client
        .send(Multipart::from_parts(["not-empty", "r-4", "echo"]))
        .await
        .unwrap();
    client.send(Multipart::from_parts(["", ""])).await.unwrap();

    assert_silent(&mut client).await;
    assert_eq!(harness.stats.messages_received(), 3);
    assert_eq!(harness.stats.messages_dropped(), 3);
    assert_eq!(harness.stats.replies_sent(), 0);

    client
        .send(request("r-5", "echo", None, Some(json!({}))))
        .await
        .unwrap();
    assert_eq!(reply(&mut client).await.request_id, "r-5");

    harness.stop().await;
}

#[tokio::test]
async fn request_without_action_gets_error_reply() {
    let harness = Harness::spawn().await;
    let mut client = harness.client().await;

    client
        .send(Multipart::from_parts(["", "r-6"]))
        .await
        .unwrap();

    let envelope = reply(&mut client).await;
    assert_eq!(envelope.request_id, "r-6");
    assert!(envelope
        .error
        .unwrap()
        .message
        .starts_with(&format!("Malformed request for component {TITLE}")));
    assert_eq!(harness.stats.messages_dropped(), 0);

    harness.stop().await;
}

#[tokio::test]
async fn handler_failure_becomes_error_reply() {
    let harness = Harness::spawn().await;
    let mut client = harness.client().await;

    client.send(request("r-7", "fail", None, None)).await.unwrap();

    let envelope = reply(&mut client).await;
    assert_eq!(envelope.request_id, "r-7");
    assert_eq!(envelope.error.unwrap().message, "user not found");

    harness.stop().await;
}

#[tokio::test]
async fn timed_out_request_gets_no_reply_and_reactor_keeps_serving() {
    let harness = Harness::spawn().await;
    let mut client = harness.client().await;

    client.send(request("r-8", "hang", None, None)).await.unwrap();
    assert_silent(&mut client).await;
    assert_eq!(harness.stats.timeouts(), 1);

    client
        .send(request("r-9", "echo", None, Some(json!({"after": "timeout"}))))
        .await
        .unwrap();
    let envelope = reply(&mut client).await;
    assert_eq!(envelope.request_id, "r-9");
    assert_eq!(envelope.result, Some(json!({"after": "timeout"})));

    harness.stop().await;
}

#[tokio::test]
async fn late_replies_are_logged_but_never_delivered() {
    let harness = Harness::start(config().with_late_replies(LateReplyPolicy::Log)).await;
    let mut client = harness.client().await;

    client
        .send(request("r-10", "delayed", None, Some(json!({"ms": 350}))))
        .await
        .unwrap();
    assert_silent(&mut client).await;
    assert_silent(&mut client).await;

    assert_eq!(harness.stats.timeouts(), 1);
    assert_eq!(harness.stats.late_replies(), 1);
    assert_eq!(harness.stats.replies_sent(), 0);

    harness.stop().await;
}

#[tokio::test]
async fn handler_that_drops_sink_yields_no_reply() {
    let harness = Harness::spawn().await;
    let mut client = harness.client().await;

    client.send(request("r-11", "forget", None, None)).await.unwrap();
    assert_silent(&mut client).await;
    assert_eq!(harness.stats.abandoned(), 1);
    assert_eq!(harness.stats.timeouts(), 0);

    harness.stop().await;
}

#[tokio::test]
async fn unserializable_reply_is_logged_and_not_sent() {
    let harness = Harness::spawn().await;
    let mut client = harness.client().await;

    client
        .send(request("r-12", "tuple-keys", None, None))
        .await
        .unwrap();
    assert_silent(&mut client).await;
    assert_eq!(harness.stats.serialization_failures(), 1);
    assert_eq!(harness.stats.replies_sent(), 0);
    assert_eq!(harness.stats.error_replies(), 0);

    client
        .send(request("r-13", "echo", None, Some(json!({"still": "serving"}))))
        .await
        .unwrap();
    assert_eq!(reply(&mut client).await.request_id, "r-13");

    harness.stop().await;
}

#[tokio::test]
async fn concurrent_requests_each_get_one_correlated_reply() {
    const N: u64 = 64;
    let harness = Harness::start(config().with_timeout(Duration::from_secs(5))).await;
    let mut client = harness.client().await;

    for i in 0..N {
        // Later requests finish first.
        let ms = (N - i) * 2;
        client
            .send(request(&format!("c-{i}"), "delayed", None, Some(json!({"ms": ms}))))
            .await
            .unwrap();
    }

    let mut seen = std::collections::BTreeSet::new();
    for _ in 0..N {
        let envelope = reply(&mut client).await;
        let echoed = envelope.result.unwrap()["request_id"]
            .as_str()
            .unwrap()
            .to_string();
        assert_eq!(echoed, envelope.request_id);
        assert!(seen.insert(envelope.request_id), "duplicate reply");
    }
    assert_eq!(seen.len() as u64, N);
    assert_silent(&mut client).await;

    harness.stop().await;
}

#[tokio::test]
async fn resending_the_same_schema_is_idempotent() {
    let harness = Harness::spawn().await;
    let mut client = harness.client().await;
    let schema = json!({"users": {"actions": {"read": {}}}});

    client
        .send(request("s-1", "schema", Some(schema.clone()), None))
        .await
        .unwrap();
    let first = reply(&mut client).await.result.unwrap();
    assert_eq!(first, schema);

    client
        .send(request("s-2", "schema", Some(schema.clone()), None))
        .await
        .unwrap();
    let second = reply(&mut client).await.result.unwrap();
    assert_eq!(second, first);

    // Requests without a schema frame keep the last snapshot.
    client.send(request("s-3", "schema", None, None)).await.unwrap();
    assert_eq!(reply(&mut client).await.result.unwrap(), first);

    harness.stop().await;
}

#[tokio::test]
async fn invalid_schema_keeps_previous_snapshot() {
    let harness = Harness::spawn().await;
    let mut client = harness.client().await;
    let schema = json!({"users": {"version": "1.0.0"}});

    client
        .send(request("s-4", "schema", Some(schema.clone()), None))
        .await
        .unwrap();
    reply(&mut client).await;

    let mut message = request("s-5", "schema", None, None);
    message.push(Bytes::from_static(b"[broken"));
    client.send(message).await.unwrap();
    assert_eq!(reply(&mut client).await.result.unwrap(), schema);

    harness.stop().await;
}

#[tokio::test]
async fn terminate_stops_loop_cleanly() {
    let harness = Harness::spawn().await;
    let mut client = harness.client().await;

    client
        .send(request("x-1", "hang", None, None))
        .await
        .unwrap();
    tokio::time::sleep(Duration::from_millis(50)).await;

    let context = harness.context.clone();
    let endpoint = harness.endpoint.clone();
    harness.stop().await;

    assert!(context.is_terminated());
    assert!(DealerSocket::connect(&endpoint).await.is_err());
}

#[tokio::test]
async fn run_on_terminated_context_reports_terminated() {
    let context = TransportContext::new();
    context.terminate();
    let result = Server::new(component(), config()).run(&context).await;
    assert!(matches!(result, Err(ServerError::Terminated)));
}

#[cfg(unix)]
#[tokio::test]
async fn serves_over_unix_socket_path() {
    let dir = tempfile::tempdir().unwrap();
    let path = dir.path().join("users.sock");
    let endpoint = Endpoint::Ipc(path.clone());

    let harness =
        Harness::start(ServerConfig::new(TITLE, endpoint).with_poll_interval(Duration::from_millis(50)))
            .await;
    let mut client = harness.client().await;
    client
        .send(request("u-1", "echo", None, Some(json!({"via": "uds"}))))
        .await
        .unwrap();
    assert_eq!(
        reply(&mut client).await.result,
        Some(json!({"via": "uds"}))
    );

    harness.stop().await;
    assert!(!path.exists(), "socket file removed on shutdown");
}
