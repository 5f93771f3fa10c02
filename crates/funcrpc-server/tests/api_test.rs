//! Integration test: start the server on a random port and exercise both
//! HTTP paths and the duplex channel.

use std::convert::Infallible;
use std::net::SocketAddr;
use std::sync::atomic::{AtomicU64, Ordering};
use std::sync::Arc;
use std::time::Duration;

use futures::{SinkExt, StreamExt};
use funcrpc_core::types::{
    APPLICATION_ERROR, INVALID_PARAMS, METHOD_NOT_FOUND, PARSE_ERROR, URI_CALL_ID,
};
use funcrpc_core::{
    Bytes, CallContext, DuplexPolicy, MethodOption, MethodRegistry, RpcRouter,
};
use funcrpc_server::{ServerConfig, WebSocketConfig};
use serde_json::{json, Value};
use tokio_tungstenite::tungstenite::Message;

async fn add(a: i64, b: i64) -> Result<i64, Infallible> {
    Ok(a + b)
}

async fn echo(message: String) -> Result<String, Infallible> {
    Ok(message)
}

async fn tx_size(tx: Bytes) -> Result<usize, String> {
    if tx.is_empty() {
        return Err("tx is empty".into());
    }
    Ok(tx.len())
}

async fn version_one() -> Result<&'static str, Infallible> {
    Ok("v1")
}

async fn version_two() -> Result<&'static str, Infallible> {
    Ok("v2")
}

async fn slow(ms: u64) -> Result<u64, Infallible> {
    tokio::time::sleep(Duration::from_millis(ms)).await;
    Ok(ms)
}

async fn subscribe(ctx: CallContext, query: String) -> Result<&'static str, String> {
    let channel = ctx
        .channel()
        .ok_or_else(|| "subscribe requires the duplex channel".to_string())?;
    channel
        .notify("event", json!({ "query": query }))
        .await
        .map_err(|e| e.to_string())?;
    Ok("subscribed")
}

fn registry(counter: Arc<AtomicU64>) -> MethodRegistry {
    let mut registry = MethodRegistry::new();
    registry.register("add", add, "a,b", &[]).unwrap();
    registry.register("echo", echo, "message", &[]).unwrap();
    registry.register("tx_size", tx_size, "tx", &[]).unwrap();
    registry.register("version", version_one, "", &[]).unwrap();
    registry.register("version", version_two, "", &[]).unwrap();
    let bumped = counter.clone();
    registry
        .register(
            "increment",
            move |by: u64| {
                let bumped = bumped.clone();
                async move { Ok::<_, Infallible>(bumped.fetch_add(by, Ordering::SeqCst) + by) }
            },
            "by",
            &[],
        )
        .unwrap();
    registry
        .register(
            "counter",
            move || {
                let counter = counter.clone();
                async move { Ok::<_, Infallible>(counter.load(Ordering::SeqCst)) }
            },
            "",
            &[MethodOption::Cacheable],
        )
        .unwrap();
    registry.register_duplex("slow", slow, "ms", &[]).unwrap();
    registry
        .register_duplex("subscribe", subscribe, "query", &[])
        .unwrap();
    registry
}

async fn start(policy: DuplexPolicy) -> (String, Arc<AtomicU64>) {
    let counter = Arc::new(AtomicU64::new(1));
    let config = ServerConfig {
        host: "127.0.0.1".to_string(),
        port: 0, // random port
        duplex_policy: policy,
        websocket: WebSocketConfig::default(),
    };
    let addr: SocketAddr =
        funcrpc_server::start_server(config, RpcRouter::new(registry(counter.clone())))
            .await
            .unwrap();
    (format!("http://{}", addr), counter)
}

async fn rpc(client: &reqwest::Client, base: &str, body: Value) -> Value {
    client
        .post(format!("{}/", base))
        .json(&body)
        .send()
        .await
        .unwrap()
        .json()
        .await
        .unwrap()
}

#[tokio::test]
async fn per_method_get_reads_query_values() {
    let (base, _) = start(DuplexPolicy::Shared).await;
    let resp = reqwest::get(format!("{}/add?a=2&b=3", base)).await.unwrap();
    assert_eq!(resp.status(), 200);

    let body: Value = resp.json().await.unwrap();
    assert_eq!(body["jsonrpc"], "2.0");
    assert_eq!(body["id"], URI_CALL_ID);
    assert_eq!(body["result"], 5);
    assert!(body.get("error").is_none());
}

#[tokio::test]
async fn per_method_post_reads_form_body() {
    let (base, _) = start(DuplexPolicy::Shared).await;
    let client = reqwest::Client::new();
    let body: Value = client
        .post(format!("{}/echo", base))
        .form(&[("message", "\"hello world\"")])
        .send()
        .await
        .unwrap()
        .json()
        .await
        .unwrap();
    assert_eq!(body["result"], "hello world");
}

#[tokio::test]
async fn both_transports_agree() {
    let (base, _) = start(DuplexPolicy::Shared).await;
    let client = reqwest::Client::new();

    let cases = [
        ("add?a=-4&b=10", json!({"method": "add", "params": [-4, 10]})),
        ("echo?message=abc", json!({"method": "echo", "params": ["abc"]})),
        ("tx_size?tx=0xDEADBEEF", json!({"method": "tx_size", "params": {"tx": "0xDEADBEEF"}})),
    ];

    for (path, call) in cases {
        let http: Value = reqwest::get(format!("{}/{}", base, path))
            .await
            .unwrap()
            .json()
            .await
            .unwrap();

        let mut request = call.clone();
        request["jsonrpc"] = json!("2.0");
        request["id"] = json!(1);
        let json_rpc = rpc(&client, &base, request).await;

        assert_eq!(http["result"], json_rpc["result"], "mismatch for {}", path);
        assert!(!http["result"].is_null());
    }
}

#[tokio::test]
async fn per_method_argument_errors_are_bad_requests() {
    let (base, _) = start(DuplexPolicy::Shared).await;

    let missing = reqwest::get(format!("{}/add?a=1", base)).await.unwrap();
    assert_eq!(missing.status(), 400);
    let body: Value = missing.json().await.unwrap();
    assert_eq!(body["error"]["code"], INVALID_PARAMS);
    assert!(body["error"]["message"].as_str().unwrap().contains("b"));

    let bad_type = reqwest::get(format!("{}/add?a=1&b=two", base)).await.unwrap();
    assert_eq!(bad_type.status(), 400);

    let bad_bytes = reqwest::get(format!("{}/tx_size?tx=nothex", base)).await.unwrap();
    assert_eq!(bad_bytes.status(), 400);
}

#[tokio::test]
async fn unknown_method_is_not_found_on_both_transports() {
    let (base, _) = start(DuplexPolicy::Shared).await;
    let client = reqwest::Client::new();

    let resp = reqwest::get(format!("{}/doesNotExist", base)).await.unwrap();
    assert_eq!(resp.status(), 404);
    let body: Value = resp.json().await.unwrap();
    assert_eq!(body["error"]["code"], METHOD_NOT_FOUND);

    let body = rpc(
        &client,
        &base,
        json!({"jsonrpc": "2.0", "id": 1, "method": "doesNotExist"}),
    )
    .await;
    assert_eq!(body["error"]["code"], METHOD_NOT_FOUND);
}

#[tokio::test]
async fn batch_with_notification_returns_two_entries() {
    let (base, _) = start(DuplexPolicy::Shared).await;
    let client = reqwest::Client::new();

    let body = rpc(
        &client,
        &base,
        json!([
            {"jsonrpc": "2.0", "id": "a", "method": "add", "params": [1, 2]},
            {"jsonrpc": "2.0", "method": "echo", "params": ["ignored"]},
            {"jsonrpc": "2.0", "id": "b", "method": "echo", "params": ["x"]}
        ]),
    )
    .await;

    let entries = body.as_array().unwrap();
    assert_eq!(entries.len(), 2);
    assert_eq!(entries[0]["id"], "a");
    assert_eq!(entries[0]["result"], 3);
    assert_eq!(entries[1]["id"], "b");
    assert_eq!(entries[1]["result"], "x");
}

#[tokio::test]
async fn notification_only_body_is_no_content() {
    let (base, _) = start(DuplexPolicy::Shared).await;
    let resp = reqwest::Client::new()
        .post(format!("{}/", base))
        .json(&json!({"jsonrpc": "2.0", "method": "add", "params": [1, 2]}))
        .send()
        .await
        .unwrap();
    assert_eq!(resp.status(), 204);
}

#[tokio::test]
async fn notifications_run_their_method() {
    let (base, counter) = start(DuplexPolicy::Shared).await;
    let client = reqwest::Client::new();

    let resp = client
        .post(format!("{}/", base))
        .json(&json!({"jsonrpc": "2.0", "method": "increment", "params": [10]}))
        .send()
        .await
        .unwrap();
    assert_eq!(resp.status(), 204);
    assert_eq!(counter.load(Ordering::SeqCst), 11);

    let body = rpc(
        &client,
        &base,
        json!([
            {"jsonrpc": "2.0", "method": "increment", "params": {"by": 100}},
            {"jsonrpc": "2.0", "id": "read", "method": "echo", "params": ["x"]}
        ]),
    )
    .await;
    let entries = body.as_array().unwrap();
    assert_eq!(entries.len(), 1);
    assert_eq!(entries[0]["id"], "read");
    assert_eq!(counter.load(Ordering::SeqCst), 111);
}

#[tokio::test]
async fn non_utf8_body_is_a_parse_error() {
    let (base, _) = start(DuplexPolicy::Shared).await;
    let mut body = br#"{"jsonrpc":"2.0","id":1,"method":"echo","params":[""#.to_vec();
    body.push(0xFF);
    body.extend_from_slice(br#""]}"#);

    let body: Value = reqwest::Client::new()
        .post(format!("{}/", base))
        .header("content-type", "application/json")
        .body(body)
        .send()
        .await
        .unwrap()
        .json()
        .await
        .unwrap();
    assert_eq!(body["error"]["code"], PARSE_ERROR);
    assert!(body.get("result").is_none());
}

#[tokio::test]
async fn malformed_body_is_a_parse_error() {
    let (base, _) = start(DuplexPolicy::Shared).await;
    let body: Value = reqwest::Client::new()
        .post(format!("{}/", base))
        .body("[{\"jsonrpc\": ")
        .send()
        .await
        .unwrap()
        .json()
        .await
        .unwrap();
    assert_eq!(body["error"]["code"], PARSE_ERROR);
}

#[tokio::test]
async fn application_errors_are_separate_from_protocol_errors() {
    let (base, _) = start(DuplexPolicy::Shared).await;

    let resp = reqwest::get(format!("{}/tx_size?tx=0x", base)).await.unwrap();
    assert_eq!(resp.status(), 500);
    let body: Value = resp.json().await.unwrap();
    assert_eq!(body["error"]["code"], APPLICATION_ERROR);
    assert_eq!(body["error"]["message"], "tx is empty");

    let body = rpc(
        &reqwest::Client::new(),
        &base,
        json!({"jsonrpc": "2.0", "id": 9, "method": "tx_size", "params": ["0x"]}),
    )
    .await;
    assert_eq!(body["id"], 9);
    assert_eq!(body["error"]["code"], APPLICATION_ERROR);
}

#[tokio::test]
async fn second_registration_is_the_one_served() {
    let (base, _) = start(DuplexPolicy::Shared).await;
    let body: Value = reqwest::get(format!("{}/version", base))
        .await
        .unwrap()
        .json()
        .await
        .unwrap();
    assert_eq!(body["result"], "v2");
}

#[tokio::test]
async fn cacheable_methods_return_live_values() {
    let (base, counter) = start(DuplexPolicy::Shared).await;
    let client = reqwest::Client::new();
    let call = json!({"jsonrpc": "2.0", "id": 1, "method": "counter"});

    assert_eq!(rpc(&client, &base, call.clone()).await["result"], 1);
    counter.store(5, Ordering::SeqCst);
    assert_eq!(rpc(&client, &base, call).await["result"], 5);

    let listing: Value = reqwest::get(format!("{}/", base))
        .await
        .unwrap()
        .json()
        .await
        .unwrap();
    let counter_info = listing["methods"]
        .as_array()
        .unwrap()
        .iter()
        .find(|m| m["name"] == "counter")
        .unwrap();
    assert_eq!(counter_info["cacheable"], true);
}

#[tokio::test]
async fn listing_describes_signatures() {
    let (base, _) = start(DuplexPolicy::Shared).await;
    let listing: Value = reqwest::get(format!("{}/", base))
        .await
        .unwrap()
        .json()
        .await
        .unwrap();
    let subscribe = listing["methods"]
        .as_array()
        .unwrap()
        .iter()
        .find(|m| m["name"] == "subscribe")
        .unwrap();
    assert_eq!(subscribe["duplex"], true);
    assert_eq!(subscribe["params"], json!([{"name": "query", "type": "string"}]));
}

#[tokio::test]
async fn channel_only_policy_hides_duplex_methods_from_http() {
    let (base, _) = start(DuplexPolicy::ChannelOnly).await;
    let resp = reqwest::get(format!("{}/slow?ms=1", base)).await.unwrap();
    assert_eq!(resp.status(), 404);

    let shared = start(DuplexPolicy::Shared).await.0;
    let resp = reqwest::get(format!("{}/slow?ms=1", shared)).await.unwrap();
    assert_eq!(resp.status(), 200);
}

// ---------------------------------------------------------------------------
// Duplex channel
// ---------------------------------------------------------------------------

type WsStream =
    tokio_tungstenite::WebSocketStream<tokio_tungstenite::MaybeTlsStream<tokio::net::TcpStream>>;

async fn connect(base: &str) -> WsStream {
    let url = format!("{}/websocket", base.replacen("http", "ws", 1));
    let (ws, _) = tokio_tungstenite::connect_async(url).await.unwrap();
    ws
}

async fn send(ws: &mut WsStream, body: Value) {
    ws.send(Message::text(body.to_string())).await.unwrap();
}

async fn next_json(ws: &mut WsStream) -> Value {
    let read = async {
        loop {
            let msg = ws.next().await.expect("stream ended").expect("read failed");
            if let Message::Text(text) = msg {
                return serde_json::from_str::<Value>(text.as_str()).unwrap();
            }
        }
    };
    tokio::time::timeout(Duration::from_secs(5), read)
        .await
        .expect("timed out waiting for a frame")
}

#[tokio::test]
async fn duplex_responses_correlate_by_id() {
    let (base, _) = start(DuplexPolicy::Shared).await;
    let mut ws = connect(&base).await;

    send(&mut ws, json!({"jsonrpc": "2.0", "id": 1, "method": "slow", "params": [300]})).await;
    send(&mut ws, json!({"jsonrpc": "2.0", "id": 2, "method": "slow", "params": {"ms": 1}})).await;
    send(&mut ws, json!({"jsonrpc": "2.0", "id": 3, "method": "add", "params": [1, 2]})).await;

    let mut responses = Vec::new();
    for _ in 0..3 {
        responses.push(next_json(&mut ws).await);
    }
    let by_id = |id: i64| responses.iter().find(|r| r["id"] == id).unwrap().clone();

    assert_eq!(by_id(1)["result"], 300);
    assert_eq!(by_id(2)["result"], 1);
    // not duplex-enabled
    assert_eq!(by_id(3)["error"]["code"], METHOD_NOT_FOUND);
    // the slow call finished last
    assert_eq!(responses[2]["id"], 1);
}

#[tokio::test]
async fn duplex_methods_can_push_notifications() {
    let (base, _) = start(DuplexPolicy::ChannelOnly).await;
    let mut ws = connect(&base).await;

    send(
        &mut ws,
        json!({"jsonrpc": "2.0", "id": "s", "method": "subscribe", "params": ["tm.event='Tx'"]}),
    )
    .await;

    let event = next_json(&mut ws).await;
    assert_eq!(event["method"], "event");
    assert_eq!(event["params"]["query"], "tm.event='Tx'");
    assert!(event.get("id").is_none());

    let resp = next_json(&mut ws).await;
    assert_eq!(resp["id"], "s");
    assert_eq!(resp["result"], "subscribed");
}

#[tokio::test]
async fn duplex_batches_and_parse_errors() {
    let (base, _) = start(DuplexPolicy::Shared).await;
    let mut ws = connect(&base).await;

    ws.send(Message::text("not json")).await.unwrap();
    let err = next_json(&mut ws).await;
    assert_eq!(err["error"]["code"], PARSE_ERROR);

    send(
        &mut ws,
        json!([
            {"jsonrpc": "2.0", "id": "a", "method": "slow", "params": [1]},
            {"jsonrpc": "2.0", "method": "slow", "params": [1]},
            {"jsonrpc": "2.0", "id": "b", "method": "slow", "params": [2]}
        ]),
    )
    .await;
    let batch = next_json(&mut ws).await;
    let entries = batch.as_array().unwrap();
    assert_eq!(entries.len(), 2);
    assert_eq!(entries[0]["id"], "a");
    assert_eq!(entries[1]["id"], "b");
}

#[tokio::test]
async fn duplex_close_is_answered() {
    let (base, _) = start(DuplexPolicy::Shared).await;
    let mut ws = connect(&base).await;

    send(&mut ws, json!({"jsonrpc": "2.0", "id": 1, "method": "slow", "params": [1]})).await;
    assert_eq!(next_json(&mut ws).await["result"], 1);

    ws.send(Message::Close(None)).await.unwrap();
    let reply = tokio::time::timeout(Duration::from_secs(5), async {
        loop {
            match ws.next().await {
                Some(Ok(Message::Close(_))) => return true,
                Some(Ok(_)) => continue,
                _ => return false,
            }
        }
    })
    .await
    .expect("timed out waiting for close reply");
    assert!(reply, "session ended without a close reply");
}
