use axum::Router;
use axum::body::Body;
use axum::http::{Request, StatusCode, header};
use http_body_util::BodyExt;
use ndmux_server::server::config::ServerConfig;
use ndmux_server::server::handler::EchoHandler;
use ndmux_server::server::routes::{AppState, CHUNK_ENCODING_HEADER, router};
use serde_json::{Value, json};
use std::io::Read;
use tower::ServiceExt;

fn app(max_batch_items: usize) -> Router {
    let config = ServerConfig {
        server_addr: "127.0.0.1:0".into(),
        batch_path: "/batch".into(),
        max_batch_items,
        stream_buffer_size: 8,
    };
    router(AppState::new(config, EchoHandler))
}

fn batch_request(body: &Value, disable_compression: bool) -> Request<Body> {
    let mut builder = Request::builder()
        .method("POST")
        .uri("/batch")
        .header(header::CONTENT_TYPE, "application/json");
    if disable_compression {
        builder = builder.header(CHUNK_ENCODING_HEADER, "deflate");
    }
    builder.body(Body::from(body.to_string())).unwrap()
}

async fn body_bytes(response: axum::response::Response) -> Vec<u8> {
    response
        .into_body()
        .collect()
        .await
        .expect("body stream must not fail")
        .to_bytes()
        .to_vec()
}

fn parse_records(raw: &[u8]) -> Vec<Value> {
    raw.split(|b| *b == b'\n')
        .filter(|line| !line.is_empty())
        .map(|line| serde_json::from_slice(line).expect("each line must be one JSON record"))
        .collect()
}

fn inflate(raw: &[u8]) -> Vec<u8> {
    let mut decoder = flate2::read::ZlibDecoder::new(raw);
    let mut out = Vec::new();
    decoder.read_to_end(&mut out).expect("valid zlib stream");
    out
}

#[tokio::test]
async fn per_item_failures_are_body_records_not_status() {
    let body = json!({ "batch": [ { "a": 1 }, { "fail": "nope" } ] });
    let response = app(100).oneshot(batch_request(&body, true)).await.unwrap();

    assert_eq!(response.status(), StatusCode::OK);
    assert_eq!(
        response.headers().get(header::CONTENT_TYPE).unwrap(),
        "application/x-ndjson"
    );
    assert_eq!(
        response.headers().get(header::CONNECTION).unwrap(),
        "keep-alive"
    );
    assert!(response.headers().get(header::CONTENT_ENCODING).is_none());

    let mut records = parse_records(&body_bytes(response).await);
    assert_eq!(records.len(), 2);
    records.sort_by_key(|r| r["id"].as_u64());

    assert_eq!(records[0]["result"], json!({ "a": 1 }));
    assert_eq!(records[1]["error"]["message"], "nope");
    assert_eq!(records[1]["error"]["code"], "echo_failure");
}

#[tokio::test]
async fn compression_is_on_unless_header_opts_out() {
    let body = json!({ "batch": [ { "a": 1 }, { "fail": "nope" } ] });

    let compressed = app(100).oneshot(batch_request(&body, false)).await.unwrap();
    assert_eq!(compressed.status(), StatusCode::OK);
    assert_eq!(
        compressed.headers().get(header::CONTENT_ENCODING).unwrap(),
        "deflate"
    );
    let compressed_bytes = body_bytes(compressed).await;

    let plain = app(100).oneshot(batch_request(&body, true)).await.unwrap();
    let plain_bytes = body_bytes(plain).await;

    // Toggling the header changes the bytes, not the logical records.
    assert_ne!(compressed_bytes, plain_bytes);
    let mut inflated = parse_records(&inflate(&compressed_bytes));
    let mut direct = parse_records(&plain_bytes);
    inflated.sort_by_key(|r| r["id"].as_u64());
    direct.sort_by_key(|r| r["id"].as_u64());
    assert_eq!(inflated, direct);
}

#[tokio::test]
async fn fast_item_overtakes_slow_item() {
    let body = json!({
        "batch": [
            { "op": "slow", "delay_ms": 100 },
            { "op": "fast", "delay_ms": 1 }
        ]
    });
    let response = app(100).oneshot(batch_request(&body, true)).await.unwrap();
    assert_eq!(response.status(), StatusCode::OK);

    let records = parse_records(&body_bytes(response).await);
    assert_eq!(records.len(), 2);
    assert_eq!(records[0]["id"], 1);
    assert_eq!(records[0]["result"]["op"], "fast");
    assert_eq!(records[1]["id"], 0);
    assert_eq!(records[1]["result"]["op"], "slow");
}

#[tokio::test]
async fn empty_batch_is_rejected_before_dispatch() {
    let body = json!({ "batch": [] });
    let response = app(100).oneshot(batch_request(&body, true)).await.unwrap();
    assert_eq!(response.status(), StatusCode::BAD_REQUEST);

    let error: Value = serde_json::from_slice(&body_bytes(response).await).unwrap();
    assert!(error["error"]["message"].is_string());
}

#[tokio::test]
async fn oversized_batch_is_rejected_before_dispatch() {
    let items: Vec<Value> = (0..5).map(|i| json!({ "i": i })).collect();
    let body = json!({ "batch": items });
    let response = app(4).oneshot(batch_request(&body, true)).await.unwrap();
    assert_eq!(response.status(), StatusCode::BAD_REQUEST);
}

#[tokio::test]
async fn malformed_body_is_a_client_error() {
    let request = Request::builder()
        .method("POST")
        .uri("/batch")
        .header(header::CONTENT_TYPE, "application/json")
        .body(Body::from("this is not json"))
        .unwrap();
    let response = app(100).oneshot(request).await.unwrap();
    assert!(response.status().is_client_error());

    // Well-formed JSON of the wrong shape is also rejected up front.
    let request = Request::builder()
        .method("POST")
        .uri("/batch")
        .header(header::CONTENT_TYPE, "application/json")
        .body(Body::from(r#"{ "items": [] }"#))
        .unwrap();
    let response = app(100).oneshot(request).await.unwrap();
    assert!(response.status().is_client_error());
}
