//! The batch route: request validation, encoding negotiation, and the
//! streamed NDJSON response.

use crate::server::config::ServerConfig;
use axum::{
    Json, Router,
    body::Body,
    extract::State,
    http::{HeaderMap, HeaderValue, StatusCode, header},
    response::{IntoResponse, Response},
    routing::post,
};
use ndmux::{BatchRequest, BatchStreamer, Encoding, ItemHandler};
use std::sync::Arc;
use tower_http::cors::{Any, CorsLayer};

/// Request header that disables response compression when set to exactly
/// `deflate`.
///
/// The polarity is inverted from `Accept-Encoding` conventions on purpose:
/// compression is the default and this header opts out of it. Preserved as
/// observable behavior from the protocol this server implements.
pub const CHUNK_ENCODING_HEADER: &str = "x-chunk-encoding";

/// Shared route state: the multiplexer instance plus the validated config.
pub struct AppState<H> {
    config: Arc<ServerConfig>,
    streamer: Arc<BatchStreamer<H>>,
}

impl<H> AppState<H>
where
    H: ItemHandler,
{
    pub fn new(config: ServerConfig, handler: H) -> Self {
        let streamer = BatchStreamer::new(handler).with_buffer(config.stream_buffer_size);
        Self {
            config: Arc::new(config),
            streamer: Arc::new(streamer),
        }
    }
}

impl<H> Clone for AppState<H> {
    fn clone(&self) -> Self {
        Self {
            config: Arc::clone(&self.config),
            streamer: Arc::clone(&self.streamer),
        }
    }
}

/// Builds the application router: one POST route at the configured path.
///
/// CORS is wide open because the expected caller is a browser client issuing
/// cross-origin batch requests.
pub fn router<H>(state: AppState<H>) -> Router
where
    H: ItemHandler,
{
    let path = state.config.batch_path.clone();
    Router::new()
        .route(&path, post(run_batch::<H>))
        .layer(
            CorsLayer::new()
                .allow_origin(Any)
                .allow_methods(Any)
                .allow_headers(Any),
        )
        .with_state(state)
}

/// Picks the response encoding from the request headers.
///
/// Absent header (or any other value) means deflate; the exact value
/// `deflate` means identity. See [`CHUNK_ENCODING_HEADER`].
pub fn negotiate_encoding(headers: &HeaderMap) -> Encoding {
    match headers.get(CHUNK_ENCODING_HEADER).and_then(|v| v.to_str().ok()) {
        Some("deflate") => Encoding::Identity,
        _ => Encoding::Deflate,
    }
}

/// Handles one batch request.
///
/// Validates batch bounds, dispatches every item, and answers 200 with a
/// streamed NDJSON body. Per-item failures are embedded in the body as error
/// records; the status line never reflects them.
async fn run_batch<H>(
    State(state): State<AppState<H>>,
    headers: HeaderMap,
    Json(batch): Json<BatchRequest>,
) -> Response
where
    H: ItemHandler,
{
    if batch.is_empty() {
        return reject(
            StatusCode::BAD_REQUEST,
            "batch must contain at least one item",
        );
    }

    if batch.len() > state.config.max_batch_items {
        return reject(
            StatusCode::BAD_REQUEST,
            format!(
                "batch size {} exceeds maximum allowed ({})",
                batch.len(),
                state.config.max_batch_items
            ),
        );
    }

    let encoding = negotiate_encoding(&headers);
    tracing::debug!(items = batch.len(), ?encoding, "dispatching batch");

    let stream = state.streamer.respond(batch, encoding);

    let mut response = Response::new(Body::from_stream(stream));
    response.headers_mut().insert(
        header::CONTENT_TYPE,
        HeaderValue::from_static("application/x-ndjson"),
    );
    response
        .headers_mut()
        .insert(header::CONNECTION, HeaderValue::from_static("keep-alive"));
    if encoding.is_deflate() {
        response.headers_mut().insert(
            header::CONTENT_ENCODING,
            HeaderValue::from_static("deflate"),
        );
    }
    response
}

fn reject(status: StatusCode, reason: impl Into<String>) -> Response {
    let body = serde_json::json!({ "error": { "message": reason.into() } });
    (status, Json(body)).into_response()
}
