//! HTTP server exposing the OCR pipeline.

use axum::body::Bytes;
use axum::extract::State;
use axum::http::StatusCode;
use axum::response::{IntoResponse, Response};
use axum::routing::post;
use axum::{Json, Router};
use ppocr_serve::core::constants::SERVER_PORT;
use ppocr_serve::Pipeline;
use serde::{Deserialize, Serialize};
use std::net::SocketAddr;
use std::sync::Arc;
use tower_http::trace::TraceLayer;
use tracing::info;

/// Application state shared across handlers.
struct AppState {
    pipeline: Arc<Pipeline>,
}

/// Body of a detection request.
#[derive(Debug, Deserialize)]
struct DetectRequest {
    /// URL of the image to run OCR on.
    link: String,
}

/// Body of a detection response.
#[derive(Debug, Serialize)]
struct DetectResponse {
    texts: Vec<String>,
    ret: i32,
}

impl DetectResponse {
    fn new(texts: Vec<String>) -> Self {
        Self { texts, ret: 1 }
    }
}

/// Runs the HTTP server until the process terminates.
///
/// The pipeline is built once by the caller and shared by every request
/// worker; it is never rebuilt per request.
pub async fn run_server(
    pipeline: Pipeline,
) -> Result<(), Box<dyn std::error::Error + Send + Sync>> {
    let state = Arc::new(AppState {
        pipeline: Arc::new(pipeline),
    });

    let app = router(state);

    let addr = SocketAddr::from(([0, 0, 0, 0], SERVER_PORT));
    info!("server listening on http://{addr}");
    info!("  POST /detect - OCR an image URL");

    let listener = tokio::net::TcpListener::bind(addr).await?;
    axum::serve(listener, app).await?;
    Ok(())
}

fn router(state: Arc<AppState>) -> Router {
    Router::new()
        .route("/detect", post(detect_handler))
        .layer(TraceLayer::new_for_http())
        .with_state(state)
}

/// OCR endpoint.
///
/// Malformed bodies answer 400 with no body. Everything else answers 200
/// with `{"texts": [...], "ret": 1}`; operational failures (fetch, decode,
/// predict) report as an empty `texts` array.
async fn detect_handler(State(state): State<Arc<AppState>>, body: Bytes) -> Response {
    let Some(link) = parse_detect_request(&body) else {
        return StatusCode::BAD_REQUEST.into_response();
    };

    let request_id = uuid::Uuid::new_v4();
    info!(%request_id, url = %link, "processing OCR request");

    let texts = crate::ocr::infer(state.pipeline.clone(), &link).await;
    info!(%request_id, regions = texts.len(), "OCR request complete");

    Json(DetectResponse::new(texts)).into_response()
}

/// Extracts the image URL from a request body.
///
/// Returns `None` for unparseable JSON or a missing `link` key.
fn parse_detect_request(body: &[u8]) -> Option<String> {
    serde_json::from_slice::<DetectRequest>(body)
        .ok()
        .map(|request| request.link)
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_parse_well_formed_body() {
        let link = parse_detect_request(br#"{"link": "http://host/receipt.jpg"}"#);
        assert_eq!(link.as_deref(), Some("http://host/receipt.jpg"));
    }

    #[test]
    fn test_parse_rejects_non_json() {
        assert!(parse_detect_request(b"not-json").is_none());
    }

    #[test]
    fn test_parse_rejects_missing_link() {
        assert!(parse_detect_request(br#"{"url": "http://host/a.jpg"}"#).is_none());
    }

    #[test]
    fn test_parse_rejects_non_string_link() {
        assert!(parse_detect_request(br#"{"link": 7}"#).is_none());
    }

    #[test]
    fn test_parse_ignores_extra_keys() {
        let link = parse_detect_request(br#"{"link": "http://h/x.png", "other": true}"#);
        assert_eq!(link.as_deref(), Some("http://h/x.png"));
    }

    #[test]
    fn test_response_shape() {
        let empty = serde_json::to_value(DetectResponse::new(Vec::new())).unwrap();
        assert_eq!(empty, serde_json::json!({"texts": [], "ret": 1}));

        let filled =
            serde_json::to_value(DetectResponse::new(vec!["TOTAL".into(), "12.34".into()]))
                .unwrap();
        assert_eq!(
            filled,
            serde_json::json!({"texts": ["TOTAL", "12.34"], "ret": 1})
        );
    }
}
