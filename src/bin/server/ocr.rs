//! Per-request inference: fetch, decode, predict.

use ppocr_serve::fetch::fetch_image;
use ppocr_serve::Pipeline;
use std::sync::Arc;
use tracing::{debug, error};

/// Runs the pipeline on the image behind `url`.
///
/// Every failure mode collapses into an empty list: nothing fetched,
/// undecodable bytes, or a predict error (the latter with a diagnostic).
/// On success the strings come back in detector-emission order.
pub async fn infer(pipeline: Arc<Pipeline>, url: &str) -> Vec<String> {
    let bytes = fetch_image(url).await;
    if bytes.is_empty() {
        return Vec::new();
    }

    let image = match image::load_from_memory(&bytes) {
        Ok(image) => image.to_rgb8(),
        Err(e) => {
            debug!(url, "failed to decode fetched bytes: {e}");
            return Vec::new();
        }
    };

    // Inference is synchronous and unbounded; keep it off the async
    // workers.
    let result = tokio::task::spawn_blocking(move || pipeline.predict(&image)).await;

    match result {
        Ok(Ok(ocr)) => ocr.texts,
        Ok(Err(e)) => {
            error!("failed to predict: {e}");
            Vec::new()
        }
        Err(e) => {
            error!("inference task failed: {e}");
            Vec::new()
        }
    }
}
