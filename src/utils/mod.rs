//! Utility functions for the serving pipeline.

pub mod transform;

pub use transform::{get_rotate_crop_image, Point2f};

/// Initializes the global tracing subscriber.
///
/// Diagnostics go to stderr; the filter honors `RUST_LOG` and defaults to
/// `info`.
pub fn init_tracing() {
    let filter = tracing_subscriber::EnvFilter::try_from_default_env()
        .unwrap_or_else(|_| tracing_subscriber::EnvFilter::new("info"));
    tracing_subscriber::fmt()
        .with_env_filter(filter)
        .with_writer(std::io::stderr)
        .init();
}
