//! Constants used throughout the serving pipeline.

/// File name of the serialized inference graph inside a stage model
/// directory.
pub const MODEL_GRAPH_FILE: &str = "inference.pdmodel";

/// File name of the serialized weights inside a stage model directory.
pub const MODEL_WEIGHTS_FILE: &str = "inference.pdiparams";

/// Name of the input tensor shared by all three stage models.
pub const MODEL_INPUT_NAME: &str = "x";

/// Port the HTTP server listens on.
pub const SERVER_PORT: u16 = 18080;

/// Wall-clock bound for a single image download, in seconds.
pub const FETCH_TIMEOUT_SECS: u64 = 10;

/// Default batch size for the orientation classifier stage.
pub const DEFAULT_CLS_BATCH_SIZE: i32 = 1;

/// Default batch size for the recognizer stage.
pub const DEFAULT_REC_BATCH_SIZE: i32 = 6;

/// Default bound on the longer image side during detection preprocessing.
pub const DEFAULT_MAX_SIDE_LEN: u32 = 960;

/// Input shape (channels, height, width) of the orientation classifier.
pub const CLS_IMAGE_SHAPE: (u32, u32, u32) = (3, 48, 192);

/// Base input shape (channels, height, width) of the recognizer; the
/// width stretches with the widest crop in a batch.
pub const REC_IMAGE_SHAPE: (u32, u32, u32) = (3, 48, 320);
