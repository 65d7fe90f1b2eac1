//! The three stage models of the OCR pipeline.
//!
//! Each predictor wraps a session for one stage artifact together with the
//! stage's pre- and post-processing. Predictors are built once by the
//! pipeline builder and invoked concurrently afterwards.

pub mod angle_classification;
pub mod text_detection;
pub mod text_recognition;

pub use angle_classification::{AngleClassifier, AngleClassifierBuilder, Classification};
pub use text_detection::{DbDetector, DbDetectorBuilder};
pub use text_recognition::{Recognition, TextRecognizer, TextRecognizerBuilder};
