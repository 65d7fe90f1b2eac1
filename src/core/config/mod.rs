//! Configuration types for the inference runtime.

mod runtime;

pub use runtime::{Backend, Device, RuntimeOption, TrtShapeProfile};
