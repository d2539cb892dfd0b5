pub mod config;
pub mod decoding;
pub mod error;
pub mod logger;
pub mod models;
pub mod pipeline;

pub use config::DecoderConfig;
pub use decoding::Decoder;
pub use decoding::source::{FileImageSource, ImageSource};
pub use error::{DecodeError, Result};
pub use models::{Digit, Reading, SegmentActivation};
pub use pipeline::{BoundingBox, DebugConfig, Pipeline, PipelineContext, PipelineData, PipelineStep};
