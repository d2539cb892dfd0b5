use std::path::PathBuf;

use image::ColorType;
use thiserror::Error;

use crate::models::SegmentActivation;

#[derive(Error, Debug)]
pub enum DecodeError {
    #[error("Input file not found: {}", .0.display())]
    InputNotFound(PathBuf),

    #[error("Failed to load image: {0}")]
    ImageLoad(#[from] image::ImageError),

    #[error("Input is not single-channel 8-bit grayscale (got {0:?})")]
    InvalidChannelDepth(ColorType),

    #[error("Invalid layout configuration: {0}")]
    LayoutConfigInvalid(String),

    #[error(
        "Sample window for segment {segment} at ({x}, {y}) exceeds the {width}x{height} character cell"
    )]
    SegmentSampleOutOfBounds {
        segment: usize,
        x: u32,
        y: u32,
        width: u32,
        height: u32,
    },

    #[error("No digit template matches segment pattern {activation} at character {index}")]
    NoMatchingTemplate {
        index: usize,
        activation: SegmentActivation,
    },

    #[error("Failed to read config file {}: {source}", .path.display())]
    ConfigRead {
        path: PathBuf,
        #[source]
        source: std::io::Error,
    },

    #[error("Failed to parse config: {0}")]
    ConfigParse(#[from] serde_json::Error),

    #[error("Failed to write debug output: {0}")]
    DebugOutput(String),
}

impl DecodeError {
    /// True when the image was read but a character matched no digit.
    pub fn is_indeterminate(&self) -> bool {
        matches!(self, DecodeError::NoMatchingTemplate { .. })
    }

    /// True for failures caused by the configuration or buffer shape rather
    /// than by what the display showed.
    pub fn is_configuration_error(&self) -> bool {
        matches!(
            self,
            DecodeError::InvalidChannelDepth(_)
                | DecodeError::LayoutConfigInvalid(_)
                | DecodeError::SegmentSampleOutOfBounds { .. }
                | DecodeError::ConfigRead { .. }
                | DecodeError::ConfigParse(_)
        )
    }
}

pub type Result<T> = std::result::Result<T, DecodeError>;
