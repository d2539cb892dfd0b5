pub mod enhance;
pub mod segment;
pub mod sampler;
pub mod matcher;
pub mod source;
pub mod steps;

use image::{DynamicImage, GrayImage};
use std::path::{Path, PathBuf};
use tracing::{debug, info};

use crate::config::DecoderConfig;
use crate::error::{DecodeError, Result};
use crate::models::Reading;
use crate::pipeline::{Pipeline, PipelineData};
use source::ImageSource;
use steps::*;

/// Main decoding orchestrator
///
/// Holds a validated configuration and the step pipeline built from it.
/// Decoding is all-or-nothing: a single unreadable character fails the whole
/// reading.
pub struct Decoder {
    config: DecoderConfig,
    pipeline: Pipeline,
}

impl Decoder {
    /// Validate the configuration and build the pipeline.
    pub fn new(config: DecoderConfig) -> Result<Self> {
        config.validate()?;
        let pipeline = build_standard_pipeline(&config);
        Ok(Self { config, pipeline })
    }

    /// Save every step's images under `output_dir` (must be empty or absent).
    pub fn with_debug(mut self, output_dir: PathBuf) -> Result<Self> {
        self.pipeline = self.pipeline.with_debug(output_dir)?;
        Ok(self)
    }

    pub fn config(&self) -> &DecoderConfig {
        &self.config
    }

    /// Decode an already cropped grayscale display strip.
    pub fn decode(&self, strip: &GrayImage) -> Result<Reading> {
        debug!(
            width = strip.width(),
            height = strip.height(),
            num_chars = self.config.num_chars,
            "decoding display strip"
        );

        // Layout problems surface here, before any enhancement work.
        segment::character_boxes(
            strip.width(),
            strip.height(),
            &self.config.layout,
            self.config.num_chars,
        )?;

        let cells = self.pipeline.run(strip.clone())?;
        let reading = assemble_reading(cells, self.config.num_chars)?;

        info!(reading = %reading, "display decoded");
        Ok(reading)
    }

    /// Decode an in-memory image that must already be 8-bit grayscale.
    pub fn decode_image(&self, image: DynamicImage) -> Result<Reading> {
        self.decode(&source::to_pixel_buffer(image)?)
    }

    /// Load the display through `source` and decode it.
    pub fn decode_file(&self, source: &impl ImageSource, path: &Path) -> Result<Reading> {
        let strip = source.load(path)?;
        self.decode(&strip)
    }
}

fn assemble_reading(cells: Vec<PipelineData>, num_chars: usize) -> Result<Reading> {
    if cells.len() != num_chars {
        return Err(DecodeError::LayoutConfigInvalid(format!(
            "expected {} characters, pipeline produced {}",
            num_chars,
            cells.len()
        )));
    }

    let mut digits = Vec::with_capacity(cells.len());
    let mut activations = Vec::with_capacity(cells.len());
    for cell in cells {
        match (cell.digit, cell.activation) {
            (Some(digit), Some(activation)) => {
                digits.push(digit);
                activations.push(activation);
            }
            _ => {
                return Err(DecodeError::LayoutConfigInvalid(format!(
                    "character {} left the pipeline undecoded",
                    cell.index
                )));
            }
        }
    }

    Ok(Reading { digits, activations })
}

/// Build the standard decoding pipeline for a configuration
pub fn build_standard_pipeline(config: &DecoderConfig) -> Pipeline {
    Pipeline::new()
        .add_step(Box::new(EnhanceStep {
            config: config.enhance,
        }))
        .add_step(Box::new(SegmentStep {
            layout: config.layout.clone(),
            num_chars: config.num_chars,
        }))
        .add_step(Box::new(SampleStep {
            geometry: config.segments.clone(),
            threshold: config.threshold,
        }))
        .add_step(Box::new(MatchStep))
}
