use image::GrayImage;
use std::path::{Path, PathBuf};
use tracing::debug;

use crate::error::{DecodeError, Result};
use crate::models::{Digit, SegmentActivation};

/// Bounding box in the display strip
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct BoundingBox {
    pub x: u32,
    pub y: u32,
    pub width: u32,
    pub height: u32,
}

/// Data that flows through the pipeline
/// Each PipelineData is either the whole display strip or one character cell
#[derive(Clone)]
pub struct PipelineData {
    /// Grayscale pixels for this item
    pub image: GrayImage,

    /// Position in the strip (None means the full strip)
    pub bbox: Option<BoundingBox>,

    /// Character position, 0 = leftmost
    pub index: usize,

    /// Set by the sampling step
    pub activation: Option<SegmentActivation>,

    /// Set by the matching step
    pub digit: Option<Digit>,
}

impl PipelineData {
    /// Create PipelineData for a full strip
    pub fn from_image(image: GrayImage) -> Self {
        Self {
            image,
            bbox: None,
            index: 0,
            activation: None,
            digit: None,
        }
    }

    /// Create PipelineData for one character cell
    pub fn from_region(image: GrayImage, index: usize, bbox: BoundingBox) -> Self {
        Self {
            image,
            bbox: Some(bbox),
            index,
            activation: None,
            digit: None,
        }
    }
}

/// Debug configuration for pipeline execution
#[derive(Clone, Debug)]
pub struct DebugConfig {
    /// Root directory for debug outputs
    pub output_dir: PathBuf,
}

/// Context available to all pipeline steps
#[derive(Clone, Default)]
pub struct PipelineContext {
    pub debug: Option<DebugConfig>,
}

/// Trait that all pipeline steps must implement
pub trait PipelineStep: Send + Sync {
    /// Process data and return transformed data
    /// Steps can split data (1 → many) or transform (many → many)
    fn process(&self, data: Vec<PipelineData>, context: &PipelineContext) -> Result<Vec<PipelineData>>;

    /// Human-readable name for this step (used in logs and debug directories)
    fn name(&self) -> &str;
}

/// Composable pipeline builder
pub struct Pipeline {
    steps: Vec<Box<dyn PipelineStep>>,
    context: PipelineContext,
}

impl Pipeline {
    /// Create a new empty pipeline
    pub fn new() -> Self {
        Self {
            steps: Vec::new(),
            context: PipelineContext::default(),
        }
    }

    /// Enable debug mode with output directory
    /// The directory must be empty or non-existent
    pub fn with_debug(mut self, output_dir: PathBuf) -> Result<Self> {
        let io_err = |e: std::io::Error| DecodeError::DebugOutput(e.to_string());

        if output_dir.exists() {
            let entries = std::fs::read_dir(&output_dir).map_err(io_err)?;
            if entries.count() > 0 {
                return Err(DecodeError::DebugOutput(format!(
                    "debug directory is not empty: {}",
                    output_dir.display()
                )));
            }
        } else {
            std::fs::create_dir_all(&output_dir).map_err(io_err)?;
        }

        self.context.debug = Some(DebugConfig { output_dir });
        Ok(self)
    }

    /// Add a processing step to the pipeline
    pub fn add_step(mut self, step: Box<dyn PipelineStep>) -> Self {
        self.steps.push(step);
        self
    }

    /// Step names in execution order
    pub fn step_names(&self) -> Vec<&str> {
        self.steps.iter().map(|step| step.name()).collect()
    }

    /// Run every step sequentially on the display strip
    pub fn run(&self, input: GrayImage) -> Result<Vec<PipelineData>> {
        let mut data = vec![PipelineData::from_image(input)];

        if let Some(debug_config) = &self.context.debug {
            save_debug_images(&debug_config.output_dir, "00_input", &data)?;
        }

        for (step_idx, step) in self.steps.iter().enumerate() {
            debug!(step = step.name(), items = data.len(), "running step");

            data = step.process(data, &self.context)?;

            if let Some(debug_config) = &self.context.debug {
                let step_dir_name = format!(
                    "{:02}_{}",
                    step_idx + 1,
                    step.name().to_lowercase().replace(' ', "_")
                );
                save_debug_images(&debug_config.output_dir, &step_dir_name, &data)?;
            }

            debug!(step = step.name(), items = data.len(), "step finished");
        }

        Ok(data)
    }
}

impl Default for Pipeline {
    fn default() -> Self {
        Self::new()
    }
}

fn save_debug_images(root: &Path, step_dir_name: &str, data: &[PipelineData]) -> Result<()> {
    let step_dir = root.join(step_dir_name);
    std::fs::create_dir_all(&step_dir).map_err(|e| DecodeError::DebugOutput(e.to_string()))?;

    for (idx, item) in data.iter().enumerate() {
        let output_path = step_dir.join(format!("{:02}.png", idx + 1));
        item.image
            .save(&output_path)
            .map_err(|e| DecodeError::DebugOutput(format!("{}: {}", output_path.display(), e)))?;
    }

    debug!(dir = step_dir_name, images = data.len(), "saved debug images");
    Ok(())
}
