use crate::config::{CharacterLayout, EnhanceConfig, SegmentGeometry, ThresholdConfig};
use crate::decoding::{enhance, matcher, sampler, segment};
use crate::error::{DecodeError, Result};
use crate::pipeline::{PipelineContext, PipelineData, PipelineStep};
use tracing::debug;

/// CLAHE followed by the brightness/contrast remap
pub struct EnhanceStep {
    pub config: EnhanceConfig,
}

impl PipelineStep for EnhanceStep {
    fn process(&self, data: Vec<PipelineData>, _context: &PipelineContext) -> Result<Vec<PipelineData>> {
        Ok(data
            .into_iter()
            .map(|mut item| {
                item.image = enhance::enhance(&item.image, &self.config);
                item
            })
            .collect())
    }

    fn name(&self) -> &str {
        "Contrast Enhancement"
    }
}

/// Cut the strip into character cells - splits one image into `num_chars` cells
pub struct SegmentStep {
    pub layout: CharacterLayout,
    pub num_chars: usize,
}

impl PipelineStep for SegmentStep {
    fn process(&self, data: Vec<PipelineData>, _context: &PipelineContext) -> Result<Vec<PipelineData>> {
        let mut result = Vec::new();

        for item in data {
            for cell in segment::split_characters(&item.image, &self.layout, self.num_chars)? {
                result.push(PipelineData::from_region(cell.image, cell.index, cell.bbox));
            }
        }

        Ok(result)
    }

    fn name(&self) -> &str {
        "Character Segmentation"
    }
}

/// Sample the seven segments of every cell
pub struct SampleStep {
    pub geometry: SegmentGeometry,
    pub threshold: ThresholdConfig,
}

impl PipelineStep for SampleStep {
    fn process(&self, data: Vec<PipelineData>, _context: &PipelineContext) -> Result<Vec<PipelineData>> {
        let mut result = Vec::with_capacity(data.len());

        for mut item in data {
            let activation = sampler::sample_segments(&item.image, &self.geometry, &self.threshold)?;
            debug!(index = item.index, %activation, "segments sampled");
            item.activation = Some(activation);
            result.push(item);
        }

        Ok(result)
    }

    fn name(&self) -> &str {
        "Segment Sampling"
    }
}

/// Look up the digit for every cell; the first unmatched cell fails the run
pub struct MatchStep;

impl PipelineStep for MatchStep {
    fn process(&self, data: Vec<PipelineData>, _context: &PipelineContext) -> Result<Vec<PipelineData>> {
        let mut result = Vec::with_capacity(data.len());

        for mut item in data {
            let activation = item.activation.ok_or_else(|| {
                DecodeError::LayoutConfigInvalid(format!(
                    "character {} reached matching without being sampled",
                    item.index
                ))
            })?;

            let digit = matcher::match_digit(activation).ok_or(DecodeError::NoMatchingTemplate {
                index: item.index,
                activation,
            })?;

            debug!(index = item.index, %digit, "digit matched");
            item.digit = Some(digit);
            result.push(item);
        }

        Ok(result)
    }

    fn name(&self) -> &str {
        "Template Matching"
    }
}
