//! Decoder configuration.
//!
//! Everything about the instrument is static: where the display sits in the
//! capture, where each character starts, and which pixels belong to which
//! segment. The configuration is loaded once (from JSON or the built-in
//! defaults), validated, and then passed read-only into every pipeline stage.

use serde::{Deserialize, Serialize};
use std::fs;
use std::path::Path;

use crate::error::{DecodeError, Result};
use crate::models::SEGMENT_COUNT;

/// Rectangle of the full capture that contains the display.
#[derive(Clone, Copy, Debug, PartialEq, Eq, Serialize, Deserialize)]
pub struct CropRegion {
    pub x: u32,
    pub y: u32,
    pub width: u32,
    pub height: u32,
}

impl Default for CropRegion {
    fn default() -> Self {
        Self {
            x: 113,
            y: 169,
            width: 595,
            height: 163,
        }
    }
}

/// Placement of the character cells inside the cropped display strip.
#[derive(Clone, Debug, PartialEq, Eq, Serialize, Deserialize)]
#[serde(default)]
pub struct CharacterLayout {
    pub start_x: u32,
    pub start_y: u32,
    pub char_width: u32,
    pub char_height: u32,
    /// Horizontal space after each character except the last.
    pub gaps: Vec<u32>,
}

impl Default for CharacterLayout {
    fn default() -> Self {
        Self {
            start_x: 4,
            start_y: 15,
            char_width: 83,
            char_height: 143,
            gaps: vec![12, 12, 45, 12, 12],
        }
    }
}

/// A sample location in character-cell coordinates.
#[derive(Clone, Copy, Debug, PartialEq, Eq, Serialize, Deserialize)]
pub struct SamplePoint {
    pub x: u32,
    pub y: u32,
}

impl SamplePoint {
    pub const fn new(x: u32, y: u32) -> Self {
        Self { x, y }
    }
}

/// Sample points for each of the seven segments.
#[derive(Clone, Debug, PartialEq, Eq, Serialize, Deserialize)]
#[serde(default)]
pub struct SegmentGeometry {
    /// One or two points per segment, indexed like `SegmentActivation`.
    pub points: [Vec<SamplePoint>; SEGMENT_COUNT],
    /// Side of the averaging window around every point.
    pub window_size: u32,
}

impl SegmentGeometry {
    /// Half the window, rounded down. Windows cover offsets `[-half, half)`.
    pub fn half_window(&self) -> u32 {
        self.window_size / 2
    }
}

impl Default for SegmentGeometry {
    fn default() -> Self {
        let pair = |a: (u32, u32), b: (u32, u32)| {
            vec![SamplePoint::new(a.0, a.1), SamplePoint::new(b.0, b.1)]
        };
        Self {
            points: [
                pair((29, 20), (49, 20)),
                pair((68, 30), (68, 56)),
                pair((68, 93), (68, 113)),
                pair((29, 130), (49, 130)),
                pair((13, 93), (13, 113)),
                pair((13, 30), (13, 56)),
                pair((29, 74), (49, 74)),
            ],
            window_size: 3,
        }
    }
}

/// Lit/unlit decision policy.
#[derive(Clone, Copy, Debug, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct ThresholdConfig {
    /// Cutoff as a fraction of the maximum pixel intensity.
    pub threshold_pct: f64,
    /// `false`: dark segments on a light background. `true`: light on dark.
    pub invert: bool,
}

impl ThresholdConfig {
    pub fn is_active(&self, pct: f64) -> bool {
        if self.invert {
            pct >= self.threshold_pct
        } else {
            pct <= self.threshold_pct
        }
    }
}

impl Default for ThresholdConfig {
    fn default() -> Self {
        Self {
            threshold_pct: 0.5,
            invert: false,
        }
    }
}

/// CLAHE tile grid, counted in tiles along each axis.
#[derive(Clone, Copy, Debug, PartialEq, Eq, Serialize, Deserialize)]
pub struct TileGrid {
    pub x: u32,
    pub y: u32,
}

/// Contrast enhancement parameters.
#[derive(Clone, Copy, Debug, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct EnhanceConfig {
    pub clip_limit: f32,
    pub tile_grid: TileGrid,
    /// How many times CLAHE is applied before the brightness/contrast remap.
    pub clahe_passes: u32,
    /// In `-255..=255`; zero leaves brightness untouched.
    pub brightness: i32,
    /// In `-127..131`; zero leaves contrast untouched.
    pub contrast: i32,
}

impl Default for EnhanceConfig {
    fn default() -> Self {
        Self {
            clip_limit: 4.1,
            tile_grid: TileGrid { x: 5, y: 3 },
            clahe_passes: 2,
            brightness: 50,
            contrast: 100,
        }
    }
}

/// Complete decoder configuration.
#[derive(Clone, Debug, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct DecoderConfig {
    pub crop: CropRegion,
    pub num_chars: usize,
    pub layout: CharacterLayout,
    pub segments: SegmentGeometry,
    pub threshold: ThresholdConfig,
    pub enhance: EnhanceConfig,
}

impl Default for DecoderConfig {
    fn default() -> Self {
        Self {
            crop: CropRegion::default(),
            num_chars: 6,
            layout: CharacterLayout::default(),
            segments: SegmentGeometry::default(),
            threshold: ThresholdConfig::default(),
            enhance: EnhanceConfig::default(),
        }
    }
}

impl DecoderConfig {
    /// Loads a JSON config file. Fields missing from the file keep their defaults.
    pub fn load(path: &Path) -> Result<Self> {
        let content = fs::read_to_string(path).map_err(|source| DecodeError::ConfigRead {
            path: path.to_path_buf(),
            source,
        })?;
        Self::from_json(&content)
    }

    pub fn from_json(json: &str) -> Result<Self> {
        Ok(serde_json::from_str(json)?)
    }

    pub fn to_json_pretty(&self) -> Result<String> {
        Ok(serde_json::to_string_pretty(self)?)
    }

    /// Checks every shape constraint the pipeline relies on.
    pub fn validate(&self) -> Result<()> {
        let invalid = |msg: String| Err(DecodeError::LayoutConfigInvalid(msg));

        if self.crop.width == 0 || self.crop.height == 0 {
            return invalid(format!(
                "crop region must be non-empty, got {}x{}",
                self.crop.width, self.crop.height
            ));
        }
        if self.num_chars == 0 {
            return invalid("num_chars must be at least 1".to_string());
        }

        let layout = &self.layout;
        if layout.gaps.len() < self.num_chars - 1 {
            return invalid(format!(
                "{} characters need {} gap values, got {}",
                self.num_chars,
                self.num_chars - 1,
                layout.gaps.len()
            ));
        }
        if layout.char_width == 0 || layout.char_height == 0 {
            return invalid(format!(
                "character cell must be non-empty, got {}x{}",
                layout.char_width, layout.char_height
            ));
        }

        let right_edge = layout.gaps[..self.num_chars - 1]
            .iter()
            .try_fold(layout.start_x, |x, &gap| {
                x.checked_add(layout.char_width)?.checked_add(gap)
            })
            .and_then(|x| x.checked_add(layout.char_width));
        let bottom_edge = layout.start_y.checked_add(layout.char_height);
        if right_edge.is_none() || bottom_edge.is_none() {
            return invalid(format!(
                "character layout of {} cells at ({}, {}) exceeds the addressable pixel range",
                self.num_chars, layout.start_x, layout.start_y
            ));
        }

        let threshold = self.threshold.threshold_pct;
        if !(0.0..=1.0).contains(&threshold) {
            return invalid(format!("threshold_pct must be within [0, 1], got {threshold}"));
        }

        let enhance = &self.enhance;
        if enhance.tile_grid.x == 0 || enhance.tile_grid.y == 0 {
            return invalid("CLAHE tile grid must have at least one tile per axis".to_string());
        }
        if !(enhance.clip_limit > 0.0) {
            return invalid(format!("clip_limit must be positive, got {}", enhance.clip_limit));
        }
        if !(-255..=255).contains(&enhance.brightness) {
            return invalid(format!(
                "brightness must be within [-255, 255], got {}",
                enhance.brightness
            ));
        }
        if !(-127..131).contains(&enhance.contrast) {
            return invalid(format!(
                "contrast must be within [-127, 131), got {}",
                enhance.contrast
            ));
        }

        self.validate_segments()
    }

    fn validate_segments(&self) -> Result<()> {
        let geometry = &self.segments;
        if geometry.window_size < 2 {
            return Err(DecodeError::LayoutConfigInvalid(format!(
                "window_size must be at least 2, got {}",
                geometry.window_size
            )));
        }

        let half = geometry.half_window();
        let (width, height) = (self.layout.char_width, self.layout.char_height);

        for (segment, points) in geometry.points.iter().enumerate() {
            if points.is_empty() || points.len() > 2 {
                return Err(DecodeError::LayoutConfigInvalid(format!(
                    "segment {segment} needs 1 or 2 sample points, got {}",
                    points.len()
                )));
            }
            for point in points {
                let fits = point.x >= half
                    && point.y >= half
                    && point.x.checked_add(half).is_some_and(|end| end <= width)
                    && point.y.checked_add(half).is_some_and(|end| end <= height);
                if !fits {
                    return Err(DecodeError::LayoutConfigInvalid(format!(
                        "segment {segment} sample window at ({}, {}) does not fit the {width}x{height} cell",
                        point.x, point.y
                    )));
                }
            }
        }

        Ok(())
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_default_config_is_valid() {
        DecoderConfig::default().validate().unwrap();
    }

    #[test]
    fn test_partial_json_keeps_defaults() {
        let config = DecoderConfig::from_json(
            r#"{ "num_chars": 4, "threshold": { "invert": true } }"#,
        )
        .unwrap();

        assert_eq!(config.num_chars, 4);
        assert!(config.threshold.invert);
        assert_eq!(config.threshold.threshold_pct, 0.5);
        assert_eq!(config.layout, CharacterLayout::default());
    }

    #[test]
    fn test_json_roundtrip() {
        let config = DecoderConfig::default();
        let json = config.to_json_pretty().unwrap();
        assert_eq!(DecoderConfig::from_json(&json).unwrap(), config);
    }

    #[test]
    fn test_malformed_json_is_parse_error() {
        let err = DecoderConfig::from_json("{ num_chars: ").unwrap_err();
        assert!(matches!(err, DecodeError::ConfigParse(_)));
    }

    #[test]
    fn test_short_gap_table_rejected() {
        let mut config = DecoderConfig::default();
        config.layout.gaps.truncate(3);
        let err = config.validate().unwrap_err();
        assert!(matches!(err, DecodeError::LayoutConfigInvalid(_)));
        assert!(err.is_configuration_error());
    }

    #[test]
    fn test_extra_gaps_allowed() {
        let mut config = DecoderConfig::default();
        config.num_chars = 3;
        config.validate().unwrap();
    }

    #[test]
    fn test_sample_window_outside_cell_rejected() {
        let mut config = DecoderConfig::default();
        config.segments.points[1] = vec![SamplePoint::new(83, 30)];
        assert!(matches!(
            config.validate(),
            Err(DecodeError::LayoutConfigInvalid(_))
        ));

        // Half-open window: a point at x = width - half still fits.
        config.segments.points[1] = vec![SamplePoint::new(82, 30)];
        config.validate().unwrap();
    }

    #[test]
    fn test_sample_point_at_coordinate_limit_rejected() {
        let mut config = DecoderConfig::default();
        config.segments.points[2] = vec![SamplePoint::new(u32::MAX, 30)];
        assert!(matches!(
            config.validate(),
            Err(DecodeError::LayoutConfigInvalid(_))
        ));
    }

    #[test]
    fn test_overflowing_layout_rejected() {
        let mut config = DecoderConfig::default();
        config.layout.gaps[0] = u32::MAX - 50;
        assert!(matches!(
            config.validate(),
            Err(DecodeError::LayoutConfigInvalid(_))
        ));

        let mut config = DecoderConfig::default();
        config.layout.start_y = u32::MAX;
        assert!(config.validate().is_err());
    }

    #[test]
    fn test_unused_gap_may_be_large() {
        let mut config = DecoderConfig::default();
        config.num_chars = 2;
        config.layout.gaps[3] = u32::MAX;
        config.validate().unwrap();
    }

    #[test]
    fn test_sample_window_touching_left_edge() {
        let mut config = DecoderConfig::default();
        config.segments.points[5] = vec![SamplePoint::new(0, 30)];
        assert!(config.validate().is_err());

        config.segments.points[5] = vec![SamplePoint::new(1, 30)];
        config.validate().unwrap();
    }

    #[test]
    fn test_window_size_below_two_rejected() {
        let mut config = DecoderConfig::default();
        config.segments.window_size = 1;
        assert!(config.validate().is_err());
    }

    #[test]
    fn test_threshold_out_of_range_rejected() {
        let mut config = DecoderConfig::default();
        config.threshold.threshold_pct = 1.5;
        assert!(config.validate().is_err());
    }

    #[test]
    fn test_contrast_pole_rejected() {
        let mut config = DecoderConfig::default();
        config.enhance.contrast = 131;
        assert!(config.validate().is_err());
    }

    #[test]
    fn test_threshold_polarity() {
        let dark_on_light = ThresholdConfig::default();
        assert!(dark_on_light.is_active(0.1));
        assert!(dark_on_light.is_active(0.5));
        assert!(!dark_on_light.is_active(0.9));

        let light_on_dark = ThresholdConfig {
            invert: true,
            ..Default::default()
        };
        assert!(light_on_dark.is_active(0.9));
        assert!(light_on_dark.is_active(0.5));
        assert!(!light_on_dark.is_active(0.1));
    }
}
