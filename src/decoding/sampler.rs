use image::GrayImage;

use crate::config::{SamplePoint, SegmentGeometry, ThresholdConfig};
use crate::error::{DecodeError, Result};
use crate::models::SegmentActivation;

/// Mean intensity of every segment, normalized to `[0, 1]`.
pub fn segment_levels(cell: &GrayImage, geometry: &SegmentGeometry) -> Result<Vec<f64>> {
    let half = geometry.half_window();
    if half == 0 {
        return Err(DecodeError::LayoutConfigInvalid(format!(
            "window_size {} samples no pixels",
            geometry.window_size
        )));
    }

    geometry
        .points
        .iter()
        .enumerate()
        .map(|(segment, points)| {
            if points.is_empty() {
                return Err(DecodeError::LayoutConfigInvalid(format!(
                    "segment {segment} has no sample points"
                )));
            }
            let mut total = 0.0;
            for point in points {
                total += window_mean(cell, segment, *point, half)? as f64;
            }
            Ok(total / points.len() as f64 / u8::MAX as f64)
        })
        .collect()
}

/// Decide which segments of one character cell are lit.
pub fn sample_segments(
    cell: &GrayImage,
    geometry: &SegmentGeometry,
    threshold: &ThresholdConfig,
) -> Result<SegmentActivation> {
    let mut activation = SegmentActivation::default();
    for (segment, level) in segment_levels(cell, geometry)?.into_iter().enumerate() {
        if threshold.is_active(level) {
            activation.activate(segment);
        }
    }
    Ok(activation)
}

/// Truncated integer mean over offsets `[-half, half)` on both axes.
///
/// The window is one pixel short on the high side for odd window sizes;
/// calibrated sample points depend on that shape.
fn window_mean(cell: &GrayImage, segment: usize, point: SamplePoint, half: u32) -> Result<u32> {
    let (width, height) = cell.dimensions();
    let fits = point.x >= half
        && point.y >= half
        && point.x.checked_add(half).is_some_and(|end| end <= width)
        && point.y.checked_add(half).is_some_and(|end| end <= height);
    if !fits {
        return Err(DecodeError::SegmentSampleOutOfBounds {
            segment,
            x: point.x,
            y: point.y,
            width,
            height,
        });
    }

    let (x0, y0) = (point.x - half, point.y - half);
    let side = 2 * half;
    let mut sum = 0u64;
    for dy in 0..side {
        for dx in 0..side {
            sum += cell.get_pixel(x0 + dx, y0 + dy)[0] as u64;
        }
    }
    Ok((sum / (side as u64 * side as u64)) as u32)
}
