use image::GrayImage;
use tracing::warn;

use crate::config::CharacterLayout;
use crate::error::{DecodeError, Result};
use crate::pipeline::BoundingBox;

/// One character cell cut from the display strip
#[derive(Debug, Clone)]
pub struct CharacterCell {
    /// Display position, 0 = leftmost
    pub index: usize,
    /// Location in the strip
    pub bbox: BoundingBox,
    pub image: GrayImage,
}

/// Compute the cell rectangles for `num_chars` characters in a strip of the given size.
///
/// A cell that would run past the right edge is narrowed to
/// `strip_width - x - 1`; a cell that would run past the bottom is cut at the
/// last row.
pub fn character_boxes(
    strip_width: u32,
    strip_height: u32,
    layout: &CharacterLayout,
    num_chars: usize,
) -> Result<Vec<BoundingBox>> {
    if layout.gaps.len() + 1 < num_chars {
        return Err(DecodeError::LayoutConfigInvalid(format!(
            "not enough gap values: {} characters need {}, got {}",
            num_chars,
            num_chars.saturating_sub(1),
            layout.gaps.len()
        )));
    }
    if layout.start_y >= strip_height {
        return Err(DecodeError::LayoutConfigInvalid(format!(
            "character row starts at y={} but the strip is {} pixels high",
            layout.start_y, strip_height
        )));
    }

    let height = layout.char_height.min(strip_height - layout.start_y);
    let mut cursor_x = layout.start_x;
    let mut boxes = Vec::with_capacity(num_chars);

    for i in 0..num_chars {
        if cursor_x >= strip_width {
            return Err(DecodeError::LayoutConfigInvalid(format!(
                "character {i} starts at x={cursor_x} but the strip is {strip_width} pixels wide"
            )));
        }

        let mut width = layout.char_width;
        if width > strip_width - cursor_x {
            width = strip_width - cursor_x - 1;
            warn!(index = i, width, "character cell clipped at strip edge");
        }
        if width == 0 {
            return Err(DecodeError::LayoutConfigInvalid(format!(
                "character {i} at x={cursor_x} has no room in a {strip_width} pixel strip"
            )));
        }

        boxes.push(BoundingBox {
            x: cursor_x,
            y: layout.start_y,
            width,
            height,
        });

        if i + 1 < num_chars {
            cursor_x = cursor_x
                .checked_add(layout.char_width)
                .and_then(|x| x.checked_add(layout.gaps[i]))
                .ok_or_else(|| {
                    DecodeError::LayoutConfigInvalid(format!(
                        "character {} position overflows after x={cursor_x}",
                        i + 1
                    ))
                })?;
        }
    }

    Ok(boxes)
}

/// Slice the enhanced strip into ordered character cells.
pub fn split_characters(
    strip: &GrayImage,
    layout: &CharacterLayout,
    num_chars: usize,
) -> Result<Vec<CharacterCell>> {
    let (width, height) = strip.dimensions();
    let boxes = character_boxes(width, height, layout, num_chars)?;

    Ok(boxes
        .into_iter()
        .enumerate()
        .map(|(index, bbox)| CharacterCell {
            index,
            bbox,
            image: image::imageops::crop_imm(strip, bbox.x, bbox.y, bbox.width, bbox.height)
                .to_image(),
        })
        .collect())
}

#[cfg(test)]
mod tests {
    use super::*;
    use image::Luma;

    fn layout(start_x: u32, char_width: u32, gaps: Vec<u32>) -> CharacterLayout {
        CharacterLayout {
            start_x,
            start_y: 1,
            char_width,
            char_height: 5,
            gaps,
        }
    }

    #[test]
    fn test_cells_follow_gap_table() {
        let boxes = character_boxes(100, 10, &layout(2, 10, vec![3, 7]), 3).unwrap();
        let xs: Vec<u32> = boxes.iter().map(|b| b.x).collect();
        assert_eq!(xs, vec![2, 15, 32]);
        assert!(boxes.iter().all(|b| b.width == 10 && b.height == 5 && b.y == 1));
    }

    #[test]
    fn test_exact_fit_spans_strip() {
        // 2 + 10 + 3 + 10 + 3 + 10 = 38
        let boxes = character_boxes(38, 10, &layout(2, 10, vec![3, 3]), 3).unwrap();
        let covered: u32 = boxes.iter().map(|b| b.width).sum::<u32>() + 3 + 3;
        assert_eq!(covered, 38 - 2);
        assert_eq!(boxes[2].width, 10);
    }

    #[test]
    fn test_last_cell_clipped_at_edge() {
        let boxes = character_boxes(35, 10, &layout(2, 10, vec![3, 3]), 3).unwrap();
        assert_eq!(boxes.len(), 3);
        assert_eq!(boxes[2].x, 28);
        assert_eq!(boxes[2].width, 35 - 28 - 1);
    }

    #[test]
    fn test_height_clipped_at_bottom() {
        let boxes = character_boxes(40, 4, &layout(0, 10, vec![0]), 2).unwrap();
        assert!(boxes.iter().all(|b| b.height == 3));
    }

    #[test]
    fn test_short_gap_table_is_config_error() {
        let err = character_boxes(100, 10, &layout(0, 10, vec![3]), 3).unwrap_err();
        assert!(matches!(err, DecodeError::LayoutConfigInvalid(_)));
    }

    #[test]
    fn test_cell_past_strip_is_config_error() {
        let err = character_boxes(20, 10, &layout(0, 10, vec![15]), 2).unwrap_err();
        assert!(matches!(err, DecodeError::LayoutConfigInvalid(_)));
    }

    #[test]
    fn test_huge_gap_is_config_error() {
        let err = character_boxes(595, 163, &layout(4, 83, vec![u32::MAX - 50, 12]), 3)
            .unwrap_err();
        assert!(matches!(err, DecodeError::LayoutConfigInvalid(_)));
    }

    #[test]
    fn test_huge_cell_width_is_clipped() {
        let boxes = character_boxes(40, 10, &layout(5, u32::MAX, vec![0]), 1).unwrap();
        assert_eq!(boxes[0].x, 5);
        assert_eq!(boxes[0].width, 40 - 5 - 1);
    }

    #[test]
    fn test_split_characters_crops_pixels() {
        let strip = GrayImage::from_fn(40, 8, |x, _| Luma([x as u8]));
        let cells = split_characters(&strip, &layout(2, 10, vec![3, 3]), 3).unwrap();

        assert_eq!(cells.len(), 3);
        for (i, cell) in cells.iter().enumerate() {
            assert_eq!(cell.index, i);
            assert_eq!(cell.image.dimensions(), (cell.bbox.width, cell.bbox.height));
            assert_eq!(cell.image.get_pixel(0, 0)[0], cell.bbox.x as u8);
        }
    }
}
