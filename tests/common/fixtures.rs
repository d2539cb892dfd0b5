use image::{GrayImage, Luma};
use imageproc::drawing::draw_filled_rect_mut;
use imageproc::rect::Rect;
use segodec::DecoderConfig;
use segodec::config::{EnhanceConfig, SamplePoint};
use segodec::decoding::matcher::DIGIT_TEMPLATES;
use segodec::decoding::segment::character_boxes;
use tempfile::NamedTempFile;

/// Extra pixels drawn around the sample points of a lit segment.
const BAR_MARGIN: u32 = 4;

/// Default geometry with the contrast stage turned into a no-op.
pub fn neutral_config() -> DecoderConfig {
    DecoderConfig {
        enhance: EnhanceConfig {
            clahe_passes: 0,
            brightness: 0,
            contrast: 0,
            ..Default::default()
        },
        ..Default::default()
    }
}

/// Draws a display strip sized to the config's crop region.
/// `None` leaves a character blank. Dark segments on light unless `lit > unlit`.
pub fn render_display(config: &DecoderConfig, chars: &[Option<u8>], lit: u8, unlit: u8) -> GrayImage {
    render_display_sized(config, chars, config.crop.width, config.crop.height, lit, unlit)
}

pub fn render_display_sized(
    config: &DecoderConfig,
    chars: &[Option<u8>],
    width: u32,
    height: u32,
    lit: u8,
    unlit: u8,
) -> GrayImage {
    let mut strip = GrayImage::from_pixel(width, height, Luma([unlit]));
    let boxes = character_boxes(width, height, &config.layout, chars.len())
        .expect("fixture layout must fit the strip");

    for (bbox, digit) in boxes.iter().zip(chars) {
        let Some(digit) = digit else { continue };
        let template = DIGIT_TEMPLATES[*digit as usize];

        for (segment, points) in config.segments.points.iter().enumerate() {
            if template[segment] {
                draw_bar(&mut strip, bbox.x, bbox.y, points, lit);
            }
        }
    }

    strip
}

/// Filled rectangle covering every sample point of one segment.
fn draw_bar(strip: &mut GrayImage, origin_x: u32, origin_y: u32, points: &[SamplePoint], value: u8) {
    let min_x = points.iter().map(|p| p.x).min().unwrap_or(0);
    let max_x = points.iter().map(|p| p.x).max().unwrap_or(0);
    let min_y = points.iter().map(|p| p.y).min().unwrap_or(0);
    let max_y = points.iter().map(|p| p.y).max().unwrap_or(0);

    let x = origin_x + min_x.saturating_sub(BAR_MARGIN);
    let y = origin_y + min_y.saturating_sub(BAR_MARGIN);
    let rect = Rect::at(x as i32, y as i32).of_size(
        max_x - min_x + 2 * BAR_MARGIN,
        max_y - min_y + 2 * BAR_MARGIN,
    );
    draw_filled_rect_mut(strip, rect, Luma([value]));
}

pub fn digits(values: &[u8]) -> Vec<Option<u8>> {
    values.iter().copied().map(Some).collect()
}

/// Places `strip` inside a larger capture at the configured crop offset and
/// writes it to a temporary PNG.
pub fn write_capture(config: &DecoderConfig, strip: &GrayImage) -> NamedTempFile {
    let crop = config.crop;
    let mut capture = GrayImage::from_pixel(crop.x + crop.width + 60, crop.y + crop.height + 40, Luma([255]));
    image::imageops::replace(&mut capture, strip, crop.x as i64, crop.y as i64);

    let file = tempfile::Builder::new()
        .suffix(".png")
        .tempfile()
        .expect("Failed to create temp image file");
    capture
        .save_with_format(file.path(), image::ImageFormat::Png)
        .expect("Failed to save test image");
    file
}

/// Writes a JSON config to a temporary file.
pub fn write_config(config: &DecoderConfig) -> NamedTempFile {
    let file = tempfile::Builder::new()
        .suffix(".json")
        .tempfile()
        .expect("Failed to create temp config file");
    std::fs::write(file.path(), config.to_json_pretty().expect("config serializes"))
        .expect("Failed to write config");
    file
}
