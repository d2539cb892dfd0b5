//! Contrast normalization for the display strip.
//!
//! Uneven lighting across a captured panel is flattened with CLAHE
//! (contrast-limited adaptive histogram equalization), after which a global
//! brightness/contrast remap pushes lit and unlit segments towards the two
//! ends of the intensity range so a fixed threshold can separate them.

use image::{GrayImage, Luma};
use imageproc::map::map_colors;
use imageproc::stats::histogram;

use crate::config::{EnhanceConfig, TileGrid};

const HIST_SIZE: usize = 256;

/// Run the full enhancement: `clahe_passes` rounds of CLAHE, then the
/// brightness/contrast remap.
pub fn enhance(img: &GrayImage, config: &EnhanceConfig) -> GrayImage {
    let mut out = img.clone();
    for _ in 0..config.clahe_passes {
        out = clahe(&out, config.clip_limit, config.tile_grid);
    }
    adjust_brightness_contrast(&out, config.brightness, config.contrast)
}

/// Contrast-limited adaptive histogram equalization.
///
/// When the image does not divide evenly into the tile grid it is padded on
/// the right and bottom by reflection (excluding the edge pixel) before tile
/// histograms are taken. Output pixels interpolate bilinearly between the
/// lookup tables of the four nearest tiles.
pub fn clahe(img: &GrayImage, clip_limit: f32, grid: TileGrid) -> GrayImage {
    let (width, height) = img.dimensions();
    if width == 0 || height == 0 || grid.x == 0 || grid.y == 0 {
        return img.clone();
    }

    let padded = if width % grid.x == 0 && height % grid.y == 0 {
        img.clone()
    } else {
        pad_reflect_101(
            img,
            width + grid.x - width % grid.x,
            height + grid.y - height % grid.y,
        )
    };
    let tile_w = padded.width() / grid.x;
    let tile_h = padded.height() / grid.y;
    let tile_area = (tile_w * tile_h) as usize;

    let clip = ((clip_limit * tile_area as f32 / HIST_SIZE as f32) as u32).max(1);
    let lut_scale = 255.0 / tile_area as f32;

    let mut luts = Vec::with_capacity((grid.x * grid.y) as usize);
    for ty in 0..grid.y {
        for tx in 0..grid.x {
            let tile = image::imageops::crop_imm(&padded, tx * tile_w, ty * tile_h, tile_w, tile_h)
                .to_image();
            let mut hist = histogram(&tile).channels[0];
            clip_histogram(&mut hist, clip);
            luts.push(cumulative_lut(&hist, lut_scale));
        }
    }

    let lut_at = |tx: u32, ty: u32, value: usize| luts[(ty * grid.x + tx) as usize][value] as f32;
    let inv_tw = 1.0 / tile_w as f32;
    let inv_th = 1.0 / tile_h as f32;

    GrayImage::from_fn(width, height, |x, y| {
        let value = img.get_pixel(x, y)[0] as usize;

        let (tx1, tx2, xa) = tile_neighbours(x as f32 * inv_tw - 0.5, grid.x);
        let (ty1, ty2, ya) = tile_neighbours(y as f32 * inv_th - 0.5, grid.y);

        let top = lut_at(tx1, ty1, value) * (1.0 - xa) + lut_at(tx2, ty1, value) * xa;
        let bottom = lut_at(tx1, ty2, value) * (1.0 - xa) + lut_at(tx2, ty2, value) * xa;

        Luma([saturate_u8(top * (1.0 - ya) + bottom * ya)])
    })
}

/// Lower/upper tile index and interpolation weight for a fractional tile position.
fn tile_neighbours(pos: f32, tiles: u32) -> (u32, u32, f32) {
    let floor = pos.floor();
    let weight = pos - floor;
    let lower = (floor as i64).max(0) as u32;
    let upper = (floor as i64 + 1).min(tiles as i64 - 1) as u32;
    (lower, upper, weight)
}

/// Clip every bin at `clip` and spread the excess across the histogram.
fn clip_histogram(hist: &mut [u32; HIST_SIZE], clip: u32) {
    let mut clipped = 0u32;
    for bin in hist.iter_mut() {
        if *bin > clip {
            clipped += *bin - clip;
            *bin = clip;
        }
    }

    let batch = clipped / HIST_SIZE as u32;
    let mut residual = (clipped % HIST_SIZE as u32) as usize;
    for bin in hist.iter_mut() {
        *bin += batch;
    }

    if residual > 0 {
        let step = (HIST_SIZE / residual).max(1);
        let mut i = 0;
        while i < HIST_SIZE && residual > 0 {
            hist[i] += 1;
            i += step;
            residual -= 1;
        }
    }
}

fn cumulative_lut(hist: &[u32; HIST_SIZE], scale: f32) -> [u8; HIST_SIZE] {
    let mut lut = [0u8; HIST_SIZE];
    let mut sum = 0u32;
    for (entry, &count) in lut.iter_mut().zip(hist.iter()) {
        sum += count;
        *entry = saturate_u8(sum as f32 * scale);
    }
    lut
}

/// Pad right/bottom to `width`x`height`, mirroring around the last pixel.
fn pad_reflect_101(img: &GrayImage, width: u32, height: u32) -> GrayImage {
    let (src_w, src_h) = img.dimensions();
    GrayImage::from_fn(width, height, |x, y| {
        *img.get_pixel(reflect_101(x, src_w), reflect_101(y, src_h))
    })
}

fn reflect_101(i: u32, len: u32) -> u32 {
    if len == 1 {
        return 0;
    }
    let period = 2 * (len - 1);
    let i = i % period;
    if i < len { i } else { period - i }
}

/// Global brightness then contrast adjustment.
///
/// Each adjustment is an affine map `v * alpha + gamma`, rounded half-to-even
/// and saturated to `[0, 255]`. A zero parameter skips its adjustment.
pub fn adjust_brightness_contrast(img: &GrayImage, brightness: i32, contrast: i32) -> GrayImage {
    let mut lut: [u8; HIST_SIZE] = std::array::from_fn(|v| v as u8);

    if brightness != 0 {
        let (shadow, highlight) = if brightness > 0 {
            (brightness, 255)
        } else {
            (0, 255 + brightness)
        };
        let alpha = (highlight - shadow) as f64 / 255.0;
        let gamma = shadow as f64;
        lut = lut.map(|v| affine(v, alpha, gamma));
    }

    if contrast != 0 {
        let factor = 131.0 * (contrast as f64 + 127.0) / (127.0 * (131.0 - contrast as f64));
        let gamma = 127.0 * (1.0 - factor);
        lut = lut.map(|v| affine(v, factor, gamma));
    }

    map_colors(img, |p| Luma([lut[p[0] as usize]]))
}

fn affine(v: u8, alpha: f64, gamma: f64) -> u8 {
    (v as f64 * alpha + gamma).round_ties_even().clamp(0.0, 255.0) as u8
}

fn saturate_u8(v: f32) -> u8 {
    v.round_ties_even().clamp(0.0, 255.0) as u8
}
