use image::{DynamicImage, GrayImage, ImageDecoder, ImageReader, Luma, Rgb};
use std::path::Path;
use tracing::{debug, warn};

use crate::config::CropRegion;
use crate::error::{DecodeError, Result};

/// Produces the grayscale display strip the decoder works on
pub trait ImageSource {
    fn load(&self, path: &Path) -> Result<GrayImage>;
}

/// Reads an image file, converts it to 8-bit luma and crops the display region
#[derive(Debug, Clone)]
pub struct FileImageSource {
    pub crop: CropRegion,
}

impl FileImageSource {
    pub fn new(crop: CropRegion) -> Self {
        Self { crop }
    }
}

impl ImageSource for FileImageSource {
    fn load(&self, path: &Path) -> Result<GrayImage> {
        if !path.exists() {
            return Err(DecodeError::InputNotFound(path.to_path_buf()));
        }

        let mut decoder = ImageReader::open(path)
            .map_err(image::ImageError::IoError)?
            .with_guessed_format()
            .map_err(image::ImageError::IoError)?
            .into_decoder()?;
        let orientation = decoder.orientation()?;
        let mut img = DynamicImage::from_decoder(decoder)?;
        img.apply_orientation(orientation);

        debug!(width = img.width(), height = img.height(), ?orientation, "image loaded");

        crop_display(&to_grayscale(&img), &self.crop)
    }
}

// BT.601 luma weights in 14-bit fixed point.
const R_WEIGHT: u32 = 4899;
const G_WEIGHT: u32 = 9617;
const B_WEIGHT: u32 = 1868;
const WEIGHT_SHIFT: u32 = 14;

fn bt601_luma(Rgb([r, g, b]): Rgb<u8>) -> Luma<u8> {
    let y = r as u32 * R_WEIGHT + g as u32 * G_WEIGHT + b as u32 * B_WEIGHT;
    Luma([((y + (1 << (WEIGHT_SHIFT - 1))) >> WEIGHT_SHIFT) as u8])
}

/// Convert any decoded image to 8-bit gray. Colour uses BT.601 weights and
/// ignores alpha; gray input only has its depth reduced.
pub fn to_grayscale(img: &DynamicImage) -> GrayImage {
    match img {
        DynamicImage::ImageLuma8(gray) => gray.clone(),
        DynamicImage::ImageLumaA8(_) | DynamicImage::ImageLuma16(_) | DynamicImage::ImageLumaA16(_) => {
            img.to_luma8()
        }
        _ => imageproc::map::map_colors(&img.to_rgb8(), bt601_luma),
    }
}

/// Crop the display region, clipping it to the image bounds.
pub fn crop_display(img: &GrayImage, crop: &CropRegion) -> Result<GrayImage> {
    let (width, height) = img.dimensions();
    if crop.x >= width || crop.y >= height {
        return Err(DecodeError::LayoutConfigInvalid(format!(
            "crop origin ({}, {}) lies outside the {}x{} image",
            crop.x, crop.y, width, height
        )));
    }

    let crop_w = crop.width.min(width - crop.x);
    let crop_h = crop.height.min(height - crop.y);
    if (crop_w, crop_h) != (crop.width, crop.height) {
        warn!(
            requested_width = crop.width,
            requested_height = crop.height,
            crop_w,
            crop_h,
            "crop region clipped to image bounds"
        );
    }

    Ok(image::imageops::crop_imm(img, crop.x, crop.y, crop_w, crop_h).to_image())
}

/// Accept only single-channel 8-bit images.
pub fn to_pixel_buffer(img: DynamicImage) -> Result<GrayImage> {
    match img {
        DynamicImage::ImageLuma8(gray) => Ok(gray),
        other => Err(DecodeError::InvalidChannelDepth(other.color())),
    }
}
