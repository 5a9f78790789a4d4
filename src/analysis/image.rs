//! Shrinking screenshots before they are sent to the vision model.
//!
//! Phone screenshots are often several megabytes; large payloads make local
//! vision models time out. Images are scaled so the longer side is at most
//! [`MAX_IMAGE_SIDE`] pixels and re-encoded as JPEG.

use image::codecs::jpeg::JpegEncoder;
use image::imageops::FilterType;
use image::{ColorType, GenericImageView};

/// Longest allowed side in pixels
pub const MAX_IMAGE_SIDE: u32 = 1024;

/// JPEG quality used for re-encoding
pub const JPEG_QUALITY: u8 = 85;

/// Errors from image preparation
#[derive(Debug, thiserror::Error)]
pub enum ImagePrepError {
    #[error("decode image: {0}")]
    Decode(#[source] image::ImageError),

    #[error("invalid image size {0}x{1}")]
    InvalidSize(u32, u32),

    #[error("encode jpeg: {0}")]
    Encode(#[source] image::ImageError),
}

/// Decode `raw`, cap the longer side at 1024 px keeping the aspect ratio, and
/// return JPEG bytes at quality 85.
pub fn prepare_image(raw: &[u8]) -> Result<Vec<u8>, ImagePrepError> {
    let img = image::load_from_memory(raw).map_err(ImagePrepError::Decode)?;

    let (width, height) = img.dimensions();
    if width == 0 || height == 0 {
        return Err(ImagePrepError::InvalidSize(width, height));
    }

    let (new_width, new_height) = scaled_dimensions(width, height, MAX_IMAGE_SIDE);
    let img = if (new_width, new_height) != (width, height) {
        img.resize_exact(new_width, new_height, FilterType::CatmullRom)
    } else {
        img
    };

    // JPEG has no alpha channel
    let rgb = img.to_rgb8();
    let mut out = Vec::new();
    JpegEncoder::new_with_quality(&mut out, JPEG_QUALITY)
        .encode(rgb.as_raw(), rgb.width(), rgb.height(), ColorType::Rgb8)
        .map_err(ImagePrepError::Encode)?;
    Ok(out)
}

/// Dimensions after capping the longer side at `max_side`.
pub fn scaled_dimensions(width: u32, height: u32, max_side: u32) -> (u32, u32) {
    if width <= max_side && height <= max_side {
        return (width, height);
    }

    let (w, h, max) = (u64::from(width), u64::from(height), u64::from(max_side));
    let (new_w, new_h) = if w > h {
        (max, h * max / w)
    } else {
        (w * max / h, max)
    };
    (new_w.max(1) as u32, new_h.max(1) as u32)
}
