//! Display-to-native crop mapping and native-resolution export.

use image::codecs::jpeg::JpegEncoder;
use image::GenericImageView;
use thiserror::Error;

use crate::capture::{CroppedImage, RawImage};
use crate::geometry::{CropRect, Display, Extent, Native, ScaleFactor};

/// Fixed output quality; compression tuning is out of scope.
pub const EXPORT_JPEG_QUALITY: u8 = 92;

#[derive(Debug, Error)]
pub enum TransformError {
    #[error("crop region has no area")]
    InvalidRegion,
    #[error("failed to decode source image: {message}")]
    Decode { message: String },
    #[error("failed to encode cropped image: {message}")]
    Encode { message: String },
}

pub type TransformResult<T> = std::result::Result<T, TransformError>;

/// Integer pixel region inside a source image.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct PixelRegion {
    pub x: u32,
    pub y: u32,
    pub width: u32,
    pub height: u32,
}

pub fn display_to_native(
    rect: &CropRect<Display>,
    scale: ScaleFactor,
    native: Extent<Native>,
) -> CropRect<Native> {
    scale.to_native(rect, native)
}

/// Rounds a native rectangle to whole pixels, nearest first, then clamps the
/// result so it never leaves the source bounds.
pub fn native_region(rect: &CropRect<Native>) -> Option<PixelRegion> {
    let extent = rect.extent();
    let max_width = extent.width().round() as u32;
    let max_height = extent.height().round() as u32;

    let x = (rect.x().round() as u32).min(max_width);
    let y = (rect.y().round() as u32).min(max_height);
    let width = (rect.width().round() as u32).min(max_width - x);
    let height = (rect.height().round() as u32).min(max_height - y);

    if width == 0 || height == 0 {
        return None;
    }

    Some(PixelRegion {
        x,
        y,
        width,
        height,
    })
}

/// Copies exactly the region's pixels out of `raw`, measured on the image as
/// shown after EXIF orientation, and re-encodes them as JPEG. The source image
/// is left untouched so the same raw image can be cropped again.
pub fn export_crop(raw: &RawImage, rect: &CropRect<Native>) -> TransformResult<CroppedImage> {
    let region = native_region(rect).ok_or(TransformError::InvalidRegion)?;

    let decoded = raw.decode_upright().map_err(|err| TransformError::Decode {
        message: err.to_string(),
    })?;

    let (source_width, source_height) = decoded.dimensions();
    if region.x + region.width > source_width || region.y + region.height > source_height {
        tracing::warn!(
            ?region,
            source_width,
            source_height,
            "decoded image smaller than reported dimensions"
        );
        return Err(TransformError::Decode {
            message: format!(
                "decoded size {source_width}x{source_height} does not contain region {region:?}"
            ),
        });
    }

    let cropped = decoded
        .crop_imm(region.x, region.y, region.width, region.height)
        .to_rgb8();

    let mut bytes = Vec::new();
    JpegEncoder::new_with_quality(&mut bytes, EXPORT_JPEG_QUALITY)
        .encode_image(&cropped)
        .map_err(|err| TransformError::Encode {
            message: err.to_string(),
        })?;

    tracing::debug!(
        x = region.x,
        y = region.y,
        width = region.width,
        height = region.height,
        size = bytes.len(),
        "exported crop"
    );
    Ok(CroppedImage::new(bytes, region.width, region.height))
}
