use std::path::Path;

use anyhow::{Context, Result};
use image::codecs::jpeg::JpegEncoder;
use image::imageops::FilterType;
use image::{DynamicImage, RgbImage};
use shopimg_contracts::errors::ImageFailure;
use shopimg_contracts::images::{clamp_quality, NormalizedImage, TARGET_DIMENSION};

use crate::error_chain_text;

/// Decodes any supported raster format and re-encodes it as a
/// `TARGET_DIMENSION` square RGB JPEG.
///
/// The resize is stretch-to-fit: non-square sources are distorted, never
/// cropped or letterboxed.
pub fn normalize(raw: &[u8], quality: u8) -> Result<NormalizedImage, ImageFailure> {
    decode_and_normalize(raw, quality)
        .map_err(|err| ImageFailure::decode(error_chain_text(&err, 240)))
}

pub(crate) fn decode_and_normalize(raw: &[u8], quality: u8) -> Result<NormalizedImage> {
    let decoded = image::load_from_memory(raw).context("unrecognized image data")?;
    normalize_image(&decoded, quality)
}

pub fn normalize_file(path: &Path, quality: u8) -> Result<NormalizedImage, ImageFailure> {
    let raw = std::fs::read(path).map_err(|err| {
        ImageFailure::decode(format!("failed reading {}: {err}", path.display()))
    })?;
    decode_and_normalize(&raw, quality).map_err(|err| {
        ImageFailure::decode(format!(
            "error processing image {}: {}",
            path.display(),
            error_chain_text(&err, 200)
        ))
    })
}

pub fn normalize_image(image: &DynamicImage, quality: u8) -> Result<NormalizedImage> {
    let rgb = image.to_rgb8();
    let resized = image::imageops::resize(
        &rgb,
        TARGET_DIMENSION,
        TARGET_DIMENSION,
        FilterType::Lanczos3,
    );
    let quality = clamp_quality(quality);
    let bytes = encode_jpeg(&resized, quality)?;
    Ok(NormalizedImage::from_encoded(bytes, quality))
}

pub(crate) fn encode_jpeg(image: &RgbImage, quality: u8) -> Result<Vec<u8>> {
    let mut bytes = Vec::new();
    let mut encoder = JpegEncoder::new_with_quality(&mut bytes, clamp_quality(quality));
    encoder
        .encode_image(image)
        .context("failed to encode JPEG")?;
    Ok(bytes)
}
