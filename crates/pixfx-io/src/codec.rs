//! In-memory image decoding and encoding.

use std::path::Path;

use image::codecs::jpeg::JpegEncoder;
use image::codecs::png::PngEncoder;
use image::{DynamicImage, ExtendedColorType, ImageEncoder};
use pixfx_effects::PixelBuffer;

use crate::IoError;

/// Encoded formats that can be written.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum OutputFormat {
    /// Lossy, quality-controlled. Alpha is dropped.
    Jpeg,
    /// Lossless RGBA.
    Png,
}

impl OutputFormat {
    /// Pick a format from the extension of `path` (case-insensitive).
    ///
    /// # Errors
    ///
    /// Returns [`IoError::UnsupportedFormat`] for anything other than
    /// `.jpg`, `.jpeg` or `.png`.
    pub fn from_path(path: &Path) -> Result<Self, IoError> {
        let ext = path
            .extension()
            .and_then(|e| e.to_str())
            .map(str::to_ascii_lowercase);
        match ext.as_deref() {
            Some("jpg" | "jpeg") => Ok(Self::Jpeg),
            Some("png") => Ok(Self::Png),
            _ => Err(IoError::UnsupportedFormat(path.display().to_string())),
        }
    }
}

/// Decode encoded image bytes into a full-bounds RGBA buffer.
///
/// Supports PNG, JPEG, BMP and WebP (whatever the `image` crate was
/// built with).
///
/// # Errors
///
/// Returns [`IoError::EmptyInput`] if `bytes` is empty and
/// [`IoError::Decode`] if the format is unrecognized or the data is
/// corrupt.
pub fn decode(bytes: &[u8]) -> Result<PixelBuffer, IoError> {
    if bytes.is_empty() {
        return Err(IoError::EmptyInput);
    }
    let img = image::load_from_memory(bytes).map_err(IoError::Decode)?;
    Ok(PixelBuffer::from(img.into_rgba8()))
}

/// Encode every pixel of `image` (bounds are ignored; crop first if
/// needed).
///
/// `jpeg_quality` is only used for [`OutputFormat::Jpeg`].
///
/// # Errors
///
/// Returns [`IoError::InvalidQuality`] for a JPEG quality outside
/// `1..=100` and [`IoError::Encode`] if the encoder fails.
pub fn encode(image: &PixelBuffer, format: OutputFormat, jpeg_quality: u8) -> Result<Vec<u8>, IoError> {
    let (w, h) = (image.width(), image.height());
    let mut bytes = Vec::new();
    match format {
        OutputFormat::Png => {
            PngEncoder::new(&mut bytes)
                .write_image(image.pixels(), w, h, ExtendedColorType::Rgba8)
                .map_err(IoError::Encode)?;
        }
        OutputFormat::Jpeg => {
            if !(1..=100).contains(&jpeg_quality) {
                return Err(IoError::InvalidQuality(jpeg_quality));
            }
            // The JPEG encoder has no alpha channel.
            let rgb = DynamicImage::ImageRgba8(image.to_rgba_image()).into_rgb8();
            JpegEncoder::new_with_quality(&mut bytes, jpeg_quality)
                .write_image(rgb.as_raw(), w, h, ExtendedColorType::Rgb8)
                .map_err(IoError::Encode)?;
        }
    }
    Ok(bytes)
}
