//! Loading and saving image files.

use std::path::{Path, PathBuf};

use pixfx_effects::{EffectError, PixelBuffer};

use crate::IoError;
use crate::codec::{OutputFormat, decode, encode};

/// How [`save`] writes an image.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct SaveOptions {
    /// JPEG quality, `1..=100`. Ignored for PNG.
    pub jpeg_quality: u8,

    /// Crop to the active bounds before encoding, dropping the unwritten
    /// border left by neighborhood filters.
    pub clip_to_bounds: bool,
}

impl SaveOptions {
    /// Default JPEG quality.
    pub const DEFAULT_JPEG_QUALITY: u8 = 95;
}

impl Default for SaveOptions {
    fn default() -> Self {
        Self {
            jpeg_quality: Self::DEFAULT_JPEG_QUALITY,
            clip_to_bounds: true,
        }
    }
}

/// Read and decode an image file.
///
/// # Errors
///
/// Returns [`IoError::Read`] if the file cannot be read, otherwise any
/// [`decode`] error.
pub fn load(path: &Path) -> Result<PixelBuffer, IoError> {
    let bytes = std::fs::read(path).map_err(|source| IoError::Read {
        path: path.to_owned(),
        source,
    })?;
    let image = decode(&bytes)?;
    log::info!(
        "loaded {} ({}x{})",
        path.display(),
        image.width(),
        image.height()
    );
    Ok(image)
}

/// Encode `image` in the format named by the extension of `path` and
/// write it.
///
/// # Errors
///
/// Returns [`IoError::UnsupportedFormat`] for an unknown extension
/// (checked before anything is encoded), any [`encode`] error, or
/// [`IoError::Write`] if the file cannot be written.
pub fn save(image: &PixelBuffer, path: &Path, options: &SaveOptions) -> Result<(), IoError> {
    let format = OutputFormat::from_path(path)?;

    let cropped;
    let target = if options.clip_to_bounds {
        cropped = image.crop_to_bounds();
        &cropped
    } else {
        image
    };

    let bytes = encode(target, format, options.jpeg_quality)?;
    std::fs::write(path, &bytes).map_err(|source| IoError::Write {
        path: path.to_owned(),
        source,
    })?;
    log::info!(
        "saved {} ({}x{}, {} bytes)",
        path.display(),
        target.width(),
        target.height(),
        bytes.len()
    );
    Ok(())
}

/// A stage inspector that saves each labelled intermediate as
/// `<dir>/<prefix>-<label>.jpg`.
///
/// Write failures surface as [`EffectError::Inspect`] and abort the run.
pub fn stage_writer(
    dir: impl Into<PathBuf>,
    prefix: &str,
    options: SaveOptions,
) -> impl Fn(&str, &PixelBuffer) -> Result<(), EffectError> + Send + Sync + 'static {
    let dir = dir.into();
    let prefix = prefix.to_owned();
    move |label, image| {
        let path = dir.join(format!("{prefix}-{label}.jpg"));
        save(image, &path, &options).map_err(|e| EffectError::Inspect(Box::new(e)))
    }
}
