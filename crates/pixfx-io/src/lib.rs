//! pixfx-io: image codecs and filesystem access for pixfx.
//!
//! The effects crate is sans-IO and only sees [`PixelBuffer`]s. This
//! crate turns encoded bytes and files into buffers and back:
//!
//! - [`decode`] / [`encode`] work on in-memory bytes.
//! - [`load`] / [`save`] wrap them with file access, output format chosen
//!   from the file extension.
//! - [`stage_writer`] builds a cartoon inspector that saves every
//!   intermediate image to a directory.

pub mod codec;
pub mod file;

pub use codec::{OutputFormat, decode, encode};
pub use file::{SaveOptions, load, save, stage_writer};

use std::path::PathBuf;

use pixfx_effects::{EffectError, PixelBuffer};

/// Errors from decoding, encoding and file access.
#[derive(Debug, thiserror::Error)]
pub enum IoError {
    /// The input file could not be read.
    #[error("failed to read {}: {source}", path.display())]
    Read {
        /// File that failed.
        path: PathBuf,
        /// Underlying error.
        #[source]
        source: std::io::Error,
    },

    /// The output file could not be written.
    #[error("failed to write {}: {source}", path.display())]
    Write {
        /// File that failed.
        path: PathBuf,
        /// Underlying error.
        #[source]
        source: std::io::Error,
    },

    /// The input bytes are empty.
    #[error("input image is empty")]
    EmptyInput,

    /// The bytes are not an image the decoder understands.
    #[error("image decode failed: {0}")]
    Decode(#[source] image::ImageError),

    /// The encoder rejected the image.
    #[error("image encode failed: {0}")]
    Encode(#[source] image::ImageError),

    /// The output extension names no supported format.
    #[error("unsupported file type: {0}")]
    UnsupportedFormat(String),

    /// JPEG quality outside `1..=100`.
    #[error("JPEG quality must be between 1 and 100, got {0}")]
    InvalidQuality(u8),

    /// Decoded pixels could not be wrapped in a buffer.
    #[error(transparent)]
    Effect(#[from] EffectError),
}
