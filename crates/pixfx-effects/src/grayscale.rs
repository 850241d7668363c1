//! Grayscale conversion.
//!
//! Three luminance formulas, selected by [`GrayscaleAlgorithm`]. The
//! output keeps the input bounds; alpha is forced opaque.

use serde::{Deserialize, Serialize};

use crate::parallel::{self, PixelKernel, PixelSite};
use crate::pipeline::Filter;
use crate::types::{EffectError, PixelBuffer};

/// How RGB is collapsed into a single intensity.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum GrayscaleAlgorithm {
    /// Midpoint of the brightest and darkest channel.
    Lightness,
    /// Plain mean of the three channels.
    Average,
    /// Perceptual weighting `0.21 R + 0.72 G + 0.07 B`.
    #[default]
    Luminosity,
}

impl GrayscaleAlgorithm {
    /// Intensity of one pixel.
    ///
    /// Luminosity is evaluated in integer hundredths so that a pixel that
    /// is already gray maps to itself exactly.
    #[must_use]
    #[allow(clippy::cast_possible_truncation)]
    pub fn intensity(self, r: u8, g: u8, b: u8) -> u8 {
        let (r, g, b) = (u32::from(r), u32::from(g), u32::from(b));
        let value = match self {
            Self::Lightness => (r.max(g).max(b) + r.min(g).min(b)) / 2,
            Self::Average => (r + g + b) / 3,
            Self::Luminosity => (21 * r + 72 * g + 7 * b) / 100,
        };
        value as u8
    }
}

/// Renders the input as a grayscale image.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq)]
pub struct Grayscale {
    algorithm: GrayscaleAlgorithm,
}

impl Grayscale {
    /// Create a grayscale filter using `algorithm`.
    #[must_use]
    pub const fn new(algorithm: GrayscaleAlgorithm) -> Self {
        Self { algorithm }
    }

    /// The configured algorithm.
    #[must_use]
    pub const fn algorithm(&self) -> GrayscaleAlgorithm {
        self.algorithm
    }
}

impl PixelKernel for Grayscale {
    type Scratch = ();

    fn scratch(&self) {}

    fn process(&self, _: &mut (), site: PixelSite, input: &[u8], output: &mut [u8; 4]) {
        let o = site.offset;
        let v = self.algorithm.intensity(input[o], input[o + 1], input[o + 2]);
        *output = [v, v, v, 255];
    }
}

impl Filter for Grayscale {
    fn name(&self) -> &'static str {
        "grayscale"
    }

    fn apply(&self, image: &PixelBuffer, parallelism: usize) -> Result<PixelBuffer, EffectError> {
        let bounds = image.bounds();
        let mut out = PixelBuffer::blank_like(image, bounds);
        parallel::run(parallelism, image, bounds, &mut out, self, 0);
        Ok(out)
    }
}
