//! Sobel edge detection.
//!
//! Applies the 3x3 Sobel X and Y kernels to the red channel (the input is
//! expected to be grayscale already, so R = G = B) and writes the
//! gradient magnitude, optionally thresholded into a binary edge map and
//! optionally inverted for a pencil-sketch look.
//!
//! Border pixels lack a full neighborhood, so the output bounds are the
//! input bounds shrunk by one pixel on every side.

use crate::parallel::{self, PixelKernel, PixelSite};
use crate::pipeline::Filter;
use crate::types::{CHANNELS, EffectError, PixelBuffer};

/// Kernel radius of the 3x3 Sobel operator.
pub const SOBEL_RADIUS: u32 = 1;

const SOBEL_X: [[i32; 3]; 3] = [[-1, 0, 1], [-2, 0, 2], [-1, 0, 1]];
const SOBEL_Y: [[i32; 3]; 3] = [[-1, -2, -1], [0, 0, 0], [1, 2, 1]];

/// Gradient magnitude as a byte.
///
/// Magnitudes above 255 saturate instead of wrapping, so strong edges
/// never read as weak ones.
#[must_use]
#[allow(clippy::cast_possible_truncation, clippy::cast_sign_loss)]
pub fn magnitude(gx: i32, gy: i32) -> u8 {
    let squared = f64::from(gx).mul_add(f64::from(gx), f64::from(gy) * f64::from(gy));
    squared.sqrt().min(255.0) as u8
}

/// Sobel edge detector.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq)]
pub struct Sobel {
    threshold: Option<u8>,
    invert: bool,
}

impl Sobel {
    /// Create a Sobel filter.
    ///
    /// With `threshold == None` the output is the raw gradient magnitude.
    /// With `Some(t)` each pixel is 255 if its magnitude is at least `t`
    /// and 0 otherwise. `invert` flips the final value (`255 - v`).
    #[must_use]
    pub const fn new(threshold: Option<u8>, invert: bool) -> Self {
        Self { threshold, invert }
    }

    /// Gradient at the pixel whose byte offset is `offset`.
    fn gradient(input: &[u8], offset: usize, stride: usize) -> (i32, i32) {
        let top_left = offset - stride - CHANNELS;
        let mut gx = 0;
        let mut gy = 0;
        for (ky, (row_x, row_y)) in SOBEL_X.iter().zip(&SOBEL_Y).enumerate() {
            let row = top_left + ky * stride;
            for (kx, (wx, wy)) in row_x.iter().zip(row_y).enumerate() {
                let r = i32::from(input[row + kx * CHANNELS]);
                gx += wx * r;
                gy += wy * r;
            }
        }
        (gx, gy)
    }
}

impl PixelKernel for Sobel {
    type Scratch = ();

    fn scratch(&self) {}

    fn process(&self, _: &mut (), site: PixelSite, input: &[u8], output: &mut [u8; 4]) {
        let (gx, gy) = Self::gradient(input, site.offset, site.stride);
        let mut value = magnitude(gx, gy);
        if let Some(threshold) = self.threshold {
            value = if value >= threshold { 255 } else { 0 };
        }
        if self.invert {
            value = 255 - value;
        }
        *output = [value, value, value, 255];
    }
}

impl Filter for Sobel {
    fn name(&self) -> &'static str {
        "sobel"
    }

    fn apply(&self, image: &PixelBuffer, parallelism: usize) -> Result<PixelBuffer, EffectError> {
        let region = image.bounds().inset(SOBEL_RADIUS);
        let mut out = PixelBuffer::blank_like(image, region);
        parallel::run(parallelism, image, region, &mut out, self, 0);
        Ok(out)
    }
}
