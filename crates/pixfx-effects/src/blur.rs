//! Gaussian blur.
//!
//! Builds a square kernel from the Gaussian function evaluated at integer
//! offsets from the kernel center, normalizes it to sum to one, and
//! convolves R, G and B independently. The output shrinks by the kernel
//! radius on every side.

use crate::parallel::{self, PixelKernel, PixelSite};
use crate::pipeline::Filter;
use crate::types::{CHANNELS, EffectError, PixelBuffer, require_odd};

/// Build a normalized `size` x `size` Gaussian kernel, row-major.
///
/// `size` must be odd so the kernel has a center pixel; `sigma` must be
/// positive. The weights sum to one.
#[must_use]
#[allow(clippy::cast_precision_loss)]
pub(crate) fn gaussian_kernel(size: u32, sigma: f64) -> Vec<f64> {
    debug_assert!(size % 2 == 1, "kernel size must be odd, got {size}");
    let radius = i64::from(size / 2);
    let denom = 2.0 * sigma * sigma;
    let mut kernel: Vec<f64> = (-radius..=radius)
        .flat_map(|dy| (-radius..=radius).map(move |dx| (dx, dy)))
        .map(|(dx, dy)| (-((dx * dx + dy * dy) as f64) / denom).exp())
        .collect();

    let sum: f64 = kernel.iter().sum();
    for w in &mut kernel {
        *w /= sum;
    }
    kernel
}

const TRUNCATION_EPSILON: f64 = 1e-9;

/// Gaussian blur filter.
#[derive(Debug, Clone, PartialEq)]
pub struct Gaussian {
    size: u32,
    sigma: f64,
    kernel: Vec<f64>,
}

impl Gaussian {
    /// Sigma used by composite effects that blur before edge detection.
    pub const DEFAULT_SIGMA: f64 = 1.0;

    /// Create a Gaussian blur with an odd `kernel_size` and positive
    /// `sigma`.
    ///
    /// # Errors
    ///
    /// Returns [`EffectError::NotOdd`] for an even kernel size and
    /// [`EffectError::InvalidConfig`] for a non-positive or non-finite
    /// sigma.
    pub fn new(kernel_size: u32, sigma: f64) -> Result<Self, EffectError> {
        require_odd("kernel size", kernel_size)?;
        if !(sigma.is_finite() && sigma > 0.0) {
            return Err(EffectError::InvalidConfig(format!(
                "sigma must be positive, got {sigma}"
            )));
        }
        Ok(Self {
            size: kernel_size,
            sigma,
            kernel: gaussian_kernel(kernel_size, sigma),
        })
    }

    /// Kernel dimension.
    #[must_use]
    pub const fn kernel_size(&self) -> u32 {
        self.size
    }

    /// Standard deviation of the kernel.
    #[must_use]
    pub const fn sigma(&self) -> f64 {
        self.sigma
    }

    /// Pixels lost on each side.
    #[must_use]
    pub const fn radius(&self) -> u32 {
        (self.size - 1) / 2
    }
}

impl PixelKernel for Gaussian {
    type Scratch = ();

    fn scratch(&self) {}

    #[allow(clippy::cast_possible_truncation, clippy::cast_sign_loss)]
    fn process(&self, _: &mut (), site: PixelSite, input: &[u8], output: &mut [u8; 4]) {
        let size = self.size as usize;
        let radius = self.radius() as usize;
        let top_left = site.offset - radius * site.stride - radius * CHANNELS;

        let mut acc = [0.0f64; 3];
        for (ky, weights) in self.kernel.chunks_exact(size).enumerate() {
            let row = top_left + ky * site.stride;
            for (kx, &w) in weights.iter().enumerate() {
                let p = row + kx * CHANNELS;
                for (c, sum) in acc.iter_mut().enumerate() {
                    *sum = w.mul_add(f64::from(input[p + c]), *sum);
                }
            }
        }

        // Truncate; the epsilon absorbs normalization error so flat
        // regions keep their value.
        let [r, g, b] = acc.map(|v| (v + TRUNCATION_EPSILON).clamp(0.0, 255.0) as u8);
        *output = [r, g, b, 255];
    }
}

impl Filter for Gaussian {
    fn name(&self) -> &'static str {
        "gaussian"
    }

    fn apply(&self, image: &PixelBuffer, parallelism: usize) -> Result<PixelBuffer, EffectError> {
        let region = image.bounds().inset(self.radius());
        let mut out = PixelBuffer::blank_like(image, region);
        parallel::run(parallelism, image, region, &mut out, self, 0);
        Ok(out)
    }
}
