//! Pencil sketch: an inverted Sobel magnitude image, optionally blurred
//! first to suppress noise.

use crate::blur::Gaussian;
use crate::edge::Sobel;
use crate::pipeline::{Filter, Pipeline};
use crate::types::{EffectError, PixelBuffer, require_odd};

/// Pencil sketch filter.
#[derive(Debug)]
pub struct Pencil {
    blur_factor: u32,
    stages: Pipeline,
}

impl Pencil {
    /// Create a pencil filter.
    ///
    /// `blur_factor` is the Gaussian kernel size applied before edge
    /// detection; `0` skips the blur, any other value must be odd. Larger
    /// values blur more and cost considerably more time.
    ///
    /// # Errors
    ///
    /// Returns [`EffectError::NotOdd`] for an even, non-zero blur factor.
    pub fn new(blur_factor: u32) -> Result<Self, EffectError> {
        let mut stages = Pipeline::new();
        if blur_factor != 0 {
            require_odd("blur factor", blur_factor)?;
            stages.add(Gaussian::new(blur_factor, Gaussian::DEFAULT_SIGMA)?, None);
        }
        stages.add(Sobel::new(None, true), None);
        Ok(Self {
            blur_factor,
            stages,
        })
    }

    /// The configured blur kernel size (`0` = no blur).
    #[must_use]
    pub const fn blur_factor(&self) -> u32 {
        self.blur_factor
    }
}

impl Filter for Pencil {
    fn name(&self) -> &'static str {
        "pencil"
    }

    fn apply(&self, image: &PixelBuffer, parallelism: usize) -> Result<PixelBuffer, EffectError> {
        self.stages.run(image, parallelism)
    }
}
