//! Brightness offset.

use crate::parallel::{self, PixelKernel, PixelSite};
use crate::pipeline::Filter;
use crate::types::{EffectError, PixelBuffer};

/// Lightens (positive offset) or darkens (negative offset) every channel,
/// clamping into `0..=255`. Alpha is copied from the input.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct Brightness {
    offset: i32,
}

impl Brightness {
    /// Create a brightness filter.
    #[must_use]
    pub const fn new(offset: i32) -> Self {
        Self { offset }
    }
}

impl PixelKernel for Brightness {
    type Scratch = ();

    fn scratch(&self) {}

    #[allow(clippy::cast_possible_truncation, clippy::cast_sign_loss)]
    fn process(&self, _: &mut (), site: PixelSite, input: &[u8], output: &mut [u8; 4]) {
        let o = site.offset;
        let shift = |c: u8| (i32::from(c).saturating_add(self.offset)).clamp(0, 255) as u8;
        *output = [
            shift(input[o]),
            shift(input[o + 1]),
            shift(input[o + 2]),
            input[o + 3],
        ];
    }
}

impl Filter for Brightness {
    fn name(&self) -> &'static str {
        "brightness"
    }

    fn apply(&self, image: &PixelBuffer, parallelism: usize) -> Result<PixelBuffer, EffectError> {
        let bounds = image.bounds();
        let mut out = PixelBuffer::blank_like(image, bounds);
        parallel::run(parallelism, image, bounds, &mut out, self, 0);
        Ok(out)
    }
}
