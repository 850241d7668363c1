//! Oil painting: posterize by local intensity mode.
//!
//! Every pixel in a `filter_size` x `filter_size` neighborhood is sorted
//! into an intensity bucket. The output pixel is the mean color of the
//! most populated bucket. Ties go to the bucket that appeared first in
//! the raster scan of the neighborhood (top row first, left to right).

use crate::parallel::{self, PixelKernel, PixelSite};
use crate::pipeline::Filter;
use crate::types::{CHANNELS, EffectError, PixelBuffer, require_odd};

/// Intensity bucket of an RGB triple for a histogram with `levels`
/// buckets.
///
/// `round(((r + g + b) / 3) * (levels - 1) / 255)`, so the result is always
/// in `0..levels`.
#[must_use]
#[allow(clippy::cast_possible_truncation, clippy::cast_sign_loss)]
pub fn bucket(r: u8, g: u8, b: u8, levels: u32) -> usize {
    let sum = u32::from(r) + u32::from(g) + u32::from(b);
    let scale = f64::from(levels.saturating_sub(1));
    (f64::from(sum) / 3.0 * scale / 255.0).round() as usize
}

/// Per-worker histogram.
#[derive(Debug, Clone)]
pub struct Histogram {
    count: Vec<u32>,
    sums: Vec<[u32; 3]>,
    /// Buckets in the order they were first hit during the current scan.
    seen: Vec<usize>,
}

impl Histogram {
    fn new(levels: u32) -> Self {
        let n = levels as usize;
        Self {
            count: vec![0; n],
            sums: vec![[0; 3]; n],
            seen: Vec::with_capacity(n),
        }
    }

    fn add(&mut self, index: usize, r: u8, g: u8, b: u8) {
        if self.count[index] == 0 {
            self.seen.push(index);
        }
        self.count[index] += 1;
        let s = &mut self.sums[index];
        s[0] += u32::from(r);
        s[1] += u32::from(g);
        s[2] += u32::from(b);
    }

    /// Mean color of the most populated bucket, first-seen on ties.
    #[allow(clippy::cast_possible_truncation)]
    fn dominant(&self) -> [u8; 3] {
        let mut best: Option<usize> = None;
        for &index in &self.seen {
            if best.is_none_or(|b| self.count[index] > self.count[b]) {
                best = Some(index);
            }
        }
        best.map_or([0; 3], |index| {
            let n = self.count[index];
            self.sums[index].map(|s| (s / n) as u8)
        })
    }

    fn clear(&mut self) {
        for &index in &self.seen {
            self.count[index] = 0;
            self.sums[index] = [0; 3];
        }
        self.seen.clear();
    }
}

/// Oil painting filter.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct OilPainting {
    filter_size: u32,
    levels: u32,
}

impl OilPainting {
    /// Create an oil painting filter.
    ///
    /// `filter_size` controls stroke size and must be odd; `levels` is the
    /// number of intensity buckets and must be at least 1. Values around
    /// `(5, 30)` are a good starting point.
    ///
    /// # Errors
    ///
    /// Returns [`EffectError::NotOdd`] for an even filter size and
    /// [`EffectError::InvalidConfig`] for zero levels.
    pub fn new(filter_size: u32, levels: u32) -> Result<Self, EffectError> {
        require_odd("filter size", filter_size)?;
        if levels == 0 {
            return Err(EffectError::InvalidConfig(
                "levels must be at least 1".to_owned(),
            ));
        }
        Ok(Self {
            filter_size,
            levels,
        })
    }

    /// Pixels lost on each side.
    #[must_use]
    pub const fn radius(&self) -> u32 {
        (self.filter_size - 1) / 2
    }
}

impl PixelKernel for OilPainting {
    type Scratch = Histogram;

    fn scratch(&self) -> Histogram {
        Histogram::new(self.levels)
    }

    fn process(
        &self,
        hist: &mut Histogram,
        site: PixelSite,
        input: &[u8],
        output: &mut [u8; 4],
    ) {
        let size = self.filter_size as usize;
        let radius = self.radius() as usize;
        let top_left = site.offset - radius * site.stride - radius * CHANNELS;

        hist.clear();
        for fy in 0..size {
            let row = top_left + fy * site.stride;
            for fx in 0..size {
                let p = row + fx * CHANNELS;
                let (r, g, b) = (input[p], input[p + 1], input[p + 2]);
                hist.add(bucket(r, g, b, self.levels), r, g, b);
            }
        }

        let [r, g, b] = hist.dominant();
        *output = [r, g, b, 255];
    }
}

impl Filter for OilPainting {
    fn name(&self) -> &'static str {
        "oil"
    }

    fn apply(&self, image: &PixelBuffer, parallelism: usize) -> Result<PixelBuffer, EffectError> {
        let region = image.bounds().inset(self.radius());
        let mut out = PixelBuffer::blank_like(image, region);
        parallel::run(parallelism, image, region, &mut out, self, 0);
        Ok(out)
    }
}
