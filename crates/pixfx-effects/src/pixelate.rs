//! Block pixelation.
//!
//! Two passes over the active bounds: the first sums R, G and B per
//! block, the second paints every pixel of a block with the block's
//! floored mean. Tiles are forced onto block-size multiples so no worker
//! ever touches a block owned by another.

use crate::parallel::{self, PixelKernel, PixelSite};
use crate::pipeline::Filter;
use crate::types::{EffectError, PixelBuffer, Rect};

/// Maps pixels to block indices.
#[derive(Debug, Clone, Copy)]
struct BlockLayout {
    origin: Rect,
    block_size: u32,
    blocks_per_row: u32,
}

impl BlockLayout {
    const fn block_count(&self) -> usize {
        self.blocks_per_row as usize * (self.origin.height / self.block_size) as usize
    }

    const fn index(&self, x: u32, y: u32) -> usize {
        let bx = (x - self.origin.x) / self.block_size;
        let by = (y - self.origin.y) / self.block_size;
        by as usize * self.blocks_per_row as usize + bx as usize
    }
}

/// Pass 1: accumulate per-block channel sums.
struct BlockSums {
    layout: BlockLayout,
}

impl PixelKernel for BlockSums {
    type Scratch = Vec<[u64; 3]>;

    fn scratch(&self) -> Self::Scratch {
        vec![[0; 3]; self.layout.block_count()]
    }

    fn process(
        &self,
        sums: &mut Self::Scratch,
        site: PixelSite,
        input: &[u8],
        _output: &mut [u8; 4],
    ) {
        let o = site.offset;
        let block = &mut sums[self.layout.index(site.x, site.y)];
        block[0] += u64::from(input[o]);
        block[1] += u64::from(input[o + 1]);
        block[2] += u64::from(input[o + 2]);
    }
}

/// Pass 2: paint each pixel with its block's mean.
struct BlockFill<'a> {
    layout: BlockLayout,
    means: &'a [[u8; 3]],
}

impl PixelKernel for BlockFill<'_> {
    type Scratch = ();

    fn scratch(&self) {}

    fn process(&self, _: &mut (), site: PixelSite, _input: &[u8], output: &mut [u8; 4]) {
        let [r, g, b] = self.means[self.layout.index(site.x, site.y)];
        *output = [r, g, b, 255];
    }
}

/// Pixelate filter.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct Pixelate {
    block_size: u32,
}

impl Pixelate {
    /// Create a pixelate filter with square blocks of `block_size` pixels.
    ///
    /// # Errors
    ///
    /// Returns [`EffectError::InvalidConfig`] if `block_size` is zero.
    pub fn new(block_size: u32) -> Result<Self, EffectError> {
        if block_size == 0 {
            return Err(EffectError::InvalidConfig(
                "block size must be at least 1".to_owned(),
            ));
        }
        Ok(Self { block_size })
    }

    /// Side length of a block.
    #[must_use]
    pub const fn block_size(&self) -> u32 {
        self.block_size
    }

    /// Worker count and tile width that keep every tile on a block
    /// boundary.
    fn tiling(&self, width: u32, parallelism: usize) -> (usize, u32) {
        let blocks_per_row = (width / self.block_size).max(1) as usize;
        let workers = parallel::resolve_parallelism(parallelism).min(blocks_per_row);
        let per_worker = width / u32::try_from(workers).unwrap_or(u32::MAX);
        let tile = (per_worker / self.block_size).max(1) * self.block_size;
        (workers, tile)
    }
}

impl Filter for Pixelate {
    fn name(&self) -> &'static str {
        "pixelate"
    }

    /// Pixelate the active bounds of `image`.
    ///
    /// # Errors
    ///
    /// Returns [`EffectError::BlockSize`] if the block size does not
    /// divide both dimensions of the active bounds. Nothing is allocated
    /// in that case.
    #[allow(clippy::cast_possible_truncation)]
    fn apply(&self, image: &PixelBuffer, parallelism: usize) -> Result<PixelBuffer, EffectError> {
        let region = image.bounds();
        let bs = self.block_size;
        if region.width % bs != 0 || region.height % bs != 0 {
            return Err(EffectError::BlockSize {
                block_size: bs,
                width: region.width,
                height: region.height,
            });
        }

        let layout = BlockLayout {
            origin: region,
            block_size: bs,
            blocks_per_row: region.width / bs,
        };
        let (workers, tile) = self.tiling(region.width, parallelism);

        let arena = parallel::reduce(workers, image, region, &BlockSums { layout }, tile);

        let pixels_per_block = u64::from(bs) * u64::from(bs);
        let means: Vec<[u8; 3]> = (0..layout.block_count())
            .map(|i| {
                let mut total = [0u64; 3];
                for sums in &arena {
                    for (t, s) in total.iter_mut().zip(sums[i]) {
                        *t += s;
                    }
                }
                total.map(|t| (t / pixels_per_block) as u8)
            })
            .collect();

        let mut out = PixelBuffer::blank_like(image, region);
        parallel::run(
            workers,
            image,
            region,
            &mut out,
            &BlockFill {
                layout,
                means: &means,
            },
            tile,
        );
        Ok(out)
    }
}

#[cfg(test)]
#[allow(clippy::unwrap_used)]
mod tests {
    use super::*;

    fn noisy(width: u32, height: u32) -> PixelBuffer {
        PixelBuffer::from_fn(width, height, |x, y| {
            [
                ((x * 31 + y * 7) % 256) as u8,
                ((x * 13 + y * 29) % 256) as u8,
                ((x * x + y) % 256) as u8,
                255,
            ]
        })
    }

    #[test]
    fn zero_block_size_rejected() {
        assert!(matches!(
            Pixelate::new(0),
            Err(EffectError::InvalidConfig(_))
        ));
    }

    #[test]
    fn non_dividing_block_size_rejected() {
        let img = noisy(10, 8);
        let result = Pixelate::new(3).unwrap().apply(&img, 2);
        assert!(matches!(
            result,
            Err(EffectError::BlockSize {
                block_size: 3,
                width: 10,
                height: 8
            })
        ));
        // Divides width but not height.
        assert!(Pixelate::new(5).unwrap().apply(&img, 2).is_err());
    }

    #[test]
    fn blocks_are_uniform_and_equal_floored_mean() {
        let (w, h, bs) = (12u32, 8u32, 4u32);
        let img = noisy(w, h);
        let out = Pixelate::new(bs).unwrap().apply(&img, 3).unwrap();
        assert_eq!(out.bounds(), Rect::full(w, h));

        for by in 0..h / bs {
            for bx in 0..w / bs {
                let mut sum = [0u32; 3];
                for y in by * bs..(by + 1) * bs {
                    for x in bx * bs..(bx + 1) * bs {
                        let p = img.get(x, y);
                        for c in 0..3 {
                            sum[c] += u32::from(p[c]);
                        }
                    }
                }
                let n = bs * bs;
                let expected = [
                    (sum[0] / n) as u8,
                    (sum[1] / n) as u8,
                    (sum[2] / n) as u8,
                    255,
                ];
                for y in by * bs..(by + 1) * bs {
                    for x in bx * bs..(bx + 1) * bs {
                        assert_eq!(out.get(x, y), expected, "block ({bx},{by}) pixel ({x},{y})");
                    }
                }
            }
        }
    }

    #[test]
    fn block_size_one_is_identity() {
        let img = noisy(7, 5);
        let out = Pixelate::new(1).unwrap().apply(&img, 4).unwrap();
        assert_eq!(out, img);
    }

    #[test]
    fn more_workers_than_blocks() {
        let img = noisy(8, 8);
        let single = Pixelate::new(4).unwrap().apply(&img, 1).unwrap();
        let many = Pixelate::new(4).unwrap().apply(&img, 16).unwrap();
        assert_eq!(single, many);
    }

    #[test]
    fn tiling_lands_on_block_boundaries() {
        let p = Pixelate::new(5).unwrap();
        let (workers, tile) = p.tiling(100, 3);
        assert_eq!(workers, 3);
        assert_eq!(tile % 5, 0);
        assert_eq!(tile, 30);

        let (workers, tile) = p.tiling(20, 8);
        assert_eq!(workers, 4);
        assert_eq!(tile, 5);
    }

    #[test]
    fn pixelates_within_shrunken_bounds() {
        let img = noisy(10, 10).with_bounds(Rect::new(1, 1, 8, 8));
        let out = Pixelate::new(4).unwrap().apply(&img, 2).unwrap();
        assert_eq!(out.bounds(), Rect::new(1, 1, 8, 8));
        assert_eq!(out.get(1, 1), out.get(4, 4));
        assert_eq!(out.get(0, 0), [0, 0, 0, 0]);
    }
}
