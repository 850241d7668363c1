//! Fork-join pixel executor.
//!
//! A region is split into column-major work units, one per worker. Each
//! worker walks its columns over the full region height and calls a
//! [`PixelKernel`] once per pixel. Workers run on scoped OS threads and
//! are joined before [`run`] returns.
//!
//! Every worker fills a private tile buffer; after the join the tiles are
//! copied into the output. Input is shared read-only, so kernel taps may
//! reach into neighbouring tiles freely. No locks, no `unsafe`.

use std::num::NonZeroUsize;

use crate::types::{CHANNELS, PixelBuffer, Rect};

/// Where a kernel invocation is happening.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct PixelSite {
    /// Index of the worker running this pixel, `0..parallelism`.
    pub worker: usize,
    /// Column of the pixel.
    pub x: u32,
    /// Row of the pixel.
    pub y: u32,
    /// Byte offset of the pixel in the input buffer.
    pub offset: usize,
    /// Bytes per input row.
    pub stride: usize,
}

/// A per-pixel transform run by the executor.
///
/// `process` receives the whole input raster plus the byte offset of the
/// current pixel, and writes the result into `output` (the four bytes of
/// the same pixel in the destination). Implementations hold their
/// construction parameters only; mutable state lives in `Scratch`, of
/// which each worker gets its own.
pub trait PixelKernel: Sync {
    /// Worker-local state, allocated once per worker per run.
    type Scratch: Send;

    /// Allocate scratch for one worker.
    fn scratch(&self) -> Self::Scratch;

    /// Transform a single pixel.
    fn process(
        &self,
        scratch: &mut Self::Scratch,
        site: PixelSite,
        input: &[u8],
        output: &mut [u8; CHANNELS],
    );
}

/// One worker's exclusive slice of a region.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct WorkUnit {
    /// Worker index.
    pub worker: usize,
    /// Columns (full region height) owned by this worker.
    pub rect: Rect,
}

/// Resolve a requested parallelism, `0` meaning one worker per hardware
/// thread.
#[must_use]
pub fn resolve_parallelism(parallelism: usize) -> usize {
    if parallelism == 0 {
        std::thread::available_parallelism().map_or(1, NonZeroUsize::get)
    } else {
        parallelism
    }
}

/// Split `region` into `workers` column strips.
///
/// With `fixed_tile_width == 0` every worker gets `width / workers`
/// columns. Otherwise the first `workers - 1` get `fixed_tile_width`
/// columns each (fewer if the region runs out). In both cases the last
/// worker takes whatever remains, so the strips always cover the region
/// exactly. Strips may be empty.
#[must_use]
pub fn partition(region: Rect, workers: usize, fixed_tile_width: u32) -> Vec<WorkUnit> {
    let workers = workers.max(1);
    let even = region.width / u32::try_from(workers).unwrap_or(u32::MAX);
    let mut x = region.x;
    let mut remaining = region.width;

    (0..workers)
        .map(|worker| {
            let width = if worker + 1 == workers {
                remaining
            } else if fixed_tile_width == 0 {
                even
            } else {
                fixed_tile_width.min(remaining)
            };
            let rect = Rect::new(x, region.y, width, region.height);
            x += width;
            remaining -= width;
            WorkUnit { worker, rect }
        })
        .collect()
}

/// Run `kernel` over every pixel of `region`, writing into `output`.
///
/// Pixels of `output` outside `region` are left untouched. Returns the
/// scratch arena, indexed by worker.
///
/// The caller guarantees that every tap the kernel makes stays inside
/// `input`; for kernels with a radius that means shrinking `region` by
/// the radius first.
pub fn run<K: PixelKernel>(
    parallelism: usize,
    input: &PixelBuffer,
    region: Rect,
    output: &mut PixelBuffer,
    kernel: &K,
    fixed_tile_width: u32,
) -> Vec<K::Scratch> {
    debug_assert!(
        input.full_rect().contains(region),
        "region {region} outside input {}",
        input.full_rect()
    );
    debug_assert!(
        output.full_rect().contains(region),
        "region {region} outside output {}",
        output.full_rect()
    );

    let units = partition(region, resolve_parallelism(parallelism), fixed_tile_width);
    log::debug!("running {} work units over {region}", units.len());

    let results = fork_join(input, &units, kernel, true);
    let mut arena = Vec::with_capacity(results.len());
    for (unit, (tile, scratch)) in units.iter().zip(results) {
        blit(output, unit.rect, &tile);
        arena.push(scratch);
    }
    arena
}

/// Run `kernel` over every pixel of `region` for its side effects on
/// scratch only, discarding any output it writes.
///
/// Used by accumulation passes. Returns the scratch arena, indexed by
/// worker.
pub fn reduce<K: PixelKernel>(
    parallelism: usize,
    input: &PixelBuffer,
    region: Rect,
    kernel: &K,
    fixed_tile_width: u32,
) -> Vec<K::Scratch> {
    debug_assert!(
        input.full_rect().contains(region),
        "region {region} outside input {}",
        input.full_rect()
    );

    let units = partition(region, resolve_parallelism(parallelism), fixed_tile_width);
    log::debug!("reducing {} work units over {region}", units.len());

    fork_join(input, &units, kernel, false)
        .into_iter()
        .map(|(_, scratch)| scratch)
        .collect()
}

fn fork_join<K: PixelKernel>(
    input: &PixelBuffer,
    units: &[WorkUnit],
    kernel: &K,
    keep_tiles: bool,
) -> Vec<(Vec<u8>, K::Scratch)> {
    std::thread::scope(|scope| {
        let handles: Vec<_> = units
            .iter()
            .map(|&unit| {
                (!unit.rect.is_empty())
                    .then(|| scope.spawn(move || process_unit(input, unit, kernel, keep_tiles)))
            })
            .collect();

        handles
            .into_iter()
            .map(|handle| match handle {
                Some(handle) => handle
                    .join()
                    .unwrap_or_else(|payload| std::panic::resume_unwind(payload)),
                None => (Vec::new(), kernel.scratch()),
            })
            .collect()
    })
}

fn process_unit<K: PixelKernel>(
    input: &PixelBuffer,
    unit: WorkUnit,
    kernel: &K,
    keep_tile: bool,
) -> (Vec<u8>, K::Scratch) {
    let mut scratch = kernel.scratch();
    let src = input.pixels();

    if keep_tile {
        let rect = unit.rect;
        let mut tile = vec![0; rect.width as usize * rect.height as usize * CHANNELS];
        {
            let mut cells = tile.as_chunks_mut::<CHANNELS>().0.iter_mut();
            for_each_site(input, unit, |site| {
                if let Some(cell) = cells.next() {
                    kernel.process(&mut scratch, site, src, cell);
                }
            });
        }
        (tile, scratch)
    } else {
        let mut sink = [0; CHANNELS];
        for_each_site(input, unit, |site| {
            kernel.process(&mut scratch, site, src, &mut sink);
        });
        (Vec::new(), scratch)
    }
}

/// Visit a work unit's pixels row by row, left to right.
fn for_each_site(input: &PixelBuffer, unit: WorkUnit, mut f: impl FnMut(PixelSite)) {
    let stride = input.stride();
    let (xs, ys) = unit.rect.to_pixel_region();
    for y in ys {
        for x in xs.clone() {
            f(PixelSite {
                worker: unit.worker,
                x,
                y,
                offset: input.offset(x, y),
                stride,
            });
        }
    }
}

/// Copy a finished tile into place.
fn blit(output: &mut PixelBuffer, rect: Rect, tile: &[u8]) {
    let row_bytes = rect.width as usize * CHANNELS;
    if row_bytes == 0 {
        return;
    }
    for (y, row) in (rect.y..).zip(tile.chunks_exact(row_bytes)) {
        let dst = output.offset(rect.x, y);
        output.pixels_mut()[dst..dst + row_bytes].copy_from_slice(row);
    }
}

#[cfg(test)]
#[allow(clippy::unwrap_used)]
mod tests {
    use super::*;

    /// Copies the input pixel unchanged.
    struct Identity;

    impl PixelKernel for Identity {
        type Scratch = ();

        fn scratch(&self) {}

        fn process(&self, _: &mut (), site: PixelSite, input: &[u8], output: &mut [u8; 4]) {
            output.copy_from_slice(&input[site.offset..site.offset + 4]);
        }
    }

    /// Counts visited pixels and records the worker index it ran under.
    struct Census;

    impl PixelKernel for Census {
        type Scratch = (u64, Option<usize>, Vec<(u32, u32)>);

        fn scratch(&self) -> Self::Scratch {
            (0, None, Vec::new())
        }

        fn process(
            &self,
            scratch: &mut Self::Scratch,
            site: PixelSite,
            _input: &[u8],
            output: &mut [u8; 4],
        ) {
            scratch.0 += 1;
            scratch.1 = Some(site.worker);
            scratch.2.push((site.x, site.y));
            *output = [255, 255, 255, 255];
        }
    }

    fn widths(units: &[WorkUnit]) -> Vec<u32> {
        units.iter().map(|u| u.rect.width).collect()
    }

    #[test]
    fn even_split_gives_remainder_to_last() {
        let units = partition(Rect::new(0, 0, 10, 4), 3, 0);
        assert_eq!(widths(&units), vec![3, 3, 4]);
        assert_eq!(units[1].rect.x, 3);
        assert_eq!(units[2].rect.x, 6);
        assert!(units.iter().all(|u| u.rect.height == 4));
    }

    #[test]
    fn fixed_width_tiles() {
        let units = partition(Rect::new(2, 1, 20, 3), 3, 4);
        assert_eq!(widths(&units), vec![4, 4, 12]);
        assert_eq!(units[0].rect.x, 2);
        assert_eq!(units[2].rect.x, 10);
    }

    #[test]
    fn fixed_width_larger_than_region_is_clamped() {
        let units = partition(Rect::new(0, 0, 5, 1), 3, 4);
        assert_eq!(widths(&units), vec![4, 1, 0]);
    }

    #[test]
    fn more_workers_than_columns() {
        let units = partition(Rect::new(0, 0, 3, 2), 8, 0);
        assert_eq!(units.len(), 8);
        assert_eq!(widths(&units).iter().sum::<u32>(), 3);
        assert_eq!(units[7].rect.width, 3);
    }

    #[test]
    fn zero_workers_treated_as_one() {
        let units = partition(Rect::new(1, 1, 6, 6), 0, 0);
        assert_eq!(units.len(), 1);
        assert_eq!(units[0].rect, Rect::new(1, 1, 6, 6));
    }

    #[test]
    fn resolve_zero_uses_hardware_threads() {
        assert!(resolve_parallelism(0) >= 1);
        assert_eq!(resolve_parallelism(5), 5);
    }

    #[test]
    fn run_copies_region_and_leaves_rest() {
        let input = PixelBuffer::from_fn(9, 7, |x, y| [x as u8, y as u8, 1, 255]);
        let mut output = PixelBuffer::new(9, 7);
        let region = Rect::new(1, 2, 6, 4);
        run(4, &input, region, &mut output, &Identity, 0);

        for y in 0..7 {
            for x in 0..9 {
                let inside = region.contains(Rect::new(x, y, 1, 1));
                let expected = if inside { input.get(x, y) } else { [0; 4] };
                assert_eq!(output.get(x, y), expected, "pixel ({x},{y})");
            }
        }
    }

    #[test]
    fn scratch_arena_is_indexed_by_worker() {
        let input = PixelBuffer::new(10, 3);
        let arena = reduce(3, &input, Rect::full(10, 3), &Census, 0);
        assert_eq!(arena.len(), 3);
        let counts: Vec<u64> = arena.iter().map(|s| s.0).collect();
        assert_eq!(counts, vec![9, 9, 12]);
        for (worker, scratch) in arena.iter().enumerate() {
            assert_eq!(scratch.1, Some(worker));
        }
    }

    #[test]
    fn workers_walk_rows_within_their_columns() {
        let input = PixelBuffer::new(4, 2);
        let arena = reduce(2, &input, Rect::full(4, 2), &Census, 0);
        assert_eq!(arena[0].2, vec![(0, 0), (1, 0), (0, 1), (1, 1)]);
        assert_eq!(arena[1].2, vec![(2, 0), (3, 0), (2, 1), (3, 1)]);
    }

    #[test]
    fn empty_units_still_get_scratch() {
        let input = PixelBuffer::new(2, 2);
        let mut output = PixelBuffer::new(2, 2);
        let arena = run(5, &input, Rect::full(2, 2), &mut output, &Census, 0);
        assert_eq!(arena.len(), 5);
        assert_eq!(arena.iter().map(|s| s.0).sum::<u64>(), 4);
        assert!(output.pixels().iter().all(|&b| b == 255));
    }

    #[test]
    fn reduce_does_not_need_output() {
        let input = PixelBuffer::new(6, 6);
        let arena = reduce(1, &input, Rect::new(1, 1, 4, 4), &Census, 0);
        assert_eq!(arena[0].0, 16);
    }

    #[test]
    fn empty_region_spawns_nothing() {
        let input = PixelBuffer::new(4, 4);
        let mut output = PixelBuffer::new(4, 4);
        let arena = run(2, &input, Rect::new(1, 1, 0, 3), &mut output, &Census, 0);
        assert_eq!(arena.iter().map(|s| s.0).sum::<u64>(), 0);
        assert!(output.pixels().iter().all(|&b| b == 0));
    }
}
