#![allow(clippy::unwrap_used)]

use pixfx_effects::parallel::partition;
use pixfx_effects::{
    Brightness, Cartoon, CartoonOptions, Filter, Gaussian, Grayscale, GrayscaleAlgorithm,
    OilPainting, Pencil, PixelBuffer, Pixelate, Rect, Sobel,
};
use proptest::prelude::*;

fn noise(width: u32, height: u32, seed: u32) -> PixelBuffer {
    PixelBuffer::from_fn(width, height, |x, y| {
        let h = (x.wrapping_mul(73_856_093) ^ y.wrapping_mul(19_349_663) ^ seed)
            .wrapping_mul(2_654_435_761);
        let [a, b, c, _] = h.to_le_bytes();
        [a, b, c, 255]
    })
}

fn arb_region() -> impl Strategy<Value = Rect> {
    (0u32..20, 0u32..20, 0u32..200, 1u32..20).prop_map(|(x, y, w, h)| Rect::new(x, y, w, h))
}

proptest! {
    #[test]
    fn tiles_cover_region_exactly(region in arb_region(), workers in 1usize..16, fixed in 0u32..40) {
        let units = partition(region, workers, fixed);
        prop_assert_eq!(units.len(), workers);

        let mut x = region.x;
        for (i, unit) in units.iter().enumerate() {
            prop_assert_eq!(unit.worker, i);
            prop_assert_eq!(unit.rect.x, x);
            prop_assert_eq!(unit.rect.y, region.y);
            prop_assert_eq!(unit.rect.height, region.height);
            x += unit.rect.width;
        }
        prop_assert_eq!(x, region.right());
        let area: u64 = units.iter().map(|u| u.rect.area()).sum();
        prop_assert_eq!(area, region.area());
    }

    #[test]
    fn fixed_tiles_are_exact_except_last(region in arb_region(), workers in 2usize..8, fixed in 1u32..30) {
        let units = partition(region, workers, fixed);
        let mut remaining = region.width;
        for unit in &units[..workers - 1] {
            prop_assert_eq!(unit.rect.width, fixed.min(remaining));
            remaining -= unit.rect.width;
        }
        prop_assert_eq!(units[workers - 1].rect.width, remaining);
    }

    #[test]
    fn grayscale_is_idempotent(w in 1u32..24, h in 1u32..24, seed in any::<u32>(), algo in 0usize..3) {
        let algorithm = [
            GrayscaleAlgorithm::Lightness,
            GrayscaleAlgorithm::Average,
            GrayscaleAlgorithm::Luminosity,
        ][algo];
        let g = Grayscale::new(algorithm);
        let once = g.apply(&noise(w, h, seed), 3).unwrap();
        let twice = g.apply(&once, 2).unwrap();
        prop_assert_eq!(once, twice);
    }

    #[test]
    fn simple_filters_ignore_parallelism(
        w in 3u32..40,
        h in 3u32..30,
        seed in any::<u32>(),
        workers in 2usize..12,
    ) {
        let img = noise(w, h, seed);
        let filters: Vec<Box<dyn Filter>> = vec![
            Box::new(Grayscale::default()),
            Box::new(Brightness::new(-37)),
            Box::new(Sobel::new(None, false)),
            Box::new(Sobel::new(Some(90), true)),
            Box::new(Gaussian::new(3, 1.0).unwrap()),
            Box::new(OilPainting::new(3, 10).unwrap()),
            Box::new(Pencil::new(0).unwrap()),
        ];
        for filter in &filters {
            let single = filter.apply(&img, 1).unwrap();
            let many = filter.apply(&img, workers).unwrap();
            prop_assert_eq!(single, many, "{} differs", filter.name());
        }
    }

    #[test]
    fn pixelate_ignores_parallelism(
        bs in 1u32..6,
        bw in 1u32..10,
        bh in 1u32..6,
        seed in any::<u32>(),
        workers in 2usize..12,
    ) {
        let img = noise(bs * bw, bs * bh, seed);
        let p = Pixelate::new(bs).unwrap();
        prop_assert_eq!(p.apply(&img, 1).unwrap(), p.apply(&img, workers).unwrap());
    }
}

#[test]
fn cartoon_ignores_parallelism() {
    let img = noise(48, 32, 7);
    let cartoon = Cartoon::new(CartoonOptions {
        blur_kernel_size: 5,
        edge_threshold: 60,
        oil_filter_size: 5,
        oil_levels: 12,
    })
    .unwrap();
    let single = cartoon.apply(&img, 1).unwrap();
    for workers in [2, 3, 7, 16] {
        assert_eq!(single, cartoon.apply(&img, workers).unwrap());
    }
}

#[test]
fn large_gaussian_ignores_parallelism() {
    let img = noise(40, 40, 3);
    let blur = Gaussian::new(9, 2.5).unwrap();
    assert_eq!(blur.apply(&img, 1).unwrap(), blur.apply(&img, 5).unwrap());
}
