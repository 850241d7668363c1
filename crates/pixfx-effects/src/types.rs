//! Shared types for the pixfx effect engine.

use std::fmt;
use std::ops::Range;

/// Re-export `RgbaImage` so downstream crates can convert decoded
/// images without depending on `image` directly.
pub use image::RgbaImage;

/// Bytes per pixel (R, G, B, A).
pub const CHANNELS: usize = 4;

/// An integer rectangle in pixel coordinates.
///
/// Used both for the active bounds of a [`PixelBuffer`] and for the
/// region a parallel job must cover.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, Hash)]
pub struct Rect {
    /// Left edge (inclusive).
    pub x: u32,
    /// Top edge (inclusive).
    pub y: u32,
    /// Number of columns.
    pub width: u32,
    /// Number of rows.
    pub height: u32,
}

impl Rect {
    /// Create a new rectangle.
    #[must_use]
    pub const fn new(x: u32, y: u32, width: u32, height: u32) -> Self {
        Self {
            x,
            y,
            width,
            height,
        }
    }

    /// The rectangle covering a whole `width` x `height` image.
    #[must_use]
    pub const fn full(width: u32, height: u32) -> Self {
        Self::new(0, 0, width, height)
    }

    /// Right edge (exclusive), saturating at `u32::MAX`.
    #[must_use]
    pub const fn right(self) -> u32 {
        self.x.saturating_add(self.width)
    }

    /// Bottom edge (exclusive), saturating at `u32::MAX`.
    #[must_use]
    pub const fn bottom(self) -> u32 {
        self.y.saturating_add(self.height)
    }

    /// Returns `true` if the rectangle covers no pixels.
    #[must_use]
    pub const fn is_empty(self) -> bool {
        self.width == 0 || self.height == 0
    }

    /// Number of pixels covered.
    #[must_use]
    pub const fn area(self) -> u64 {
        self.width as u64 * self.height as u64
    }

    /// The overlap of two rectangles.
    ///
    /// Rectangles that only touch produce a zero-sized rectangle at the
    /// touching edge; disjoint rectangles produce `Rect::default()`.
    #[must_use]
    pub fn intersect(self, other: Self) -> Self {
        let x = self.x.max(other.x);
        let y = self.y.max(other.y);
        let right = self.right().min(other.right());
        let bottom = self.bottom().min(other.bottom());
        if right >= x && bottom >= y {
            Self::new(x, y, right - x, bottom - y)
        } else {
            Self::default()
        }
    }

    /// Shrink every side by `radius` pixels.
    ///
    /// A rectangle too small to survive the shrink becomes empty.
    #[must_use]
    pub const fn inset(self, radius: u32) -> Self {
        let twice = radius.saturating_mul(2);
        if self.width <= twice || self.height <= twice {
            return Self::new(self.x, self.y, 0, 0);
        }
        Self::new(
            self.x.saturating_add(radius),
            self.y.saturating_add(radius),
            self.width - twice,
            self.height - twice,
        )
    }

    /// Returns `true` if `other` lies entirely inside this rectangle.
    ///
    /// Empty rectangles are contained everywhere.
    #[must_use]
    pub const fn contains(self, other: Self) -> bool {
        other.is_empty()
            || (other.x >= self.x
                && other.y >= self.y
                && other.right() <= self.right()
                && other.bottom() <= self.bottom())
    }

    /// Column and row ranges addressed by this rectangle.
    #[must_use]
    pub const fn to_pixel_region(self) -> (Range<u32>, Range<u32>) {
        (self.x..self.right(), self.y..self.bottom())
    }
}

impl fmt::Display for Rect {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(
            f,
            "X:{}, Y:{}, Width:{}, Height:{}",
            self.x, self.y, self.width, self.height
        )
    }
}

/// An RGBA raster with an active-bounds rectangle.
///
/// Pixels are stored row-major, four bytes per pixel. `bounds` marks the
/// region holding valid data; kernel filters leave a border outside it
/// that was never written. Bounds are fixed when the buffer is built and
/// are always clipped to the backing store.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct PixelBuffer {
    width: u32,
    height: u32,
    pixels: Vec<u8>,
    bounds: Rect,
}

impl PixelBuffer {
    /// A zeroed buffer whose bounds cover the whole image.
    #[must_use]
    pub fn new(width: u32, height: u32) -> Self {
        Self {
            width,
            height,
            pixels: vec![0; byte_len(width, height)],
            bounds: Rect::full(width, height),
        }
    }

    /// A zeroed buffer with the same dimensions as `template` whose bounds
    /// are `bounds` clipped to the image.
    ///
    /// This is how filters allocate their output: same nominal size as the
    /// input, bounds set to the region the filter fills.
    #[must_use]
    pub fn blank_like(template: &Self, bounds: Rect) -> Self {
        let mut out = Self::new(template.width, template.height);
        out.bounds = bounds.intersect(out.full_rect());
        out
    }

    /// Wrap raw RGBA bytes.
    ///
    /// # Errors
    ///
    /// Returns [`EffectError::BufferSize`] if `pixels` is not exactly
    /// `width * height * 4` bytes long.
    pub fn from_raw(width: u32, height: u32, pixels: Vec<u8>) -> Result<Self, EffectError> {
        let expected = byte_len(width, height);
        if pixels.len() != expected {
            return Err(EffectError::BufferSize {
                width,
                height,
                expected,
                actual: pixels.len(),
            });
        }
        Ok(Self {
            width,
            height,
            pixels,
            bounds: Rect::full(width, height),
        })
    }

    /// Build a buffer by evaluating `f` at every pixel.
    #[must_use]
    pub fn from_fn(width: u32, height: u32, mut f: impl FnMut(u32, u32) -> [u8; 4]) -> Self {
        let mut out = Self::new(width, height);
        for y in 0..height {
            for x in 0..width {
                let offset = out.offset(x, y);
                out.pixels[offset..offset + CHANNELS].copy_from_slice(&f(x, y));
            }
        }
        out
    }

    /// Replace the active bounds, clipped to the image.
    #[must_use]
    pub fn with_bounds(mut self, bounds: Rect) -> Self {
        self.bounds = bounds.intersect(self.full_rect());
        self
    }

    /// Width of the backing store in pixels.
    #[must_use]
    pub const fn width(&self) -> u32 {
        self.width
    }

    /// Height of the backing store in pixels.
    #[must_use]
    pub const fn height(&self) -> u32 {
        self.height
    }

    /// Bytes per row.
    #[must_use]
    pub const fn stride(&self) -> usize {
        self.width as usize * CHANNELS
    }

    /// The region holding valid pixels.
    #[must_use]
    pub const fn bounds(&self) -> Rect {
        self.bounds
    }

    /// The rectangle covering the whole backing store.
    #[must_use]
    pub const fn full_rect(&self) -> Rect {
        Rect::full(self.width, self.height)
    }

    /// Raw RGBA bytes, row-major.
    #[must_use]
    pub fn pixels(&self) -> &[u8] {
        &self.pixels
    }

    /// Mutable raw RGBA bytes, row-major.
    pub fn pixels_mut(&mut self) -> &mut [u8] {
        &mut self.pixels
    }

    /// Consume the buffer and return its raw bytes.
    #[must_use]
    pub fn into_raw(self) -> Vec<u8> {
        self.pixels
    }

    /// Byte offset of pixel `(x, y)`.
    #[must_use]
    pub const fn offset(&self, x: u32, y: u32) -> usize {
        y as usize * self.stride() + x as usize * CHANNELS
    }

    /// The RGBA value at `(x, y)`.
    ///
    /// # Panics
    ///
    /// Panics if `(x, y)` is outside the backing store.
    #[must_use]
    pub fn get(&self, x: u32, y: u32) -> [u8; 4] {
        let o = self.offset(x, y);
        [
            self.pixels[o],
            self.pixels[o + 1],
            self.pixels[o + 2],
            self.pixels[o + 3],
        ]
    }

    /// Intersection of this buffer's bounds with another's.
    #[must_use]
    pub fn intersect_bounds(&self, other: &Self) -> Rect {
        self.bounds.intersect(other.bounds)
    }

    /// Copy the active bounds into a new buffer that is exactly that size.
    ///
    /// Kernel filters leave an unwritten frame around their output; this
    /// drops it before encoding.
    #[must_use]
    pub fn crop_to_bounds(&self) -> Self {
        let b = self.bounds;
        let mut out = Self::new(b.width, b.height);
        let row_bytes = b.width as usize * CHANNELS;
        for row in 0..b.height {
            let src = self.offset(b.x, b.y + row);
            let dst = out.offset(0, row);
            out.pixels[dst..dst + row_bytes].copy_from_slice(&self.pixels[src..src + row_bytes]);
        }
        out
    }

    /// Convert into an `image` crate RGBA buffer of the full backing store.
    #[must_use]
    pub fn to_rgba_image(&self) -> RgbaImage {
        RgbaImage::from_fn(self.width, self.height, |x, y| image::Rgba(self.get(x, y)))
    }
}

impl From<RgbaImage> for PixelBuffer {
    fn from(image: RgbaImage) -> Self {
        let (width, height) = image.dimensions();
        Self {
            width,
            height,
            pixels: image.into_raw(),
            bounds: Rect::full(width, height),
        }
    }
}

const fn byte_len(width: u32, height: u32) -> usize {
    width as usize * height as usize * CHANNELS
}

/// Errors produced by effect construction and application.
///
/// Every configuration error is reported before any parallel work
/// starts.
#[derive(Debug, thiserror::Error)]
pub enum EffectError {
    /// A kernel or filter dimension that must be odd was even.
    #[error("{parameter} must be odd, got {value}")]
    NotOdd {
        /// Name of the offending parameter.
        parameter: &'static str,
        /// The rejected value.
        value: u32,
    },

    /// Pixelate block size does not tile the image.
    #[error(
        "block size {block_size} must divide exactly into the width and the height of the image ({width}x{height})"
    )]
    BlockSize {
        /// Requested block size.
        block_size: u32,
        /// Width of the region being pixelated.
        width: u32,
        /// Height of the region being pixelated.
        height: u32,
    },

    /// Any other out-of-range parameter.
    #[error("invalid effect configuration: {0}")]
    InvalidConfig(String),

    /// Raw bytes did not match the declared dimensions.
    #[error("pixel buffer of {width}x{height} needs {expected} bytes, got {actual}")]
    BufferSize {
        /// Declared width.
        width: u32,
        /// Declared height.
        height: u32,
        /// `width * height * 4`.
        expected: usize,
        /// Length actually supplied.
        actual: usize,
    },

    /// A pipeline inspection callback failed.
    #[error("stage inspection failed: {0}")]
    Inspect(#[source] Box<dyn std::error::Error + Send + Sync>),
}

/// Reject even values for parameters that need a center pixel.
pub(crate) const fn require_odd(parameter: &'static str, value: u32) -> Result<(), EffectError> {
    if value % 2 == 1 {
        Ok(())
    } else {
        Err(EffectError::NotOdd { parameter, value })
    }
}

#[cfg(test)]
#[allow(clippy::unwrap_used)]
mod tests {
    use super::*;

    // --- Rect tests ---

    #[test]
    fn intersect_overlapping() {
        let a = Rect::new(0, 0, 10, 10);
        let b = Rect::new(5, 3, 10, 10);
        assert_eq!(a.intersect(b), Rect::new(5, 3, 5, 7));
    }

    #[test]
    fn intersect_disjoint_is_empty() {
        let a = Rect::new(0, 0, 4, 4);
        let b = Rect::new(10, 10, 4, 4);
        let r = a.intersect(b);
        assert!(r.is_empty());
        assert_eq!(r, Rect::default());
    }

    #[test]
    fn intersect_is_commutative() {
        let a = Rect::new(2, 7, 13, 4);
        let b = Rect::new(5, 1, 3, 20);
        assert_eq!(a.intersect(b), b.intersect(a));
    }

    #[test]
    fn inset_shrinks_each_side() {
        let r = Rect::new(0, 0, 10, 8).inset(2);
        assert_eq!(r, Rect::new(2, 2, 6, 4));
    }

    #[test]
    fn inset_too_large_is_empty() {
        assert!(Rect::new(0, 0, 4, 100).inset(2).is_empty());
        assert!(Rect::new(0, 0, 5, 5).inset(u32::MAX).is_empty());
        assert_eq!(Rect::new(0, 0, 5, 5).inset(2), Rect::new(2, 2, 1, 1));
    }

    #[test]
    fn contains_checks_all_edges() {
        let outer = Rect::new(1, 1, 8, 8);
        assert!(outer.contains(Rect::new(1, 1, 8, 8)));
        assert!(outer.contains(Rect::new(3, 3, 2, 2)));
        assert!(!outer.contains(Rect::new(0, 1, 2, 2)));
        assert!(!outer.contains(Rect::new(5, 5, 5, 1)));
        assert!(outer.contains(Rect::new(100, 100, 0, 0)));
    }

    #[test]
    fn pixel_region_ranges() {
        let (xs, ys) = Rect::new(2, 3, 4, 5).to_pixel_region();
        assert_eq!(xs, 2..6);
        assert_eq!(ys, 3..8);
    }

    #[test]
    fn rect_display() {
        assert_eq!(
            Rect::new(1, 2, 3, 4).to_string(),
            "X:1, Y:2, Width:3, Height:4"
        );
    }

    // --- PixelBuffer tests ---

    #[test]
    fn new_buffer_bounds_cover_image() {
        let buf = PixelBuffer::new(7, 3);
        assert_eq!(buf.bounds(), Rect::full(7, 3));
        assert_eq!(buf.stride(), 28);
        assert_eq!(buf.pixels().len(), 7 * 3 * 4);
    }

    #[test]
    fn from_raw_rejects_wrong_length() {
        let result = PixelBuffer::from_raw(2, 2, vec![0; 15]);
        assert!(matches!(
            result,
            Err(EffectError::BufferSize {
                expected: 16,
                actual: 15,
                ..
            })
        ));
    }

    #[test]
    fn get_reads_rgba() {
        let buf = PixelBuffer::from_fn(3, 2, |x, y| [x as u8, y as u8, 9, 255]);
        assert_eq!(buf.get(2, 1), [2, 1, 9, 255]);
        assert_eq!(buf.get(0, 0), [0, 0, 9, 255]);
    }

    #[test]
    fn with_bounds_clips_to_image() {
        let buf = PixelBuffer::new(4, 4).with_bounds(Rect::new(2, 2, 10, 10));
        assert_eq!(buf.bounds(), Rect::new(2, 2, 2, 2));
    }

    #[test]
    fn far_out_bounds_do_not_overflow() {
        let far = Rect::new(u32::MAX - 1, 0, 4, 4);
        assert_eq!(far.right(), u32::MAX);
        assert_eq!(Rect::new(0, u32::MAX, 1, 1).bottom(), u32::MAX);
        let buf = PixelBuffer::new(4, 4).with_bounds(far);
        assert!(buf.bounds().is_empty());
    }

    #[test]
    fn blank_like_keeps_nominal_size() {
        let src = PixelBuffer::new(9, 5);
        let out = PixelBuffer::blank_like(&src, Rect::new(1, 1, 7, 3));
        assert_eq!((out.width(), out.height()), (9, 5));
        assert_eq!(out.bounds(), Rect::new(1, 1, 7, 3));
    }

    #[test]
    fn crop_to_bounds_copies_active_region() {
        let buf = PixelBuffer::from_fn(5, 4, |x, y| [x as u8, y as u8, 0, 255])
            .with_bounds(Rect::new(1, 2, 3, 2));
        let cropped = buf.crop_to_bounds();
        assert_eq!((cropped.width(), cropped.height()), (3, 2));
        assert_eq!(cropped.bounds(), Rect::full(3, 2));
        assert_eq!(cropped.get(0, 0), [1, 2, 0, 255]);
        assert_eq!(cropped.get(2, 1), [3, 3, 0, 255]);
    }

    #[test]
    fn rgba_image_round_trip() {
        let img = RgbaImage::from_fn(4, 3, |x, y| image::Rgba([x as u8, y as u8, 7, 200]));
        let buf = PixelBuffer::from(img.clone());
        assert_eq!(buf.get(3, 2), [3, 2, 7, 200]);
        assert_eq!(buf.to_rgba_image(), img);
    }

    #[test]
    fn require_odd_rejects_even() {
        assert!(require_odd("kernel size", 3).is_ok());
        assert!(matches!(
            require_odd("kernel size", 4),
            Err(EffectError::NotOdd { value: 4, .. })
        ));
        assert!(require_odd("kernel size", 0).is_err());
    }
}
