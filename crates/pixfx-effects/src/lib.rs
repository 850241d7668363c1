//! pixfx-effects: parallel spatial image effects (sans-IO).
//!
//! Every effect is a per-pixel kernel driven by a fork-join executor
//! that splits the active region of a [`PixelBuffer`] into vertical
//! strips, one per worker. Effects that read a neighborhood shrink the
//! active bounds by their radius, and composite effects thread the
//! shrunken image through further stages.
//!
//! This crate has **no I/O dependencies**: it operates on in-memory RGBA
//! buffers. Decoding, encoding and the filesystem live in `pixfx-io`.

pub mod blur;
pub mod brightness;
pub mod cartoon;
pub mod diagnostics;
pub mod edge;
pub mod grayscale;
pub mod oil;
pub mod parallel;
pub mod pencil;
pub mod pipeline;
pub mod pixelate;
pub mod types;

pub use blur::Gaussian;
pub use brightness::Brightness;
pub use cartoon::{Cartoon, CartoonOptions, StageInspector};
pub use diagnostics::{Timing, TimingEntry};
pub use edge::Sobel;
pub use grayscale::{Grayscale, GrayscaleAlgorithm};
pub use oil::OilPainting;
pub use parallel::{PixelKernel, PixelSite, WorkUnit};
pub use pencil::Pencil;
pub use pipeline::{Filter, Inspector, Pipeline};
pub use pixelate::Pixelate;
pub use types::{CHANNELS, EffectError, PixelBuffer, Rect, RgbaImage};
