//! Cartoon: oil-painted colors with black ink along detected edges.
//!
//! The edge mask comes from an optional blur, luminosity grayscale and a
//! thresholded Sobel. Independently the input image is oil painted.
//! Wherever the mask is set the painted pixel is replaced by black.
//!
//! Each branch shrinks the frame by a different radius, so the output
//! bounds are the intersection of both; pixels outside must be cropped
//! before encoding.

use std::fmt;
use std::sync::Arc;

use serde::{Deserialize, Serialize};

use crate::blur::Gaussian;
use crate::edge::Sobel;
use crate::grayscale::{Grayscale, GrayscaleAlgorithm};
use crate::oil::OilPainting;
use crate::parallel::{self, PixelKernel, PixelSite};
use crate::pipeline::{Filter, Inspector, Pipeline};
use crate::types::{EffectError, PixelBuffer};

/// Callback receiving labelled intermediates (`"gaussian"`, `"edge"`,
/// `"oil"`).
pub type StageInspector = Arc<dyn Fn(&str, &PixelBuffer) -> Result<(), EffectError> + Send + Sync>;

/// Options for [`Cartoon`].
///
/// The defaults are a reasonable starting point; most images need some
/// tuning.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(default)]
pub struct CartoonOptions {
    /// Gaussian kernel size applied before edge detection to reduce
    /// noise. `0` skips the blur; otherwise it must be odd.
    pub blur_kernel_size: u32,

    /// Sobel magnitude at or above which a pixel counts as an edge.
    /// Lower values ink more detail.
    pub edge_threshold: u8,

    /// Oil painting stroke size. Must be odd.
    pub oil_filter_size: u32,

    /// Number of intensity buckets for the oil painting.
    pub oil_levels: u32,
}

impl CartoonOptions {
    /// Default blur kernel size.
    pub const DEFAULT_BLUR_KERNEL_SIZE: u32 = 21;
    /// Default edge threshold.
    pub const DEFAULT_EDGE_THRESHOLD: u8 = 40;
    /// Default oil filter size.
    pub const DEFAULT_OIL_FILTER_SIZE: u32 = 15;
    /// Default oil levels.
    pub const DEFAULT_OIL_LEVELS: u32 = 15;
}

impl Default for CartoonOptions {
    fn default() -> Self {
        Self {
            blur_kernel_size: Self::DEFAULT_BLUR_KERNEL_SIZE,
            edge_threshold: Self::DEFAULT_EDGE_THRESHOLD,
            oil_filter_size: Self::DEFAULT_OIL_FILTER_SIZE,
            oil_levels: Self::DEFAULT_OIL_LEVELS,
        }
    }
}

/// Blackens painted pixels under the edge mask.
struct InkEdges<'a> {
    mask: &'a [u8],
}

impl PixelKernel for InkEdges<'_> {
    type Scratch = ();

    fn scratch(&self) {}

    fn process(&self, _: &mut (), site: PixelSite, input: &[u8], output: &mut [u8; 4]) {
        let o = site.offset;
        *output = if self.mask[o] == 255 {
            [0, 0, 0, 255]
        } else {
            [input[o], input[o + 1], input[o + 2], 255]
        };
    }
}

/// Cartoon filter.
pub struct Cartoon {
    options: CartoonOptions,
    blur: Option<Gaussian>,
    sobel: Sobel,
    oil: OilPainting,
    inspector: Option<StageInspector>,
}

impl Cartoon {
    /// Create a cartoon filter, validating every sub-filter up front.
    ///
    /// # Errors
    ///
    /// Returns [`EffectError::NotOdd`] for an even blur kernel or oil
    /// filter size and [`EffectError::InvalidConfig`] for zero oil levels.
    pub fn new(options: CartoonOptions) -> Result<Self, EffectError> {
        let blur = match options.blur_kernel_size {
            0 => None,
            size => Some(Gaussian::new(size, Gaussian::DEFAULT_SIGMA)?),
        };
        Ok(Self {
            options,
            blur,
            sobel: Sobel::new(Some(options.edge_threshold), false),
            oil: OilPainting::new(options.oil_filter_size, options.oil_levels)?,
            inspector: None,
        })
    }

    /// Attach a callback that receives the intermediate images.
    #[must_use]
    pub fn with_inspector(
        mut self,
        inspector: impl Fn(&str, &PixelBuffer) -> Result<(), EffectError> + Send + Sync + 'static,
    ) -> Self {
        self.inspector = Some(Arc::new(inspector));
        self
    }

    /// The options this filter was built from.
    #[must_use]
    pub const fn options(&self) -> &CartoonOptions {
        &self.options
    }

    fn inspect_as(&self, label: &'static str) -> Option<Inspector> {
        self.inspector.clone().map(|inspect| -> Inspector {
            Box::new(move |image: &PixelBuffer| inspect(label, image))
        })
    }

    /// The binary edge mask of `image`.
    fn edge_mask(&self, image: &PixelBuffer, parallelism: usize) -> Result<PixelBuffer, EffectError> {
        let mut edges = Pipeline::new();
        if let Some(blur) = &self.blur {
            edges.add(blur.clone(), self.inspect_as("gaussian"));
        }
        edges
            .add(Grayscale::new(GrayscaleAlgorithm::Luminosity), None)
            .add(self.sobel, self.inspect_as("edge"));
        edges.run(image, parallelism)
    }
}

impl Filter for Cartoon {
    fn name(&self) -> &'static str {
        "cartoon"
    }

    fn apply(&self, image: &PixelBuffer, parallelism: usize) -> Result<PixelBuffer, EffectError> {
        let mask = self.edge_mask(image, parallelism)?;

        let painted = self.oil.apply(image, parallelism)?;
        if let Some(inspect) = &self.inspector {
            inspect("oil", &painted)?;
        }

        let region = painted.intersect_bounds(&mask);
        let mut out = PixelBuffer::blank_like(image, region);
        parallel::run(
            parallelism,
            &painted,
            region,
            &mut out,
            &InkEdges {
                mask: mask.pixels(),
            },
            0,
        );
        Ok(out)
    }
}

impl fmt::Debug for Cartoon {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("Cartoon")
            .field("options", &self.options)
            .field("inspector", &self.inspector.is_some())
            .finish_non_exhaustive()
    }
}
