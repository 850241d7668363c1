//! Filter composition.
//!
//! A [`Pipeline`] threads an image through an ordered list of
//! [`Filter`]s. Each stage may carry an inspection callback that sees the
//! stage's output before the next stage runs, which is how debug
//! intermediates get written out.
//!
//! ```rust
//! # use pixfx_effects::{EffectError, Pipeline, PixelBuffer};
//! # use pixfx_effects::{Gaussian, Grayscale, GrayscaleAlgorithm, Sobel};
//! # fn run(image: &PixelBuffer) -> Result<PixelBuffer, EffectError> {
//! let mut pipeline = Pipeline::new();
//! pipeline
//!     .add(Gaussian::new(5, 1.0)?, None)
//!     .add(Grayscale::new(GrayscaleAlgorithm::Luminosity), None)
//!     .add(Sobel::new(Some(40), false), None);
//! let edges = pipeline.run(image, 0)?;
//! # Ok(edges)
//! # }
//! ```

use web_time::Instant;

use crate::types::{EffectError, PixelBuffer};

/// An image effect.
///
/// Filters are stateless: applying the same filter to the same input
/// always yields the same output, regardless of `parallelism`.
pub trait Filter: Send + Sync {
    /// Short name used in logs and timing labels.
    fn name(&self) -> &'static str;

    /// Apply the effect using `parallelism` workers (`0` = one per
    /// hardware thread).
    ///
    /// # Errors
    ///
    /// Returns a configuration error if the filter cannot run on this
    /// image. Composite filters also surface inspection failures.
    fn apply(&self, image: &PixelBuffer, parallelism: usize) -> Result<PixelBuffer, EffectError>;
}

impl<F: Filter + ?Sized> Filter for Box<F> {
    fn name(&self) -> &'static str {
        (**self).name()
    }

    fn apply(&self, image: &PixelBuffer, parallelism: usize) -> Result<PixelBuffer, EffectError> {
        (**self).apply(image, parallelism)
    }
}

/// Callback invoked with a stage's output.
pub type Inspector = Box<dyn Fn(&PixelBuffer) -> Result<(), EffectError> + Send + Sync>;

struct Stage {
    filter: Box<dyn Filter>,
    inspect: Option<Inspector>,
}

/// An ordered list of filters applied one after another.
#[derive(Default)]
pub struct Pipeline {
    stages: Vec<Stage>,
}

impl Pipeline {
    /// An empty pipeline. Running it returns a copy of the input.
    #[must_use]
    pub fn new() -> Self {
        Self::default()
    }

    /// Append a stage with an optional inspection callback.
    pub fn add(&mut self, filter: impl Filter + 'static, inspect: Option<Inspector>) -> &mut Self {
        self.stages.push(Stage {
            filter: Box::new(filter),
            inspect,
        });
        self
    }

    /// Builder-style [`add`](Self::add) without a callback.
    #[must_use]
    pub fn with(mut self, filter: impl Filter + 'static) -> Self {
        self.add(filter, None);
        self
    }

    /// Names of the stages in order.
    pub fn stage_names(&self) -> impl Iterator<Item = &'static str> + '_ {
        self.stages.iter().map(|s| s.filter.name())
    }

    /// Run every stage in order.
    ///
    /// # Errors
    ///
    /// The first failing stage or callback aborts the run and its error
    /// is returned unchanged.
    pub fn run(&self, image: &PixelBuffer, parallelism: usize) -> Result<PixelBuffer, EffectError> {
        let mut current: Option<PixelBuffer> = None;
        for stage in &self.stages {
            let input = current.as_ref().unwrap_or(image);
            let started = Instant::now();
            let output = stage.filter.apply(input, parallelism)?;
            log::debug!(
                "stage {} finished in {:.3}ms, bounds {}",
                stage.filter.name(),
                started.elapsed().as_secs_f64() * 1000.0,
                output.bounds(),
            );
            if let Some(inspect) = &stage.inspect {
                inspect(&output)?;
            }
            current = Some(output);
        }
        Ok(current.unwrap_or_else(|| image.clone()))
    }
}

impl Filter for Pipeline {
    fn name(&self) -> &'static str {
        "pipeline"
    }

    fn apply(&self, image: &PixelBuffer, parallelism: usize) -> Result<PixelBuffer, EffectError> {
        self.run(image, parallelism)
    }
}

impl std::fmt::Debug for Pipeline {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_list().entries(self.stage_names()).finish()
    }
}
