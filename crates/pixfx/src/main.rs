//! pixfx: apply a parallel image effect to a file.
//!
//! Loads an image, runs one effect over it with a configurable number of
//! worker threads, and writes the result. The output format follows the
//! output extension (`.jpg`, `.jpeg` or `.png`).
//!
//! # Usage
//!
//! ```text
//! pixfx [OPTIONS] oil 5 30 photo.jpg photo-oil.jpg
//! pixfx --threads 4 --timings cartoon --debug-dir dbg photo.jpg photo-cartoon.jpg
//! ```

#![allow(clippy::print_stdout, clippy::print_stderr)]

mod logger;

use std::error::Error;
use std::path::PathBuf;
use std::process::ExitCode;

use clap::{Args, Parser, Subcommand, ValueEnum};
use pixfx_effects::{
    Brightness, Cartoon, CartoonOptions, Filter, Gaussian, Grayscale, GrayscaleAlgorithm,
    OilPainting, Pencil, Pixelate, Sobel, Timing,
};
use pixfx_io::SaveOptions;

/// Parallel spatial image effects.
#[derive(Parser, Debug)]
#[command(name = "pixfx", version)]
struct Cli {
    /// Worker threads (0 = one per hardware thread).
    #[arg(long, global = true, default_value_t = 0)]
    threads: usize,

    /// JPEG output quality.
    #[arg(
        long,
        global = true,
        default_value_t = SaveOptions::DEFAULT_JPEG_QUALITY,
        value_parser = clap::value_parser!(u8).range(1..=100),
    )]
    jpeg_quality: u8,

    /// Keep the unwritten border instead of cropping to the valid region.
    #[arg(long, global = true)]
    no_crop: bool,

    /// Print per-step timings when done.
    #[arg(long, global = true)]
    timings: bool,

    /// Increase log output (-v info, -vv debug, -vvv trace).
    #[arg(short, long, global = true, action = clap::ArgAction::Count)]
    verbose: u8,

    #[command(subcommand)]
    effect: Effect,
}

/// Input and output image paths.
#[derive(Args, Debug)]
struct Files {
    /// Input image (PNG, JPEG, BMP, WebP).
    input: PathBuf,

    /// Output image (.jpg, .jpeg or .png).
    output: PathBuf,
}

#[derive(Subcommand, Debug)]
enum Effect {
    /// Convert to gray.
    Grayscale {
        /// Gray conversion formula.
        #[arg(long, value_enum, default_value_t = Algorithm::Luminosity)]
        algorithm: Algorithm,

        #[command(flatten)]
        files: Files,
    },

    /// Add a constant to every channel.
    Brightness {
        /// Offset added to R, G and B (negative darkens).
        #[arg(allow_negative_numbers = true)]
        offset: i32,

        #[command(flatten)]
        files: Files,
    },

    /// Sobel edge detection.
    Sobel {
        /// Magnitude at or above which a pixel is an edge. Without it the
        /// raw magnitude is written.
        #[arg(long)]
        threshold: Option<u8>,

        /// Invert the result (dark edges on white).
        #[arg(long)]
        invert: bool,

        #[command(flatten)]
        files: Files,
    },

    /// Gaussian blur.
    Gaussian {
        /// Kernel size (odd).
        kernel_size: u32,

        /// Standard deviation of the kernel.
        #[arg(long, default_value_t = Gaussian::DEFAULT_SIGMA)]
        sigma: f64,

        #[command(flatten)]
        files: Files,
    },

    /// Oil painting.
    Oil {
        /// Stroke size (odd, at least 3).
        #[arg(value_parser = clap::value_parser!(u32).range(3..))]
        filter_size: u32,

        /// Intensity levels (at least 1).
        #[arg(value_parser = clap::value_parser!(u32).range(1..))]
        levels: u32,

        #[command(flatten)]
        files: Files,
    },

    /// Block pixelation.
    Pixelate {
        /// Block side length; must divide the image width and height.
        #[arg(value_parser = clap::value_parser!(u32).range(1..))]
        block_size: u32,

        #[command(flatten)]
        files: Files,
    },

    /// Pencil sketch.
    Pencil {
        /// Blur kernel size applied first (0 = none, otherwise odd).
        blur_factor: u32,

        #[command(flatten)]
        files: Files,
    },

    /// Oil painting with inked edges.
    Cartoon {
        #[command(flatten)]
        options: CartoonArgs,

        #[command(flatten)]
        files: Files,
    },
}

#[derive(Args, Debug)]
struct CartoonArgs {
    /// Blur kernel size before edge detection (0 = none, otherwise odd).
    #[arg(long, default_value_t = CartoonOptions::DEFAULT_BLUR_KERNEL_SIZE)]
    blur_kernel_size: u32,

    /// Edge threshold; lower values ink more detail.
    #[arg(long, default_value_t = CartoonOptions::DEFAULT_EDGE_THRESHOLD)]
    edge_threshold: u8,

    /// Oil painting stroke size (odd).
    #[arg(long, default_value_t = CartoonOptions::DEFAULT_OIL_FILTER_SIZE)]
    oil_filter_size: u32,

    /// Oil painting intensity levels.
    #[arg(long, default_value_t = CartoonOptions::DEFAULT_OIL_LEVELS)]
    oil_levels: u32,

    /// Full options as a JSON string. When provided, the individual
    /// cartoon flags are ignored; missing fields take their defaults.
    #[arg(long)]
    config_json: Option<String>,

    /// Directory to save the intermediate images into.
    #[arg(long)]
    debug_dir: Option<PathBuf>,
}

/// Gray conversion formula.
#[derive(Clone, Copy, Debug, ValueEnum)]
enum Algorithm {
    /// Mean of the largest and smallest channel.
    Lightness,
    /// Mean of the three channels.
    Average,
    /// Perceptual weighting.
    Luminosity,
}

impl From<Algorithm> for GrayscaleAlgorithm {
    fn from(algorithm: Algorithm) -> Self {
        match algorithm {
            Algorithm::Lightness => Self::Lightness,
            Algorithm::Average => Self::Average,
            Algorithm::Luminosity => Self::Luminosity,
        }
    }
}

impl Effect {
    const fn files(&self) -> &Files {
        match self {
            Self::Grayscale { files, .. }
            | Self::Brightness { files, .. }
            | Self::Sobel { files, .. }
            | Self::Gaussian { files, .. }
            | Self::Oil { files, .. }
            | Self::Pixelate { files, .. }
            | Self::Pencil { files, .. }
            | Self::Cartoon { files, .. } => files,
        }
    }

    /// Build the filter, validating every parameter.
    fn filter(&self, save: SaveOptions) -> Result<Box<dyn Filter>, Box<dyn Error>> {
        let filter: Box<dyn Filter> = match self {
            Self::Grayscale { algorithm, .. } => Box::new(Grayscale::new((*algorithm).into())),
            Self::Brightness { offset, .. } => Box::new(Brightness::new(*offset)),
            Self::Sobel {
                threshold, invert, ..
            } => Box::new(Sobel::new(*threshold, *invert)),
            Self::Gaussian {
                kernel_size, sigma, ..
            } => Box::new(Gaussian::new(*kernel_size, *sigma)?),
            Self::Oil {
                filter_size,
                levels,
                ..
            } => Box::new(OilPainting::new(*filter_size, *levels)?),
            Self::Pixelate { block_size, .. } => Box::new(Pixelate::new(*block_size)?),
            Self::Pencil { blur_factor, .. } => Box::new(Pencil::new(*blur_factor)?),
            Self::Cartoon { options, .. } => {
                let cartoon = Cartoon::new(options.to_options()?)?;
                match &options.debug_dir {
                    Some(dir) => {
                        std::fs::create_dir_all(dir)?;
                        let writer = pixfx_io::stage_writer(dir.clone(), "cartoon", save);
                        Box::new(cartoon.with_inspector(writer))
                    }
                    None => Box::new(cartoon),
                }
            }
        };
        Ok(filter)
    }
}

impl CartoonArgs {
    fn to_options(&self) -> Result<CartoonOptions, Box<dyn Error>> {
        if let Some(ref json) = self.config_json {
            return serde_json::from_str(json)
                .map_err(|e| format!("Error parsing --config-json: {e}").into());
        }
        Ok(CartoonOptions {
            blur_kernel_size: self.blur_kernel_size,
            edge_threshold: self.edge_threshold,
            oil_filter_size: self.oil_filter_size,
            oil_levels: self.oil_levels,
        })
    }
}

fn run(cli: &Cli) -> Result<Timing, Box<dyn Error>> {
    let save = SaveOptions {
        jpeg_quality: cli.jpeg_quality,
        clip_to_bounds: !cli.no_crop,
    };
    let filter = cli.effect.filter(save)?;
    let files = cli.effect.files();
    let mut timing = Timing::new();

    timing.start("load");
    let image = pixfx_io::load(&files.input)?;
    timing.stop("load");

    timing.start(filter.name());
    let output = filter.apply(&image, cli.threads)?;
    timing.stop(filter.name());
    log::info!("{} done, valid region {}", filter.name(), output.bounds());

    timing.start("save");
    pixfx_io::save(&output, &files.output, &save)?;
    timing.stop("save");

    Ok(timing)
}

fn main() -> ExitCode {
    let cli = Cli::parse();
    logger::init(cli.verbose);

    match run(&cli) {
        Ok(timing) => {
            if cli.timings {
                print!("{timing}");
            }
            ExitCode::SUCCESS
        }
        Err(e) => {
            eprintln!("Error: {e}");
            ExitCode::FAILURE
        }
    }
}
