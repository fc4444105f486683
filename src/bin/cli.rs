use anyhow::{Context, Result};
use clap::Parser;
use log::{info, LevelFilter};
use speckle_stacker::pipeline::Pipeline;
use speckle_stacker::settings::{CropRect, PipelineConfig};
use speckle_stacker::video::{ColorChannel, Y4mSource};

/// Speckle masking image processing: Labeyrie + Weigelt reconstruction from
/// a YUV4MPEG2 video of turbulence-degraded short exposures.
#[derive(Parser, Debug)]
#[command(name = "speckle-stacker")]
#[command(author = "OpenSauce")]
#[command(version)]
#[command(about = "Speckle-masking image reconstruction from turbulence-degraded video.")]
struct Args {
    /// Process at most this many frames (default: 400).
    #[arg(short = 'n', long = "nrframes")]
    max_frames: Option<u32>,

    /// Index of the reference frame (default: 0).
    #[arg(short = 'r', long = "refframe")]
    ref_frame: Option<usize>,

    /// Radius of phase reconstruction, in pixels (default: 2 * bdepth).
    #[arg(short = 'p', long = "recoradius")]
    reco_radius: Option<f64>,

    /// Bispectrum extent along its 3rd and 4th axes (default: 15).
    #[arg(short = 'b', long = "bdepth")]
    bispectrum_depth: Option<usize>,

    /// Color channel: r, g, b or i (default: i).
    #[arg(short = 'c', long = "channel")]
    channel: Option<char>,

    /// Fixed crop box position, `left:top`.
    #[arg(short = 'k', long = "croppos", value_parser = parse_pair)]
    crop_pos: Option<(usize, usize)>,

    /// Crop box size, `width:height`.
    #[arg(short = 's', long = "cropsize", value_parser = parse_pair)]
    crop_size: Option<(usize, usize)>,

    /// Calculate the picture sum and shifted sum (default: on).
    #[arg(long = "calcsum", overrides_with = "no_calcsum")]
    calcsum: bool,
    #[arg(long = "no-calcsum", overrides_with = "calcsum")]
    no_calcsum: bool,

    /// Perform speckle masking (default: on).
    #[arg(long = "specklemasking", overrides_with = "no_specklemasking")]
    specklemasking: bool,
    #[arg(long = "no-specklemasking", overrides_with = "specklemasking")]
    no_specklemasking: bool,

    /// Increase verbosity; may be repeated.
    #[arg(short = 'v', action = clap::ArgAction::Count)]
    verbose: u8,

    /// Path to the input YUV4MPEG2 video.
    source: String,
}

fn parse_pair(s: &str) -> std::result::Result<(usize, usize), String> {
    let (a, b) = s
        .split_once(':')
        .ok_or_else(|| format!("expected `a:b`, got '{s}'"))?;
    let a: usize = a.parse().map_err(|_| format!("not a number: '{a}'"))?;
    let b: usize = b.parse().map_err(|_| format!("not a number: '{b}'"))?;
    Ok((a, b))
}

fn main() -> Result<()> {
    let args = Args::parse();
    let default_level = match args.verbose {
        0 => LevelFilter::Info,
        1 => LevelFilter::Debug,
        _ => LevelFilter::Trace,
    };
    env_logger::Builder::new()
        .filter_level(default_level)
        .parse_default_env()
        .init();

    info!("Speckle Masking Image Processing");
    info!("args: {args:?}");

    let mut config = PipelineConfig::default();
    if let Some(n) = args.max_frames {
        config.max_frames = n;
    }
    if let Some(r) = args.ref_frame {
        config.ref_frame = r;
    }
    if let Some(b) = args.bispectrum_depth {
        config.bispectrum_depth = b;
        if args.reco_radius.is_none() {
            config.reco_radius = (2 * b) as f64;
        }
    }
    if let Some(p) = args.reco_radius {
        config.reco_radius = p;
    }
    if let Some(c) = args.channel {
        config.color_channel = ColorChannel::from_flag(c)?.into();
    }
    if let (Some((left, top)), Some((width, height))) = (args.crop_pos, args.crop_size) {
        config.crop = Some(CropRect { left, top, width, height });
    }
    config.calc_sum = !args.no_calcsum;
    config.speckle_masking = !args.no_specklemasking;

    info!("opening video file {}", args.source);
    let mut source =
        Y4mSource::open(&args.source).with_context(|| format!("failed to open '{}'", args.source))?;

    Pipeline::new(config)
        .run(&mut source)
        .context("reconstruction pipeline failed")?;

    Ok(())
}
