use std::fs;
use std::path::{Path, PathBuf};
use std::process::ExitCode;

use clap::Parser;
use solo_align::{AlignerConfig, AlignmentError, SoloAlignerBuilder};

#[derive(Debug, Parser)]
#[command(name = "align")]
#[command(about = "Align a solo piano feature sequence against a .solo score")]
struct Args {
    /// Path to the score in .solo format.
    #[arg(long)]
    score: PathBuf,

    /// JSON feature file: an array (or `{"frames": [...]}` object) of
    /// equal-length arrays of non-negative spectrum bins, one per frame.
    #[arg(long)]
    features: PathBuf,

    #[arg(long, default_value_t = AlignerConfig::DEFAULT_SAMPLE_RATE_HZ)]
    sample_rate: f32,

    #[arg(long, default_value_t = AlignerConfig::DEFAULT_HOP_SIZE)]
    hop_size: usize,

    #[arg(long, default_value_t = AlignerConfig::DEFAULT_BLOCK_SIZE)]
    block_size: usize,

    #[arg(long, default_value_t = AlignerConfig::DEFAULT_BEAM_WIDTH)]
    beam_width: usize,

    #[arg(long, default_value_t = AlignerConfig::DEFAULT_WINDOW_SIZE)]
    window_size: usize,
}

#[derive(Debug, serde::Deserialize)]
#[serde(untagged)]
enum FeatureFile {
    Frames { frames: Vec<Vec<f32>> },
    Bare(Vec<Vec<f32>>),
}

impl FeatureFile {
    fn into_frames(self) -> Vec<Vec<f32>> {
        match self {
            FeatureFile::Frames { frames } => frames,
            FeatureFile::Bare(frames) => frames,
        }
    }
}

fn main() -> ExitCode {
    tracing_subscriber::fmt()
        .with_env_filter(tracing_subscriber::EnvFilter::from_default_env())
        .init();

    let args = Args::parse();
    match run(&args) {
        Ok(()) => ExitCode::SUCCESS,
        Err(err) => {
            eprintln!("align: {err}");
            ExitCode::FAILURE
        }
    }
}

fn run(args: &Args) -> Result<(), AlignmentError> {
    let mut config = AlignerConfig::new(args.sample_rate, args.hop_size, args.block_size);
    config.beam_width = args.beam_width;
    config.window_size = args.window_size;
    let seconds_per_frame = f64::from(config.sample_rate_hz).recip() * config.hop_size as f64;

    let mut aligner = SoloAlignerBuilder::new(config)
        .with_score_path(&args.score)
        .build()?;

    for frame in load_features(&args.features)? {
        aligner.supply_feature(frame)?;
    }
    tracing::debug!(frames = aligner.num_frames(), "features loaded");

    let results = aligner.align()?;
    println!("event\tframe\tseconds");
    for (event, frame) in results.iter().enumerate() {
        println!("{event}\t{frame}\t{:.3}", *frame as f64 * seconds_per_frame);
    }
    Ok(())
}

fn load_features(path: &Path) -> Result<Vec<Vec<f32>>, AlignmentError> {
    let data = fs::read_to_string(path)
        .map_err(|e| AlignmentError::io("reading features file", e))?;
    parse_features(&data)
}

fn parse_features(data: &str) -> Result<Vec<Vec<f32>>, AlignmentError> {
    let parsed: FeatureFile =
        serde_json::from_str(data).map_err(|e| AlignmentError::InvalidInput {
            message: format!("parsing features file: {e}"),
        })?;
    Ok(parsed.into_frames())
}
