// convoy-cli/src/cli.rs
//
// Defines the command-line argument structures using clap.

use clap::{Args, Parser, Subcommand};
use convoy_core::config::{DEFAULT_PREVIEW_CLIP_SECONDS, PreviewStart, QualityMetric};
use std::path::PathBuf;

// --- CLI Argument Definition ---

#[derive(Parser, Debug)]
#[command(
    author,
    version, // Reads from Cargo.toml via "cargo" feature in clap
    about = "Convoy: batch media converter",
    long_about = "Plans and runs batch media conversions with ffmpeg and ffprobe via convoy-core."
)]
pub struct Cli {
    #[command(subcommand)]
    pub command: Commands,

    /// Show debug output on the console
    #[arg(short, long, global = true)]
    pub verbose: bool,

    /// Disable colored output
    #[arg(long, global = true)]
    pub no_color: bool,
}

#[derive(Subcommand, Debug)]
pub enum Commands {
    /// Converts every media file of the input into the output directory
    Run(RunArgs),
    /// Shows the conversion plan for each file without encoding anything
    Plan(PlanArgs),
}

/// Options shared by every command that builds conversion plans.
#[derive(Args, Debug, Clone)]
pub struct ConversionArgs {
    /// Input file or directory
    #[arg(short = 'i', long = "input", value_name = "INPUT_PATH")]
    pub input_path: PathBuf,

    /// Directory where converted files are written
    #[arg(short = 'o', long = "output", value_name = "OUTPUT_DIR")]
    pub output_dir: PathBuf,

    /// Conversion tables file (TOML); built-in tables when omitted
    #[arg(long, value_name = "FILE", env = "CONVOY_TABLES")]
    pub tables: Option<PathBuf>,

    /// Video encoder from the codec catalogue (e.g. libx265, hevc_nvenc)
    #[arg(long = "codec", value_name = "ENCODER")]
    pub video_codec: Option<String>,

    /// Target container extension; each source keeps its own when omitted
    #[arg(long, value_name = "EXT")]
    pub container: Option<String>,

    /// Always re-encode audio instead of copying compatible streams
    #[arg(long)]
    pub reencode_audio: bool,

    /// Audio codec used when audio is re-encoded
    #[arg(long, value_name = "CODEC")]
    pub audio_codec: Option<String>,

    /// Audio bitrate in kbps for re-encoded audio
    #[arg(long, value_name = "KBPS")]
    pub audio_bitrate: Option<u32>,

    /// Multiplier applied to the rate profile bitrate
    #[arg(long, value_name = "FACTOR")]
    pub bitrate_modifier: Option<f64>,

    /// Skip files whose output already exists
    #[arg(long)]
    pub skip_existing: bool,

    /// Encoder preset override
    #[arg(long, value_name = "PRESET")]
    pub preset: Option<String>,

    /// Decode in software even for hardware encoders
    #[arg(long)]
    pub no_hw_decode: bool,

    /// Comma-separated input extensions to pick up from a directory
    #[arg(long, value_delimiter = ',', value_name = "EXTS")]
    pub extensions: Option<Vec<String>>,
}

#[derive(Args, Debug)]
pub struct RunArgs {
    #[command(flatten)]
    pub conversion: ConversionArgs,

    /// Directory for run logs and summaries (defaults to OUTPUT_DIR/logs)
    #[arg(short, long, value_name = "LOG_DIR")]
    pub log_dir: Option<PathBuf>,

    /// Directory for encode workspaces, used as DIR/convoy-work (defaults to OUTPUT_DIR/.convoy-work)
    #[arg(long, value_name = "DIR")]
    pub temp_dir: Option<PathBuf>,

    // --- Quality Preview ---
    /// Score a short encoded clip before each full encode
    #[arg(long)]
    pub preview: bool,

    /// Preview clip length in seconds
    #[arg(long, value_name = "SECONDS", default_value_t = DEFAULT_PREVIEW_CLIP_SECONDS, requires = "preview")]
    pub preview_seconds: f64,

    /// Preview clip start: seconds from the start, or "middle"
    #[arg(long, value_name = "START", default_value = "middle", requires = "preview")]
    pub preview_start: PreviewStart,

    /// Preview metric: vmaf, ssim or psnr
    #[arg(long, value_name = "METRIC", default_value = "vmaf", requires = "preview")]
    pub preview_metric: QualityMetric,
}

#[derive(Args, Debug)]
pub struct PlanArgs {
    #[command(flatten)]
    pub conversion: ConversionArgs,

    /// Print the plans as JSON
    #[arg(long)]
    pub json: bool,
}
