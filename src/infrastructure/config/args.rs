use super::app_config::LogLevel;
use clap::Parser;
use std::path::PathBuf;

/// Command line arguments.
#[derive(Debug, Parser)]
#[command(
    name = "cached-image",
    version,
    about = "Fetch, decode and cache images",
    long_about = None
)]
pub struct CliArgs {
    /// Image URLs to load.
    #[arg(value_name = "URL", required = true)]
    pub urls: Vec<String>,

    /// Configuration file path.
    #[arg(short, long, value_name = "PATH")]
    pub config: Option<PathBuf>,

    /// Log file path.
    #[arg(long, value_name = "PATH")]
    pub log_path: Option<PathBuf>,

    /// Log verbosity level.
    #[arg(long, value_enum)]
    pub log_level: Option<LogLevel>,

    /// Request timeout in seconds.
    #[arg(long)]
    pub timeout: Option<u64>,

    /// Maximum number of cached images.
    #[arg(long)]
    pub max_entries: Option<usize>,

    /// Maximum decoded size of the cache in bytes.
    #[arg(long)]
    pub max_cost: Option<usize>,

    /// Downscale images larger than this many pixels on either side.
    #[arg(long)]
    pub max_dimension: Option<u32>,

    /// Number of times to load every URL. Later passes are served from the cache.
    #[arg(long, default_value_t = 2)]
    pub passes: u32,
}
