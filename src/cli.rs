//! CLI argument definitions using clap derive macros.

use std::path::PathBuf;

use clap::Parser;

use streamgate::DEFAULT_MAX_ATTEMPTS;

/// Bot-resistant video metadata and download API.
///
/// Streamgate resolves public video URLs to stream metadata and direct
/// downloads, rotating its outbound identity and backing off when the
/// upstream blocks automated clients.
#[derive(Parser, Debug)]
#[command(name = "streamgate")]
#[command(author, version, about)]
pub struct Args {
    /// Increase output verbosity (-v for debug, -vv for trace)
    #[arg(short, long, action = clap::ArgAction::Count)]
    pub verbose: u8,

    /// Suppress non-error output
    #[arg(short, long)]
    pub quiet: bool,

    /// Address to bind the HTTP server to
    #[arg(short, long, default_value = "0.0.0.0")]
    pub bind: String,

    /// Port to listen on
    #[arg(short, long, default_value_t = 5000)]
    pub port: u16,

    /// Directory for staged downloads (defaults to a subdirectory of the
    /// system temp dir)
    #[arg(long)]
    pub temp_dir: Option<PathBuf>,

    /// Seconds a downloaded file is retained before cleanup (10-86400)
    #[arg(long, default_value_t = 300, value_parser = clap::value_parser!(u64).range(10..=86_400))]
    pub retention_secs: u64,

    /// Maximum extraction attempts per request (1-10)
    #[arg(short = 'a', long, default_value_t = DEFAULT_MAX_ATTEMPTS as u8, value_parser = clap::value_parser!(u8).range(1..=10))]
    pub max_attempts: u8,

    /// Path to the yt-dlp binary
    #[arg(long, default_value = "yt-dlp")]
    pub ytdlp_bin: PathBuf,
}
