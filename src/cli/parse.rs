//! CLI parse: clap types for content-policy. No behavior; definitions only.

use crate::error::PolicyError;
use crate::types::Frame;
use clap::{Parser, Subcommand, ValueEnum};
use std::path::PathBuf;

/// content-policy - classify requests against filter lists
#[derive(Parser)]
#[command(name = "content-policy")]
#[command(about = "Classify requests and decide whether to block them using filter lists")]
pub struct Cli {
    #[command(subcommand)]
    pub command: Commands,

    /// Workspace root directory (searched for config/config.toml)
    #[arg(long, default_value = ".")]
    pub workspace: PathBuf,

    /// Configuration file path (overrides default config loading)
    #[arg(long)]
    pub config: Option<PathBuf>,

    /// Enable verbose logging (default: off)
    #[arg(long, default_value = "false")]
    pub verbose: bool,

    /// Log level (trace, debug, info, warn, error, off)
    #[arg(long)]
    pub log_level: Option<String>,

    /// Log format (json, text)
    #[arg(long)]
    pub log_format: Option<String>,

    /// Log output (stdout, stderr, file)
    #[arg(long)]
    pub log_output: Option<String>,

    /// Log file path (if output is "file")
    #[arg(long)]
    pub log_file: Option<PathBuf>,
}

#[derive(Subcommand)]
pub enum Commands {
    /// Decide whether a single request is allowed
    Check {
        /// Content type reported for the request (IMAGE, SCRIPT, ...)
        #[arg(long = "type", default_value = "OTHER")]
        content_type: String,

        /// Request location
        location: String,

        /// Frame chain, innermost first. Append " <sitekey>" to attach a key.
        #[arg(long = "frame", value_parser = parse_frame)]
        frames: Vec<Frame>,

        /// Filter list files, in addition to those named in the config
        #[arg(long = "list")]
        lists: Vec<PathBuf>,

        /// Treat the request as coming from a private context
        #[arg(long)]
        private: bool,

        /// Override the fast-collapse preference
        #[arg(long)]
        fast_collapse: Option<bool>,
    },
    /// Report whether element hiding applies to a frame chain
    Elemhide {
        /// Frame chain, innermost first. Append " <sitekey>" to attach a key.
        #[arg(long = "frame", value_parser = parse_frame, required = true)]
        frames: Vec<Frame>,

        /// Filter list files, in addition to those named in the config
        #[arg(long = "list")]
        lists: Vec<PathBuf>,

        #[arg(long)]
        private: bool,
    },
    /// Parse filter lists and report filter counts and invalid lines
    Lint {
        /// Filter list files
        #[arg(required = true)]
        lists: Vec<PathBuf>,

        /// Output format
        #[arg(long, value_enum, default_value = "text")]
        format: OutputFormat,
    },
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, ValueEnum)]
pub enum OutputFormat {
    Text,
    Json,
}

/// Parse a `--frame` value: a URL, optionally followed by whitespace and a site key.
///
/// Only http(s) frames are checked for well-formedness; other schemes pass
/// through so exempt-scheme handling can be observed.
pub fn parse_frame(value: &str) -> Result<Frame, PolicyError> {
    let value = value.trim();
    let (location, site_key) = match value.split_once(char::is_whitespace) {
        Some((location, key)) => (location, Some(key.trim())),
        None => (value, None),
    };
    if location.is_empty() {
        return Err(PolicyError::InvalidLocation(value.to_string()));
    }
    let lower = location.to_ascii_lowercase();
    if (lower.starts_with("http:") || lower.starts_with("https:"))
        && url::Url::parse(location).is_err()
    {
        return Err(PolicyError::InvalidLocation(location.to_string()));
    }
    Ok(match site_key {
        Some(key) if !key.is_empty() => Frame::with_site_key(location, key),
        _ => Frame::new(location),
    })
}
