// /////////////////////////////////////////////////////////////////////////////
// Adaptive Pipeline RS
// Copyright (c) 2025 Michael Gardner, A Bit of Help, Inc.
// SPDX-License-Identifier: BSD-3-Clause
// See LICENSE file in the project root.
// /////////////////////////////////////////////////////////////////////////////

//! # CLI Parser
//!
//! Command-line interface parsing using clap.
//!
//! This module defines the CLI structure and handles argument parsing.
//! Security validation happens in the validator module after parsing.

use clap::{Parser, Subcommand};
use std::path::PathBuf;

/// Main CLI structure
#[derive(Parser, Debug, Clone)]
#[command(name = "transcode-worker")]
#[command(about = concat!("Media Transcode Worker v", env!("CARGO_PKG_VERSION")))]
#[command(version)]
pub struct Cli {
    #[command(subcommand)]
    pub command: Commands,

    /// Enable verbose (pretty, non-JSON) logging
    #[arg(short, long)]
    pub verbose: bool,

    /// Worker configuration file path (TOML/YAML/JSON)
    #[arg(short, long)]
    pub config: Option<PathBuf>,

    /// Override the CPU-bound worker pool size
    #[arg(long)]
    pub cpu_threads: Option<usize>,

    /// Override the I/O-bound worker pool size
    #[arg(long)]
    pub io_threads: Option<usize>,

    /// Storage backend override, currently only "filesystem" is implemented
    #[arg(long, value_parser = parse_storage_type)]
    pub storage_type: Option<String>,

    /// Reply-poll timer queue depth before a request times out
    #[arg(long, default_value = "4")]
    pub channel_depth: usize,
}

/// CLI subcommands
#[derive(Subcommand, Debug, Clone)]
pub enum Commands {
    /// Run the worker against a single request read from a JSON file, replying
    /// to stdout instead of an RPC transport — useful for local testing since
    /// the broker client itself is out of scope.
    Run {
        /// Path to a serialized `TranscodeRequest` JSON document
        #[arg(short, long)]
        request: PathBuf,
    },

    /// Validate a `TranscodeRequest` JSON document without processing it
    ValidateRequest {
        /// Path to the request document to validate
        request: PathBuf,
    },

    /// Serve an HLS asset (playlist, segment, or key) from committed storage
    /// for the given resource and version, writing the response body to stdout
    Serve {
        /// Resource id owning the asset
        resource_id: String,

        /// Version label (encoder profile name) to serve from
        version: String,

        /// Relative asset path within the version directory
        asset: PathBuf,
    },
}

/// Parse and validate storage type from CLI argument
fn parse_storage_type(s: &str) -> Result<String, String> {
    match s.to_lowercase().as_str() {
        "filesystem" => Ok(s.to_lowercase()),
        _ => Err(format!("Invalid storage type '{}'. Valid options: filesystem", s)),
    }
}

/// Parse CLI arguments
///
/// # Panics
///
/// Clap will exit the process with appropriate error message if parsing fails
pub fn parse_cli() -> Cli {
    Cli::parse()
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_parse_storage_type_valid() {
        assert_eq!(parse_storage_type("filesystem").unwrap(), "filesystem");
        assert_eq!(parse_storage_type("FileSystem").unwrap(), "filesystem");
    }

    #[test]
    fn test_parse_storage_type_invalid() {
        assert!(parse_storage_type("s3").is_err());
    }
}
