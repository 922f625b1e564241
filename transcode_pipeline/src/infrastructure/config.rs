// /////////////////////////////////////////////////////////////////////////////
// Media Transcode Worker
// SPDX-License-Identifier: BSD-3-Clause
// /////////////////////////////////////////////////////////////////////////////

//! Worker configuration: storage roots, chunk/worker sizing, RPC timer
//! limits, and the HLS key directory. Loaded from an optional TOML/YAML/JSON
//! file layered under environment variable overrides (`APP_` prefix).

use serde::{Deserialize, Serialize};
use std::path::PathBuf;
use transcode_domain::TranscodeError;

/// Default for `MAX_NUM_TIMER_EVENTS`: the poll-count a reply consumer should
/// give up at, yielding a 503. This worker only publishes replies through
/// [`crate::rpc::RpcTransport`] — it never itself polls a broker waiting on
/// one — so the constant is carried for config-shape compatibility with
/// whatever consumes those replies, not exercised by a loop here.
pub const DEFAULT_MAX_NUM_TIMER_EVENTS: u32 = 300;

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct WorkerConfig {
    /// Root directory for source/committed/staging storage layouts.
    pub storage_root: PathBuf,
    /// Root directory for local-temp working files.
    pub local_tmp_root: PathBuf,
    /// Directory holding per-version `crypto-key.json` files.
    pub key_dir: PathBuf,
    /// Default read-buffer size for storage chunk reads.
    pub chunk_size_bytes: u64,
    /// Worker count for downstream CPU-bound fan-out, defaulting to the
    /// system's available parallelism (see `WorkerCount::default_for_system`).
    pub worker_count: usize,
    /// `monitor_progress` report interval in seconds, default 0.15.
    pub report_interval: f64,
    /// Reply-poll timeout count a reply consumer gives up at (not enforced
    /// by a loop in this crate, see `DEFAULT_MAX_NUM_TIMER_EVENTS`).
    pub max_num_timer_events: u32,
    /// Minimum seconds between master playlist rebuilds for one resource.
    pub playlist_update_interval_secs: u64,
    /// Minimum seconds between HLS crypto key rotations.
    pub keyfile_update_interval_secs: u64,
}

impl Default for WorkerConfig {
    fn default() -> Self {
        Self {
            storage_root: PathBuf::from("/data/media"),
            local_tmp_root: PathBuf::from("/tmp/transcode"),
            key_dir: PathBuf::from("/data/media/keys"),
            chunk_size_bytes: 1_048_576,
            worker_count: transcode_domain::WorkerCount::default_for_system().count(),
            report_interval: 0.15,
            max_num_timer_events: DEFAULT_MAX_NUM_TIMER_EVENTS,
            playlist_update_interval_secs: 60,
            keyfile_update_interval_secs: 300,
        }
    }
}

impl WorkerConfig {
    /// Loads configuration layered as: built-in defaults, an optional file
    /// at `path` (format sniffed from its extension), then environment
    /// variables prefixed `APP_` (e.g. `APP_CHUNK_SIZE_BYTES`).
    pub fn load(path: Option<&std::path::Path>) -> Result<Self, TranscodeError> {
        let defaults = Self::default();
        let mut builder = config::Config::builder()
            .set_default("storage_root", defaults.storage_root.to_string_lossy().to_string())
            .map_err(config_err)?
            .set_default("local_tmp_root", defaults.local_tmp_root.to_string_lossy().to_string())
            .map_err(config_err)?
            .set_default("key_dir", defaults.key_dir.to_string_lossy().to_string())
            .map_err(config_err)?
            .set_default("chunk_size_bytes", defaults.chunk_size_bytes as i64)
            .map_err(config_err)?
            .set_default("worker_count", defaults.worker_count as i64)
            .map_err(config_err)?
            .set_default("report_interval", defaults.report_interval)
            .map_err(config_err)?
            .set_default("max_num_timer_events", defaults.max_num_timer_events as i64)
            .map_err(config_err)?
            .set_default(
                "playlist_update_interval_secs",
                defaults.playlist_update_interval_secs as i64,
            )
            .map_err(config_err)?
            .set_default("keyfile_update_interval_secs", defaults.keyfile_update_interval_secs as i64)
            .map_err(config_err)?;

        if let Some(path) = path {
            builder = builder.add_source(config::File::from(path.to_path_buf()).required(false));
        }

        builder = builder.add_source(config::Environment::with_prefix("APP").separator("_"));

        let settled = builder.build().map_err(config_err)?;
        settled.try_deserialize().map_err(config_err)
    }
}

fn config_err(err: config::ConfigError) -> TranscodeError {
    TranscodeError::service(format!("configuration error: {err}"))
}
