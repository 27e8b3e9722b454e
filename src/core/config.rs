//! Runtime configuration
//!
//! Layered with figment: built-in defaults, then an optional `nulldl.toml`
//! next to the binary's working directory, then `NULLDL_*` environment
//! variables, then a bare `PORT` (what most hosting platforms set).

use figment::providers::{Env, Format, Serialized, Toml};
use figment::Figment;
use serde::{Deserialize, Serialize};
use std::path::PathBuf;
use std::time::Duration;

use crate::core::error::AppResult;

/// Default config file looked up in the working directory.
pub const CONFIG_FILE: &str = "nulldl.toml";

/// Prefix for environment overrides, e.g. `NULLDL_TEMP_DIR=/var/tmp/nulldl`.
pub const ENV_PREFIX: &str = "NULLDL_";

/// Ceiling for captured stdout/stderr of one subprocess (10 MiB).
pub const DEFAULT_MAX_OUTPUT_BYTES: usize = 10 * 1024 * 1024;

#[derive(Debug, Clone, Serialize, Deserialize, PartialEq)]
pub struct Config {
    /// Interface to bind
    pub host: String,
    /// Port to bind
    pub port: u16,
    /// Shared scratch directory for per-request files
    pub temp_dir: PathBuf,
    /// Static assets served for anything that is not an API route
    pub static_dir: PathBuf,
    /// yt-dlp binary (name on PATH or absolute path)
    pub ytdlp_bin: String,
    /// ffmpeg binary (name on PATH or absolute path)
    pub ffmpeg_bin: String,
    /// How long an analysis result stays cached
    pub analyze_cache_ttl_secs: u64,
    /// How often expired analysis entries are swept
    pub cache_cleanup_interval_secs: u64,
    /// Captured-output ceiling per stream per subprocess
    pub max_output_bytes: usize,
    /// Optional cap on simultaneous download pipelines; unbounded when absent
    pub max_concurrent_downloads: Option<usize>,
    /// Default log filter; `RUST_LOG` wins when set
    pub log_level: String,
}

impl Default for Config {
    fn default() -> Self {
        Self {
            host: "0.0.0.0".to_string(),
            port: 3000,
            temp_dir: PathBuf::from("tmp"),
            static_dir: PathBuf::from("public"),
            ytdlp_bin: "yt-dlp".to_string(),
            ffmpeg_bin: "ffmpeg".to_string(),
            analyze_cache_ttl_secs: 3600,
            cache_cleanup_interval_secs: 600,
            max_output_bytes: DEFAULT_MAX_OUTPUT_BYTES,
            max_concurrent_downloads: None,
            log_level: "info".to_string(),
        }
    }
}

impl Config {
    /// Load configuration from defaults, `nulldl.toml` and the environment.
    pub fn load() -> AppResult<Self> {
        Self::figment().extract().map_err(Into::into)
    }

    /// The provider stack behind [`Config::load`], exposed for tests.
    pub fn figment() -> Figment {
        Figment::from(Serialized::defaults(Config::default()))
            .merge(Toml::file(CONFIG_FILE))
            .merge(Env::prefixed(ENV_PREFIX))
            .merge(Env::raw().only(&["port"]))
    }

    pub fn analyze_cache_ttl(&self) -> Duration {
        Duration::from_secs(self.analyze_cache_ttl_secs)
    }

    pub fn cache_cleanup_interval(&self) -> Duration {
        Duration::from_secs(self.cache_cleanup_interval_secs.max(1))
    }

    pub fn bind_addr(&self) -> String {
        format!("{}:{}", self.host, self.port)
    }
}
