//! CLI configuration management.
//!
//! Configuration is stored as TOML:
//! - Linux: `~/.config/pcs/config.toml`
//! - Windows: `%APPDATA%/pcs/config.toml`

use std::path::{Path, PathBuf};
use std::time::Duration;

use pcs_transfer::DEFAULT_CHUNK_SIZE;
use pcs_upload::{RetryPolicy, UploadConfig};
use serde::{Deserialize, Serialize};

/// CLI configuration.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct Config {
    /// OAuth access token attached to every request.
    #[serde(default, skip_serializing_if = "String::is_empty")]
    pub access_token: String,

    /// Refresh token used by `pcs refresh`.
    #[serde(default, skip_serializing_if = "String::is_empty")]
    pub refresh_token: String,

    /// Application API key, needed to refresh the access token.
    #[serde(default, skip_serializing_if = "String::is_empty")]
    pub client_id: String,

    /// Application secret key, needed to refresh the access token.
    #[serde(default, skip_serializing_if = "String::is_empty")]
    pub client_secret: String,

    /// Maximum chunk size in bytes.
    #[serde(default = "default_chunk_size")]
    pub chunk_size: u64,

    /// Chunk uploads in flight.
    #[serde(default = "default_concurrency")]
    pub concurrency: usize,

    /// Try rapid upload before sending bytes.
    #[serde(default = "default_true")]
    pub rapid_upload: bool,

    /// Attempts per chunk on transient failures.
    #[serde(default = "default_retry_attempts")]
    pub retry_attempts: u32,

    /// Per-request timeout in seconds (0 = none).
    #[serde(default = "default_request_timeout")]
    pub request_timeout_secs: u64,
}

fn default_chunk_size() -> u64 {
    DEFAULT_CHUNK_SIZE
}

fn default_concurrency() -> usize {
    4
}

fn default_true() -> bool {
    true
}

fn default_retry_attempts() -> u32 {
    4
}

fn default_request_timeout() -> u64 {
    300
}

impl Default for Config {
    fn default() -> Self {
        Self {
            access_token: String::new(),
            refresh_token: String::new(),
            client_id: String::new(),
            client_secret: String::new(),
            chunk_size: default_chunk_size(),
            concurrency: default_concurrency(),
            rapid_upload: default_true(),
            retry_attempts: default_retry_attempts(),
            request_timeout_secs: default_request_timeout(),
        }
    }
}

impl Config {
    /// Loads configuration from `path`, or the default location. A missing
    /// file yields the defaults.
    pub fn load(path: Option<&Path>) -> anyhow::Result<Self> {
        let path = match path {
            Some(p) => p.to_path_buf(),
            None => config_path()?,
        };

        if path.exists() {
            let content = std::fs::read_to_string(&path)?;
            let config: Config = toml::from_str(&content)?;
            tracing::debug!(path = %path.display(), "configuration loaded");
            Ok(config)
        } else {
            Ok(Config::default())
        }
    }

    /// Saves the configuration to `path`, or the default location.
    pub fn save(&self, path: Option<&Path>) -> anyhow::Result<()> {
        let path = match path {
            Some(p) => p.to_path_buf(),
            None => config_path()?,
        };

        if let Some(parent) = path.parent() {
            std::fs::create_dir_all(parent)?;
        }

        let content = toml::to_string_pretty(self)?;
        std::fs::write(&path, content)?;

        // Restrict permissions on Unix.
        #[cfg(unix)]
        {
            use std::os::unix::fs::PermissionsExt;
            std::fs::set_permissions(&path, std::fs::Permissions::from_mode(0o600))?;
        }

        tracing::debug!(path = %path.display(), "configuration saved");
        Ok(())
    }

    pub fn request_timeout(&self) -> Option<Duration> {
        (self.request_timeout_secs > 0).then(|| Duration::from_secs(self.request_timeout_secs))
    }

    /// Coordinator settings derived from this configuration.
    pub fn upload_config(&self) -> UploadConfig {
        UploadConfig {
            chunk_size: self.chunk_size,
            concurrency: self.concurrency,
            rapid_upload: self.rapid_upload,
            allow_single_upload: true,
            retry: RetryPolicy {
                max_attempts: self.retry_attempts,
                ..RetryPolicy::default()
            },
        }
    }
}

/// Returns the platform-specific configuration file path.
pub fn config_path() -> anyhow::Result<PathBuf> {
    #[cfg(target_os = "linux")]
    {
        let home = std::env::var("HOME").unwrap_or_else(|_| "/tmp".into());
        Ok(PathBuf::from(home)
            .join(".config")
            .join("pcs")
            .join("config.toml"))
    }

    #[cfg(target_os = "windows")]
    {
        let appdata =
            std::env::var("APPDATA").unwrap_or_else(|_| "C:\\Users\\Default\\AppData".into());
        Ok(PathBuf::from(appdata).join("pcs").join("config.toml"))
    }

    #[cfg(not(any(target_os = "linux", target_os = "windows")))]
    {
        Ok(PathBuf::from("/tmp/pcs/config.toml"))
    }
}
