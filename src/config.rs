//! Configuration loaded from `reelbatch.toml`.
//!
//! Every field has a sensible default so the tool runs without a config
//! file. The API key is never stored here: it comes from the
//! `WAVESPEED_API_KEY` environment variable, falling back to a
//! line-oriented `KEY=VALUE` env file.

use std::env;
use std::fs;
use std::path::{Path, PathBuf};

use serde::Deserialize;

use crate::error::AppError;
use crate::wavespeed::client::DEFAULT_API_BASE;

pub const API_KEY_VAR: &str = "WAVESPEED_API_KEY";

/// Top-level configuration for one batch run.
#[derive(Debug, Clone, Deserialize)]
pub struct Config {
    /// JSON array of classified input items.
    #[serde(default = "default_input_file")]
    pub input_file: PathBuf,

    /// Durable per-item progress map, rewritten atomically on every
    /// transition.
    #[serde(default = "default_progress_file")]
    pub progress_file: PathBuf,

    /// Local cache for downloaded artifacts.
    #[serde(default = "default_generated_dir")]
    pub generated_dir: PathBuf,

    /// Content feed the publisher appends to.
    #[serde(default = "default_feed_file")]
    pub feed_file: PathBuf,

    /// Optional secondary location the input file is mirrored to after a
    /// successful publish pass.
    #[serde(default)]
    pub classified_mirror: Option<PathBuf>,

    /// KEY=VALUE env file scanned for the API key when the environment
    /// variable is unset. Defaults to `~/.config/reelbatch/env`.
    #[serde(default)]
    pub env_file: Option<PathBuf>,

    #[serde(default = "default_api_base")]
    pub api_base: String,

    /// Bucket and key prefix for the storage upload collaborator.
    #[serde(default = "default_bucket")]
    pub bucket: String,
    #[serde(default = "default_upload_prefix")]
    pub upload_prefix: String,

    /// Public URL prefix where uploaded artifacts are served from.
    #[serde(default = "default_public_base_url")]
    pub public_base_url: String,

    /// Seconds between poll rounds.
    #[serde(default = "default_poll_interval_secs")]
    pub poll_interval_secs: u64,

    /// Submit attempt cap for rate-limit/transient retries.
    #[serde(default = "default_max_attempts")]
    pub max_attempts: u32,

    /// Base backoff delay in milliseconds; doubles each retry.
    #[serde(default = "default_retry_base_delay_ms")]
    pub retry_base_delay_ms: u64,

    /// Per-request HTTP timeout.
    #[serde(default = "default_request_timeout_secs")]
    pub request_timeout_secs: u64,

    /// Generated clip duration in seconds.
    #[serde(default = "default_duration_secs")]
    pub duration_secs: u32,
}

fn default_input_file() -> PathBuf {
    PathBuf::from("classified_items.json")
}

fn default_progress_file() -> PathBuf {
    PathBuf::from("generation_progress.json")
}

fn default_generated_dir() -> PathBuf {
    PathBuf::from("generated_videos")
}

fn default_feed_file() -> PathBuf {
    PathBuf::from("feed-videos.json")
}

fn default_api_base() -> String {
    DEFAULT_API_BASE.to_string()
}

fn default_bucket() -> String {
    "media".to_string()
}

fn default_upload_prefix() -> String {
    "generated".to_string()
}

fn default_public_base_url() -> String {
    "https://media.example.com".to_string()
}

fn default_poll_interval_secs() -> u64 {
    5
}

fn default_max_attempts() -> u32 {
    5
}

fn default_retry_base_delay_ms() -> u64 {
    2000
}

fn default_request_timeout_secs() -> u64 {
    120
}

fn default_duration_secs() -> u32 {
    5
}

impl Default for Config {
    fn default() -> Self {
        Self {
            input_file: default_input_file(),
            progress_file: default_progress_file(),
            generated_dir: default_generated_dir(),
            feed_file: default_feed_file(),
            classified_mirror: None,
            env_file: None,
            api_base: default_api_base(),
            bucket: default_bucket(),
            upload_prefix: default_upload_prefix(),
            public_base_url: default_public_base_url(),
            poll_interval_secs: default_poll_interval_secs(),
            max_attempts: default_max_attempts(),
            retry_base_delay_ms: default_retry_base_delay_ms(),
            request_timeout_secs: default_request_timeout_secs(),
            duration_secs: default_duration_secs(),
        }
    }
}

impl Config {
    /// Load `reelbatch.toml` from the current directory, falling back to
    /// defaults when the file does not exist.
    pub fn load() -> Result<Self, AppError> {
        let path = Path::new("reelbatch.toml");
        if path.exists() {
            let contents = fs::read_to_string(path)?;
            Ok(toml::from_str::<Config>(&contents)?)
        } else {
            Ok(Self::default())
        }
    }

    /// Resolve the API key: the environment variable wins, then the env
    /// file is scanned line by line for `WAVESPEED_API_KEY=...`. A missing
    /// key is a fatal startup error.
    pub fn load_api_key(&self) -> Result<String, AppError> {
        if let Ok(key) = env::var(API_KEY_VAR)
            && !key.is_empty()
        {
            return Ok(key);
        }

        let env_file = self.env_file.clone().or_else(default_env_file);
        if let Some(path) = env_file
            && path.exists()
            && let Some(key) = scan_env_file(&path)?
        {
            return Ok(key);
        }

        Err(AppError::Config(format!(
            "{API_KEY_VAR} not found in environment or env file"
        )))
    }
}

fn default_env_file() -> Option<PathBuf> {
    env::var_os("HOME").map(|home| PathBuf::from(home).join(".config/reelbatch/env"))
}

// Line-oriented KEY=VALUE parsing; comments and malformed lines are
// skipped, quotes around the value are stripped.
fn scan_env_file(path: &Path) -> Result<Option<String>, AppError> {
    for line in fs::read_to_string(path)?.lines() {
        let line = line.trim();
        if line.starts_with('#') {
            continue;
        }
        let Some((key, value)) = line.split_once('=') else {
            continue;
        };
        if key.trim() == API_KEY_VAR {
            let value = value.trim().trim_matches(|c| c == '"' || c == '\'');
            if !value.is_empty() {
                return Ok(Some(value.to_string()));
            }
        }
    }
    Ok(None)
}

#[cfg(test)]
mod tests {
    use super::*;
    use tempfile::TempDir;

    #[test]
    fn default_config_values() {
        let config = Config::default();
        assert_eq!(config.poll_interval_secs, 5);
        assert_eq!(config.max_attempts, 5);
        assert_eq!(config.retry_base_delay_ms, 2000);
        assert_eq!(config.duration_secs, 5);
        assert_eq!(config.api_base, DEFAULT_API_BASE);
        assert!(config.classified_mirror.is_none());
    }

    #[test]
    fn deserialize_partial_toml() {
        let toml_str = r#"
            input_file = "my_items.json"
            max_attempts = 3
            bucket = "clips"
        "#;
        let config: Config = toml::from_str(toml_str).unwrap();
        assert_eq!(config.input_file, PathBuf::from("my_items.json"));
        assert_eq!(config.max_attempts, 3);
        assert_eq!(config.bucket, "clips");
        assert_eq!(config.poll_interval_secs, 5);
    }

    #[test]
    fn env_file_fallback_parses_key_value_lines() {
        let tmp = TempDir::new().unwrap();
        let env_path = tmp.path().join("env");
        fs::write(
            &env_path,
            "# credentials\nOTHER=x\nWAVESPEED_API_KEY = \"sk-from-file\"\n",
        )
        .unwrap();

        let key = scan_env_file(&env_path).unwrap();
        assert_eq!(key.as_deref(), Some("sk-from-file"));
    }

    #[test]
    fn env_file_without_key_yields_none() {
        let tmp = TempDir::new().unwrap();
        let env_path = tmp.path().join("env");
        fs::write(&env_path, "SOMETHING=else\nnot a pair\n").unwrap();
        assert_eq!(scan_env_file(&env_path).unwrap(), None);
    }

    #[test]
    fn missing_key_is_a_config_error() {
        // Point the fallback at a file that lacks the key so the result
        // does not depend on the test environment's HOME.
        let tmp = TempDir::new().unwrap();
        let env_path = tmp.path().join("env");
        fs::write(&env_path, "UNRELATED=1\n").unwrap();

        let config = Config {
            env_file: Some(env_path),
            ..Config::default()
        };
        if env::var(API_KEY_VAR).is_ok() {
            return; // ambient key set; nothing to assert
        }
        let err = config.load_api_key().unwrap_err();
        assert!(matches!(err, AppError::Config(_)));
    }
}
