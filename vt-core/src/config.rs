use anyhow::Context;
use serde::Deserialize;
use std::fs;
use std::path::{Path, PathBuf};
use std::time::Duration;

#[derive(Debug, Clone, Default)]
pub struct Config {
  pub api: ApiConfig,
  pub input: InputConfig,
  pub logging: LoggingConfig,
}

#[derive(Debug, Clone, Deserialize)]
pub struct ApiConfig {
  #[serde(default = "default_api_host")]
  pub host: String,

  #[serde(default = "default_timeout_seconds")]
  pub timeout_seconds: u64,

  // Spacing between the end of one call and the start of the next.
  #[serde(default = "default_min_call_interval_ms")]
  pub min_call_interval_ms: u64,
}

impl ApiConfig {
  pub fn timeout(&self) -> Duration {
    Duration::from_secs(self.timeout_seconds)
  }

  pub fn min_call_interval(&self) -> Duration {
    Duration::from_millis(self.min_call_interval_ms)
  }
}

impl Default for ApiConfig {
  fn default() -> Self {
    Self {
      host: default_api_host(),
      timeout_seconds: default_timeout_seconds(),
      min_call_interval_ms: default_min_call_interval_ms(),
    }
  }
}

#[derive(Debug, Clone, Deserialize)]
pub struct InputConfig {
  #[serde(default = "default_api_key_file")]
  pub api_key_file: PathBuf,

  #[serde(default = "default_hashes_file")]
  pub hashes_file: PathBuf,
}

impl Default for InputConfig {
  fn default() -> Self {
    Self {
      api_key_file: default_api_key_file(),
      hashes_file: default_hashes_file(),
    }
  }
}

#[derive(Debug, Clone, Deserialize)]
pub struct LoggingConfig {
  #[serde(default = "default_log_level")]
  pub level: String,

  #[serde(default = "default_retention_days")]
  pub retention_days: u64,
}

impl Default for LoggingConfig {
  fn default() -> Self {
    Self {
      level: default_log_level(),
      retention_days: default_retention_days(),
    }
  }
}

fn default_api_host() -> String {
  "https://www.virustotal.com/".to_string()
}

fn default_timeout_seconds() -> u64 {
  2
}

fn default_min_call_interval_ms() -> u64 {
  250
}

fn default_api_key_file() -> PathBuf {
  PathBuf::from("api_key.txt")
}

fn default_hashes_file() -> PathBuf {
  PathBuf::from("hashes.txt")
}

fn default_log_level() -> String {
  "info".to_string()
}

fn default_retention_days() -> u64 {
  14
}

#[derive(Debug, Clone, Default, Deserialize)]
struct ConfigFile {
  #[serde(default)]
  pub api: Option<ApiConfig>,

  #[serde(default)]
  pub input: Option<InputConfig>,

  #[serde(default)]
  pub logging: Option<LoggingConfig>,
}

impl ConfigFile {
  fn normalize(self) -> Config {
    let mut cfg = Config::default();
    if let Some(api) = self.api {
      cfg.api = api;
    }
    if let Some(input) = self.input {
      cfg.input = input;
    }
    if let Some(logging) = self.logging {
      cfg.logging = logging;
    }

    if let Some(reason) = validate_api_config(&cfg.api) {
      eprintln!("vt-detections: [api] config invalid ({reason}); using defaults for [api].");
      cfg.api = ApiConfig::default();
    }

    cfg
  }
}

/// Reads the config file without ever writing to it. A missing or unparsable
/// file yields defaults.
pub fn load_or_default(path: &Path) -> anyhow::Result<Config> {
  if !path.exists() {
    return Ok(Config::default());
  }

  let raw = fs::read_to_string(path).with_context(|| format!("read {}", path.display()))?;
  parse(&raw).or_else(|e| {
    eprintln!(
      "vt-detections: invalid config at {}; using defaults: {e}",
      path.display()
    );
    Ok(Config::default())
  })
}

pub fn parse(raw: &str) -> anyhow::Result<Config> {
  let file = toml::from_str::<ConfigFile>(raw)?;
  Ok(file.normalize())
}

fn validate_api_config(cfg: &ApiConfig) -> Option<String> {
  if cfg.timeout_seconds == 0 {
    return Some("timeout_seconds must be > 0".to_string());
  }
  if cfg.min_call_interval_ms == 0 {
    return Some("min_call_interval_ms must be > 0".to_string());
  }

  let Ok(url) = reqwest::Url::parse(&cfg.host) else {
    return Some(format!("invalid host URL: {}", cfg.host));
  };
  if url.scheme() != "https" {
    return Some(format!("host must use HTTPS: {}", cfg.host));
  }
  if url.host_str().is_none() {
    return Some(format!("host URL has no host: {}", cfg.host));
  }

  None
}
