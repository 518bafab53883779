use std::path::{Path, PathBuf};

pub const HOME_ENV: &str = "VT_DETECTIONS_HOME";

pub fn base_dir() -> anyhow::Result<PathBuf> {
  if let Ok(home) = std::env::var(HOME_ENV) {
    if !home.trim().is_empty() {
      return Ok(PathBuf::from(home));
    }
  }
  Ok(std::env::current_dir()?)
}

pub fn config_path(base: &Path) -> PathBuf {
  base.join("config.toml")
}

pub fn logs_dir(base: &Path) -> PathBuf {
  base.join("logs")
}

/// Relative paths from config or the command line are anchored at the base dir.
pub fn resolve(base: &Path, path: &Path) -> PathBuf {
  if path.is_absolute() {
    path.to_path_buf()
  } else {
    base.join(path)
  }
}
