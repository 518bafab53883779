pub mod config;
pub mod credential;
pub mod logging;
pub mod paths;
pub mod report;
pub mod session;
pub mod throttle;
pub mod virustotal;

use anyhow::Context;
use reqwest::Url;
use std::path::{Path, PathBuf};

#[derive(Debug, Clone, Default)]
pub struct RunOptions {
  pub config_path: Option<PathBuf>,
  pub hashes_path: Option<PathBuf>,
  pub api_key_path: Option<PathBuf>,
  /// Resolve inputs and print the request targets without calling the API.
  pub dry_run: bool,
  pub no_log_file: bool,
}

#[derive(Debug, Clone, PartialEq, Eq)]
struct InputPaths {
  api_key: PathBuf,
  hashes: PathBuf,
}

/// Command-line paths win over config paths; both are relative to `base`.
fn input_paths(base: &Path, cfg: &config::Config, opts: &RunOptions) -> InputPaths {
  let api_key = opts
    .api_key_path
    .as_deref()
    .unwrap_or(&cfg.input.api_key_file);
  let hashes = opts.hashes_path.as_deref().unwrap_or(&cfg.input.hashes_file);
  InputPaths {
    api_key: paths::resolve(base, api_key),
    hashes: paths::resolve(base, hashes),
  }
}

/// The default config file may be absent; one named on the command line may not.
fn load_config(base: &Path, opts: &RunOptions) -> anyhow::Result<config::Config> {
  match &opts.config_path {
    Some(p) => {
      let path = paths::resolve(base, p);
      if !path.is_file() {
        anyhow::bail!("config file {} does not exist", path.display());
      }
      config::load_or_default(&path)
    }
    None => config::load_or_default(&paths::config_path(base)),
  }
}

/// Request URLs a real run would hit, in hash-list order. Touches no network.
pub fn dry_run_targets(
  session: &session::ApiSession,
  hashes: &[String],
) -> anyhow::Result<Vec<Url>> {
  hashes
    .iter()
    .map(|hash| session.url(&virustotal::file_report_endpoint(hash)))
    .collect()
}

pub fn run(opts: &RunOptions) -> anyhow::Result<()> {
  let base = paths::base_dir()?;
  let cfg = load_config(&base, opts)?;

  if opts.no_log_file {
    logging::init_stderr_only(&cfg.logging.level)?;
  } else {
    logging::init_file_and_stderr(
      &paths::logs_dir(&base),
      &cfg.logging.level,
      cfg.logging.retention_days,
    )?;
  }

  let inputs = input_paths(&base, &cfg, opts);
  let api_key = credential::load_api_key(&inputs.api_key)?;
  let hashes = report::read_hash_list(&inputs.hashes)?;
  tracing::info!(
    hashes = hashes.len(),
    source = %inputs.hashes.display(),
    host = %cfg.api.host,
    "hash list loaded"
  );

  let session = session::ApiSession::new(&cfg.api.host, cfg.api.timeout())?;

  if opts.dry_run {
    for url in dry_run_targets(&session, &hashes)? {
      println!("DRY-RUN: would GET {url}");
    }
    return Ok(());
  }

  let throttle = throttle::Throttle::new(cfg.api.min_call_interval());
  let mut client = virustotal::VirusTotalClient::new(session, api_key, throttle);

  let detections =
    report::collect_detections(&mut client, &hashes).context("collect detection counts")?;
  println!("{}", report::render(&detections)?);
  tracing::info!(entries = detections.len(), "detection report written");
  Ok(())
}

#[cfg(test)]
mod tests {
  use super::*;
  use std::time::Duration;

  #[test]
  fn config_paths_are_used_by_default() {
    let base = Path::new("/srv/vt");
    let cfg = config::Config::default();
    let inputs = input_paths(base, &cfg, &RunOptions::default());
    assert_eq!(
      inputs,
      InputPaths {
        api_key: base.join("api_key.txt"),
        hashes: base.join("hashes.txt"),
      }
    );
  }

  #[test]
  fn command_line_paths_override_config() {
    let base = Path::new("/srv/vt");
    let mut cfg = config::Config::default();
    cfg.input.hashes_file = PathBuf::from("from-config.txt");
    let opts = RunOptions {
      hashes_path: Some(PathBuf::from("batch/cli.txt")),
      ..RunOptions::default()
    };

    let inputs = input_paths(base, &cfg, &opts);
    assert_eq!(inputs.hashes, base.join("batch/cli.txt"));
    assert_eq!(inputs.api_key, base.join("api_key.txt"));
  }

  #[test]
  fn dry_run_lists_joined_urls_in_order() {
    let session =
      session::ApiSession::new("https://example.com/", Duration::from_secs(2)).unwrap();
    let hashes = vec!["abc".to_string(), "def".to_string()];

    let targets = dry_run_targets(&session, &hashes).unwrap();
    let targets: Vec<&str> = targets.iter().map(Url::as_str).collect();
    assert_eq!(
      targets,
      [
        "https://example.com/api/v3/files/abc",
        "https://example.com/api/v3/files/def",
      ]
    );
  }

  #[test]
  fn dry_run_keeps_blank_hash_lines() {
    let session =
      session::ApiSession::new("https://example.com/", Duration::from_secs(2)).unwrap();
    let hashes = vec!["abc".to_string(), String::new()];

    let targets = dry_run_targets(&session, &hashes).unwrap();
    assert_eq!(targets.len(), 2);
    assert_eq!(targets[1].as_str(), "https://example.com/api/v3/files/");
  }

  #[test]
  fn explicit_config_path_must_exist() {
    let dir = tempfile::tempdir().unwrap();
    let opts = RunOptions {
      config_path: Some(PathBuf::from("missing.toml")),
      ..RunOptions::default()
    };
    let err = load_config(dir.path(), &opts).unwrap_err();
    assert!(err.to_string().contains("missing.toml"));
  }

  #[test]
  fn explicit_config_path_is_read() {
    let dir = tempfile::tempdir().unwrap();
    std::fs::write(dir.path().join("alt.toml"), "[api]\ntimeout_seconds = 7\n").unwrap();
    let opts = RunOptions {
      config_path: Some(PathBuf::from("alt.toml")),
      ..RunOptions::default()
    };
    assert_eq!(load_config(dir.path(), &opts).unwrap().api.timeout_seconds, 7);
  }

  #[test]
  fn default_config_may_be_absent() {
    let dir = tempfile::tempdir().unwrap();
    let cfg = load_config(dir.path(), &RunOptions::default()).unwrap();
    assert_eq!(cfg.api.timeout_seconds, 2);
  }
}
