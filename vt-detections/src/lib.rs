use std::path::PathBuf;
use vt_core::RunOptions;

#[derive(Debug, Clone, PartialEq, Eq)]
pub enum Command {
  Version,
  Help,
  Run(CliArgs),
}

/// Parsed command-line flags; turned into [`RunOptions`] by `into_options`.
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct CliArgs {
  pub config: Option<PathBuf>,
  pub hashes: Option<PathBuf>,
  pub api_key_file: Option<PathBuf>,
  pub dry_run: bool,
  pub no_log_file: bool,
}

impl CliArgs {
  pub fn into_options(self) -> RunOptions {
    RunOptions {
      config_path: self.config,
      hashes_path: self.hashes,
      api_key_path: self.api_key_file,
      dry_run: self.dry_run,
      no_log_file: self.no_log_file,
    }
  }
}

/// `args` includes the program name at index 0, as from `std::env::args`.
pub fn parse_args(args: &[String]) -> anyhow::Result<Command> {
  let mut out = CliArgs::default();
  let mut i = 1;
  while i < args.len() {
    match args[i].as_str() {
      "--version" => return Ok(Command::Version),
      "--help" | "-h" => return Ok(Command::Help),
      "--dry-run" => out.dry_run = true,
      "--no-log-file" => out.no_log_file = true,
      flag @ ("--config" | "--hashes" | "--api-key-file") => {
        let value = args
          .get(i + 1)
          .ok_or_else(|| anyhow::anyhow!("`{flag}` expects a path"))?;
        let value = Some(PathBuf::from(value));
        match flag {
          "--config" => out.config = value,
          "--hashes" => out.hashes = value,
          _ => out.api_key_file = value,
        }
        i += 1;
      }
      other => anyhow::bail!("unknown argument `{other}`; see --help"),
    }
    i += 1;
  }
  Ok(Command::Run(out))
}

pub fn print_help() {
  println!(
    "vt-detections {}

Looks up every hash in the hash list on VirusTotal and prints, per hash, how
many engines flagged the file as malicious.

USAGE:
  vt-detections [OPTIONS]

OPTIONS:
  --config <path>        config file (default: <home>/config.toml)
  --hashes <path>        hash list, one per line (default: [input].hashes_file)
  --api-key-file <path>  file holding the API key (default: [input].api_key_file)
  --dry-run              print the request URLs without calling the API
  --no-log-file          log to stderr only
  --version              print the version
  -h, --help             print this help

<home> is $VT_DETECTIONS_HOME, or the current directory.",
    env!("CARGO_PKG_VERSION")
  );
}
