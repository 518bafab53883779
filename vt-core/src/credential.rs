use anyhow::Context;
use std::fmt;
use std::fs;
use std::path::Path;

/// VirusTotal API key. Held for the life of the process and never logged.
#[derive(Clone, PartialEq, Eq)]
pub struct ApiKey(String);

impl ApiKey {
  pub fn new(raw: &str) -> anyhow::Result<Self> {
    let key = raw.trim();
    if key.is_empty() {
      anyhow::bail!("API key is empty");
    }
    Ok(Self(key.to_string()))
  }

  pub fn expose(&self) -> &str {
    &self.0
  }
}

impl fmt::Debug for ApiKey {
  fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
    f.write_str("ApiKey(<redacted>)")
  }
}

pub fn load_api_key(path: &Path) -> anyhow::Result<ApiKey> {
  let raw = fs::read_to_string(path)
    .with_context(|| format!("read API key file {}", path.display()))?;
  ApiKey::new(&raw).with_context(|| format!("API key file {}", path.display()))
}
