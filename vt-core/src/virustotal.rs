use crate::credential::ApiKey;
use crate::session::Transport;
use crate::throttle::{Clock, SystemClock, Throttle};
use anyhow::Context;
use reqwest::header::{HeaderMap, HeaderValue, ACCEPT};
use serde_json::Value;

const FILE_REPORT_ENDPOINT: &str = "api/v3/files/";
const API_KEY_HEADER: &str = "x-apikey";

/// Relative endpoint of the file report for `hash`.
pub fn file_report_endpoint(hash: &str) -> String {
  format!("{FILE_REPORT_ENDPOINT}{hash}")
}

/// VirusTotal v3 client. Every request goes through the injected throttle, so
/// one client (and one throttle) should serve every lookup made with a key.
pub struct VirusTotalClient<T: Transport, C: Clock = SystemClock> {
  transport: T,
  api_key: ApiKey,
  throttle: Throttle<C>,
}

impl<T: Transport, C: Clock> VirusTotalClient<T, C> {
  pub fn new(transport: T, api_key: ApiKey, throttle: Throttle<C>) -> Self {
    Self {
      transport,
      api_key,
      throttle,
    }
  }

  pub fn throttle(&self) -> &Throttle<C> {
    &self.throttle
  }

  /// Fetches the raw file report. Remote error envelopes come back as
  /// ordinary reports; only transport failures are errors.
  pub fn file_report_for(&mut self, hash: &str) -> anyhow::Result<Value> {
    let endpoint = file_report_endpoint(hash);
    let headers = self.headers()?;

    let transport = &self.transport;
    self
      .throttle
      .call(|| transport.get_json(&endpoint, &headers))
      .with_context(|| format!("fetch file report for {hash}"))
  }

  fn headers(&self) -> anyhow::Result<HeaderMap> {
    let mut headers = HeaderMap::new();
    headers.insert(ACCEPT, HeaderValue::from_static("application/json"));

    let mut key = HeaderValue::from_str(self.api_key.expose())
      .context("API key contains characters not allowed in an HTTP header")?;
    key.set_sensitive(true);
    headers.insert(API_KEY_HEADER, key);
    Ok(headers)
  }
}
