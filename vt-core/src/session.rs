use anyhow::Context;
use reqwest::blocking::{Client, Response};
use reqwest::header::{HeaderMap, USER_AGENT};
use reqwest::Url;
use serde_json::Value;
use std::io::Read;
use std::time::Duration;

const MAX_BODY_BYTES: usize = 16 * 1024 * 1024;

/// One GET against a relative endpoint, body parsed as JSON.
pub trait Transport {
  fn get_json(&self, endpoint: &str, headers: &HeaderMap) -> anyhow::Result<Value>;
}

impl<T: Transport + ?Sized> Transport for &T {
  fn get_json(&self, endpoint: &str, headers: &HeaderMap) -> anyhow::Result<Value> {
    (**self).get_json(endpoint, headers)
  }
}

/// Blocking HTTP session bound to a single base host.
pub struct ApiSession {
  host: Url,
  client: Client,
}

impl ApiSession {
  pub fn new(host: &str, timeout: Duration) -> anyhow::Result<Self> {
    let host = Url::parse(host).with_context(|| format!("invalid API host: {host}"))?;
    let client = Client::builder()
      .timeout(timeout)
      .build()
      .context("build HTTP client")?;
    Ok(Self { host, client })
  }

  pub fn host(&self) -> &Url {
    &self.host
  }

  pub fn url(&self, endpoint: &str) -> anyhow::Result<Url> {
    join_endpoint(&self.host, endpoint)
  }
}

impl Transport for ApiSession {
  fn get_json(&self, endpoint: &str, headers: &HeaderMap) -> anyhow::Result<Value> {
    let url = self.url(endpoint)?;
    let label = safe_url_label(&url);

    let response = self
      .client
      .get(url)
      .headers(headers.clone())
      .header(
        USER_AGENT,
        format!("vt-detections/{}", env!("CARGO_PKG_VERSION")),
      )
      .send()
      .with_context(|| format!("GET {label}"))?;

    tracing::debug!(url = %label, status = response.status().as_u16(), "API response");

    let body = read_response_with_limit(response, MAX_BODY_BYTES)
      .with_context(|| format!("read body of {label}"))?;
    serde_json::from_slice(&body).with_context(|| format!("parse JSON body of {label}"))
  }
}

/// RFC 3986 reference resolution of `endpoint` against `host`. A leading `/`
/// would discard the host's own path, so it is refused.
pub fn join_endpoint(host: &Url, endpoint: &str) -> anyhow::Result<Url> {
  if endpoint.starts_with('/') {
    anyhow::bail!("endpoint must be relative (no leading '/'): {endpoint}");
  }
  host
    .join(endpoint)
    .with_context(|| format!("join endpoint {endpoint} onto {host}"))
}

fn read_response_with_limit(response: Response, max_bytes: usize) -> anyhow::Result<Vec<u8>> {
  let mut out = Vec::new();
  let mut limited = response.take((max_bytes.saturating_add(1)) as u64);
  limited.read_to_end(&mut out)?;

  if out.len() > max_bytes {
    anyhow::bail!("response exceeds max size {} bytes", max_bytes);
  }

  Ok(out)
}

fn safe_url_label(url: &Url) -> String {
  let host = url.host_str().unwrap_or("<no-host>");
  let mut path = url.path().to_string();
  if path.is_empty() {
    path = "/".to_string();
  }
  format!("{host}{path}")
}
