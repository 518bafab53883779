use crate::session::Transport;
use crate::throttle::Clock;
use crate::virustotal::VirusTotalClient;
use anyhow::Context;
use serde::ser::{Serialize, SerializeMap, Serializer};
use serde_json::Value;
use std::collections::HashMap;
use std::fs;
use std::path::Path;

pub const COUNT_NOT_AVAILABLE: &str = "Count not available";
pub const REPORT_HEADER: &str =
  "The current total number of detections for the provided list of hashes is:";

/// Outcome of one hash lookup as it appears in the final report.
#[derive(Debug, Clone, PartialEq)]
pub enum Detection {
  /// Value at `last_analysis_stats.malicious`, passed through as sent
  /// (normally a non-negative integer).
  Count(Value),
  /// `error.code` from the service, string or number as sent.
  ErrorCode(Value),
  Unavailable,
}

impl Serialize for Detection {
  fn serialize<S: Serializer>(&self, serializer: S) -> Result<S::Ok, S::Error> {
    match self {
      Detection::Count(count) => count.serialize(serializer),
      Detection::ErrorCode(code) => code.serialize(serializer),
      Detection::Unavailable => serializer.serialize_str(COUNT_NOT_AVAILABLE),
    }
  }
}

/// Hash -> detection, in first-seen order. A repeated hash replaces the
/// earlier value but keeps its position.
#[derive(Debug, Clone, Default)]
pub struct DetectionReport {
  entries: Vec<(String, Detection)>,
  index: HashMap<String, usize>,
}

impl DetectionReport {
  pub fn new() -> Self {
    Self::default()
  }

  pub fn insert(&mut self, hash: String, detection: Detection) {
    if let Some(&i) = self.index.get(&hash) {
      self.entries[i].1 = detection;
      return;
    }
    self.index.insert(hash.clone(), self.entries.len());
    self.entries.push((hash, detection));
  }

  pub fn get(&self, hash: &str) -> Option<&Detection> {
    self.index.get(hash).map(|&i| &self.entries[i].1)
  }

  pub fn len(&self) -> usize {
    self.entries.len()
  }

  pub fn is_empty(&self) -> bool {
    self.entries.is_empty()
  }

  pub fn iter(&self) -> impl Iterator<Item = (&str, &Detection)> {
    self.entries.iter().map(|(h, d)| (h.as_str(), d))
  }
}

impl Serialize for DetectionReport {
  fn serialize<S: Serializer>(&self, serializer: S) -> Result<S::Ok, S::Error> {
    let mut map = serializer.serialize_map(Some(self.entries.len()))?;
    for (hash, detection) in &self.entries {
      map.serialize_entry(hash, detection)?;
    }
    map.end()
  }
}

/// Error envelope first, then whatever sits at the malicious-count path. Only
/// a missing segment (or an error envelope without a code) is `Unavailable`.
pub fn reduce(report: &Value) -> Detection {
  if let Some(error) = report.get("error") {
    return match error.get("code") {
      Some(code) => Detection::ErrorCode(code.clone()),
      None => Detection::Unavailable,
    };
  }

  report
    .pointer("/data/attributes/last_analysis_stats/malicious")
    .map(|count| Detection::Count(count.clone()))
    .unwrap_or(Detection::Unavailable)
}

/// One trimmed hash per line. Nothing else is validated.
pub fn read_hash_list(path: &Path) -> anyhow::Result<Vec<String>> {
  let raw = fs::read_to_string(path)
    .with_context(|| format!("read hash list {}", path.display()))?;
  Ok(parse_hash_list(&raw))
}

pub fn parse_hash_list(raw: &str) -> Vec<String> {
  raw
    .lines()
    .enumerate()
    .map(|(i, line)| {
      let hash = line.trim();
      if hash.is_empty() {
        tracing::warn!(line = i + 1, "blank line in hash list; it will still be looked up");
      }
      hash.to_string()
    })
    .collect()
}

/// Looks up every hash in order. The first transport failure aborts the run.
pub fn collect_detections<T, C>(
  client: &mut VirusTotalClient<T, C>,
  hashes: &[String],
) -> anyhow::Result<DetectionReport>
where
  T: Transport,
  C: Clock,
{
  let mut out = DetectionReport::new();

  for (i, hash) in hashes.iter().enumerate() {
    let report = client.file_report_for(hash)?;
    let detection = reduce(&report);

    match &detection {
      Detection::Count(count) => {
        tracing::info!(hash = %hash, malicious = %count, "file report received");
      }
      Detection::ErrorCode(code) => {
        tracing::warn!(hash = %hash, code = %code, "service returned an error");
      }
      Detection::Unavailable => {
        tracing::warn!(hash = %hash, "file report has no malicious count");
      }
    }
    tracing::debug!(done = i + 1, total = hashes.len(), "progress");

    out.insert(hash.clone(), detection);
  }

  Ok(out)
}

pub fn render(report: &DetectionReport) -> anyhow::Result<String> {
  let json = serde_json::to_string_pretty(report).context("serialize detection report")?;
  Ok(format!("{REPORT_HEADER}\n{json}"))
}
