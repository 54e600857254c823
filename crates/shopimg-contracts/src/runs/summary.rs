use std::path::Path;

use serde::{Deserialize, Serialize};
use serde_json::{Map, Value};

use crate::errors::{FailureKind, ImageFailure};
use crate::events::now_utc_iso;

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum ImageSource {
    Downloaded,
    Synthesized,
    Custom,
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct SavedItem {
    pub slug: String,
    pub filename: String,
    pub source: ImageSource,
    pub origin: Option<String>,
    pub sha256: String,
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct SkippedItem {
    pub slug: String,
    pub kind: String,
    pub reason: String,
}

/// Per-run tally written to `summary.json`.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct BatchSummary {
    pub run_id: String,
    pub job: String,
    pub started_at: String,
    pub finished_at: Option<String>,
    pub total: u64,
    pub saved: Vec<SavedItem>,
    pub skipped: Vec<SkippedItem>,
}

impl BatchSummary {
    pub fn start(run_id: impl Into<String>, job: impl Into<String>) -> Self {
        Self {
            run_id: run_id.into(),
            job: job.into(),
            started_at: now_utc_iso(),
            finished_at: None,
            total: 0,
            saved: Vec::new(),
            skipped: Vec::new(),
        }
    }

    pub fn record_saved(&mut self, item: SavedItem) {
        self.total += 1;
        self.saved.push(item);
    }

    pub fn record_skipped(&mut self, slug: &str, failure: &ImageFailure) {
        self.total += 1;
        self.skipped.push(SkippedItem {
            slug: slug.to_string(),
            kind: failure.kind().as_str().to_string(),
            reason: failure.message().to_string(),
        });
    }

    pub fn finish(&mut self) {
        self.finished_at = Some(now_utc_iso());
    }

    pub fn count(&self, source: ImageSource) -> u64 {
        self.saved.iter().filter(|item| item.source == source).count() as u64
    }

    pub fn skipped_with(&self, kind: FailureKind) -> u64 {
        self.skipped
            .iter()
            .filter(|item| item.kind == kind.as_str())
            .count() as u64
    }

    pub fn all_saved(&self) -> bool {
        self.skipped.is_empty()
    }
}

pub fn write_summary(
    path: &Path,
    summary: &BatchSummary,
    extra: Option<&Map<String, Value>>,
) -> anyhow::Result<()> {
    let mut payload = match serde_json::to_value(summary)? {
        Value::Object(map) => map,
        _ => Map::new(),
    };
    for (key, source) in [
        ("downloaded", ImageSource::Downloaded),
        ("synthesized", ImageSource::Synthesized),
        ("custom", ImageSource::Custom),
    ] {
        payload.insert(key.to_string(), Value::Number(summary.count(source).into()));
    }
    payload.insert("ts".to_string(), Value::String(now_utc_iso()));
    if let Some(extra) = extra {
        for (key, value) in extra {
            payload.insert(key.clone(), value.clone());
        }
    }

    if let Some(parent) = path.parent() {
        std::fs::create_dir_all(parent)?;
    }
    std::fs::write(path, serde_json::to_string_pretty(&Value::Object(payload))?)?;
    Ok(())
}
