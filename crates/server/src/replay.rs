//! Re-run stored alerts through the pipeline, one at a time.

use std::path::Path;
use std::sync::Arc;

use anyhow::Context;
use ict_core::Payload;
use serde_json::Value;
use tracing::{info, warn};

use crate::pipeline::Pipeline;

#[derive(Debug, Default, PartialEq, Eq)]
pub struct ReplaySummary {
    pub processed: usize,
    pub invalid: usize,
}

/// A replay file holds either one payload object or an array of them.
pub fn parse_records(text: &str) -> anyhow::Result<Vec<Value>> {
    match serde_json::from_str::<Value>(text).context("replay file is not valid JSON")? {
        Value::Array(items) => Ok(items),
        obj @ Value::Object(_) => Ok(vec![obj]),
        other => anyhow::bail!("expected a payload object or array, found {}", kind(&other)),
    }
}

fn kind(value: &Value) -> &'static str {
    match value {
        Value::Null => "null",
        Value::Bool(_) => "boolean",
        Value::Number(_) => "number",
        Value::String(_) => "string",
        Value::Array(_) => "array",
        Value::Object(_) => "object",
    }
}

pub async fn replay_file(pipeline: Arc<Pipeline>, path: &Path) -> anyhow::Result<ReplaySummary> {
    let text = tokio::fs::read_to_string(path)
        .await
        .with_context(|| format!("reading {}", path.display()))?;
    let records = parse_records(&text)?;
    info!(path = %path.display(), records = records.len(), "Replaying alerts");

    let mut summary = ReplaySummary::default();
    for (index, record) in records.into_iter().enumerate() {
        match Payload::from_value(record) {
            Ok(payload) => {
                pipeline.process(payload).await;
                summary.processed += 1;
            }
            Err(e) => {
                warn!(index, error = %e, "Skipping invalid record");
                summary.invalid += 1;
            }
        }
    }

    info!(processed = summary.processed, invalid = summary.invalid, "Replay finished");
    Ok(summary)
}
