use std::path::Path;

use anyhow::Context;
use chrono::{DateTime, NaiveDate, NaiveDateTime};
use serde::Deserialize;
use serde_json::Value;
use tracing::{info, warn};

use crate::models::RawMessage;

const TIMESTAMP_FORMAT: &str = "%Y-%m-%d %H:%M:%S";

#[derive(Debug, Deserialize)]
struct CsvRow {
    #[serde(default)]
    message_id: Option<String>,
    #[serde(default)]
    sender: Option<String>,
    #[serde(default)]
    text: Option<String>,
    #[serde(default)]
    timestamp: Option<String>,
}

#[derive(Deserialize)]
#[serde(untagged)]
enum JsonBatch {
    Wrapped { messages: Vec<RawMessage> },
    Bare(Vec<RawMessage>),
}

/// Load messages from a CSV or JSON file, chosen by extension.
pub fn load_messages(path: &Path) -> anyhow::Result<Vec<RawMessage>> {
    let is_csv = path
        .extension()
        .and_then(|ext| ext.to_str())
        .is_some_and(|ext| ext.eq_ignore_ascii_case("csv"));

    if is_csv {
        load_csv(path)
    } else {
        load_json(path)
    }
}

pub fn load_json(path: &Path) -> anyhow::Result<Vec<RawMessage>> {
    let contents = std::fs::read_to_string(path)
        .with_context(|| format!("failed to read {}", path.display()))?;
    let batch: JsonBatch = serde_json::from_str(&contents)
        .with_context(|| format!("{} is not a message batch", path.display()))?;

    let messages = match batch {
        JsonBatch::Wrapped { messages } => messages,
        JsonBatch::Bare(messages) => messages,
    };
    info!(path = %path.display(), messages = messages.len(), "loaded json batch");
    Ok(messages)
}

/// Read `message_id,sender,text,timestamp` rows. Rows that fail to parse are
/// skipped.
pub fn load_csv(path: &Path) -> anyhow::Result<Vec<RawMessage>> {
    let reader = csv::Reader::from_path(path)
        .with_context(|| format!("failed to open {}", path.display()))?;
    let (messages, skipped) = read_csv(reader)?;
    info!(path = %path.display(), messages = messages.len(), skipped, "loaded csv batch");
    Ok(messages)
}

fn read_csv<R: std::io::Read>(mut reader: csv::Reader<R>) -> anyhow::Result<(Vec<RawMessage>, usize)> {
    reader.headers().context("csv has no header row")?;

    let mut messages = Vec::new();
    let mut skipped = 0usize;

    for (line, result) in reader.deserialize::<CsvRow>().enumerate() {
        match result {
            Ok(row) => messages.push(row.into_message()),
            Err(err) => {
                skipped += 1;
                warn!(row = line + 1, error = %err, "skipping malformed csv row");
            }
        }
    }

    Ok((messages, skipped))
}

impl CsvRow {
    fn into_message(self) -> RawMessage {
        RawMessage {
            message_id: self.message_id.map(|id| match id.trim().parse::<i64>() {
                Ok(n) => Value::from(n),
                Err(_) => Value::String(id),
            }),
            sender: self.sender,
            text: self.text,
            timestamp: self.timestamp.map(|ts| Value::String(normalize_timestamp(&ts))),
        }
    }
}

/// Render recognizable timestamps uniformly; anything else is kept verbatim.
/// Offset-qualified timestamps are converted to UTC.
pub fn normalize_timestamp(raw: &str) -> String {
    let trimmed = raw.trim();

    if let Ok(dt) = DateTime::parse_from_rfc3339(trimmed) {
        return dt.naive_utc().format(TIMESTAMP_FORMAT).to_string();
    }
    for format in [TIMESTAMP_FORMAT, "%Y-%m-%dT%H:%M:%S", "%Y-%m-%d %H:%M"] {
        if let Ok(dt) = NaiveDateTime::parse_from_str(trimmed, format) {
            return dt.format(TIMESTAMP_FORMAT).to_string();
        }
    }
    if let Ok(date) = NaiveDate::parse_from_str(trimmed, "%Y-%m-%d") {
        if let Some(dt) = date.and_hms_opt(0, 0, 0) {
            return dt.format(TIMESTAMP_FORMAT).to_string();
        }
    }

    raw.to_string()
}
