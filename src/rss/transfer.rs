//! Subscription import and export formats.
//!
//! JSON documents look like `{"feeds": [{"title": ..., "url": ...}]}`; CSV
//! files carry a `title,url` header row.

use std::str::FromStr;

use serde::Serialize;

use super::types::{FeedRecord, ImportRow};
use crate::{ReaderError, Result};

/// Supported transfer formats.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default)]
pub enum TransferFormat {
    #[default]
    Json,
    Csv,
}

impl TransferFormat {
    /// MIME type of an exported document.
    pub fn content_type(&self) -> &'static str {
        match self {
            TransferFormat::Json => "application/json",
            TransferFormat::Csv => "text/csv; charset=utf-8",
        }
    }

    /// File name offered for an export download.
    pub fn file_name(&self) -> &'static str {
        match self {
            TransferFormat::Json => "feeds.json",
            TransferFormat::Csv => "feeds.csv",
        }
    }
}

impl FromStr for TransferFormat {
    type Err = ReaderError;

    fn from_str(s: &str) -> Result<Self> {
        match s.to_ascii_lowercase().as_str() {
            "json" => Ok(TransferFormat::Json),
            "csv" => Ok(TransferFormat::Csv),
            other => Err(ReaderError::Validation(format!(
                "unsupported format: {} (expected json or csv)",
                other
            ))),
        }
    }
}

#[derive(Debug, Serialize)]
struct FeedList {
    feeds: Vec<FeedRecord>,
}

/// Encode subscriptions in the given format.
pub fn encode(format: TransferFormat, records: &[FeedRecord]) -> Result<Vec<u8>> {
    match format {
        TransferFormat::Json => {
            let list = FeedList {
                feeds: records.to_vec(),
            };
            serde_json::to_vec_pretty(&list)
                .map_err(|e| ReaderError::Validation(format!("failed to encode JSON: {}", e)))
        }
        TransferFormat::Csv => {
            let mut writer = csv::Writer::from_writer(Vec::new());
            if records.is_empty() {
                writer
                    .write_record(["title", "url"])
                    .map_err(|e| ReaderError::Validation(format!("failed to encode CSV: {}", e)))?;
            }
            for record in records {
                writer
                    .serialize(record)
                    .map_err(|e| ReaderError::Validation(format!("failed to encode CSV: {}", e)))?;
            }
            writer
                .into_inner()
                .map_err(|e| ReaderError::Validation(format!("failed to encode CSV: {}", e)))
        }
    }
}

/// Decode an uploaded subscription list into rows, in payload order.
///
/// Only an unreadable document fails as a whole. A row that does not fit
/// the `{title, url}` shape becomes an `Err` with the reason and the other
/// rows are still decoded. Blank titles and URLs decode as `None`; the
/// caller decides what a row without a URL means.
pub fn decode(format: TransferFormat, bytes: &[u8]) -> Result<Vec<ImportRow>> {
    let rows = match format {
        TransferFormat::Json => decode_json(bytes)?,
        TransferFormat::Csv => decode_csv(bytes),
    };

    Ok(rows.into_iter().map(|row| row.map(normalize)).collect())
}

fn decode_json(bytes: &[u8]) -> Result<Vec<ImportRow>> {
    let document: serde_json::Value = serde_json::from_slice(bytes)
        .map_err(|e| ReaderError::Validation(format!("invalid JSON: {}", e)))?;

    let feeds = match document {
        serde_json::Value::Object(mut object) => object
            .remove("feeds")
            .unwrap_or(serde_json::Value::Array(Vec::new())),
        _ => {
            return Err(ReaderError::Validation(
                "invalid JSON: expected an object with a \"feeds\" list".to_string(),
            ))
        }
    };

    let serde_json::Value::Array(items) = feeds else {
        return Err(ReaderError::Validation(
            "invalid JSON: \"feeds\" must be a list".to_string(),
        ));
    };

    Ok(items
        .into_iter()
        .map(|item| {
            serde_json::from_value::<FeedRecord>(item).map_err(|e| format!("invalid row: {}", e))
        })
        .collect())
}

fn decode_csv(bytes: &[u8]) -> Vec<ImportRow> {
    let mut reader = csv::ReaderBuilder::new()
        .has_headers(true)
        .flexible(true)
        .trim(csv::Trim::All)
        .from_reader(bytes);

    reader
        .deserialize::<FeedRecord>()
        .map(|result| result.map_err(|e| format!("invalid row: {}", e)))
        .collect()
}

fn normalize(record: FeedRecord) -> FeedRecord {
    let clean = |value: Option<String>| {
        value
            .map(|v| v.trim().to_string())
            .filter(|v| !v.is_empty())
    };
    FeedRecord {
        title: clean(record.title),
        url: clean(record.url),
    }
}
