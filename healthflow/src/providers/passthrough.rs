//! An extractor for services whose payload items are already flat records.

use crate::context::{ExtractedRecords, RawPayloads};
use crate::errors::ExtractionError;
use crate::stages::Extractor;
use std::collections::BTreeMap;

/// Passes object items through unchanged, keyed by data kind.
///
/// Kinds can be renamed on the way through; everything else keeps the raw
/// kind as its key and relies on the data type lookup downstream.
#[derive(Debug, Clone, Default)]
pub struct PassthroughExtractor {
    renames: BTreeMap<String, String>,
}

impl PassthroughExtractor {
    /// Creates an extractor with no renames.
    #[must_use]
    pub fn new() -> Self {
        Self::default()
    }

    /// Emits records of `kind` under `key` instead.
    #[must_use]
    pub fn with_rename(mut self, kind: impl Into<String>, key: impl Into<String>) -> Self {
        self.renames.insert(kind.into(), key.into());
        self
    }
}

impl Extractor for PassthroughExtractor {
    fn extract(&self, raw: &RawPayloads) -> Result<ExtractedRecords, ExtractionError> {
        let mut extracted = ExtractedRecords::new();

        for (kind, items) in raw {
            for (index, item) in items.iter().enumerate() {
                if !item.is_object() {
                    return Err(ExtractionError::UnexpectedShape {
                        kind: kind.clone(),
                        index,
                        message: format!("expected an object, found {}", json_kind(item)),
                    });
                }
            }
            let key = self.renames.get(kind).unwrap_or(kind).clone();
            extracted.entry(key).or_default().extend(items.iter().cloned());
        }

        Ok(extracted)
    }
}

fn json_kind(value: &serde_json::Value) -> &'static str {
    match value {
        serde_json::Value::Null => "null",
        serde_json::Value::Bool(_) => "a boolean",
        serde_json::Value::Number(_) => "a number",
        serde_json::Value::String(_) => "a string",
        serde_json::Value::Array(_) => "an array",
        serde_json::Value::Object(_) => "an object",
    }
}
