//! In-memory annotation store: files, their columns, and annotation fields.
//!
//! The dataset is loaded whole, mutated in place by the recorder, and written
//! back whole. Maps keep insertion order so iteration follows the backing file
//! and a flush never reorders it.
//!
//! # Schema
//!
//! ```text
//! { "<file>": { "metadata": { "country", "isp_used" },
//!               "columns": { "<column>": { "records": [...],
//!                                          "pii_1": "...", ...,
//!                                          "pii_explanation": "...",
//!                                          "pii_explanation_agree": 1, ... } } } }
//! ```
//!
//! Field presence encodes progress. Keys the workflow does not know about are
//! carried through untouched.
use anyhow::{anyhow, Context, Result};
use indexmap::IndexMap;
use serde::{Deserialize, Serialize};
use serde_json::Value;
use std::fs;
use std::path::Path;

mod fields;

pub use fields::{
    Decision, ExplanationKey, FieldId, FieldKind, LabelField, Variant, QUORUM,
};

/// Free-text model explanation shown to labelers. Never voted on or written.
pub const MODEL_EXPLANATION_FIELD: &str = "non_pii_gpt-4o";

/// Whole annotation dataset keyed by file name.
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
#[serde(transparent)]
pub struct Dataset {
    pub files: IndexMap<String, FileEntry>,
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct FileEntry {
    pub metadata: FileMetadata,
    pub columns: IndexMap<String, ColumnEntry>,
    #[serde(flatten)]
    pub extra: IndexMap<String, Value>,
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct FileMetadata {
    pub country: String,
    pub isp_used: String,
    #[serde(flatten)]
    pub extra: IndexMap<String, Value>,
}

/// Raw records for one column plus its annotation fields.
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
pub struct ColumnEntry {
    pub records: Vec<Value>,
    #[serde(flatten)]
    pub fields: IndexMap<String, Value>,
}

/// Agree/reject counts for one explanation.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, Serialize)]
pub struct VoteTally {
    pub agree: u32,
    pub reject: u32,
}

impl VoteTally {
    pub fn total(&self) -> u32 {
        self.agree + self.reject
    }
}

impl Dataset {
    /// Parse and validate a dataset from JSON bytes.
    pub fn from_slice(bytes: &[u8]) -> Result<Self> {
        let dataset: Dataset = serde_json::from_slice(bytes).context("parse dataset JSON")?;
        dataset.validate()?;
        Ok(dataset)
    }

    /// Load a dataset file from disk.
    pub fn load(path: &Path) -> Result<Self> {
        let bytes = fs::read(path).with_context(|| format!("read dataset {}", path.display()))?;
        Self::from_slice(&bytes).with_context(|| format!("load dataset {}", path.display()))
    }

    /// Encode the full dataset the way it is persisted.
    pub fn to_pretty_json(&self) -> serde_json::Result<Vec<u8>> {
        serde_json::to_vec_pretty(self)
    }

    pub fn file(&self, name: &str) -> Option<&FileEntry> {
        self.files.get(name)
    }

    pub fn column(&self, file: &str, column: &str) -> Option<&ColumnEntry> {
        self.files.get(file)?.columns.get(column)
    }

    pub fn column_mut(&mut self, file: &str, column: &str) -> Option<&mut ColumnEntry> {
        self.files.get_mut(file)?.columns.get_mut(column)
    }

    /// Every column in stable order.
    pub fn columns(&self) -> impl Iterator<Item = (&str, &str, &ColumnEntry)> {
        self.files.iter().flat_map(|(file_name, file)| {
            file.columns
                .iter()
                .map(move |(column_name, column)| (file_name.as_str(), column_name.as_str(), column))
        })
    }

    pub fn column_count(&self) -> usize {
        self.files.values().map(|file| file.columns.len()).sum()
    }

    /// Check that every known annotation field has the expected JSON shape.
    ///
    /// A malformed dataset is rejected as a whole rather than skipped column
    /// by column, so selection never runs over partially understood data.
    pub fn validate(&self) -> Result<()> {
        for (file_name, column_name, column) in self.columns() {
            for (name, value) in &column.fields {
                let Some(id) = FieldId::parse(name) else {
                    continue;
                };
                let ok = match id.kind() {
                    FieldKind::Text => value.is_string(),
                    FieldKind::Counter => value
                        .as_u64()
                        .is_some_and(|count| u32::try_from(count).is_ok()),
                };
                if !ok {
                    return Err(anyhow!(
                        "{file_name}/{column_name}: field {name} must be {} (got {value})",
                        match id.kind() {
                            FieldKind::Text => "a string",
                            FieldKind::Counter => "a non-negative integer",
                        }
                    ));
                }
            }
        }
        Ok(())
    }
}

impl ColumnEntry {
    pub fn has(&self, id: FieldId) -> bool {
        self.fields.contains_key(&id.key())
    }

    pub fn text(&self, id: FieldId) -> Option<&str> {
        self.fields.get(&id.key()).and_then(Value::as_str)
    }

    pub fn label(&self, variant: Variant, field: LabelField) -> Option<&str> {
        self.text(FieldId::Label { field, variant })
    }

    pub fn explanation(&self, key: ExplanationKey) -> Option<&str> {
        self.text(FieldId::Explanation(key))
    }

    /// Counter value, with a missing counter reading as zero.
    pub fn counter(&self, id: FieldId) -> u32 {
        self.fields
            .get(&id.key())
            .and_then(Value::as_u64)
            .and_then(|count| u32::try_from(count).ok())
            .unwrap_or(0)
    }

    pub fn tally(&self, key: ExplanationKey) -> VoteTally {
        VoteTally {
            agree: self.counter(FieldId::Agree(key)),
            reject: self.counter(FieldId::Reject(key)),
        }
    }

    pub fn set_text(&mut self, id: FieldId, value: impl Into<String>) {
        self.fields.insert(id.key(), Value::String(value.into()));
    }

    pub fn set_counter(&mut self, id: FieldId, value: u32) {
        self.fields.insert(id.key(), Value::from(value));
    }
}
