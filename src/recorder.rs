//! Applying reviewer actions to a column.
//!
//! `apply_label` and `apply_vote` are the raw mutations. The `check_*`
//! guards decide whether an action is still allowed; the store runs them
//! before mutating so a refused action leaves the dataset untouched.
use crate::dataset::{
    ColumnEntry, Decision, ExplanationKey, FieldId, LabelField, Variant, VoteTally,
};
use crate::policy::{key_open, variant_filled, votable};
use serde::Serialize;
use thiserror::Error;

/// Why an action was refused before touching the dataset.
#[derive(Debug, Error, PartialEq, Eq)]
pub enum RecordError {
    #[error("unknown file {0:?}")]
    UnknownFile(String),
    #[error("unknown column {column:?} in {file:?}")]
    UnknownColumn { file: String, column: String },
    #[error("variant {variant} of {column:?} is already labeled (use --amend to overwrite)")]
    VariantAlreadyFilled { column: String, variant: Variant },
    #[error("{key} on {column:?} already has {quorum} votes", quorum = crate::dataset::QUORUM)]
    KeyClosed { column: String, key: ExplanationKey },
    #[error("{key} on {column:?} has no explanation to vote on")]
    NothingToVote { column: String, key: ExplanationKey },
}

/// PII category offered to reviewers.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, clap::ValueEnum)]
pub enum PiiCategory {
    #[value(name = "None")]
    #[serde(rename = "None")]
    NotPii,
    #[value(name = "GENERIC_ID")]
    #[serde(rename = "GENERIC_ID")]
    GenericId,
    #[value(name = "PERSON_NAME")]
    #[serde(rename = "PERSON_NAME")]
    PersonName,
    #[value(name = "ORGANIZATION_NAME")]
    #[serde(rename = "ORGANIZATION_NAME")]
    OrganizationName,
    #[value(name = "PHONE_NUMBER")]
    #[serde(rename = "PHONE_NUMBER")]
    PhoneNumber,
    #[value(name = "EMAIL")]
    #[serde(rename = "EMAIL")]
    Email,
}

impl PiiCategory {
    pub fn as_str(self) -> &'static str {
        match self {
            PiiCategory::NotPii => "None",
            PiiCategory::GenericId => "GENERIC_ID",
            PiiCategory::PersonName => "PERSON_NAME",
            PiiCategory::OrganizationName => "ORGANIZATION_NAME",
            PiiCategory::PhoneNumber => "PHONE_NUMBER",
            PiiCategory::Email => "EMAIL",
        }
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, clap::ValueEnum)]
#[serde(rename_all = "SCREAMING_SNAKE_CASE")]
#[value(rename_all = "SCREAMING_SNAKE_CASE")]
pub enum PiiSensitivity {
    NonSensitive,
    LowSensitive,
    MediumSensitive,
    HighSensitive,
}

impl PiiSensitivity {
    pub fn as_str(self) -> &'static str {
        match self {
            PiiSensitivity::NonSensitive => "NON_SENSITIVE",
            PiiSensitivity::LowSensitive => "LOW_SENSITIVE",
            PiiSensitivity::MediumSensitive => "MEDIUM_SENSITIVE",
            PiiSensitivity::HighSensitive => "HIGH_SENSITIVE",
        }
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, clap::ValueEnum)]
#[serde(rename_all = "SCREAMING_SNAKE_CASE")]
#[value(rename_all = "SCREAMING_SNAKE_CASE")]
pub enum NonPiiCategory {
    NonSensitive,
    Sensitive,
}

impl NonPiiCategory {
    pub fn as_str(self) -> &'static str {
        match self {
            NonPiiCategory::NonSensitive => "NON_SENSITIVE",
            NonPiiCategory::Sensitive => "SENSITIVE",
        }
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, clap::ValueEnum)]
#[serde(rename_all = "SCREAMING_SNAKE_CASE")]
#[value(rename_all = "SCREAMING_SNAKE_CASE")]
pub enum NonPiiSensitivity {
    NonSensitive,
    MediumSensitive,
    HighSensitive,
}

impl NonPiiSensitivity {
    pub fn as_str(self) -> &'static str {
        match self {
            NonPiiSensitivity::NonSensitive => "NON_SENSITIVE",
            NonPiiSensitivity::MediumSensitive => "MEDIUM_SENSITIVE",
            NonPiiSensitivity::HighSensitive => "HIGH_SENSITIVE",
        }
    }
}

/// One complete labeling pass for a column.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize)]
pub struct LabelSet {
    pub pii: PiiCategory,
    pub pii_sensitivity_level: PiiSensitivity,
    pub non_pii: NonPiiCategory,
    pub non_pii_sensitivity_level: NonPiiSensitivity,
}

impl LabelSet {
    fn value(&self, field: LabelField) -> &'static str {
        match field {
            LabelField::Pii => self.pii.as_str(),
            LabelField::PiiSensitivityLevel => self.pii_sensitivity_level.as_str(),
            LabelField::NonPii => self.non_pii.as_str(),
            LabelField::NonPiiSensitivityLevel => self.non_pii_sensitivity_level.as_str(),
        }
    }
}

/// Write all four label fields for `variant`; last write wins.
pub fn apply_label(column: &mut ColumnEntry, variant: Variant, labels: &LabelSet) {
    for field in LabelField::ALL {
        column.set_text(FieldId::Label { field, variant }, labels.value(field));
    }
}

/// Add exactly one vote for `key`, starting missing counters at zero.
pub fn apply_vote(column: &mut ColumnEntry, key: ExplanationKey, decision: Decision) -> VoteTally {
    let id = FieldId::vote(key, decision);
    let next = column.counter(id).saturating_add(1);
    column.set_counter(id, next);
    column.tally(key)
}

/// Refuse a label for a filled variant unless the caller is amending.
pub fn check_label(
    column_name: &str,
    column: &ColumnEntry,
    variant: Variant,
    amend: bool,
) -> Result<(), RecordError> {
    if !amend && variant_filled(column, variant) {
        return Err(RecordError::VariantAlreadyFilled {
            column: column_name.to_string(),
            variant,
        });
    }
    Ok(())
}

/// Refuse a vote once the key has quorum or has nothing to vote on.
pub fn check_vote(
    column_name: &str,
    column: &ColumnEntry,
    key: ExplanationKey,
) -> Result<(), RecordError> {
    if !votable(column, key) {
        return Err(RecordError::NothingToVote {
            column: column_name.to_string(),
            key,
        });
    }
    if !key_open(column, key) {
        return Err(RecordError::KeyClosed {
            column: column_name.to_string(),
            key,
        });
    }
    Ok(())
}
