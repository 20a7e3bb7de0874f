//! Closed set of annotation field identifiers.
//!
//! Column entries store annotations under dynamically composed key names
//! (`pii_1`, `non_pii_explanation_agree`, ...). Everything that reads or
//! writes those keys goes through [`FieldId`] so the naming convention lives
//! in exactly one place.
use serde::{Deserialize, Serialize};
use std::fmt;

/// Independent judgments required before a task is settled.
pub const QUORUM: u32 = 2;

/// One of the two independent labeling passes over a column.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, PartialOrd, Ord, Serialize, Deserialize)]
#[serde(into = "u8", try_from = "u8")]
pub enum Variant {
    First,
    Second,
}

impl Variant {
    /// Variants in the order they are prompted.
    pub const ALL: [Variant; 2] = [Variant::First, Variant::Second];

    pub fn number(self) -> u8 {
        match self {
            Variant::First => 1,
            Variant::Second => 2,
        }
    }
}

impl From<Variant> for u8 {
    fn from(variant: Variant) -> Self {
        variant.number()
    }
}

impl TryFrom<u8> for Variant {
    type Error = String;

    fn try_from(value: u8) -> Result<Self, Self::Error> {
        match value {
            1 => Ok(Variant::First),
            2 => Ok(Variant::Second),
            other => Err(format!("variant must be 1 or 2 (got {other})")),
        }
    }
}

impl fmt::Display for Variant {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{}", self.number())
    }
}

/// The four values a reviewer supplies for one labeling pass.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum LabelField {
    Pii,
    PiiSensitivityLevel,
    NonPii,
    NonPiiSensitivityLevel,
}

impl LabelField {
    pub const ALL: [LabelField; 4] = [
        LabelField::Pii,
        LabelField::PiiSensitivityLevel,
        LabelField::NonPii,
        LabelField::NonPiiSensitivityLevel,
    ];

    /// Unsuffixed key name, also the name used by the single-pass legacy schema.
    pub fn as_str(self) -> &'static str {
        match self {
            LabelField::Pii => "pii",
            LabelField::PiiSensitivityLevel => "pii_sensitivity_level",
            LabelField::NonPii => "non_pii",
            LabelField::NonPiiSensitivityLevel => "non_pii_sensitivity_level",
        }
    }
}

/// Machine-generated explanations that reviewers confirm or reject.
#[derive(
    Debug, Clone, Copy, PartialEq, Eq, Hash, PartialOrd, Ord, Serialize, Deserialize, clap::ValueEnum,
)]
pub enum ExplanationKey {
    #[serde(rename = "pii_explanation")]
    #[value(name = "pii_explanation")]
    Pii,
    #[serde(rename = "pii_sensitivity_explanation")]
    #[value(name = "pii_sensitivity_explanation")]
    PiiSensitivity,
    #[serde(rename = "non_pii_explanation")]
    #[value(name = "non_pii_explanation")]
    NonPii,
    #[serde(rename = "non_pii_sensitivity_explanation")]
    #[value(name = "non_pii_sensitivity_explanation")]
    NonPiiSensitivity,
}

impl ExplanationKey {
    pub const ALL: [ExplanationKey; 4] = [
        ExplanationKey::Pii,
        ExplanationKey::PiiSensitivity,
        ExplanationKey::NonPii,
        ExplanationKey::NonPiiSensitivity,
    ];

    pub fn as_str(self) -> &'static str {
        match self {
            ExplanationKey::Pii => "pii_explanation",
            ExplanationKey::PiiSensitivity => "pii_sensitivity_explanation",
            ExplanationKey::NonPii => "non_pii_explanation",
            ExplanationKey::NonPiiSensitivity => "non_pii_sensitivity_explanation",
        }
    }

    pub fn parse(text: &str) -> Option<Self> {
        Self::ALL.into_iter().find(|key| key.as_str() == text)
    }
}

impl fmt::Display for ExplanationKey {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

/// A reviewer's judgment on one explanation.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize, clap::ValueEnum)]
#[serde(rename_all = "snake_case")]
pub enum Decision {
    Agree,
    Reject,
}

impl Decision {
    pub fn as_str(self) -> &'static str {
        match self {
            Decision::Agree => "agree",
            Decision::Reject => "reject",
        }
    }
}

/// Shape a known field must have in the dataset file.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum FieldKind {
    /// JSON string.
    Text,
    /// JSON non-negative integer.
    Counter,
}

/// Every annotation key the workflow reads or writes.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum FieldId {
    Label { field: LabelField, variant: Variant },
    Explanation(ExplanationKey),
    Agree(ExplanationKey),
    Reject(ExplanationKey),
}

impl FieldId {
    /// Counter field that records `decision` for `key`.
    pub fn vote(key: ExplanationKey, decision: Decision) -> Self {
        match decision {
            Decision::Agree => FieldId::Agree(key),
            Decision::Reject => FieldId::Reject(key),
        }
    }

    /// Key name as stored in the dataset file.
    pub fn key(&self) -> String {
        match self {
            FieldId::Label { field, variant } => format!("{}_{}", field.as_str(), variant),
            FieldId::Explanation(key) => key.as_str().to_string(),
            FieldId::Agree(key) => format!("{}_agree", key.as_str()),
            FieldId::Reject(key) => format!("{}_reject", key.as_str()),
        }
    }

    pub fn kind(&self) -> FieldKind {
        match self {
            FieldId::Label { .. } | FieldId::Explanation(_) => FieldKind::Text,
            FieldId::Agree(_) | FieldId::Reject(_) => FieldKind::Counter,
        }
    }

    /// All known identifiers, labels first.
    pub fn all() -> impl Iterator<Item = FieldId> {
        let labels = Variant::ALL.into_iter().flat_map(|variant| {
            LabelField::ALL
                .into_iter()
                .map(move |field| FieldId::Label { field, variant })
        });
        let explanations = ExplanationKey::ALL.into_iter().flat_map(|key| {
            [
                FieldId::Explanation(key),
                FieldId::Agree(key),
                FieldId::Reject(key),
            ]
        });
        labels.chain(explanations)
    }

    /// Resolve a stored key name back to its identifier.
    pub fn parse(name: &str) -> Option<Self> {
        Self::all().find(|id| id.key() == name)
    }
}
