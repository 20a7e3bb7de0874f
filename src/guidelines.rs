//! ISP guideline reference table.
//!
//! Read once, never written. Each ISP lists guideline strings under four
//! sensitivity tiers; missing tiers read as empty.
use anyhow::{Context, Result};
use indexmap::IndexMap;
use serde::{Deserialize, Serialize};
use std::fs;
use std::path::Path;

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize)]
#[serde(rename_all = "snake_case")]
pub enum SensitivityTier {
    LowOrNone,
    Medium,
    High,
    Severe,
}

impl SensitivityTier {
    /// Tiers from least to most sensitive.
    pub const ALL: [SensitivityTier; 4] = [
        SensitivityTier::LowOrNone,
        SensitivityTier::Medium,
        SensitivityTier::High,
        SensitivityTier::Severe,
    ];

    /// Bucket name used in the guidelines file.
    pub fn as_str(self) -> &'static str {
        match self {
            SensitivityTier::LowOrNone => "low/no sensitivity",
            SensitivityTier::Medium => "medium sensitivity",
            SensitivityTier::High => "high sensitivity",
            SensitivityTier::Severe => "severe sensitivity",
        }
    }
}

#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
pub struct IspGuidelines {
    #[serde(rename = "low/no sensitivity", default)]
    pub low_or_none: Vec<String>,
    #[serde(rename = "medium sensitivity", default)]
    pub medium: Vec<String>,
    #[serde(rename = "high sensitivity", default)]
    pub high: Vec<String>,
    #[serde(rename = "severe sensitivity", default)]
    pub severe: Vec<String>,
}

impl IspGuidelines {
    pub fn tier(&self, tier: SensitivityTier) -> &[String] {
        match tier {
            SensitivityTier::LowOrNone => &self.low_or_none,
            SensitivityTier::Medium => &self.medium,
            SensitivityTier::High => &self.high,
            SensitivityTier::Severe => &self.severe,
        }
    }

    /// Non-empty tiers in order.
    pub fn tiers(&self) -> impl Iterator<Item = (SensitivityTier, &[String])> {
        SensitivityTier::ALL
            .into_iter()
            .map(|tier| (tier, self.tier(tier)))
            .filter(|(_, items)| !items.is_empty())
    }
}

#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
#[serde(transparent)]
pub struct GuidelineTable {
    pub isps: IndexMap<String, IspGuidelines>,
}

impl GuidelineTable {
    pub fn load(path: &Path) -> Result<Self> {
        let bytes =
            fs::read(path).with_context(|| format!("read guidelines {}", path.display()))?;
        let table: GuidelineTable = serde_json::from_slice(&bytes)
            .with_context(|| format!("parse guidelines {}", path.display()))?;
        Ok(table)
    }

    pub fn get(&self, isp: &str) -> Option<&IspGuidelines> {
        self.isps.get(isp)
    }

    pub fn names(&self) -> impl Iterator<Item = &str> {
        self.isps.keys().map(String::as_str)
    }
}
