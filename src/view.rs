//! Plain views of pending units for the command line.
use crate::dataset::{Dataset, ExplanationKey, MODEL_EXPLANATION_FIELD};
use crate::guidelines::IspGuidelines;
use crate::policy::{key_open, PendingTask};
use crate::selector::PendingUnit;
use crate::util::{preview_records, truncate_string};
use serde::Serialize;
use serde_json::Value;
use std::io::{self, Write};

const PREVIEW_RECORDS: usize = 5;
const PREVIEW_MAX_BYTES: usize = 160;
const EXPLANATION_MAX_BYTES: usize = 400;

#[derive(Debug, Clone, Serialize)]
pub struct ExplanationView {
    pub key: ExplanationKey,
    pub text: String,
    pub agree: u32,
    pub reject: u32,
    pub open: bool,
}

/// Explanation text shown read-only next to a column being labeled.
#[derive(Debug, Clone, Serialize)]
pub struct NoteView {
    pub field: String,
    pub text: String,
}

/// Everything a reviewer needs to act on one pending unit.
#[derive(Debug, Clone, Serialize)]
pub struct UnitView {
    #[serde(flatten)]
    pub unit: PendingUnit,
    pub country: String,
    pub isp_used: String,
    pub records: Vec<Value>,
    #[serde(skip_serializing_if = "Vec::is_empty")]
    pub explanations: Vec<ExplanationView>,
    #[serde(skip_serializing_if = "Vec::is_empty")]
    pub notes: Vec<NoteView>,
}

impl UnitView {
    /// Build the view, or `None` if the unit no longer exists in `dataset`.
    pub fn build(dataset: &Dataset, unit: &PendingUnit) -> Option<Self> {
        let file = dataset.file(&unit.file)?;
        let column = file.columns.get(&unit.column)?;
        let notes = match &unit.task {
            PendingTask::Label { .. } => ExplanationKey::ALL
                .into_iter()
                .map(ExplanationKey::as_str)
                .chain([MODEL_EXPLANATION_FIELD])
                .filter_map(|field| {
                    let text = column
                        .fields
                        .get(field)
                        .and_then(Value::as_str)
                        .filter(|text| !text.is_empty())?;
                    Some(NoteView {
                        field: field.to_string(),
                        text: text.to_string(),
                    })
                })
                .collect(),
            PendingTask::Vote { .. } => Vec::new(),
        };
        let explanations = match &unit.task {
            PendingTask::Vote { .. } => ExplanationKey::ALL
                .into_iter()
                .filter_map(|key| {
                    let text = column.explanation(key).filter(|text| !text.is_empty())?;
                    let tally = column.tally(key);
                    Some(ExplanationView {
                        key,
                        text: text.to_string(),
                        agree: tally.agree,
                        reject: tally.reject,
                        open: key_open(column, key),
                    })
                })
                .collect(),
            PendingTask::Label { .. } => Vec::new(),
        };
        Some(Self {
            unit: unit.clone(),
            country: file.metadata.country.clone(),
            isp_used: file.metadata.isp_used.clone(),
            records: column.records.clone(),
            explanations,
            notes,
        })
    }

    pub fn write_text<W: Write>(&self, out: &mut W) -> io::Result<()> {
        writeln!(
            out,
            "{}/{}: {}",
            self.unit.file, self.unit.column, self.unit.task
        )?;
        writeln!(out, "  country: {}  isp: {}", self.country, self.isp_used)?;
        writeln!(
            out,
            "  records: {}",
            preview_records(&self.records, PREVIEW_RECORDS, PREVIEW_MAX_BYTES)
        )?;
        for explanation in &self.explanations {
            writeln!(
                out,
                "  {} [{} agree / {} reject{}]: {}",
                explanation.key,
                explanation.agree,
                explanation.reject,
                if explanation.open { "" } else { ", closed" },
                truncate_string(&explanation.text, EXPLANATION_MAX_BYTES)
            )?;
        }
        for note in &self.notes {
            writeln!(
                out,
                "  {}: {}",
                note.field,
                truncate_string(&note.text, EXPLANATION_MAX_BYTES)
            )?;
        }
        Ok(())
    }
}

/// List an ISP's guideline tiers.
pub fn write_guidelines<W: Write>(
    out: &mut W,
    isp: &str,
    guidelines: Option<&IspGuidelines>,
) -> io::Result<()> {
    let Some(guidelines) = guidelines else {
        return writeln!(out, "no guidelines found for ISP {isp:?}");
    };
    writeln!(out, "guidelines for {isp}:")?;
    let mut any = false;
    for (tier, items) in guidelines.tiers() {
        any = true;
        writeln!(out, "  {}:", tier.as_str())?;
        for item in items {
            writeln!(out, "    - {item}")?;
        }
    }
    if !any {
        writeln!(out, "  (empty)")?;
    }
    Ok(())
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::policy::TaskKind;
    use crate::selector::next_pending;

    #[test]
    fn vote_view_lists_only_non_empty_explanations() {
        let dataset = Dataset::from_slice(
            br#"{"f.csv": {"metadata": {"country": "italy", "isp_used": "TIM"},
                "columns": {"c": {"records": ["x"], "pii_explanation": "emails",
                "pii_explanation_agree": 1, "non_pii_explanation": ""}}}}"#,
        )
        .unwrap();
        let unit = next_pending(&dataset, TaskKind::Vote).unwrap();
        let view = UnitView::build(&dataset, &unit).unwrap();
        assert_eq!(view.explanations.len(), 1);
        assert_eq!(view.explanations[0].agree, 1);
        assert!(view.explanations[0].open);

        let mut out = Vec::new();
        view.write_text(&mut out).unwrap();
        let text = String::from_utf8(out).unwrap();
        assert!(text.starts_with("f.csv/c: vote on pii_explanation"));
        assert!(text.contains("isp: TIM"));
    }

    #[test]
    fn label_view_carries_explanations_read_only() {
        let dataset = Dataset::from_slice(
            br#"{"f.csv": {"metadata": {"country": "italy", "isp_used": "TIM"},
                "columns": {"c": {"records": ["x"], "non_pii_gpt-4o": "billing codes",
                "pii_explanation": "", "non_pii_explanation": "internal ids"}}}}"#,
        )
        .unwrap();
        let unit = next_pending(&dataset, TaskKind::Label).unwrap();
        let view = UnitView::build(&dataset, &unit).unwrap();
        assert!(view.explanations.is_empty());
        let fields: Vec<_> = view.notes.iter().map(|note| note.field.as_str()).collect();
        assert_eq!(fields, vec!["non_pii_explanation", "non_pii_gpt-4o"]);

        let mut out = Vec::new();
        view.write_text(&mut out).unwrap();
        let text = String::from_utf8(out).unwrap();
        assert!(text.ends_with("  non_pii_explanation: internal ids\n  non_pii_gpt-4o: billing codes\n"));
    }

    #[test]
    fn guidelines_for_unknown_isp_are_reported() {
        let mut out = Vec::new();
        write_guidelines(&mut out, "Nope", None).unwrap();
        assert_eq!(
            String::from_utf8(out).unwrap(),
            "no guidelines found for ISP \"Nope\"\n"
        );
    }
}
