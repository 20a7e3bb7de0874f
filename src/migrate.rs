//! Upgrade from the single-pass schema to two-variant labeling.
//!
//! The first version of the form wrote unsuffixed `pii`,
//! `pii_sensitivity_level`, `non_pii` and `non_pii_sensitivity_level`. Those
//! values become variant 1 when variant 1 has not been touched. Legacy keys
//! are left in place, and the global `agreed`/`rejected` counters are only
//! reported since they cannot be attributed to one explanation.
use crate::dataset::{Dataset, FieldId, LabelField, Variant};
use serde::Serialize;
use serde_json::Value;

const LEGACY_COUNTERS: [&str; 2] = ["agreed", "rejected"];

#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
pub struct ColumnRef {
    pub file: String,
    pub column: String,
}

#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize)]
pub struct MigrationReport {
    /// Columns whose legacy labels were copied into variant 1.
    pub promoted: Vec<ColumnRef>,
    /// Columns with legacy labels that could not be promoted.
    pub skipped: Vec<ColumnRef>,
    /// Columns still carrying global vote counters.
    pub legacy_counters: Vec<ColumnRef>,
}

impl MigrationReport {
    pub fn changed(&self) -> bool {
        !self.promoted.is_empty()
    }
}

/// Promote legacy labels in place. Running it twice changes nothing.
pub fn migrate(dataset: &mut Dataset) -> MigrationReport {
    let mut report = MigrationReport::default();
    for (file_name, file) in dataset.files.iter_mut() {
        for (column_name, column) in file.columns.iter_mut() {
            let at = || ColumnRef {
                file: file_name.clone(),
                column: column_name.clone(),
            };
            if LEGACY_COUNTERS
                .iter()
                .any(|name| column.fields.contains_key(*name))
            {
                report.legacy_counters.push(at());
            }

            let legacy: Vec<Option<String>> = LabelField::ALL
                .iter()
                .map(|field| {
                    column
                        .fields
                        .get(field.as_str())
                        .and_then(Value::as_str)
                        .map(str::to_string)
                })
                .collect();
            if legacy.iter().all(Option::is_none) {
                continue;
            }
            let variant_touched = LabelField::ALL.into_iter().any(|field| {
                column.has(FieldId::Label {
                    field,
                    variant: Variant::First,
                })
            });
            if variant_touched {
                continue;
            }
            if legacy.iter().any(Option::is_none) {
                report.skipped.push(at());
                continue;
            }
            for (field, value) in LabelField::ALL.into_iter().zip(legacy.into_iter().flatten()) {
                column.set_text(
                    FieldId::Label {
                        field,
                        variant: Variant::First,
                    },
                    value,
                );
            }
            report.promoted.push(at());
        }
    }
    if !report.legacy_counters.is_empty() {
        tracing::warn!(
            columns = report.legacy_counters.len(),
            "global agreed/rejected counters are not migrated"
        );
    }
    report
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::policy::{remaining_task, PendingTask, TaskKind};

    fn dataset() -> Dataset {
        Dataset::from_slice(
            br#"{"f.csv": {"metadata": {"country": "x", "isp_used": "y"}, "columns": {
  "legacy": {"records": [], "pii": "EMAIL", "pii_sensitivity_level": "HIGH_SENSITIVE",
             "non_pii": "NON_SENSITIVE", "non_pii_sensitivity_level": "NON_SENSITIVE",
             "agreed": 3},
  "partial": {"records": [], "pii": "EMAIL"},
  "current": {"records": [], "pii": "None", "pii_sensitivity_level": "NON_SENSITIVE",
              "non_pii": "NON_SENSITIVE", "non_pii_sensitivity_level": "NON_SENSITIVE",
              "pii_1": "PERSON_NAME"},
  "fresh": {"records": []}
}}}"#,
        )
        .unwrap()
    }

    #[test]
    fn promotes_complete_legacy_labels_only() {
        let mut data = dataset();
        let report = migrate(&mut data);
        let names = |refs: &[ColumnRef]| refs.iter().map(|r| r.column.clone()).collect::<Vec<_>>();
        assert_eq!(names(&report.promoted), vec!["legacy"]);
        assert_eq!(names(&report.skipped), vec!["partial"]);
        assert_eq!(names(&report.legacy_counters), vec!["legacy"]);

        let legacy = data.column("f.csv", "legacy").unwrap();
        assert_eq!(legacy.label(Variant::First, LabelField::Pii), Some("EMAIL"));
        assert_eq!(legacy.fields.get("pii").and_then(Value::as_str), Some("EMAIL"));
        assert_eq!(
            remaining_task(legacy, TaskKind::Label),
            Some(PendingTask::Label {
                variant: Variant::Second
            })
        );

        let current = data.column("f.csv", "current").unwrap();
        assert_eq!(
            current.label(Variant::First, LabelField::Pii),
            Some("PERSON_NAME")
        );
        assert_eq!(
            current.label(Variant::First, LabelField::NonPii),
            None
        );
    }

    #[test]
    fn migration_is_idempotent() {
        let mut data = dataset();
        assert!(migrate(&mut data).changed());
        let snapshot = data.clone();
        let second = migrate(&mut data);
        assert!(!second.changed());
        assert_eq!(data, snapshot);
    }
}
