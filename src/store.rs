//! Annotation store: the dataset plus the target it is flushed to.
//!
//! Every recorded action is flushed before the call returns. When the flush
//! fails the mutation stays applied in memory and the caller gets
//! [`SaveError::Flush`]; it must not treat the item as saved.
use crate::dataset::{ColumnEntry, Dataset, Decision, ExplanationKey, Variant, VoteTally};
use crate::policy::TaskKind;
use crate::recorder::{apply_label, apply_vote, check_label, check_vote, LabelSet, RecordError};
use crate::selector::{self, PendingUnit};
use crate::sync::{FlushError, FlushReport, SyncTarget};
use anyhow::Result;
use thiserror::Error;

#[derive(Debug, Error)]
pub enum SaveError {
    /// Refused before mutating; the dataset is unchanged.
    #[error(transparent)]
    Record(#[from] RecordError),
    /// Applied in memory but not persisted.
    #[error("saved in memory only: {0}")]
    Flush(#[from] FlushError),
}

pub struct Store {
    dataset: Dataset,
    target: SyncTarget,
}

impl Store {
    /// Load the dataset from `target`.
    pub fn open(target: SyncTarget) -> Result<Self> {
        let dataset = target.load()?;
        tracing::info!(
            source = %target.describe(),
            files = dataset.files.len(),
            columns = dataset.column_count(),
            "opened annotation store"
        );
        Ok(Self { dataset, target })
    }

    pub fn dataset(&self) -> &Dataset {
        &self.dataset
    }

    pub fn target(&self) -> &SyncTarget {
        &self.target
    }

    pub fn next_pending(&self, task: TaskKind) -> Option<PendingUnit> {
        selector::next_pending(&self.dataset, task)
    }

    /// Record one labeling pass and flush.
    pub fn record_label(
        &mut self,
        file: &str,
        column: &str,
        variant: Variant,
        labels: &LabelSet,
        amend: bool,
    ) -> Result<FlushReport, SaveError> {
        let entry = lookup_column(&mut self.dataset, file, column)?;
        check_label(column, entry, variant, amend)?;
        apply_label(entry, variant, labels);
        tracing::info!(file, column, variant = variant.number(), amend, "recorded label");
        let message = format!("Update annotations (label {file}/{column} variant {variant})");
        Ok(self.flush(&message)?)
    }

    /// Record one vote and flush.
    pub fn record_vote(
        &mut self,
        file: &str,
        column: &str,
        key: ExplanationKey,
        decision: Decision,
    ) -> Result<(VoteTally, FlushReport), SaveError> {
        let entry = lookup_column(&mut self.dataset, file, column)?;
        check_vote(column, entry, key)?;
        let tally = apply_vote(entry, key, decision);
        tracing::info!(
            file,
            column,
            key = key.as_str(),
            decision = decision.as_str(),
            agree = tally.agree,
            reject = tally.reject,
            "recorded vote"
        );
        let message = format!("Update annotations (vote {file}/{column} {key})");
        let report = self.flush(&message)?;
        Ok((tally, report))
    }

    /// Mutate the dataset directly, then flush it.
    pub fn update<F>(&mut self, message: &str, mutate: F) -> Result<FlushReport, FlushError>
    where
        F: FnOnce(&mut Dataset),
    {
        mutate(&mut self.dataset);
        self.flush(message)
    }

    pub fn flush(&self, message: &str) -> Result<FlushReport, FlushError> {
        self.target.flush(&self.dataset, message).inspect_err(|err| {
            tracing::warn!(error = %err, "flush failed; in-memory state is ahead of storage");
        })
    }
}

fn lookup_column<'a>(
    dataset: &'a mut Dataset,
    file: &str,
    column: &str,
) -> Result<&'a mut ColumnEntry, RecordError> {
    if dataset.file(file).is_none() {
        return Err(RecordError::UnknownFile(file.to_string()));
    }
    dataset
        .column_mut(file, column)
        .ok_or_else(|| RecordError::UnknownColumn {
            file: file.to_string(),
            column: column.to_string(),
        })
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::policy::PendingTask;
    use crate::recorder::{NonPiiCategory, NonPiiSensitivity, PiiCategory, PiiSensitivity};
    use crate::sync::testing::MemoryRemote;

    const DATASET: &[u8] = br#"{"f.csv": {"metadata": {"country": "x", "isp_used": "y"},
        "columns": {"c": {"records": ["r"], "pii_explanation": "why"}}}}"#;

    fn labels() -> LabelSet {
        LabelSet {
            pii: PiiCategory::GenericId,
            pii_sensitivity_level: PiiSensitivity::LowSensitive,
            non_pii: NonPiiCategory::Sensitive,
            non_pii_sensitivity_level: NonPiiSensitivity::MediumSensitive,
        }
    }

    fn local_store() -> (tempfile::TempDir, Store) {
        let dir = tempfile::tempdir().unwrap();
        let path = dir.path().join("test.json");
        std::fs::write(&path, DATASET).unwrap();
        let store = Store::open(SyncTarget::Local(path)).unwrap();
        (dir, store)
    }

    #[test]
    fn end_to_end_label_scenario() {
        let (dir, mut store) = local_store();
        let first = store.next_pending(TaskKind::Label).unwrap();
        assert_eq!(
            (first.file.as_str(), first.column.as_str(), &first.task),
            (
                "f.csv",
                "c",
                &PendingTask::Label {
                    variant: Variant::First
                }
            )
        );
        store
            .record_label("f.csv", "c", Variant::First, &labels(), false)
            .unwrap();
        let second = store.next_pending(TaskKind::Label).unwrap();
        assert_eq!(
            second.task,
            PendingTask::Label {
                variant: Variant::Second
            }
        );
        store
            .record_label("f.csv", "c", Variant::Second, &labels(), false)
            .unwrap();
        assert_eq!(store.next_pending(TaskKind::Label), None);

        let persisted = Dataset::load(&dir.path().join("test.json")).unwrap();
        assert_eq!(&persisted, store.dataset());
    }

    #[test]
    fn refused_actions_leave_dataset_untouched() {
        let (_dir, mut store) = local_store();
        let before = store.dataset().clone();
        let err = store
            .record_vote("f.csv", "c", ExplanationKey::NonPii, Decision::Agree)
            .unwrap_err();
        assert!(matches!(
            err,
            SaveError::Record(RecordError::NothingToVote { .. })
        ));
        let err = store
            .record_vote("g.csv", "c", ExplanationKey::Pii, Decision::Agree)
            .unwrap_err();
        assert!(matches!(err, SaveError::Record(RecordError::UnknownFile(_))));
        assert_eq!(store.dataset(), &before);
    }

    #[test]
    fn third_vote_is_refused() {
        let (_dir, mut store) = local_store();
        store
            .record_vote("f.csv", "c", ExplanationKey::Pii, Decision::Agree)
            .unwrap();
        let (tally, _) = store
            .record_vote("f.csv", "c", ExplanationKey::Pii, Decision::Reject)
            .unwrap();
        assert_eq!(tally, VoteTally { agree: 1, reject: 1 });
        assert_eq!(store.next_pending(TaskKind::Vote), None);
        let err = store
            .record_vote("f.csv", "c", ExplanationKey::Pii, Decision::Agree)
            .unwrap_err();
        assert!(matches!(err, SaveError::Record(RecordError::KeyClosed { .. })));
    }

    #[test]
    fn flush_failure_keeps_mutation_in_memory() {
        let remote = MemoryRemote::with_content(DATASET);
        let mut store = Store::open(SyncTarget::Remote {
            store: Box::new(remote.shared()),
            path: "test.json".to_string(),
        })
        .unwrap();
        remote.state.borrow_mut().interfere_after_read = true;

        let err = store
            .record_vote("f.csv", "c", ExplanationKey::Pii, Decision::Agree)
            .unwrap_err();
        assert!(matches!(
            err,
            SaveError::Flush(FlushError::RemoteWriteConflict { .. })
        ));
        let column = store.dataset().column("f.csv", "c").unwrap();
        assert_eq!(column.tally(ExplanationKey::Pii).agree, 1);
        assert!(remote.state.borrow().writes.is_empty());
    }
}
