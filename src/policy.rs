//! Completion policy for label and vote tasks.
//!
//! Pure functions over a single column: no I/O and no mutation. Everything
//! that decides "is this done" or "what is asked next" goes through here so
//! the selector, the recorder guards, and status all agree.
use crate::dataset::{ColumnEntry, ExplanationKey, FieldId, LabelField, Variant, QUORUM};
use serde::Serialize;
use std::fmt;

/// Kind of reviewer work being collected.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, clap::ValueEnum)]
#[serde(rename_all = "snake_case")]
pub enum TaskKind {
    /// Two independent label passes per column.
    Label,
    /// Quorum votes on each non-empty explanation.
    Vote,
}

impl TaskKind {
    pub fn as_str(self) -> &'static str {
        match self {
            TaskKind::Label => "label",
            TaskKind::Vote => "vote",
        }
    }
}

impl fmt::Display for TaskKind {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

/// The input a column still needs for a task.
#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
#[serde(tag = "kind", rename_all = "snake_case")]
pub enum PendingTask {
    Label { variant: Variant },
    Vote { open_keys: Vec<ExplanationKey> },
}

impl fmt::Display for PendingTask {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            PendingTask::Label { variant } => write!(f, "label variant {variant}"),
            PendingTask::Vote { open_keys } => {
                let keys = open_keys
                    .iter()
                    .map(|key| key.as_str())
                    .collect::<Vec<_>>()
                    .join(", ");
                write!(f, "vote on {keys}")
            }
        }
    }
}

/// A variant is filled once all four label fields exist for it.
pub fn variant_filled(column: &ColumnEntry, variant: Variant) -> bool {
    LabelField::ALL
        .into_iter()
        .all(|field| column.has(FieldId::Label { field, variant }))
}

/// Whether there is explanation text to vote on.
///
/// An absent explanation and an empty one both mean nothing to vote on.
pub fn votable(column: &ColumnEntry, key: ExplanationKey) -> bool {
    column
        .explanation(key)
        .is_some_and(|text| !text.is_empty())
}

/// Whether a key still accepts votes.
pub fn key_open(column: &ColumnEntry, key: ExplanationKey) -> bool {
    votable(column, key) && column.tally(key).total() < QUORUM
}

/// Next required input for `task`, or `None` when the column is complete.
pub fn remaining_task(column: &ColumnEntry, task: TaskKind) -> Option<PendingTask> {
    match task {
        TaskKind::Label => Variant::ALL
            .into_iter()
            .find(|variant| !variant_filled(column, *variant))
            .map(|variant| PendingTask::Label { variant }),
        TaskKind::Vote => {
            let open_keys = ExplanationKey::ALL
                .into_iter()
                .filter(|key| key_open(column, *key))
                .collect::<Vec<_>>();
            (!open_keys.is_empty()).then_some(PendingTask::Vote { open_keys })
        }
    }
}

pub fn is_complete(column: &ColumnEntry, task: TaskKind) -> bool {
    remaining_task(column, task).is_none()
}

/// Reviewer inputs still needed: unfilled variants, or votes short of quorum.
pub fn outstanding_inputs(column: &ColumnEntry, task: TaskKind) -> u32 {
    match task {
        TaskKind::Label => Variant::ALL
            .into_iter()
            .filter(|variant| !variant_filled(column, *variant))
            .count() as u32,
        TaskKind::Vote => ExplanationKey::ALL
            .into_iter()
            .filter(|key| key_open(column, *key))
            .map(|key| QUORUM - column.tally(key).total())
            .sum(),
    }
}
