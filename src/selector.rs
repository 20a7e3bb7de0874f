//! Work selection over the whole dataset.
//!
//! Selection is recomputed from the store on every call. Nothing remembers
//! which columns were already shown; the annotation fields themselves are the
//! only record of progress, so a save is visible to the very next query.
use crate::dataset::Dataset;
use crate::policy::{is_complete, outstanding_inputs, remaining_task, PendingTask, TaskKind};
use serde::Serialize;

/// A column that still needs reviewer input.
#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
pub struct PendingUnit {
    pub file: String,
    pub column: String,
    pub task: PendingTask,
}

/// Per-task progress across the dataset.
#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
pub struct TaskProgress {
    pub task: TaskKind,
    pub total_columns: usize,
    pub complete_columns: usize,
    /// Label passes or votes still missing across all columns.
    pub outstanding: u32,
    pub pending_files: Vec<String>,
}

impl TaskProgress {
    pub fn is_done(&self) -> bool {
        self.complete_columns == self.total_columns
    }
}

/// First incomplete column in file order, then column order.
///
/// `None` means the dataset is fully annotated for `task`.
pub fn next_pending(dataset: &Dataset, task: TaskKind) -> Option<PendingUnit> {
    let next = dataset
        .columns()
        .find_map(|(file, column, entry)| {
            remaining_task(entry, task).map(|pending| PendingUnit {
                file: file.to_string(),
                column: column.to_string(),
                task: pending,
            })
        });
    match &next {
        Some(unit) => tracing::debug!(
            task = %task,
            file = %unit.file,
            column = %unit.column,
            "next pending unit"
        ),
        None => tracing::debug!(task = %task, "no pending units"),
    }
    next
}

/// Pending columns of one file in column order.
///
/// Returns `None` for an unknown file so callers can tell "nothing left"
/// apart from a typo.
pub fn pending_in_file(dataset: &Dataset, file: &str, task: TaskKind) -> Option<Vec<PendingUnit>> {
    let entry = dataset.file(file)?;
    Some(
        entry
            .columns
            .iter()
            .filter_map(|(column, column_entry)| {
                remaining_task(column_entry, task).map(|pending| PendingUnit {
                    file: file.to_string(),
                    column: column.clone(),
                    task: pending,
                })
            })
            .collect(),
    )
}

/// First file, in dataset order, that still has pending columns.
pub fn next_pending_file(dataset: &Dataset, task: TaskKind) -> Option<&str> {
    next_pending(dataset, task).and_then(|unit| {
        dataset
            .files
            .get_key_value(&unit.file)
            .map(|(name, _)| name.as_str())
    })
}

pub fn progress(dataset: &Dataset, task: TaskKind) -> TaskProgress {
    let mut complete_columns = 0;
    let mut outstanding = 0;
    let mut pending_files = Vec::new();
    for (file_name, file) in &dataset.files {
        let mut file_pending = false;
        for column in file.columns.values() {
            outstanding += outstanding_inputs(column, task);
            if is_complete(column, task) {
                complete_columns += 1;
            } else {
                file_pending = true;
            }
        }
        if file_pending {
            pending_files.push(file_name.clone());
        }
    }
    TaskProgress {
        task,
        total_columns: dataset.column_count(),
        complete_columns,
        outstanding,
        pending_files,
    }
}
