//! Loading and flushing the dataset.
//!
//! A flush always writes the entire dataset. With a remote target the flush
//! reads the current version marker first and submits a write conditioned on
//! it; without one the local file is replaced atomically.
//!
//! # Failure model
//!
//! ```text
//! remote read fails    -> RemoteReadError      (nothing written)
//! marker went stale    -> RemoteWriteConflict  (remote untouched)
//! other write failure  -> RemoteWriteError
//! local write fails    -> LocalWriteError
//! ```
//!
//! There is no retry: one reviewer session owns the dataset, and a conflict
//! means someone else wrote the remote copy.
use crate::config::RemoteConfig;
use crate::dataset::Dataset;
use anyhow::{Context, Result};
use std::path::{Path, PathBuf};
use std::time::Instant;
use thiserror::Error;

mod github;
mod local;

pub use github::GithubContentsStore;

/// Current remote content plus the marker a write must be conditioned on.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct RemoteObject {
    pub content: Vec<u8>,
    pub marker: String,
}

/// Why a conditional write did not land.
#[derive(Debug, Error, PartialEq, Eq)]
pub enum WriteRejection {
    #[error("version marker is stale")]
    Conflict,
    #[error("{0}")]
    Failed(String),
}

/// Versioned content store addressed by path.
pub trait RemoteStore {
    /// Short description of the store for logs.
    fn describe(&self) -> String;

    fn read(&self, path: &str) -> Result<RemoteObject>;

    /// Current version marker of `path`.
    fn marker(&self, path: &str) -> Result<String> {
        self.read(path).map(|object| object.marker)
    }

    /// Replace `path` with `content` only if its marker is still `marker`.
    fn write(
        &self,
        path: &str,
        content: &[u8],
        marker: &str,
        message: &str,
    ) -> Result<(), WriteRejection>;
}

#[derive(Debug, Error)]
pub enum FlushError {
    #[error("RemoteReadError: could not read version marker of {target}: {reason}")]
    RemoteRead { target: String, reason: String },
    #[error("RemoteWriteConflict: {target} changed after marker {marker} was read; reload and retry")]
    RemoteWriteConflict { target: String, marker: String },
    #[error("RemoteWriteError: write to {target} failed: {reason}")]
    RemoteWrite { target: String, reason: String },
    #[error("LocalWriteError: write {} failed: {source}", .path.display())]
    LocalWrite {
        path: PathBuf,
        #[source]
        source: std::io::Error,
    },
    #[error("encode dataset: {0}")]
    Encode(#[from] serde_json::Error),
}

/// Where the dataset lives.
pub enum SyncTarget {
    Local(PathBuf),
    Remote {
        store: Box<dyn RemoteStore>,
        path: String,
    },
}

/// Summary of a successful flush.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct FlushReport {
    pub target: String,
    pub bytes: usize,
}

impl SyncTarget {
    /// Remote target when configured, otherwise the local file.
    pub fn from_config(local: &Path, remote: Option<RemoteConfig>) -> Self {
        match remote {
            Some(config) => {
                let path = config.path.clone();
                SyncTarget::Remote {
                    store: Box::new(GithubContentsStore::new(config)),
                    path,
                }
            }
            None => SyncTarget::Local(local.to_path_buf()),
        }
    }

    pub fn describe(&self) -> String {
        match self {
            SyncTarget::Local(path) => path.display().to_string(),
            SyncTarget::Remote { store, path } => format!("{}:{}", store.describe(), path),
        }
    }

    /// Load the full dataset from the target.
    pub fn load(&self) -> Result<Dataset> {
        match self {
            SyncTarget::Local(path) => Dataset::load(path),
            SyncTarget::Remote { store, path } => {
                let object = store
                    .read(path)
                    .with_context(|| format!("read remote dataset {}", self.describe()))?;
                tracing::info!(
                    dest = %self.describe(),
                    marker = %object.marker,
                    bytes = object.content.len(),
                    "loaded remote dataset"
                );
                Dataset::from_slice(&object.content)
                    .with_context(|| format!("load remote dataset {}", self.describe()))
            }
        }
    }

    /// Persist the whole dataset.
    pub fn flush(&self, dataset: &Dataset, message: &str) -> Result<FlushReport, FlushError> {
        let start = Instant::now();
        let bytes = dataset.to_pretty_json()?;
        let target = self.describe();
        match self {
            SyncTarget::Local(path) => {
                local::write_atomic(path, &bytes).map_err(|source| FlushError::LocalWrite {
                    path: path.clone(),
                    source,
                })?;
            }
            SyncTarget::Remote { store, path } => {
                let marker = store.marker(path).map_err(|err| FlushError::RemoteRead {
                    target: target.clone(),
                    reason: format!("{err:#}"),
                })?;
                store
                    .write(path, &bytes, &marker, message)
                    .map_err(|rejection| match rejection {
                        WriteRejection::Conflict => FlushError::RemoteWriteConflict {
                            target: target.clone(),
                            marker: marker.clone(),
                        },
                        WriteRejection::Failed(reason) => FlushError::RemoteWrite {
                            target: target.clone(),
                            reason,
                        },
                    })?;
            }
        }
        tracing::info!(
            dest = %target,
            bytes = bytes.len(),
            elapsed_ms = start.elapsed().as_millis() as u64,
            "flushed dataset"
        );
        Ok(FlushReport {
            target,
            bytes: bytes.len(),
        })
    }
}


#[cfg(test)]
mod tests {
    use super::testing::MemoryRemote;
    use super::*;

    const DATASET: &[u8] = br#"{"f.csv": {"metadata": {"country": "x", "isp_used": "y"},
        "columns": {"c": {"records": [1]}}}}"#;

    fn remote_target(remote: &MemoryRemote) -> SyncTarget {
        SyncTarget::Remote {
            store: Box::new(remote.shared()),
            path: "test.json".to_string(),
        }
    }

    #[test]
    fn remote_flush_writes_full_dataset_against_fresh_marker() {
        let remote = MemoryRemote::with_content(DATASET);
        let target = remote_target(&remote);
        let dataset = target.load().unwrap();
        let report = target.flush(&dataset, "Update annotations").unwrap();

        let state = remote.state.borrow();
        assert_eq!(state.version, 1);
        assert_eq!(state.writes, vec!["Update annotations"]);
        assert_eq!(report.bytes, state.content.len());
        assert_eq!(Dataset::from_slice(&state.content).unwrap(), dataset);
    }

    #[test]
    fn stale_marker_reports_conflict_and_leaves_remote_alone() {
        let remote = MemoryRemote::with_content(DATASET);
        let target = remote_target(&remote);
        let dataset = target.load().unwrap();
        remote.state.borrow_mut().interfere_after_read = true;

        let err = target.flush(&dataset, "Update annotations").unwrap_err();
        assert!(matches!(err, FlushError::RemoteWriteConflict { .. }));
        let state = remote.state.borrow();
        assert_eq!(state.content, b"{}".to_vec());
        assert!(state.writes.is_empty());
    }

    #[test]
    fn failed_marker_read_aborts_before_writing() {
        let remote = MemoryRemote::with_content(DATASET);
        let target = remote_target(&remote);
        let dataset = target.load().unwrap();
        remote.state.borrow_mut().fail_reads = true;

        let err = target.flush(&dataset, "Update annotations").unwrap_err();
        assert!(matches!(err, FlushError::RemoteRead { .. }));
        assert!(err.to_string().starts_with("RemoteReadError"));
        assert!(remote.state.borrow().writes.is_empty());
    }

    #[test]
    fn rejected_write_is_a_remote_write_error() {
        let remote = MemoryRemote::with_content(DATASET);
        let target = remote_target(&remote);
        let mut dataset = target.load().unwrap();
        dataset
            .column_mut("f.csv", "c")
            .unwrap()
            .set_counter(crate::dataset::FieldId::Agree(crate::dataset::ExplanationKey::Pii), 1);
        remote.state.borrow_mut().fail_writes = true;

        let err = target.flush(&dataset, "Update annotations").unwrap_err();
        match &err {
            FlushError::RemoteWrite { reason, .. } => assert!(reason.contains("503")),
            other => panic!("expected RemoteWrite, got {other:?}"),
        }
        assert!(err.to_string().starts_with("RemoteWriteError"));
        let state = remote.state.borrow();
        assert_eq!(state.content, DATASET.to_vec());
        assert_eq!(state.version, 0);
        assert!(state.writes.is_empty());
    }

    #[test]
    fn local_flush_replaces_file() {
        let dir = tempfile::tempdir().unwrap();
        let path = dir.path().join("test.json");
        std::fs::write(&path, DATASET).unwrap();
        let target = SyncTarget::Local(path.clone());
        let mut dataset = target.load().unwrap();
        dataset
            .column_mut("f.csv", "c")
            .unwrap()
            .set_counter(crate::dataset::FieldId::Agree(crate::dataset::ExplanationKey::Pii), 1);
        target.flush(&dataset, "unused").unwrap();
        assert_eq!(Dataset::load(&path).unwrap(), dataset);
        let leftovers = std::fs::read_dir(dir.path()).unwrap().count();
        assert_eq!(leftovers, 1);
    }

    #[test]
    fn local_flush_failure_is_typed() {
        let dir = tempfile::tempdir().unwrap();
        let blocker = dir.path().join("blocker");
        std::fs::write(&blocker, b"not a dir").unwrap();
        let target = SyncTarget::Local(blocker.join("test.json"));
        let err = target.flush(&Dataset::default(), "unused").unwrap_err();
        assert!(matches!(err, FlushError::LocalWrite { .. }));
    }
}
