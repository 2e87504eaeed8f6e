use std::fmt;

pub mod job;
pub mod path_utils;
pub mod printer;
pub mod timelapse;

pub use job::JobState;
pub use printer::{HistoricalTempEntry, PrinterState, PrinterStateFlags, PrinterTempState};
pub use timelapse::{Timelapse, TimelapseConfig, TimelapseListing};

/// One remote artifact subject to mirroring. `name` is the uniqueness key.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Item {
    pub name: String,
    pub size: u64,
    pub remote_path: String,
}

impl Item {
    pub fn new(name: impl Into<String>, size: u64, remote_path: impl Into<String>) -> Self {
        Self {
            name: name.into(),
            size,
            remote_path: remote_path.into(),
        }
    }
}

#[derive(Debug, thiserror::Error, PartialEq, Eq)]
pub enum PlanError {
    #[error("concurrency must be at least 1 (got {0})")]
    Concurrency(usize),
}

/// Immutable per-run configuration for a mirror run.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct SyncPlan {
    concurrency: usize,
    delete_after_sync: bool,
}

impl SyncPlan {
    pub fn new(concurrency: usize, delete_after_sync: bool) -> Result<Self, PlanError> {
        if concurrency < 1 {
            return Err(PlanError::Concurrency(concurrency));
        }
        Ok(Self {
            concurrency,
            delete_after_sync,
        })
    }

    pub fn concurrency(&self) -> usize {
        self.concurrency
    }

    pub fn delete_after_sync(&self) -> bool {
        self.delete_after_sync
    }
}

#[derive(Debug, Clone, PartialEq, Eq)]
pub enum FailureReason {
    /// Unsafe item name, or the destination could not be created.
    Create(String),
    Fetch(String),
    Copy(String),
    /// The stream ended cleanly but did not deliver the listed size.
    Incomplete { expected: u64, written: u64 },
    Delete(String),
    Cancelled,
    /// The worker task panicked or was aborted.
    Aborted(String),
}

impl fmt::Display for FailureReason {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            FailureReason::Create(msg) => write!(f, "create failed: {msg}"),
            FailureReason::Fetch(msg) => write!(f, "fetch failed: {msg}"),
            FailureReason::Copy(msg) => write!(f, "copy failed: {msg}"),
            FailureReason::Incomplete { expected, written } => {
                write!(f, "incomplete transfer: wrote {written} of {expected} bytes")
            }
            FailureReason::Delete(msg) => write!(f, "delete failed: {msg}"),
            FailureReason::Cancelled => f.write_str("cancelled"),
            FailureReason::Aborted(msg) => write!(f, "worker aborted: {msg}"),
        }
    }
}

/// Terminal state of one item after a run.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum SyncOutcome {
    Skipped,
    Downloaded,
    Deleted,
    Failed(FailureReason),
}

impl SyncOutcome {
    pub fn is_failed(&self) -> bool {
        matches!(self, SyncOutcome::Failed(_))
    }
}

impl fmt::Display for SyncOutcome {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            SyncOutcome::Skipped => f.write_str("skipped"),
            SyncOutcome::Downloaded => f.write_str("downloaded"),
            SyncOutcome::Deleted => f.write_str("deleted"),
            SyncOutcome::Failed(reason) => write!(f, "failed ({reason})"),
        }
    }
}
