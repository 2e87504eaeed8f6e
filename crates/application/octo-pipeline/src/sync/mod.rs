use camino::Utf8PathBuf;
use octo_core::{FailureReason, SyncOutcome, SyncPlan};
use tokio_util::sync::CancellationToken;

pub mod engine;
pub mod local;
pub mod remote;

pub use engine::SyncEngine;
pub use local::{FsLocalTarget, LocalTarget, LocalWriter};
pub use remote::{HttpRemoteStore, ItemStream, RemoteStore};

/// One mirror run: where to write, how, and the signal that stops it.
#[derive(Debug, Clone)]
pub struct SyncRequest {
    pub dest_dir: Utf8PathBuf,
    pub plan: SyncPlan,
    pub cancel: CancellationToken,
}

impl SyncRequest {
    pub fn new(dest_dir: impl Into<Utf8PathBuf>, plan: SyncPlan) -> Self {
        Self {
            dest_dir: dest_dir.into(),
            plan,
            cancel: CancellationToken::new(),
        }
    }
}

#[derive(Debug, Clone)]
pub enum SyncEvent {
    Started { name: String, total_bytes: u64 },
    Progress { name: String, bytes_delta: u64 },
    Finished { name: String, outcome: SyncOutcome },
}

/// Per-item outcomes of a run, in the order the items were given.
#[derive(Debug, Clone, Default)]
pub struct SyncReport {
    pub outcomes: Vec<(String, SyncOutcome)>,
}

impl SyncReport {
    fn count(&self, pred: impl Fn(&SyncOutcome) -> bool) -> usize {
        self.outcomes.iter().filter(|(_, o)| pred(o)).count()
    }

    pub fn skipped(&self) -> usize {
        self.count(|o| matches!(o, SyncOutcome::Skipped))
    }

    pub fn downloaded(&self) -> usize {
        self.count(|o| matches!(o, SyncOutcome::Downloaded))
    }

    pub fn deleted(&self) -> usize {
        self.count(|o| matches!(o, SyncOutcome::Deleted))
    }

    pub fn failed(&self) -> usize {
        self.count(SyncOutcome::is_failed)
    }

    pub fn is_success(&self) -> bool {
        self.failed() == 0
    }

    pub fn outcome(&self, name: &str) -> Option<&SyncOutcome> {
        self.outcomes
            .iter()
            .find(|(n, _)| n == name)
            .map(|(_, o)| o)
    }

    pub fn first_failure(&self) -> Option<(&str, &FailureReason)> {
        self.outcomes.iter().find_map(|(name, o)| match o {
            SyncOutcome::Failed(reason) => Some((name.as_str(), reason)),
            _ => None,
        })
    }

    /// Collapse the run into one verdict, keeping the first failure for diagnostics.
    pub fn into_result(self) -> Result<SyncReport, SyncError> {
        match self.first_failure() {
            None => Ok(self),
            Some((name, reason)) => Err(SyncError::ItemsFailed {
                failed: self.failed(),
                total: self.outcomes.len(),
                first_name: name.to_string(),
                first_reason: reason.clone(),
            }),
        }
    }
}

/// High-level error type for sync operations.
#[derive(Debug, thiserror::Error)]
pub enum SyncError {
    #[error("Remote error: {0}")]
    Remote(String),
    #[error("{failed} of {total} items failed (first: {first_name}: {first_reason})")]
    ItemsFailed {
        failed: usize,
        total: usize,
        first_name: String,
        first_reason: FailureReason,
    },
}

/// Convenience constructor for the HTTP-to-filesystem engine.
pub fn default_engine(client: octo_infra::OctoClient) -> SyncEngine {
    SyncEngine::new(
        std::sync::Arc::new(HttpRemoteStore::new(client)),
        std::sync::Arc::new(FsLocalTarget),
    )
}
