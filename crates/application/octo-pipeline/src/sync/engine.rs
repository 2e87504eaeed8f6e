use std::sync::Arc;
use std::time::{Duration, Instant};

use camino::{Utf8Path, Utf8PathBuf};
use futures::future::join_all;
use futures::StreamExt;
use octo_core::path_utils::ItemPath;
use octo_core::{FailureReason, Item, SyncOutcome};
use tokio::io::AsyncWriteExt;
use tokio::sync::mpsc::Sender;
use tokio::sync::Semaphore;
use tokio_util::sync::CancellationToken;
use tracing::{debug, info, warn};

use crate::sync::local::{LocalTarget, LocalWriter};
use crate::sync::remote::{ItemStream, RemoteStore};
use crate::sync::{SyncError, SyncEvent, SyncReport, SyncRequest};

const PROGRESS_EMIT_BYTES: u64 = 1_000_000;
const PROGRESS_EMIT_INTERVAL: Duration = Duration::from_millis(100);

/// Mirrors remote items into a local directory with a bounded number of
/// items in flight.
pub struct SyncEngine {
    remote: Arc<dyn RemoteStore>,
    local: Arc<dyn LocalTarget>,
}

impl SyncEngine {
    pub fn new(remote: Arc<dyn RemoteStore>, local: Arc<dyn LocalTarget>) -> Self {
        Self { remote, local }
    }

    /// Enumerate the remote collection. A failure here is fatal to a run.
    pub async fn list(&self) -> Result<Vec<Item>, SyncError> {
        self.remote.list().await
    }

    /// Process every item exactly once and report all outcomes in input order.
    ///
    /// One task is spawned per item up front; the admission gate only bounds how
    /// many of them run their body at once. A failing item never stops its
    /// siblings.
    pub async fn run(
        &self,
        items: &[Item],
        req: &SyncRequest,
        progress_tx: Option<Sender<SyncEvent>>,
    ) -> SyncReport {
        let gate = Arc::new(Semaphore::new(req.plan.concurrency()));

        let handles: Vec<_> = items
            .iter()
            .cloned()
            .map(|item| {
                let worker = Worker {
                    remote: self.remote.clone(),
                    local: self.local.clone(),
                    dest_dir: req.dest_dir.clone(),
                    delete_after_sync: req.plan.delete_after_sync(),
                    cancel: req.cancel.clone(),
                    tx: progress_tx.clone(),
                };
                let gate = gate.clone();
                let name = item.name.clone();
                (name, tokio::spawn(worker.run(item, gate)))
            })
            .collect();

        let outcomes = join_all(handles.into_iter().map(|(name, handle)| async move {
            let outcome = match handle.await {
                Ok(outcome) => outcome,
                Err(e) => {
                    warn!("Worker for {} did not complete: {}", name, e);
                    SyncOutcome::Failed(FailureReason::Aborted(e.to_string()))
                }
            };
            (name, outcome)
        }))
        .await;

        SyncReport { outcomes }
    }

    /// [`SyncEngine::run`] collapsed into a single verdict.
    pub async fn sync(
        &self,
        items: &[Item],
        req: &SyncRequest,
        progress_tx: Option<Sender<SyncEvent>>,
    ) -> Result<SyncReport, SyncError> {
        self.run(items, req, progress_tx).await.into_result()
    }

    /// List, then mirror everything that was listed.
    pub async fn list_and_sync(
        &self,
        req: &SyncRequest,
        progress_tx: Option<Sender<SyncEvent>>,
    ) -> Result<SyncReport, SyncError> {
        let items = self.list().await?;
        self.sync(&items, req, progress_tx).await
    }
}

struct Worker {
    remote: Arc<dyn RemoteStore>,
    local: Arc<dyn LocalTarget>,
    dest_dir: Utf8PathBuf,
    delete_after_sync: bool,
    cancel: CancellationToken,
    tx: Option<Sender<SyncEvent>>,
}

impl Worker {
    async fn run(self, item: Item, gate: Arc<Semaphore>) -> SyncOutcome {
        let outcome = tokio::select! {
            biased;
            _ = self.cancel.cancelled() => SyncOutcome::Failed(FailureReason::Cancelled),
            permit = gate.acquire_owned() => match permit {
                Ok(_permit) => self.process(&item).await,
                Err(_) => {
                    SyncOutcome::Failed(FailureReason::Aborted("admission gate closed".into()))
                }
            },
        };

        if let SyncOutcome::Failed(reason) = &outcome {
            warn!("{}: {}", item.name, reason);
        }
        self.emit(SyncEvent::Finished {
            name: item.name.clone(),
            outcome: outcome.clone(),
        })
        .await;
        outcome
    }

    async fn process(&self, item: &Item) -> SyncOutcome {
        if !ItemPath::verify_safe(&item.name) {
            return SyncOutcome::Failed(FailureReason::Create(format!(
                "refusing unsafe item name {:?}",
                item.name
            )));
        }
        let dest = self.dest_dir.join(&item.name);

        match self.local.stat(&dest).await {
            Ok(Some(len)) if len == item.size => return self.already_present(item).await,
            Ok(_) => {}
            // Unknown local state: prefer a re-transfer over a silent skip.
            Err(e) => warn!("Cannot stat {}, fetching again: {}", dest, e),
        }

        self.transfer(item, &dest).await
    }

    async fn already_present(&self, item: &Item) -> SyncOutcome {
        if !self.delete_after_sync {
            debug!("Skipping {} (already present)", item.name);
            return SyncOutcome::Skipped;
        }
        info!("Deleting (already present) {}", item.name);
        self.delete(item).await
    }

    async fn transfer(&self, item: &Item, dest: &Utf8Path) -> SyncOutcome {
        info!("Downloading {} -> {} ({})", item.name, dest, item.size);

        let mut file = match self.local.create_truncate(dest).await {
            Ok(f) => f,
            Err(e) => return SyncOutcome::Failed(FailureReason::Create(format!("{dest}: {e}"))),
        };

        let fetched = tokio::select! {
            _ = self.cancel.cancelled() => Err(FailureReason::Cancelled),
            res = self.remote.fetch(item) => res.map_err(|e| FailureReason::Fetch(e.to_string())),
        };
        let stream = match fetched {
            Ok(stream) => stream,
            Err(reason) => {
                // Nothing was written; don't leave an artifact the resume check could trust.
                drop(file);
                if let Err(e) = self.local.remove(dest).await {
                    warn!("Failed to remove {} after failed fetch: {}", dest, e);
                }
                return SyncOutcome::Failed(reason);
            }
        };

        self.emit(SyncEvent::Started {
            name: item.name.clone(),
            total_bytes: item.size,
        })
        .await;

        // A partial file is left in place on error; its size won't match next time.
        let copied = tokio::select! {
            _ = self.cancel.cancelled() => Err(FailureReason::Cancelled),
            res = self.copy(item, stream, &mut file) => res,
        };
        drop(file);
        let written = match copied {
            Ok(n) => n,
            Err(reason) => return SyncOutcome::Failed(reason),
        };
        if written != item.size {
            return SyncOutcome::Failed(FailureReason::Incomplete {
                expected: item.size,
                written,
            });
        }

        if self.delete_after_sync {
            info!("Deleting {}", item.name);
            return self.delete(item).await;
        }
        SyncOutcome::Downloaded
    }

    async fn copy(
        &self,
        item: &Item,
        mut stream: ItemStream,
        file: &mut LocalWriter,
    ) -> Result<u64, FailureReason> {
        let mut written = 0u64;
        let mut accumulated = 0u64;
        let mut last_emit = Instant::now();

        while let Some(chunk) = stream.next().await {
            let chunk = chunk.map_err(|e| FailureReason::Copy(e.to_string()))?;
            file.write_all(&chunk)
                .await
                .map_err(|e| FailureReason::Copy(e.to_string()))?;

            let len = chunk.len() as u64;
            written += len;
            accumulated += len;
            if accumulated >= PROGRESS_EMIT_BYTES
                || last_emit.elapsed() >= PROGRESS_EMIT_INTERVAL
            {
                self.progress(item, accumulated).await;
                accumulated = 0;
                last_emit = Instant::now();
            }
        }
        if accumulated > 0 {
            self.progress(item, accumulated).await;
        }

        file.shutdown()
            .await
            .map_err(|e| FailureReason::Copy(e.to_string()))?;
        Ok(written)
    }

    async fn delete(&self, item: &Item) -> SyncOutcome {
        tokio::select! {
            _ = self.cancel.cancelled() => SyncOutcome::Failed(FailureReason::Cancelled),
            res = self.remote.delete(item) => match res {
                Ok(()) => SyncOutcome::Deleted,
                Err(e) => SyncOutcome::Failed(FailureReason::Delete(e.to_string())),
            },
        }
    }

    async fn progress(&self, item: &Item, bytes_delta: u64) {
        self.emit(SyncEvent::Progress {
            name: item.name.clone(),
            bytes_delta,
        })
        .await;
    }

    async fn emit(&self, event: SyncEvent) {
        if let Some(tx) = &self.tx {
            let _ = tx.send(event).await;
        }
    }
}
