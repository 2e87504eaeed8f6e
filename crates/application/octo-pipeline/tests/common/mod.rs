#![allow(dead_code)]

use bytes::Bytes;
use camino::Utf8PathBuf;
use futures::stream::{self, StreamExt};
use octo_core::Item;
use octo_pipeline::{FsLocalTarget, ItemStream, RemoteStore, SyncEngine, SyncError};
use std::collections::{HashMap, HashSet};
use std::sync::atomic::{AtomicUsize, Ordering};
use std::sync::{Arc, Mutex};
use std::time::Duration;

/// Long enough for the engine to report progress on the first chunk.
const STALL_PAUSE: Duration = Duration::from_millis(150);

/// How the fake server treats one item.
#[derive(Clone)]
pub enum Behavior {
    Serve(Vec<u8>),
    /// `fetch` itself fails.
    FailFetch,
    /// Sends the given prefix, then the stream errors.
    BreakAfter(Vec<u8>),
    /// `fetch` never returns.
    Hang,
    /// Sends the given prefix after a short pause, then the body stalls forever.
    Stall(Vec<u8>),
}

/// Decrements the in-flight counter when the body is dropped.
struct ActiveGuard(Arc<AtomicUsize>);

impl Drop for ActiveGuard {
    fn drop(&mut self) {
        self.0.fetch_sub(1, Ordering::SeqCst);
    }
}

#[derive(Default)]
pub struct FakeStore {
    pub items: Mutex<Vec<Item>>,
    behaviors: Mutex<HashMap<String, Behavior>>,
    failing_deletes: Mutex<HashSet<String>>,
    pub fetches: Mutex<Vec<String>>,
    pub deletes: Mutex<Vec<String>>,
    fail_list: bool,
    delay: Duration,
    active: Arc<AtomicUsize>,
    pub max_active: AtomicUsize,
}

impl FakeStore {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn failing_list() -> Self {
        Self {
            fail_list: true,
            ..Self::default()
        }
    }

    pub fn with_delay(delay: Duration) -> Self {
        Self {
            delay,
            ..Self::default()
        }
    }

    /// Register an item whose listed size matches its contents.
    pub fn serve(&self, name: &str, contents: &[u8]) -> Item {
        self.add(name, contents.len() as u64, Behavior::Serve(contents.to_vec()))
    }

    pub fn add(&self, name: &str, size: u64, behavior: Behavior) -> Item {
        let item = Item::new(name, size, format!("/downloads/timelapse/{name}"));
        self.items.lock().unwrap().push(item.clone());
        self.behaviors
            .lock()
            .unwrap()
            .insert(name.to_string(), behavior);
        item
    }

    pub fn set_behavior(&self, name: &str, behavior: Behavior) {
        self.behaviors
            .lock()
            .unwrap()
            .insert(name.to_string(), behavior);
    }

    pub fn fail_delete(&self, name: &str, fail: bool) {
        let mut set = self.failing_deletes.lock().unwrap();
        if fail {
            set.insert(name.to_string());
        } else {
            set.remove(name);
        }
    }

    pub fn listed(&self) -> Vec<Item> {
        self.items.lock().unwrap().clone()
    }

    pub fn fetch_count(&self) -> usize {
        self.fetches.lock().unwrap().len()
    }

    pub fn deleted(&self) -> Vec<String> {
        let mut d = self.deletes.lock().unwrap().clone();
        d.sort();
        d
    }

    /// Marks one remote call as in flight until the guard drops.
    fn enter(&self) -> ActiveGuard {
        let now = self.active.fetch_add(1, Ordering::SeqCst) + 1;
        self.max_active.fetch_max(now, Ordering::SeqCst);
        ActiveGuard(self.active.clone())
    }

    async fn pause(&self) {
        if !self.delay.is_zero() {
            tokio::time::sleep(self.delay).await;
        }
    }

    pub fn reset_counters(&self) {
        self.fetches.lock().unwrap().clear();
        self.deletes.lock().unwrap().clear();
    }
}

#[async_trait::async_trait]
impl RemoteStore for FakeStore {
    async fn list(&self) -> Result<Vec<Item>, SyncError> {
        if self.fail_list {
            return Err(SyncError::Remote("connection refused".into()));
        }
        Ok(self.listed())
    }

    async fn fetch(&self, item: &Item) -> Result<ItemStream, SyncError> {
        self.fetches.lock().unwrap().push(item.name.clone());
        let behavior = self
            .behaviors
            .lock()
            .unwrap()
            .get(&item.name)
            .cloned()
            .ok_or_else(|| SyncError::Remote(format!("404 {}", item.name)))?;

        let guard = self.enter();
        self.pause().await;

        match behavior {
            Behavior::Serve(data) => {
                let chunks: Vec<Result<Bytes, SyncError>> = data
                    .chunks(4)
                    .map(|c| Ok(Bytes::copy_from_slice(c)))
                    .collect();
                Ok(guarded(chunks, guard))
            }
            Behavior::BreakAfter(prefix) => {
                let chunks = vec![
                    Ok(Bytes::from(prefix)),
                    Err(SyncError::Remote("connection reset".into())),
                ];
                Ok(guarded(chunks, guard))
            }
            Behavior::Stall(prefix) => {
                let head = stream::once(async move {
                    tokio::time::sleep(STALL_PAUSE).await;
                    Ok::<_, SyncError>(Bytes::from(prefix))
                });
                Ok(hold(head.chain(stream::pending()).boxed(), guard))
            }
            Behavior::FailFetch => Err(SyncError::Remote(format!("500 {}", item.name))),
            Behavior::Hang => {
                futures::future::pending::<()>().await;
                unreachable!()
            }
        }
    }

    async fn delete(&self, item: &Item) -> Result<(), SyncError> {
        let _guard = self.enter();
        self.pause().await;
        if self.failing_deletes.lock().unwrap().contains(&item.name) {
            return Err(SyncError::Remote(format!("409 {}", item.name)));
        }
        self.deletes.lock().unwrap().push(item.name.clone());
        Ok(())
    }
}

/// Forwards `body`, keeping `guard` alive until the stream is dropped.
fn hold(body: ItemStream, guard: ActiveGuard) -> ItemStream {
    stream::unfold((body, guard), |(mut body, guard)| async move {
        body.next().await.map(|chunk| (chunk, (body, guard)))
    })
    .boxed()
}

fn guarded(chunks: Vec<Result<Bytes, SyncError>>, guard: ActiveGuard) -> ItemStream {
    hold(stream::iter(chunks).boxed(), guard)
}

pub fn engine(store: Arc<FakeStore>) -> SyncEngine {
    SyncEngine::new(store, Arc::new(FsLocalTarget))
}

pub fn temp_root() -> (tempfile::TempDir, Utf8PathBuf) {
    let dir = tempfile::tempdir().unwrap();
    let root = Utf8PathBuf::from_path_buf(dir.path().to_path_buf()).unwrap();
    (dir, root)
}
