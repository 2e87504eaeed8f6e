pub mod sync;

// Re-export core engine components
pub use sync::{
    default_engine, FsLocalTarget, HttpRemoteStore, ItemStream, LocalTarget, LocalWriter,
    RemoteStore, SyncEngine, SyncError, SyncEvent, SyncReport, SyncRequest,
};
