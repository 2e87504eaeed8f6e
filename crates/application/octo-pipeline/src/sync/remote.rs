use crate::sync::SyncError;
use bytes::Bytes;
use futures::stream::{BoxStream, StreamExt, TryStreamExt};
use octo_core::Item;
use octo_infra::OctoClient;

/// Body of one remote item, chunk by chunk.
pub type ItemStream = BoxStream<'static, Result<Bytes, SyncError>>;

#[async_trait::async_trait]
pub trait RemoteStore: Send + Sync {
    async fn list(&self) -> Result<Vec<Item>, SyncError>;
    /// Open the item's body. The returned stream should yield exactly `item.size` bytes.
    async fn fetch(&self, item: &Item) -> Result<ItemStream, SyncError>;
    async fn delete(&self, item: &Item) -> Result<(), SyncError>;
}

/// Timelapse videos on an OctoPrint server.
pub struct HttpRemoteStore {
    client: OctoClient,
}

impl HttpRemoteStore {
    pub fn new(client: OctoClient) -> Self {
        Self { client }
    }
}

#[async_trait::async_trait]
impl RemoteStore for HttpRemoteStore {
    async fn list(&self) -> Result<Vec<Item>, SyncError> {
        let (_config, files) = self
            .client
            .list_timelapses()
            .await
            .map_err(|e| SyncError::Remote(format!("listing timelapses failed: {e}")))?;
        Ok(files.iter().map(Item::from).collect())
    }

    async fn fetch(&self, item: &Item) -> Result<ItemStream, SyncError> {
        let stream = self
            .client
            .fetch_path(&item.remote_path)
            .await
            .map_err(|e| SyncError::Remote(e.to_string()))?;
        Ok(stream
            .map_err(|e| SyncError::Remote(e.to_string()))
            .boxed())
    }

    async fn delete(&self, item: &Item) -> Result<(), SyncError> {
        self.client
            .delete_timelapse(&item.name)
            .await
            .map_err(|e| SyncError::Remote(e.to_string()))
    }
}
