use std::sync::Arc;

#[cfg(test)]
use mockall::automock;
use serde::Deserialize;
use serde::Serialize;
use tokio::sync::mpsc;
use tonic::async_trait;

use crate::access::ItemChecker;
use crate::bulk::BulkRequestIterator;
use crate::bulk::BulkSettings;
use crate::core::CollectionKey;
use crate::core::WriteEvent;
use crate::core::WrittenEvent;
use crate::proto::BulkResponse;
use crate::proto::ListRequest;
use crate::proto::ListResponse;
use crate::proto::ResourceKey;
use crate::Result;

/// Value of one key as seen by the backend
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct BackendReadResponse {
    pub key: ResourceKey,
    pub resource_version: i64,
    pub value: Vec<u8>,
    pub folder: String,
}

#[derive(Debug, Clone, PartialEq, Eq)]
pub struct ResourceStats {
    pub collection: CollectionKey,
    pub count: i64,
    /// Latest version written into the collection
    pub resource_version: i64,
}

/// Opaque list continuation, carried as JSON in `next_page_token`.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct ContinueToken {
    /// Version the first page was listed at
    pub resource_version: i64,
    /// Last key returned so far
    pub start_after: String,
}

impl ContinueToken {
    pub fn encode(&self) -> Result<String> {
        Ok(serde_json::to_string(self)?)
    }

    pub fn decode(token: &str) -> Result<Self> {
        Ok(serde_json::from_str(token)?)
    }
}

/// Persistence contract of the store.
///
/// `write_event` must close the race between the server's optimistic check
/// and the write itself: an update or delete only succeeds if the stored
/// version still equals `event.previous_rv`, and a create only if the key is
/// free. Returned versions are strictly increasing across all keys.
#[cfg_attr(test, automock)]
#[async_trait]
pub trait StorageBackend: Send + Sync + 'static {
    /// Persists `event` and returns the version assigned to it
    async fn write_event(
        &self,
        event: WriteEvent,
    ) -> Result<i64>;

    /// `resource_version` 0 reads the latest value. Deleted or missing keys
    /// fail with `StorageError::NotFound`.
    async fn read(
        &self,
        key: &ResourceKey,
        resource_version: i64,
    ) -> Result<BackendReadResponse>;

    /// One page of the collection addressed by `request.key`, with items
    /// rejected by `filter` left out.
    async fn prepare_list(
        &self,
        request: &ListRequest,
        max_page_bytes: usize,
        filter: ItemChecker,
    ) -> Result<ListResponse>;

    /// A fresh stream of every committed write. The backend closes it.
    async fn watch_write_events(&self) -> Result<mpsc::Receiver<Arc<WrittenEvent>>>;

    /// Per collection counts; `namespace` empty means all namespaces
    async fn resource_stats(
        &self,
        namespace: &str,
        min_count: i64,
    ) -> Result<Vec<ResourceStats>>;
}

/// Optional capability: all-or-nothing replacement of whole collections.
#[async_trait]
pub trait BulkProcessingBackend: Send + Sync + 'static {
    /// Consumes `iter` until it is exhausted. Whenever
    /// [`BulkRequestIterator::rollback_requested`] returns true nothing of
    /// this stream may be kept.
    async fn process_bulk(
        &self,
        settings: &BulkSettings,
        iter: &mut dyn BulkRequestIterator,
    ) -> BulkResponse;
}
