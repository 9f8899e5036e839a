//! In-memory reference backend.
//!
//! Keeps the full version history of every key so historical reads and
//! snapshot-consistent list paging work. All writes are serialized by one
//! lock, which also makes version assignment and commit order identical.

use std::collections::BTreeMap;
use std::collections::HashMap;
use std::ops::Bound;
use std::sync::Arc;

use parking_lot::Mutex;
use parking_lot::RwLock;
use tokio::sync::mpsc;
use tonic::async_trait;
use tracing::debug;
use tracing::trace;
use tracing::warn;

use crate::access::ItemChecker;
use crate::config::ServerConfig;
use crate::bulk::BulkRequestIterator;
use crate::bulk::BulkSettings;
use crate::core::CollectionKey;
use crate::core::Operation;
use crate::core::ResourceObject;
use crate::core::VersionAssigner;
use crate::core::WriteEvent;
use crate::core::WrittenEvent;
use crate::proto::BulkAction;
use crate::proto::BulkResponse;
use crate::proto::BulkSummary;
use crate::proto::ErrorResult;
use crate::proto::ListRequest;
use crate::proto::ListResponse;
use crate::proto::ResourceKey;
use crate::proto::ResourceWrapper;
use crate::proto::WatchEventType;
use crate::storage::BackendReadResponse;
use crate::storage::BulkProcessingBackend;
use crate::storage::ContinueToken;
use crate::storage::ResourceStats;
use crate::storage::StorageBackend;
use crate::utils::time::now_millis;
use crate::Error;
use crate::Result;
use crate::StorageError;

/// Buffer of each change stream handed out by `watch_write_events`
const CHANGE_STREAM_BUFFER: usize = 10_000;

/// Marks events written by a bulk rebuild so watchers can skip them
const BULK_PREVIOUS_RV: i64 = -1;

#[derive(Debug, Clone)]
struct StoredVersion {
    resource_version: i64,
    value: Vec<u8>,
    folder: String,
    deleted: bool,
}

type History = BTreeMap<ResourceKey, Vec<StoredVersion>>;

#[derive(Debug)]
pub struct MemoryBackend {
    versions: VersionAssigner,
    data: RwLock<History>,
    // Ordered fan-out into each change stream; see `watch_write_events`
    watchers: Mutex<Vec<mpsc::UnboundedSender<Arc<WrittenEvent>>>>,
}

impl Default for MemoryBackend {
    fn default() -> Self {
        Self::new(0)
    }
}

impl MemoryBackend {
    /// `seed` is the version the first write builds upon
    pub fn new(seed: i64) -> Self {
        Self {
            versions: VersionAssigner::new(seed),
            data: RwLock::new(BTreeMap::new()),
            watchers: Mutex::new(Vec::new()),
        }
    }

    /// Seeds the version counter from `server.initial_resource_version`
    pub fn from_config(config: &ServerConfig) -> Self {
        Self::new(config.initial_resource_version)
    }

    pub fn current_version(&self) -> i64 {
        self.versions.current()
    }

    fn notify(
        &self,
        events: Vec<WrittenEvent>,
    ) {
        if events.is_empty() {
            return;
        }
        let mut watchers = self.watchers.lock();
        for event in events {
            let event = Arc::new(event);
            watchers.retain(|tx| tx.send(event.clone()).is_ok());
        }
    }

    fn commit(
        &self,
        data: &mut History,
        key: &ResourceKey,
        event_type: WatchEventType,
        value: Vec<u8>,
        folder: String,
        previous_rv: i64,
    ) -> WrittenEvent {
        let resource_version = self.versions.next();
        data.entry(key.clone()).or_default().push(StoredVersion {
            resource_version,
            value: value.clone(),
            folder: folder.clone(),
            deleted: event_type == WatchEventType::Deleted,
        });
        WrittenEvent {
            key: key.clone(),
            event_type,
            value,
            folder,
            resource_version,
            timestamp: now_millis(),
            previous_rv,
        }
    }
}

fn latest(history: &[StoredVersion]) -> Option<&StoredVersion> {
    history.last()
}

/// Newest version at or below `rv`; `rv` 0 means the newest overall
fn at_version(
    history: &[StoredVersion],
    rv: i64,
) -> Option<&StoredVersion> {
    if rv == 0 {
        return latest(history);
    }
    history.iter().rev().find(|v| v.resource_version <= rv)
}

fn live(history: &[StoredVersion]) -> Option<&StoredVersion> {
    latest(history).filter(|v| !v.deleted)
}

fn collection_count(
    data: &History,
    collection: &CollectionKey,
) -> i64 {
    data.iter()
        .filter(|(key, history)| collection.contains(key) && live(history).is_some())
        .count() as i64
}

/// Inverse of the `ns/group/resource/name` display form
fn key_from_token(token: &str) -> Option<ResourceKey> {
    let mut parts = token.splitn(4, '/');
    Some(ResourceKey::new(parts.next()?, parts.next()?, parts.next()?, parts.next()?))
}

fn folder_of(value: &[u8]) -> String {
    ResourceObject::from_slice(value)
        .map(|obj| obj.folder().to_string())
        .unwrap_or_default()
}

#[async_trait]
impl StorageBackend for MemoryBackend {
    async fn write_event(
        &self,
        event: WriteEvent,
    ) -> Result<i64> {
        if let Some(status) = &event.status {
            return Err(Error::Validation(status.clone()));
        }
        let folder = event.folder().to_string();

        let mut data = self.data.write();
        let current = data.get(&event.key).and_then(|h| live(h)).map(|v| v.resource_version);
        match (event.operation, current) {
            (Operation::Created, Some(_)) => {
                return Err(StorageError::AlreadyExists(event.key.to_string()).into());
            }
            (Operation::Updated | Operation::Deleted, None) => {
                return Err(StorageError::NotFound(event.key.to_string()).into());
            }
            (Operation::Updated | Operation::Deleted, Some(rv)) if rv != event.previous_rv => {
                debug!(key = %event.key, stored = rv, expected = event.previous_rv, "compare and swap failed");
                return Err(StorageError::OptimisticLockFailed.into());
            }
            _ => {}
        }
        let written = self.commit(
            &mut data,
            &event.key,
            event.operation.event_type(),
            event.value,
            folder,
            event.previous_rv,
        );

        let rv = written.resource_version;
        trace!(key = %written.key, rv, "event written");
        // still under the write lock so change streams see commit order
        self.notify(vec![written]);
        Ok(rv)
    }

    async fn read(
        &self,
        key: &ResourceKey,
        resource_version: i64,
    ) -> Result<BackendReadResponse> {
        let data = self.data.read();
        let found = data
            .get(key)
            .and_then(|h| at_version(h, resource_version))
            .filter(|v| !v.deleted)
            .ok_or_else(|| Error::from(StorageError::NotFound(key.to_string())))?;
        Ok(BackendReadResponse {
            key: key.clone(),
            resource_version: found.resource_version,
            value: found.value.clone(),
            folder: found.folder.clone(),
        })
    }

    async fn prepare_list(
        &self,
        request: &ListRequest,
        max_page_bytes: usize,
        filter: ItemChecker,
    ) -> Result<ListResponse> {
        let key = request.key.clone().unwrap_or_default();
        let collection = key.collection();
        let data = self.data.read();

        let (list_rv, start_after) = match request.next_page_token.as_str() {
            "" => (self.versions.current(), None),
            token => {
                let token = ContinueToken::decode(token).map_err(|_| {
                    Error::Validation(ErrorResult::bad_request("invalid continue token").with_field("next_page_token"))
                })?;
                let after = key_from_token(&token.start_after).ok_or_else(|| {
                    Error::Validation(ErrorResult::bad_request("invalid continue token").with_field("next_page_token"))
                })?;
                (token.resource_version, Some(after))
            }
        };
        let limit = usize::try_from(request.limit).unwrap_or(0).max(1);

        let mut response = ListResponse {
            resource_version: list_rv,
            ..Default::default()
        };
        let mut bytes = 0;
        let mut last_key: Option<&ResourceKey> = None;
        let lower = match &start_after {
            Some(after) => Bound::Excluded(after),
            None => Bound::Unbounded,
        };
        for (item_key, history) in data.range((lower, Bound::Unbounded)) {
            let matches = if collection.namespace.is_empty() {
                item_key.group == collection.group && item_key.resource == collection.resource
            } else {
                collection.contains(item_key)
            };
            if !matches || (!key.name.is_empty() && item_key.name != key.name) {
                continue;
            }
            let Some(version) = at_version(history, list_rv).filter(|v| !v.deleted) else {
                continue;
            };
            if !filter(&item_key.namespace, &item_key.name, &version.folder) {
                continue;
            }

            if response.items.len() >= limit || (bytes >= max_page_bytes && !response.items.is_empty()) {
                let token = ContinueToken {
                    resource_version: list_rv,
                    start_after: last_key.map(|k| k.to_string()).unwrap_or_default(),
                };
                response.next_page_token = token.encode()?;
                break;
            }
            bytes += version.value.len();
            response.items.push(ResourceWrapper {
                resource_version: version.resource_version,
                value: version.value.clone(),
            });
            last_key = Some(item_key);
        }
        Ok(response)
    }

    async fn watch_write_events(&self) -> Result<mpsc::Receiver<Arc<WrittenEvent>>> {
        let (tx, rx) = mpsc::channel(CHANGE_STREAM_BUFFER);
        let (ordered_tx, mut ordered_rx) = mpsc::unbounded_channel::<Arc<WrittenEvent>>();
        self.watchers.lock().push(ordered_tx);

        // writers never wait on a change stream reader
        tokio::spawn(async move {
            while let Some(event) = ordered_rx.recv().await {
                if tx.send(event).await.is_err() {
                    debug!("change stream reader went away");
                    break;
                }
            }
        });
        Ok(rx)
    }

    async fn resource_stats(
        &self,
        namespace: &str,
        min_count: i64,
    ) -> Result<Vec<ResourceStats>> {
        let data = self.data.read();
        let mut stats: BTreeMap<CollectionKey, ResourceStats> = BTreeMap::new();
        for (key, history) in data.iter() {
            if !namespace.is_empty() && key.namespace != namespace {
                continue;
            }
            let collection = key.collection();
            let entry = stats.entry(collection.clone()).or_insert_with(|| ResourceStats {
                collection,
                count: 0,
                resource_version: 0,
            });
            if let Some(last) = latest(history) {
                entry.resource_version = entry.resource_version.max(last.resource_version);
            }
            if live(history).is_some() {
                entry.count += 1;
            }
        }
        Ok(stats.into_values().filter(|s| s.count >= min_count).collect())
    }
}

#[async_trait]
impl BulkProcessingBackend for MemoryBackend {
    async fn process_bulk(
        &self,
        settings: &BulkSettings,
        iter: &mut dyn BulkRequestIterator,
    ) -> BulkResponse {
        // staged per collection; later items win over earlier ones of the same key
        let mut staged: HashMap<CollectionKey, BTreeMap<ResourceKey, Vec<u8>>> = settings
            .collections
            .iter()
            .map(|c| (c.clone(), BTreeMap::new()))
            .collect();
        let mut processed = 0;

        while iter.next().await {
            if iter.rollback_requested() {
                warn!("bulk rollback requested, discarding staged items");
                return BulkResponse {
                    error: Some(ErrorResult::bad_request("bulk stream rolled back")),
                    ..Default::default()
                };
            }
            let Some(req) = iter.request() else {
                continue;
            };
            let Some(key) = req.key.clone() else {
                continue;
            };
            let Some(items) = staged.get_mut(&key.collection()) else {
                return BulkResponse {
                    error: Some(ErrorResult::bad_request(format!("{key} is not part of the bulk collections"))),
                    ..Default::default()
                };
            };
            processed += 1;
            if req.action() == BulkAction::Deleted {
                items.remove(&key);
            } else {
                items.insert(key, req.value.clone());
            }
        }
        if iter.rollback_requested() {
            return BulkResponse {
                error: Some(ErrorResult::bad_request("bulk stream rolled back")),
                ..Default::default()
            };
        }

        let mut written = Vec::new();
        let mut summary = Vec::new();
        {
            let mut data = self.data.write();
            for collection in &settings.collections {
                let items = staged.remove(collection).unwrap_or_default();
                let previous_count = collection_count(&data, collection);

                let stale: Vec<ResourceKey> = data
                    .iter()
                    .filter(|(key, history)| {
                        collection.contains(key) && live(history).is_some() && !items.contains_key(*key)
                    })
                    .map(|(key, _)| key.clone())
                    .collect();
                for key in stale {
                    written.push(self.commit(
                        &mut data,
                        &key,
                        WatchEventType::Deleted,
                        Vec::new(),
                        String::new(),
                        BULK_PREVIOUS_RV,
                    ));
                }

                let count = items.len() as i64;
                for (key, value) in items {
                    let event_type = match data.get(&key).and_then(|h| live(h)) {
                        Some(_) => WatchEventType::Modified,
                        None => WatchEventType::Added,
                    };
                    let folder = folder_of(&value);
                    written.push(self.commit(&mut data, &key, event_type, value, folder, BULK_PREVIOUS_RV));
                }

                summary.push(BulkSummary {
                    namespace: collection.namespace.clone(),
                    group: collection.group.clone(),
                    resource: collection.resource.clone(),
                    count,
                    previous_count,
                    resource_version: self.versions.current(),
                });
            }
            self.notify(written);
        }

        debug!(processed, collections = summary.len(), "bulk rebuild committed");
        BulkResponse {
            error: None,
            processed,
            summary,
        }
    }
}
