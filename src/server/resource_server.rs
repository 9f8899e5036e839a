use std::sync::atomic::AtomicI64;
use std::sync::atomic::Ordering;
use std::sync::Arc;

use tokio::sync::OnceCell;
use tokio_stream::Stream;
use tokio_util::sync::CancellationToken;
use tonic::metadata::MetadataMap;
use tonic::Status;
use tracing::debug;
use tracing::error;
use tracing::info;
use tracing::trace;
use tracing::warn;

use super::ResourceServerBuilder;
use crate::access::Authorizer;
use crate::access::AuthorizerExt;
use crate::access::RequestContext;
use crate::bulk::BulkRunner;
use crate::bulk::BulkSettings;
use crate::config::StoreConfig;
use crate::core::EventValidator;
use crate::core::ResourceObject;
use crate::core::WriteEvent;
use crate::core::WrittenEvent;
use crate::proto::BulkRequest;
use crate::proto::BulkResponse;
use crate::proto::CreateRequest;
use crate::proto::CreateResponse;
use crate::proto::DeleteRequest;
use crate::proto::DeleteResponse;
use crate::proto::ErrorResult;
use crate::proto::ListRequest;
use crate::proto::ListResponse;
use crate::proto::ReadRequest;
use crate::proto::ReadResponse;
use crate::proto::ResourceKey;
use crate::proto::UpdateRequest;
use crate::proto::UpdateResponse;
use crate::search::SearchIndex;
use crate::storage::BackendReadResponse;
use crate::storage::BulkProcessingBackend;
use crate::storage::ResourceStats;
use crate::storage::StorageBackend;
use crate::watch::Broadcaster;
use crate::BroadcastError;
use crate::Error;
use crate::Result;
use crate::StorageMetrics;

/// Outcome of a unary call before it is folded into its response message
type Outcome<T> = std::result::Result<T, ErrorResult>;

/// Entry point of the store: authorizes, validates and orders every write,
/// and streams committed changes to watchers.
pub struct ResourceServer {
    pub(super) backend: Arc<dyn StorageBackend>,
    pub(super) bulk_backend: Option<Arc<dyn BulkProcessingBackend>>,
    pub(super) authorizer: Arc<dyn Authorizer>,
    pub(super) search: Option<Arc<dyn SearchIndex>>,
    pub(super) validator: EventValidator,
    pub(super) broadcaster: Broadcaster<Arc<WrittenEvent>>,
    pub(super) metrics: Arc<StorageMetrics>,
    pub(super) config: StoreConfig,
    pub(super) token: CancellationToken,
    /// First outcome of `init`, kept for every later caller
    pub(super) started: OnceCell<std::result::Result<(), String>>,
    /// Newest version the change stream delivered
    pub(super) most_recent_rv: Arc<AtomicI64>,
}

impl ResourceServer {
    pub fn builder(
        backend: Arc<dyn StorageBackend>,
        authorizer: Arc<dyn Authorizer>,
    ) -> ResourceServerBuilder {
        ResourceServerBuilder::new(backend, authorizer)
    }

    pub fn config(&self) -> &StoreConfig {
        &self.config
    }

    pub fn metrics(&self) -> &Arc<StorageMetrics> {
        &self.metrics
    }

    /// Connects the broadcaster to the backend change stream.
    ///
    /// Only the first call does any work; watch calls it on demand.
    pub async fn init(&self) -> Result<()> {
        self.check_running()?;
        let outcome = self
            .started
            .get_or_init(|| async {
                self.start_broadcaster().await.map_err(|e| {
                    error!("resource server init failed: {:?}", e);
                    e.to_string()
                })
            })
            .await;
        outcome.clone().map_err(|e| BroadcastError::Connect(e).into())
    }

    async fn start_broadcaster(&self) -> Result<()> {
        let backend = self.backend.clone();
        let most_recent = self.most_recent_rv.clone();
        let token = self.token.clone();

        self.broadcaster
            .start(move |out| async move {
                let mut changes = backend.watch_write_events().await?;
                tokio::spawn(async move {
                    loop {
                        let event = tokio::select! {
                            _ = token.cancelled() => break,
                            event = changes.recv() => match event {
                                Some(event) => event,
                                None => break,
                            },
                        };
                        // rebuilt collections are not streamed
                        if event.previous_rv < 0 {
                            continue;
                        }
                        trace!(key = %event.key, rv = event.resource_version, "streaming event");
                        most_recent.store(event.resource_version, Ordering::Release);
                        if out.send(event).await.is_err() {
                            break;
                        }
                    }
                    debug!("change stream forwarding stopped");
                });
                Ok::<_, Error>(())
            })
            .await?;
        info!("resource server watching backend changes");
        Ok(())
    }

    /// Stops the broadcaster; every later call fails.
    pub fn stop(&self) {
        info!("stopping resource server");
        self.token.cancel();
    }

    pub fn is_stopped(&self) -> bool {
        self.token.is_cancelled()
    }

    pub(super) fn check_running(&self) -> Result<()> {
        if self.token.is_cancelled() {
            return Err(Error::Fatal("resource server is stopped".to_string()));
        }
        Ok(())
    }

    pub async fn create(
        &self,
        ctx: &RequestContext,
        req: CreateRequest,
    ) -> CreateResponse {
        match self.try_create(ctx, req).await {
            Ok(resource_version) => CreateResponse {
                error: None,
                resource_version,
            },
            Err(error) => CreateResponse {
                error: Some(error),
                resource_version: 0,
            },
        }
    }

    async fn try_create(
        &self,
        ctx: &RequestContext,
        req: CreateRequest,
    ) -> Outcome<i64> {
        self.check_running()?;
        let requester = ctx.requester()?;
        let key = request_key(req.key)?;
        self.authorizer
            .can_create(requester, &key, &payload_folder(&req.value))
            .await?;

        if !key.name.is_empty() {
            match self.backend.read(&key, 0).await {
                Ok(_) => return Err(ErrorResult::already_exists(format!("{key} already exists"))),
                Err(e) if e.is_not_found() => {}
                Err(e) => return Err(e.into()),
            }
        }

        let event = self
            .validator
            .prepare_create(requester, &key, &req.value)
            .into_result()?;
        self.write(event).await
    }

    pub async fn update(
        &self,
        ctx: &RequestContext,
        req: UpdateRequest,
    ) -> UpdateResponse {
        match self.try_update(ctx, req).await {
            Ok(resource_version) => UpdateResponse {
                error: None,
                resource_version,
            },
            Err(error) => UpdateResponse {
                error: Some(error),
                resource_version: 0,
            },
        }
    }

    async fn try_update(
        &self,
        ctx: &RequestContext,
        req: UpdateRequest,
    ) -> Outcome<i64> {
        self.check_running()?;
        let requester = ctx.requester()?;
        let key = request_key(req.key)?;
        if req.resource_version < 0 {
            return Err(
                ErrorResult::bad_request("update must include the previous version").with_field("resourceVersion")
            );
        }
        self.authorizer
            .can_update(requester, &key, &payload_folder(&req.value))
            .await?;

        let current = match self.backend.read(&key, 0).await {
            Ok(current) => current,
            Err(e) if e.is_not_found() => return Err(ErrorResult::bad_request("current value does not exist")),
            Err(e) => return Err(e.into()),
        };
        if req.resource_version > 0 && req.resource_version != current.resource_version {
            debug!(key = %key, requested = req.resource_version, current = current.resource_version, "stale update");
            return Err(ErrorResult::optimistic_locking_failed());
        }

        // moving between folders needs update on the old one and create on the new one
        let new_folder = payload_folder(&req.value);
        if current.folder != new_folder {
            self.authorizer.can_update(requester, &key, &current.folder).await?;
            self.authorizer.can_create(requester, &key, &new_folder).await?;
        }

        let event = self
            .validator
            .prepare_update(requester, &key, &req.value, &current.value, current.resource_version)
            .into_result()?;
        self.write(event).await
    }

    pub async fn delete(
        &self,
        ctx: &RequestContext,
        req: DeleteRequest,
    ) -> DeleteResponse {
        match self.try_delete(ctx, req).await {
            Ok(resource_version) => DeleteResponse {
                error: None,
                resource_version,
            },
            Err(error) => DeleteResponse {
                error: Some(error),
                resource_version: 0,
            },
        }
    }

    async fn try_delete(
        &self,
        ctx: &RequestContext,
        req: DeleteRequest,
    ) -> Outcome<i64> {
        self.check_running()?;
        let requester = ctx.requester()?;
        let key = request_key(req.key)?;
        if req.resource_version < 0 {
            return Err(
                ErrorResult::bad_request("delete must include the previous version").with_field("resourceVersion")
            );
        }
        self.authorizer.can_delete(requester, &key, "").await?;

        let current = self.backend.read(&key, 0).await?;
        if !current.folder.is_empty() {
            self.authorizer.can_delete(requester, &key, &current.folder).await?;
        }
        if req.resource_version > 0 && req.resource_version != current.resource_version {
            return Err(ErrorResult::optimistic_locking_failed());
        }

        let event = self
            .validator
            .prepare_delete(requester, &key, req.resource_version, &current.value, current.resource_version)
            .into_result()?;
        self.write(event).await
    }

    async fn write(
        &self,
        event: WriteEvent,
    ) -> Outcome<i64> {
        let operation = event.operation;
        let key = event.key.clone();
        let previous_rv = event.previous_rv;

        let result = self.backend.write_event(event).await;
        self.metrics.record_write(operation.as_str(), result.is_ok());
        match result {
            Ok(rv) => {
                debug!(key = %key, %operation, rv, previous_rv, "resource written");
                Ok(rv)
            }
            Err(e) => {
                warn!(key = %key, %operation, previous_rv, "write failed: {:?}", e);
                Err(e.into())
            }
        }
    }

    pub async fn read(
        &self,
        ctx: &RequestContext,
        req: ReadRequest,
    ) -> ReadResponse {
        match self.try_read(ctx, req).await {
            Ok(found) => ReadResponse {
                error: None,
                resource_version: found.resource_version,
                value: found.value,
                folder: found.folder,
            },
            Err(error) => ReadResponse {
                error: Some(error),
                ..Default::default()
            },
        }
    }

    async fn try_read(
        &self,
        ctx: &RequestContext,
        req: ReadRequest,
    ) -> Outcome<BackendReadResponse> {
        self.check_running()?;
        let requester = ctx.requester()?;
        let key = request_key(req.key)?;
        if req.resource_version < 0 {
            return Err(ErrorResult::bad_request("invalid resource version").with_field("resourceVersion"));
        }

        let checker = self.authorizer.read_checker(requester, &key).await?;
        let found = self.backend.read(&key, req.resource_version).await?;
        if !checker(&key.namespace, &key.name, &found.folder) {
            return Err(ErrorResult::forbidden(format!("not allowed to read {key}")));
        }
        Ok(found)
    }

    pub async fn list(
        &self,
        ctx: &RequestContext,
        req: ListRequest,
    ) -> ListResponse {
        self.try_list(ctx, req).await.unwrap_or_else(|error| ListResponse {
            error: Some(error),
            ..Default::default()
        })
    }

    async fn try_list(
        &self,
        ctx: &RequestContext,
        mut req: ListRequest,
    ) -> Outcome<ListResponse> {
        self.check_running()?;
        let requester = ctx.requester()?;
        let key = request_key(req.key.clone())?;
        if req.limit < 1 {
            req.limit = self.config.server.default_list_limit;
        }

        // no partial lists: a failing authorizer fails the whole call
        let filter = self.authorizer.list_filter(requester, &key).await?;
        let rsp = self
            .backend
            .prepare_list(&req, self.config.server.max_page_size_bytes, filter)
            .await?;
        if rsp.resource_version < 1 {
            error!(key = %key, rv = rsp.resource_version, "backend listed at an invalid version");
            return Err(ErrorResult::internal(format!(
                "invalid resource version for list: {}",
                rsp.resource_version
            )));
        }
        Ok(rsp)
    }

    /// Per collection counts for `namespace`, empty meaning all of them
    pub async fn resource_stats(
        &self,
        ctx: &RequestContext,
        namespace: &str,
        min_count: i64,
    ) -> Result<Vec<ResourceStats>> {
        self.check_running()?;
        ctx.requester()?;
        self.backend.resource_stats(namespace, min_count).await
    }

    /// Replaces the collections named in `metadata` with the items of
    /// `stream`, all or nothing.
    pub async fn bulk_process<S>(
        &self,
        ctx: &RequestContext,
        metadata: &MetadataMap,
        stream: S,
    ) -> BulkResponse
    where
        S: Stream<Item = std::result::Result<BulkRequest, Status>> + Send + Unpin,
    {
        let response = self
            .try_bulk_process(ctx, metadata, stream)
            .await
            .unwrap_or_else(|error| BulkResponse {
                error: Some(error),
                ..Default::default()
            });
        self.metrics.record_bulk(response.error.is_none());
        if let Some(e) = &response.error {
            warn!(code = e.code, "bulk request failed: {}", e.message);
        }
        response
    }

    async fn try_bulk_process<S>(
        &self,
        ctx: &RequestContext,
        metadata: &MetadataMap,
        stream: S,
    ) -> Outcome<BulkResponse>
    where
        S: Stream<Item = std::result::Result<BulkRequest, Status>> + Send + Unpin,
    {
        self.check_running()?;
        let Some(bulk_backend) = &self.bulk_backend else {
            return Err(ErrorResult::not_implemented("backend does not support bulk processing"));
        };
        let settings = BulkSettings::from_metadata(metadata)?;

        let validator = match (settings.skip_validation, self.config.bulk.skip_validation_allowed) {
            (true, true) => None,
            (true, false) => {
                warn!("bulk stream asked to skip validation, which is not allowed");
                Some(self.validator.clone())
            }
            (false, _) => Some(self.validator.clone()),
        };

        let mut runner = BulkRunner::prepare(ctx, &settings, self.authorizer.as_ref(), validator, stream).await?;
        let response = bulk_backend.process_bulk(&settings, &mut runner).await;
        info!(
            processed = response.processed,
            accepted = runner.accepted(),
            collections = settings.collections.len(),
            "bulk stream processed"
        );
        Ok(runner.finish(response, self.search.as_deref()).await)
    }
}

/// Present and carrying group and resource
fn request_key(key: Option<ResourceKey>) -> Outcome<ResourceKey> {
    let key = key.ok_or_else(|| ErrorResult::bad_request("missing resource key").with_field("key"))?;
    key.verify()?;
    Ok(key)
}

/// Folder named by a payload, empty when it cannot be decoded
fn payload_folder(value: &[u8]) -> String {
    ResourceObject::from_slice(value)
        .map(|obj| obj.folder().to_string())
        .unwrap_or_default()
}
