use std::sync::atomic::AtomicI64;
use std::sync::Arc;

use tokio::sync::OnceCell;
use tokio_util::sync::CancellationToken;
use tracing::debug;

use super::ResourceServer;
use crate::access::Authorizer;
use crate::access::WriteAccessHooks;
use crate::config::StoreConfig;
use crate::core::EventValidator;
use crate::search::SearchIndex;
use crate::storage::BulkProcessingBackend;
use crate::storage::StorageBackend;
use crate::utils::time::system_clock;
use crate::utils::time::Clock;
use crate::watch::Broadcaster;
use crate::Error;
use crate::Result;
use crate::StorageMetrics;

/// Assembles a [`ResourceServer`].
///
/// Only the backend and the authorizer are mandatory. Write hooks default
/// to the authorizer's folder and origin checks, metrics to an unshared
/// registry.
pub struct ResourceServerBuilder {
    backend: Arc<dyn StorageBackend>,
    authorizer: Arc<dyn Authorizer>,
    bulk_backend: Option<Arc<dyn BulkProcessingBackend>>,
    search: Option<Arc<dyn SearchIndex>>,
    write_hooks: Option<WriteAccessHooks>,
    clock: Option<Clock>,
    metrics: Option<Arc<StorageMetrics>>,
    config: StoreConfig,
    token: CancellationToken,
}

impl ResourceServerBuilder {
    pub fn new(
        backend: Arc<dyn StorageBackend>,
        authorizer: Arc<dyn Authorizer>,
    ) -> Self {
        Self {
            backend,
            authorizer,
            bulk_backend: None,
            search: None,
            write_hooks: None,
            clock: None,
            metrics: None,
            config: StoreConfig::default(),
            token: CancellationToken::new(),
        }
    }

    pub fn bulk_backend(
        mut self,
        bulk_backend: Arc<dyn BulkProcessingBackend>,
    ) -> Self {
        self.bulk_backend = Some(bulk_backend);
        self
    }

    pub fn search(
        mut self,
        search: Arc<dyn SearchIndex>,
    ) -> Self {
        self.search = Some(search);
        self
    }

    pub fn write_hooks(
        mut self,
        write_hooks: WriteAccessHooks,
    ) -> Self {
        self.write_hooks = Some(write_hooks);
        self
    }

    pub fn clock(
        mut self,
        clock: Clock,
    ) -> Self {
        self.clock = Some(clock);
        self
    }

    pub fn metrics(
        mut self,
        metrics: Arc<StorageMetrics>,
    ) -> Self {
        self.metrics = Some(metrics);
        self
    }

    pub fn config(
        mut self,
        config: StoreConfig,
    ) -> Self {
        self.config = config;
        self
    }

    /// Cancelling `token` stops the server the same way [`ResourceServer::stop`] does
    pub fn cancellation_token(
        mut self,
        token: CancellationToken,
    ) -> Self {
        self.token = token;
        self
    }

    pub fn build(self) -> Result<ResourceServer> {
        self.config.validate()?;

        let metrics = match self.metrics {
            Some(m) => m,
            None => Arc::new(StorageMetrics::standalone().map_err(|e| Error::Fatal(format!("metrics: {e}")))?),
        };
        let hooks = self
            .write_hooks
            .unwrap_or_else(|| WriteAccessHooks::from_authorizer(self.authorizer.clone()));
        let validator = EventValidator::new(hooks, self.clock.unwrap_or_else(system_clock));
        let broadcaster = Broadcaster::new(self.config.watch.clone(), self.token.child_token(), metrics.clone());

        debug!(
            bulk = self.bulk_backend.is_some(),
            search = self.search.is_some(),
            "resource server built"
        );
        Ok(ResourceServer {
            backend: self.backend,
            bulk_backend: self.bulk_backend,
            authorizer: self.authorizer,
            search: self.search,
            validator,
            broadcaster,
            metrics,
            config: self.config,
            token: self.token,
            started: OnceCell::new(),
            most_recent_rv: Arc::new(AtomicI64::new(0)),
        })
    }
}
