use std::sync::atomic::Ordering;
use std::sync::Arc;

use tokio::sync::mpsc;
use tonic::Status;
use tracing::debug;
use tracing::error;
use tracing::trace;
use tracing::warn;

use super::ResourceServer;
use crate::access::AuthorizerExt;
use crate::access::ItemChecker;
use crate::access::RequestContext;
use crate::core::WrittenEvent;
use crate::proto::ListRequest;
use crate::proto::ResourceKey;
use crate::proto::WatchEvent;
use crate::proto::WatchEventType;
use crate::proto::WatchRequest;
use crate::proto::WatchResource;
use crate::utils::time::now_millis;
use crate::watch::Subscription;
use crate::Error;
use crate::Result;

/// Sending side of a watch stream, as handed out by a server streaming RPC
pub type WatchSender = mpsc::Sender<std::result::Result<WatchEvent, Status>>;

impl ResourceServer {
    /// Streams changes of every key matching `req.key` into `tx`.
    ///
    /// Returns once the caller cancels, `tx` is closed, or the broadcaster
    /// terminates. Events are sent in version order and only if newer than
    /// the start version.
    pub async fn watch(
        &self,
        ctx: &RequestContext,
        req: WatchRequest,
        tx: WatchSender,
    ) -> Result<()> {
        let requester = ctx.requester()?;
        let key = req.key.clone().unwrap_or_default();
        key.verify().map_err(Error::Validation)?;
        self.init().await?;

        let checker = self.authorizer.list_filter(requester, &key).await?;

        // subscribe before backfilling so nothing written meanwhile is lost
        let mut subscription = self.broadcaster.subscribe(ctx).await?;
        let result = self
            .stream_changes(ctx, &req, &key, checker, &mut subscription, &tx)
            .await;
        self.broadcaster.unsubscribe(&subscription);
        result
    }

    async fn stream_changes(
        &self,
        ctx: &RequestContext,
        req: &WatchRequest,
        key: &ResourceKey,
        checker: ItemChecker,
        subscription: &mut Subscription<Arc<WrittenEvent>>,
        tx: &WatchSender,
    ) -> Result<()> {
        let since = if req.send_initial_events {
            let Some(initial_rv) = self.send_initial_events(key, checker.clone(), tx).await? else {
                return Ok(());
            };
            if req.allow_watch_bookmarks {
                let bookmark = WatchEvent {
                    timestamp: now_millis(),
                    event_type: WatchEventType::Bookmark as i32,
                    resource: Some(WatchResource {
                        value: Vec::new(),
                        version: initial_rv,
                    }),
                    previous: None,
                };
                if tx.send(Ok(bookmark)).await.is_err() {
                    return Ok(());
                }
            }
            initial_rv
        } else if req.since == 0 {
            self.current_version(key).await
        } else {
            req.since
        };
        debug!(key = %key, since, "watch started");

        loop {
            let event = tokio::select! {
                _ = ctx.cancel.cancelled() => return Ok(()),
                _ = tx.closed() => return Ok(()),
                event = subscription.recv() => match event {
                    Some(event) => event,
                    None => {
                        debug!(key = %key, "watch subscription closed");
                        return Ok(());
                    }
                },
            };
            if event.resource_version <= since || !event.key.matches(key) {
                continue;
            }
            if !checker(&event.key.namespace, &event.key.name, &event.folder) {
                trace!(key = %event.key, "watch event filtered by authorization");
                continue;
            }

            let out = self.to_watch_event(&event).await?;
            let latency = (now_millis() - event.timestamp).max(0) as f64 / 1000.0;
            self.metrics
                .watch_event_latency
                .with_label_values(&[event.key.resource.as_str()])
                .observe(latency);
            if tx.send(Ok(out)).await.is_err() {
                return Ok(());
            }
        }
    }

    /// Sends the current contents as ADDED events and returns the version
    /// they were listed at. `None` means the receiver went away.
    async fn send_initial_events(
        &self,
        key: &ResourceKey,
        checker: ItemChecker,
        tx: &WatchSender,
    ) -> Result<Option<i64>> {
        let mut req = ListRequest {
            key: Some(key.clone()),
            limit: self.config.server.default_list_limit,
            next_page_token: String::new(),
        };
        let mut list_rv = None;
        loop {
            let page = self
                .backend
                .prepare_list(&req, self.config.server.max_page_size_bytes, checker.clone())
                .await?;
            if let Some(error) = page.error {
                return Err(Error::Validation(error));
            }
            let rv = *list_rv.get_or_insert(page.resource_version);
            for item in page.items {
                let added = WatchEvent {
                    timestamp: now_millis(),
                    event_type: WatchEventType::Added as i32,
                    resource: Some(WatchResource {
                        value: item.value,
                        version: item.resource_version,
                    }),
                    previous: None,
                };
                if tx.send(Ok(added)).await.is_err() {
                    return Ok(None);
                }
            }
            if page.next_page_token.is_empty() {
                return Ok(Some(rv));
            }
            req.next_page_token = page.next_page_token;
        }
    }

    /// Start version of a watch that neither replays nor names one
    async fn current_version(
        &self,
        key: &ResourceKey,
    ) -> i64 {
        let req = ListRequest {
            key: Some(key.clone()),
            limit: 1,
            next_page_token: String::new(),
        };
        let nothing: ItemChecker = Arc::new(|_: &str, _: &str, _: &str| false);
        match self
            .backend
            .prepare_list(&req, self.config.server.max_page_size_bytes, nothing)
            .await
        {
            Ok(page) => page.resource_version,
            Err(e) => {
                warn!("watch: failed to fetch current version, using last broadcast one: {:?}", e);
                self.most_recent_rv.load(Ordering::Acquire)
            }
        }
    }

    async fn to_watch_event(
        &self,
        event: &WrittenEvent,
    ) -> Result<WatchEvent> {
        // the stored value of a delete is only a marker
        let value = match event.event_type {
            WatchEventType::Deleted => Vec::new(),
            _ => event.value.clone(),
        };
        let mut out = WatchEvent {
            timestamp: event.timestamp,
            event_type: event.event_type as i32,
            resource: Some(WatchResource {
                value,
                version: event.resource_version,
            }),
            previous: None,
        };

        if event.previous_rv > 0 {
            match self.backend.read(&event.key, event.previous_rv).await {
                Ok(previous) if previous.resource_version != event.previous_rv => {
                    error!(
                        key = %event.key,
                        expected = event.previous_rv,
                        actual = previous.resource_version,
                        "previous version mismatch"
                    );
                    return Err(Error::Fatal("resource version mismatch".to_string()));
                }
                Ok(previous) => {
                    out.previous = Some(WatchResource {
                        value: previous.value,
                        version: previous.resource_version,
                    });
                }
                Err(e) => {
                    error!(key = %event.key, rv = event.previous_rv, "error reading previous object: {:?}", e);
                }
            }
        }
        Ok(out)
    }
}
