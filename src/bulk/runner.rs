use std::collections::HashMap;

use tokio_stream::Stream;
use tokio_stream::StreamExt;
use tokio_util::sync::CancellationToken;
use tonic::async_trait;
use tonic::Status;
use tracing::debug;
use tracing::warn;

use super::BulkSettings;
use crate::access::Authorizer;
use crate::access::ItemChecker;
use crate::access::RequestContext;
use crate::access::Requester;
use crate::access::Verb;
use crate::core::CollectionKey;
use crate::core::EventValidator;
use crate::core::ResourceObject;
use crate::proto::BulkAction;
use crate::proto::BulkRequest;
use crate::proto::BulkResponse;
use crate::proto::ErrorResult;
use crate::search::SearchIndex;

/// Iterator the backend pulls bulk items from.
#[async_trait]
pub trait BulkRequestIterator: Send {
    /// Advances to the next item. `false` means there is nothing left.
    async fn next(&mut self) -> bool;

    /// The current item; `None` once a rollback was triggered.
    fn request(&self) -> Option<&BulkRequest>;

    /// One shot read of the rollback flag. When it returns true everything
    /// written for this stream must be discarded.
    fn rollback_requested(&mut self) -> bool;
}

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum RunnerState {
    Normal,
    RollbackPending,
    RollbackConsumed,
    Done,
}

/// Adapts an incoming item stream into a [`BulkRequestIterator`].
///
/// Authorization is compiled once per collection up front; items are only
/// checked against the compiled closures.
pub struct BulkRunner<S> {
    stream: S,
    requester: Requester,
    checkers: HashMap<CollectionKey, ItemChecker>,
    /// Set unless the stream asked to skip validation
    validator: Option<EventValidator>,
    cancel: CancellationToken,
    state: RunnerState,
    request: Option<BulkRequest>,
    rollback: bool,
    failure: Option<ErrorResult>,
    accepted: i64,
}

impl<S> BulkRunner<S>
where
    S: Stream<Item = Result<BulkRequest, Status>> + Send + Unpin,
{
    /// Checks the stream preconditions before any item is read.
    pub async fn prepare(
        ctx: &RequestContext,
        settings: &BulkSettings,
        authorizer: &dyn Authorizer,
        validator: Option<EventValidator>,
        stream: S,
    ) -> Result<Self, ErrorResult> {
        let requester = ctx
            .requester
            .clone()
            .ok_or_else(|| ErrorResult::unauthorized("no identity found for request"))?;
        if settings.collections.is_empty() {
            return Err(ErrorResult::bad_request("missing target collection(s) in request metadata"));
        }
        if !settings.rebuild_collection {
            return Err(ErrorResult::bad_request("only rebuild collection mode is supported"));
        }

        let mut checkers = HashMap::with_capacity(settings.collections.len());
        for collection in &settings.collections {
            let key = collection.to_resource_key();
            authorizer
                .check(&requester, Verb::DeleteCollection, &key, "")
                .await
                .map_err(|e| ErrorResult::from(&e))?;
            let checker = authorizer
                .compile(&requester, Verb::Create, &key)
                .await
                .map_err(|e| ErrorResult::from(&e))?;
            checkers.insert(collection.clone(), checker);
        }
        debug!(collections = settings.collections.len(), requester = %requester, "bulk runner prepared");

        Ok(Self {
            stream,
            requester,
            checkers,
            validator,
            cancel: ctx.cancel.clone(),
            state: RunnerState::Normal,
            request: None,
            rollback: false,
            failure: None,
            accepted: 0,
        })
    }

    pub fn state(&self) -> RunnerState {
        self.state
    }

    /// The reason the stream was rolled back, if it was
    pub fn failure(&self) -> Option<&ErrorResult> {
        self.failure.as_ref()
    }

    /// Items handed to the backend so far
    pub fn accepted(&self) -> i64 {
        self.accepted
    }

    fn fail(
        &mut self,
        err: ErrorResult,
    ) {
        warn!(requester = %self.requester, "bulk stream rolled back: {}", err);
        self.state = RunnerState::RollbackPending;
        self.rollback = true;
        self.request = None;
        self.failure = Some(err);
    }

    fn admit(
        &self,
        req: &BulkRequest,
    ) -> Result<(), ErrorResult> {
        let key = req
            .key
            .as_ref()
            .ok_or_else(|| ErrorResult::bad_request("bulk item is missing its key"))?;
        let collection = key.collection();
        let checker = self.checkers.get(&collection).ok_or_else(|| {
            ErrorResult::bad_request(format!("bulk item {key} is not part of the declared collections"))
        })?;
        if req.action() != BulkAction::Deleted {
            // the backend stores the payload's folder, so that is what gets authorized
            let folder = ResourceObject::from_slice(&req.value)
                .map(|obj| obj.folder().to_string())
                .unwrap_or_default();
            if folder != req.folder {
                return Err(ErrorResult::bad_request(format!(
                    "bulk item {key} declares folder {:?} but its payload is in {:?}",
                    req.folder, folder
                ))
                .with_field("folder"));
            }
        }
        if !checker(&key.namespace, &key.name, &req.folder) {
            return Err(ErrorResult::forbidden(format!("not allowed to create {key}")));
        }

        if let Some(validator) = &self.validator {
            if req.action() != BulkAction::Deleted {
                validator
                    .prepare_create(&self.requester, key, &req.value)
                    .into_result()?;
            }
        }
        Ok(())
    }

    /// Post processing once the backend is done: the first recorded failure
    /// wins over whatever the backend reported, and a successful rebuild
    /// refreshes the search index of every touched collection.
    pub async fn finish(
        self,
        mut response: BulkResponse,
        search: Option<&dyn SearchIndex>,
    ) -> BulkResponse {
        if let Some(failure) = self.failure {
            response.error = Some(failure);
        }
        if response.error.is_some() {
            return response;
        }

        if let Some(search) = search {
            for summary in &response.summary {
                let collection = CollectionKey::new(&summary.namespace, &summary.group, &summary.resource);
                if let Err(e) = search
                    .rebuild_index(&collection, summary.count, summary.resource_version)
                    .await
                {
                    warn!(collection = %collection, "index rebuild after bulk failed: {:?}", e);
                    response.error = Some(ErrorResult::internal(format!(
                        "failed to rebuild index for {collection}: {e}"
                    )));
                    break;
                }
            }
        }
        response
    }
}

#[async_trait]
impl<S> BulkRequestIterator for BulkRunner<S>
where
    S: Stream<Item = Result<BulkRequest, Status>> + Send + Unpin,
{
    async fn next(&mut self) -> bool {
        if self.state != RunnerState::Normal {
            return false;
        }

        let item = tokio::select! {
            _ = self.cancel.cancelled() => Some(Err(Status::cancelled("bulk stream cancelled"))),
            item = self.stream.next() => item,
        };
        match item {
            None => {
                debug!(accepted = self.accepted, "bulk stream complete");
                self.state = RunnerState::Done;
                self.request = None;
                false
            }
            Some(Err(status)) => {
                self.fail(ErrorResult::internal(format!(
                    "error reading bulk stream: {}",
                    status.message()
                )));
                true
            }
            Some(Ok(req)) => {
                match self.admit(&req) {
                    Ok(()) => {
                        self.accepted += 1;
                        self.request = Some(req);
                    }
                    Err(e) => self.fail(e),
                }
                true
            }
        }
    }

    fn request(&self) -> Option<&BulkRequest> {
        match self.state {
            RunnerState::Normal => self.request.as_ref(),
            _ => None,
        }
    }

    fn rollback_requested(&mut self) -> bool {
        if !self.rollback {
            return false;
        }
        self.rollback = false;
        self.state = RunnerState::RollbackConsumed;
        true
    }
}
