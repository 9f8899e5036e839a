use std::sync::Arc;

use tokio::sync::mpsc;
use tokio::task::JoinHandle;
use tokio_util::sync::CancellationToken;

use super::*;
use crate::access::FixedAuthorizer;
use crate::access::ItemChecker;
use crate::access::MockAuthorizer;
use crate::access::RequestContext;
use crate::bulk::BulkRequestIterator;
use crate::bulk::BulkSettings;
use crate::core::CollectionKey;
use crate::proto::BulkAction;
use crate::proto::CreateRequest;
use crate::proto::DeleteRequest;
use crate::proto::ResourceKey;
use crate::proto::UpdateRequest;
use crate::proto::WatchEvent;
use crate::proto::WatchEventType;
use crate::proto::WatchRequest;
use crate::storage::BulkProcessingBackend;
use crate::storage::MemoryBackend;
use crate::test_utils::assert_idle;
use crate::test_utils::bulk_item;
use crate::test_utils::enable_logger;
use crate::test_utils::playlist_bytes;
use crate::test_utils::playlist_key;
use crate::test_utils::recv_within;
use crate::test_utils::requester;
use crate::test_utils::SliceBulkIterator;
use crate::AccessError;
use crate::Error;

type Events = mpsc::Receiver<std::result::Result<WatchEvent, tonic::Status>>;

fn ctx() -> RequestContext {
    RequestContext::new(requester())
}

fn setup() -> (Arc<ResourceServer>, Arc<MemoryBackend>) {
    enable_logger();
    let backend = Arc::new(MemoryBackend::default());
    let server = ResourceServer::builder(backend.clone(), Arc::new(FixedAuthorizer::allow_all()))
        .bulk_backend(backend.clone())
        .build()
        .unwrap();
    (Arc::new(server), backend)
}

fn playlists() -> ResourceKey {
    ResourceKey::new("default", "playlist.grafana.app", "playlists", "")
}

fn spawn_watch(
    server: &Arc<ResourceServer>,
    ctx: RequestContext,
    req: WatchRequest,
) -> (Events, JoinHandle<crate::Result<()>>) {
    let (tx, rx) = mpsc::channel(16);
    let server = server.clone();
    let handle = tokio::spawn(async move { server.watch(&ctx, req, tx).await });
    (rx, handle)
}

async fn next_event(rx: &mut Events) -> WatchEvent {
    recv_within(rx).await.expect("watch stream closed").expect("watch error")
}

/// Watch that replays the collection and signals readiness with a bookmark
async fn ready_watch(
    server: &Arc<ResourceServer>,
    key: ResourceKey,
    initial: usize,
) -> (Events, JoinHandle<crate::Result<()>>) {
    ready_watch_with(server, ctx(), key, initial).await
}

async fn ready_watch_with(
    server: &Arc<ResourceServer>,
    ctx: RequestContext,
    key: ResourceKey,
    initial: usize,
) -> (Events, JoinHandle<crate::Result<()>>) {
    let req = WatchRequest {
        key: Some(key),
        since: 0,
        send_initial_events: true,
        allow_watch_bookmarks: true,
    };
    let (mut rx, handle) = spawn_watch(server, ctx, req);
    for _ in 0..initial {
        assert_eq!(next_event(&mut rx).await.event_type(), WatchEventType::Added);
    }
    assert_eq!(next_event(&mut rx).await.event_type(), WatchEventType::Bookmark);
    (rx, handle)
}

async fn create(
    server: &ResourceServer,
    name: &str,
) -> i64 {
    let rsp = server
        .create(
            &ctx(),
            CreateRequest {
                key: Some(playlist_key(name)),
                value: playlist_bytes(name, "first"),
            },
        )
        .await;
    assert!(rsp.error.is_none(), "{:?}", rsp.error);
    rsp.resource_version
}

async fn update(
    server: &ResourceServer,
    name: &str,
    resource_version: i64,
) -> i64 {
    let rsp = server
        .update(
            &ctx(),
            UpdateRequest {
                key: Some(playlist_key(name)),
                value: playlist_bytes(name, "second"),
                resource_version,
            },
        )
        .await;
    assert!(rsp.error.is_none(), "{:?}", rsp.error);
    rsp.resource_version
}

#[tokio::test]
async fn test_initial_events_then_live_changes() {
    let (server, _) = setup();
    let v1 = create(&server, "p1").await;

    let (mut rx, _handle) = ready_watch(&server, playlists(), 1).await;
    let v2 = update(&server, "p1", v1).await;

    let event = next_event(&mut rx).await;
    assert_eq!(event.event_type(), WatchEventType::Modified);
    assert_eq!(event.resource.as_ref().unwrap().version, v2);
    assert_eq!(event.resource.unwrap().value, playlist_bytes("p1", "second"));
    let previous = event.previous.unwrap();
    assert_eq!(previous.version, v1);
    assert_eq!(previous.value, playlist_bytes("p1", "first"));
    assert_idle(&mut rx).await;
}

#[tokio::test]
async fn test_bookmark_carries_list_version() {
    let (server, _) = setup();
    create(&server, "p1").await;
    let v2 = create(&server, "p2").await;

    let req = WatchRequest {
        key: Some(playlists()),
        since: 0,
        send_initial_events: true,
        allow_watch_bookmarks: true,
    };
    let (mut rx, _handle) = spawn_watch(&server, ctx(), req);
    next_event(&mut rx).await;
    next_event(&mut rx).await;
    let bookmark = next_event(&mut rx).await;
    assert_eq!(bookmark.event_type(), WatchEventType::Bookmark);
    assert_eq!(bookmark.resource.unwrap().version, v2);
}

#[tokio::test]
async fn test_deleted_event_has_empty_value() {
    let (server, _) = setup();
    let v1 = create(&server, "p1").await;
    let (mut rx, _handle) = ready_watch(&server, playlists(), 1).await;

    let rsp = server
        .delete(
            &ctx(),
            DeleteRequest {
                key: Some(playlist_key("p1")),
                resource_version: v1,
            },
        )
        .await;
    assert!(rsp.error.is_none());

    let event = next_event(&mut rx).await;
    assert_eq!(event.event_type(), WatchEventType::Deleted);
    assert!(event.resource.unwrap().value.is_empty());
    assert_eq!(event.previous.unwrap().version, v1);
}

#[tokio::test]
async fn test_key_filter() {
    let (server, _) = setup();
    create(&server, "p1").await;
    let (mut rx, _handle) = ready_watch(&server, playlist_key("p1"), 1).await;

    create(&server, "p2").await;
    let v = update(&server, "p1", 0).await;

    let event = next_event(&mut rx).await;
    assert_eq!(event.resource.unwrap().version, v);
    assert_idle(&mut rx).await;
}

#[tokio::test]
async fn test_explicit_since_skips_older_events() {
    let (server, _) = setup();
    let v1 = create(&server, "p1").await;

    // replayed from the broadcaster cache, but not newer than `since`
    let (_warmup, _h) = ready_watch(&server, playlists(), 1).await;
    let v2 = update(&server, "p1", v1).await;

    let req = WatchRequest {
        key: Some(playlists()),
        since: v2,
        send_initial_events: false,
        allow_watch_bookmarks: false,
    };
    let (mut rx, _handle) = spawn_watch(&server, ctx(), req);
    assert_idle(&mut rx).await;

    let v3 = update(&server, "p1", v2).await;
    assert_eq!(next_event(&mut rx).await.resource.unwrap().version, v3);
}

#[tokio::test]
async fn test_bulk_writes_are_not_streamed() {
    let (server, backend) = setup();
    let (mut rx, _handle) = ready_watch(&server, playlists(), 0).await;

    let settings = BulkSettings {
        collections: vec![CollectionKey::new("default", "playlist.grafana.app", "playlists")],
        rebuild_collection: true,
        skip_validation: true,
    };
    let mut iter = SliceBulkIterator::new(vec![bulk_item(&playlist_key("a"), BulkAction::Added)]);
    assert!(backend.process_bulk(&settings, &mut iter).await.error.is_none());
    assert!(!iter.rollback_requested());
    assert_idle(&mut rx).await;

    let v = create(&server, "b").await;
    assert_eq!(next_event(&mut rx).await.resource.unwrap().version, v);
}

#[tokio::test]
async fn test_unauthenticated_watch_fails() {
    let (server, _) = setup();
    let (tx, _rx) = mpsc::channel(1);

    let err = server
        .watch(
            &RequestContext::anonymous(),
            WatchRequest {
                key: Some(playlists()),
                ..Default::default()
            },
            tx,
        )
        .await
        .unwrap_err();
    assert!(matches!(err, Error::Access(AccessError::Unauthenticated)));
}

#[tokio::test]
async fn test_cancel_ends_watch() {
    let (server, _) = setup();
    let cancel = CancellationToken::new();
    let (_rx, handle) = ready_watch_with(&server, ctx().with_cancel(cancel.clone()), playlists(), 0).await;

    cancel.cancel();
    let result = tokio::time::timeout(crate::test_utils::RECV_TIMEOUT, handle)
        .await
        .unwrap()
        .unwrap();
    assert!(result.is_ok());
}

#[tokio::test]
async fn test_dropped_receiver_ends_watch() {
    let (server, _) = setup();
    let (rx, handle) = ready_watch(&server, playlists(), 0).await;

    drop(rx);
    let result = tokio::time::timeout(crate::test_utils::RECV_TIMEOUT, handle)
        .await
        .unwrap()
        .unwrap();
    assert!(result.is_ok());
}

#[tokio::test]
async fn test_events_filtered_by_compiled_checker() {
    enable_logger();
    let mut auth = MockAuthorizer::new();
    auth.expect_check().returning(|_, _, _, _| Ok(()));
    auth.expect_compile().returning(|_, _, _| {
        let hide_secret: ItemChecker = Arc::new(|_: &str, name: &str, _: &str| name != "secret");
        Ok(hide_secret)
    });
    let backend = Arc::new(MemoryBackend::default());
    let server = Arc::new(ResourceServer::builder(backend, Arc::new(auth)).build().unwrap());
    let (mut rx, _handle) = ready_watch(&server, playlists(), 0).await;

    create(&server, "secret").await;
    let visible = create(&server, "open").await;

    assert_eq!(next_event(&mut rx).await.resource.unwrap().version, visible);
}

#[tokio::test]
async fn test_authorizer_failure_ends_watch() {
    enable_logger();
    let mut auth = MockAuthorizer::new();
    auth.expect_compile()
        .returning(|_, _, _| Err(Error::Access(AccessError::Forbidden("no watching".into()))));
    let server = ResourceServer::builder(Arc::new(MemoryBackend::default()), Arc::new(auth))
        .build()
        .unwrap();
    let (tx, _rx) = mpsc::channel(1);

    let err = server
        .watch(
            &ctx(),
            WatchRequest {
                key: Some(playlists()),
                ..Default::default()
            },
            tx,
        )
        .await
        .unwrap_err();
    assert!(matches!(err, Error::Access(AccessError::Forbidden(_))));
}
