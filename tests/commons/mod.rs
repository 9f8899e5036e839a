use std::sync::Arc;
use std::time::Duration;

use resource_store::access::FixedAuthorizer;
use resource_store::access::RequestContext;
use resource_store::access::Requester;
use resource_store::proto::ResourceKey;
use resource_store::proto::WatchEvent;
use resource_store::proto::WatchEventType;
use resource_store::proto::WatchRequest;
use resource_store::storage::MemoryBackend;
use resource_store::ResourceServer;
use serde_json::json;
use tokio::sync::mpsc;
use tokio::task::JoinHandle;
use tracing_subscriber::EnvFilter;

pub const PLAYLIST_GROUP: &str = "playlist.grafana.app";

// every channel receive in these tests is bounded by this
pub const RECV_TIMEOUT: Duration = Duration::from_secs(2);

pub type WatchEvents = mpsc::Receiver<Result<WatchEvent, tonic::Status>>;

pub fn enable_logger() {
    let _ = tracing_subscriber::fmt()
        .with_env_filter(EnvFilter::from_default_env())
        .with_test_writer()
        .try_init();
}

pub fn ctx() -> RequestContext {
    RequestContext::new(Requester::new("user", "u1", "alice"))
}

pub fn playlist_key(name: &str) -> ResourceKey {
    ResourceKey::new("default", PLAYLIST_GROUP, "playlists", name)
}

pub fn playlists() -> ResourceKey {
    playlist_key("")
}

pub fn playlist(
    name: &str,
    title: &str,
) -> Vec<u8> {
    serde_json::to_vec(&json!({
        "apiVersion": format!("{PLAYLIST_GROUP}/v0alpha1"),
        "kind": "Playlist",
        "metadata": {
            "name": name,
            "namespace": "default",
            "uid": format!("uid-{name}"),
        },
        "spec": {"title": title, "interval": "5m"},
    }))
    .unwrap()
}

pub fn start_server() -> (Arc<ResourceServer>, Arc<MemoryBackend>) {
    enable_logger();
    let backend = Arc::new(MemoryBackend::default());
    let server = ResourceServer::builder(backend.clone(), Arc::new(FixedAuthorizer::allow_all()))
        .bulk_backend(backend.clone())
        .build()
        .unwrap();
    (Arc::new(server), backend)
}

pub async fn recv_event(rx: &mut WatchEvents) -> WatchEvent {
    tokio::time::timeout(RECV_TIMEOUT, rx.recv())
        .await
        .expect("no watch event in time")
        .expect("watch stream closed")
        .expect("watch failed")
}

pub async fn assert_no_event(rx: &mut WatchEvents) {
    if let Ok(Some(event)) = tokio::time::timeout(Duration::from_millis(100), rx.recv()).await {
        panic!("unexpected watch event: {event:?}");
    }
}

/// Starts a watch on `key` and waits until its initial listing is done,
/// so every later write is guaranteed to be observed.
pub async fn start_watch(
    server: &Arc<ResourceServer>,
    key: ResourceKey,
) -> (WatchEvents, JoinHandle<resource_store::Result<()>>) {
    let (tx, mut rx) = mpsc::channel(64);
    let server = server.clone();
    let handle = tokio::spawn(async move {
        let req = WatchRequest {
            key: Some(key),
            since: 0,
            send_initial_events: true,
            allow_watch_bookmarks: true,
        };
        server.watch(&ctx(), req, tx).await
    });
    loop {
        let event = recv_event(&mut rx).await;
        if event.event_type() == WatchEventType::Bookmark {
            break;
        }
    }
    (rx, handle)
}
