use resource_store::bulk::BulkSettings;
use resource_store::core::CollectionKey;
use resource_store::proto::BulkAction;
use resource_store::proto::BulkRequest;
use resource_store::proto::CreateRequest;
use resource_store::proto::ListRequest;
use resource_store::proto::WatchEventType;
use tonic::Status;

use crate::commons::*;

fn item(name: &str) -> Result<BulkRequest, Status> {
    Ok(BulkRequest {
        key: Some(playlist_key(name)),
        action: BulkAction::Added as i32,
        value: playlist(name, "imported"),
        folder: String::new(),
    })
}

fn metadata() -> tonic::metadata::MetadataMap {
    BulkSettings {
        collections: vec![CollectionKey::new("default", PLAYLIST_GROUP, "playlists")],
        rebuild_collection: true,
        skip_validation: false,
    }
    .to_metadata()
}

async fn list_names(server: &resource_store::ResourceServer) -> usize {
    let rsp = server
        .list(
            &ctx(),
            ListRequest {
                key: Some(playlists()),
                limit: 100,
                next_page_token: String::new(),
            },
        )
        .await;
    assert!(rsp.error.is_none());
    rsp.items.len()
}

#[tokio::test]
async fn test_bulk_replaces_collection_silently_for_watchers() {
    let (server, _) = start_server();
    server
        .create(
            &ctx(),
            CreateRequest {
                key: Some(playlist_key("legacy")),
                value: playlist("legacy", "old"),
            },
        )
        .await;
    let (mut events, _watch) = start_watch(&server, playlists()).await;

    let stream = tokio_stream::iter(vec![item("a"), item("b"), item("c")]);
    let rsp = server.bulk_process(&ctx(), &metadata(), stream).await;

    assert!(rsp.error.is_none(), "{:?}", rsp.error);
    assert_eq!(rsp.processed, 3);
    assert_eq!(rsp.summary[0].count, 3);
    assert_eq!(rsp.summary[0].previous_count, 1);
    assert_eq!(list_names(&server).await, 3);
    assert_no_event(&mut events).await;

    // regular writes after the rebuild stream again
    let rsp = server
        .create(
            &ctx(),
            CreateRequest {
                key: Some(playlist_key("d")),
                value: playlist("d", "new"),
            },
        )
        .await;
    let event = recv_event(&mut events).await;
    assert_eq!(event.event_type(), WatchEventType::Added);
    assert_eq!(event.resource.unwrap().version, rsp.resource_version);
}

#[tokio::test]
async fn test_broken_stream_keeps_previous_contents() {
    let (server, _) = start_server();
    server
        .create(
            &ctx(),
            CreateRequest {
                key: Some(playlist_key("legacy")),
                value: playlist("legacy", "old"),
            },
        )
        .await;

    let stream = tokio_stream::iter(vec![item("a"), Err(Status::unavailable("connection reset")), item("c")]);
    let rsp = server.bulk_process(&ctx(), &metadata(), stream).await;

    assert_eq!(rsp.error.unwrap().code, 500);
    assert_eq!(list_names(&server).await, 1);
}
