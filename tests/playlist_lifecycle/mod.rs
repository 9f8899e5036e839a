use resource_store::proto::CreateRequest;
use resource_store::proto::DeleteRequest;
use resource_store::proto::ListRequest;
use resource_store::proto::ReadRequest;
use resource_store::proto::UpdateRequest;
use resource_store::proto::WatchEventType;

use crate::commons::*;

#[tokio::test]
async fn test_create_update_watch_and_stale_update() {
    let (server, _) = start_server();

    let created = server
        .create(
            &ctx(),
            CreateRequest {
                key: Some(playlist_key("p1")),
                value: playlist("p1", "Morning"),
            },
        )
        .await;
    assert!(created.error.is_none());
    let v1 = created.resource_version;
    assert!(v1 > 0);

    let (mut events, _watch) = start_watch(&server, playlists()).await;

    let updated = server
        .update(
            &ctx(),
            UpdateRequest {
                key: Some(playlist_key("p1")),
                value: playlist("p1", "Evening"),
                resource_version: v1,
            },
        )
        .await;
    assert!(updated.error.is_none());
    let v2 = updated.resource_version;
    assert!(v2 > v1);

    let event = recv_event(&mut events).await;
    assert_eq!(event.event_type(), WatchEventType::Modified);
    assert_eq!(event.resource.unwrap().version, v2);

    let stale = server
        .update(
            &ctx(),
            UpdateRequest {
                key: Some(playlist_key("p1")),
                value: playlist("p1", "Night"),
                resource_version: v1,
            },
        )
        .await;
    assert_eq!(stale.error.unwrap().code, 409);

    // exactly one change was observed
    assert_no_event(&mut events).await;

    let read = server
        .read(
            &ctx(),
            ReadRequest {
                key: Some(playlist_key("p1")),
                resource_version: 0,
            },
        )
        .await;
    assert_eq!(read.resource_version, v2);
    assert_eq!(read.value, playlist("p1", "Evening"));
}

#[tokio::test]
async fn test_list_pages_and_delete() {
    let (server, _) = start_server();
    for i in 0..5 {
        let name = format!("p{i}");
        let rsp = server
            .create(
                &ctx(),
                CreateRequest {
                    key: Some(playlist_key(&name)),
                    value: playlist(&name, "t"),
                },
            )
            .await;
        assert!(rsp.error.is_none());
    }

    let mut req = ListRequest {
        key: Some(playlists()),
        limit: 2,
        next_page_token: String::new(),
    };
    let mut seen = 0;
    let mut pages = 0;
    loop {
        let page = server.list(&ctx(), req.clone()).await;
        assert!(page.error.is_none());
        seen += page.items.len();
        pages += 1;
        if page.next_page_token.is_empty() {
            break;
        }
        req.next_page_token = page.next_page_token;
    }
    assert_eq!(seen, 5);
    assert_eq!(pages, 3);

    let (mut events, _watch) = start_watch(&server, playlist_key("p0")).await;
    let deleted = server
        .delete(
            &ctx(),
            DeleteRequest {
                key: Some(playlist_key("p0")),
                resource_version: 0,
            },
        )
        .await;
    assert!(deleted.error.is_none());

    let event = recv_event(&mut events).await;
    assert_eq!(event.event_type(), WatchEventType::Deleted);
    assert!(event.resource.unwrap().value.is_empty());

    let read = server
        .read(
            &ctx(),
            ReadRequest {
                key: Some(playlist_key("p0")),
                resource_version: 0,
            },
        )
        .await;
    assert_eq!(read.error.unwrap().code, 404);
}
