use serde_json::json;
use serde_json::Value;

use crate::access::Requester;
use crate::proto::ResourceKey;

pub const PLAYLIST_GROUP: &str = "playlist.grafana.app";

pub fn requester() -> Requester {
    Requester::new("user", "u1", "alice")
}

pub fn other_requester() -> Requester {
    Requester::new("user", "u2", "bob")
}

pub fn playlist_key(name: &str) -> ResourceKey {
    ResourceKey::new("default", PLAYLIST_GROUP, "playlists", name)
}

/// JSON object matching `key`, with the given metadata merged in.
pub fn object_value(
    key: &ResourceKey,
    metadata: Value,
) -> Value {
    let mut obj = json!({
        "apiVersion": format!("{}/v0alpha1", key.group),
        "kind": "Playlist",
        "metadata": {
            "name": key.name,
            "namespace": key.namespace,
            "uid": format!("uid-{}", key.name),
        },
        "spec": {"title": key.name},
    });
    if let (Some(target), Value::Object(extra)) = (obj["metadata"].as_object_mut(), metadata) {
        for (k, v) in extra {
            target.insert(k, v);
        }
    }
    obj
}

pub fn object_bytes(
    key: &ResourceKey,
    metadata: Value,
) -> Vec<u8> {
    serde_json::to_vec(&object_value(key, metadata)).unwrap()
}

/// Valid playlist payload with `spec.title` set to `title`
pub fn playlist_bytes(
    name: &str,
    title: &str,
) -> Vec<u8> {
    let mut obj = object_value(&playlist_key(name), json!({}));
    obj["spec"]["title"] = json!(title);
    serde_json::to_vec(&obj).unwrap()
}

pub fn bulk_item(
    key: &ResourceKey,
    action: crate::proto::BulkAction,
) -> crate::proto::BulkRequest {
    crate::proto::BulkRequest {
        key: Some(key.clone()),
        action: action as i32,
        value: object_bytes(key, json!({})),
        folder: String::new(),
    }
}
