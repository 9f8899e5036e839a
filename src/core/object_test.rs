use serde_json::json;

use super::ResourceObject;

#[test]
fn test_decode_typed_fields() {
    let raw = json!({
        "apiVersion": "playlist.grafana.app/v0alpha1",
        "kind": "Playlist",
        "metadata": {
            "name": "p1",
            "namespace": "default",
            "uid": "abc",
            "creationTimestamp": "2024-01-01T00:00:00Z",
            "annotations": {"grafana.app/folder": "f1", "grafana.app/createdBy": "user:u1"}
        },
        "spec": {"title": "hello"}
    });
    let obj = ResourceObject::from_slice(&serde_json::to_vec(&raw).unwrap()).unwrap();

    assert_eq!(obj.kind, "Playlist");
    assert_eq!(obj.group(), "playlist.grafana.app");
    assert_eq!(obj.version(), "v0alpha1");
    assert_eq!(obj.metadata.name, "p1");
    assert_eq!(obj.folder(), "f1");
    assert_eq!(obj.created_by(), "user:u1");
    assert_eq!(obj.updated_by(), "");
    assert_eq!(obj.rest["spec"]["title"], "hello");
}

#[test]
fn test_core_api_version_has_no_group() {
    let obj: ResourceObject = serde_json::from_value(json!({"apiVersion": "v1", "kind": "ConfigMap"})).unwrap();
    assert_eq!(obj.group(), "");
    assert_eq!(obj.version(), "v1");
}

#[test]
fn test_unknown_fields_survive_encoding() {
    let raw = json!({
        "apiVersion": "g/v1",
        "kind": "K",
        "metadata": {"name": "n", "ownerReferences": [{"name": "o"}]},
        "status": {"ready": true}
    });
    let obj: ResourceObject = serde_json::from_value(raw.clone()).unwrap();
    let back: serde_json::Value = serde_json::from_slice(&obj.to_vec().unwrap()).unwrap();
    assert_eq!(back, raw);
}

#[test]
fn test_annotation_mutation() {
    let mut obj = ResourceObject::default();
    obj.set_annotation("a", "1");
    assert_eq!(obj.annotation("a"), "1");
    obj.remove_annotation("a");
    assert_eq!(obj.annotation("a"), "");
}
