use super::CollectionKey;
use crate::proto::ResourceKey;

#[test]
fn test_parse_collection_key() {
    let key: CollectionKey = "default/playlist.grafana.app/playlists".parse().unwrap();
    assert_eq!(key, CollectionKey::new("default", "playlist.grafana.app", "playlists"));

    let cluster: CollectionKey = "/g/r/ignored".parse().unwrap();
    assert_eq!(cluster, CollectionKey::new("", "g", "r"));
}

#[test]
fn test_parse_rejects_malformed() {
    assert!("only/two".parse::<CollectionKey>().is_err());
    assert!("a/b/c/d/e".parse::<CollectionKey>().is_err());
    assert!("ns//r".parse::<CollectionKey>().is_err());
    assert_eq!("ns/g/".parse::<CollectionKey>().unwrap_err().code, 400);
}

#[test]
fn test_contains() {
    let collection = CollectionKey::new("ns", "g", "r");
    assert!(collection.contains(&ResourceKey::new("ns", "g", "r", "a")));
    assert!(!collection.contains(&ResourceKey::new("other", "g", "r", "a")));
    assert_eq!(collection.to_resource_key().name, "");
}
