use crate::proto::ResourceKey;

#[test]
fn test_matches_empty_filter_fields() {
    let key = ResourceKey::new("default", "playlist.grafana.app", "playlists", "p1");

    assert!(key.matches(&ResourceKey::default()));
    assert!(key.matches(&ResourceKey::new("default", "playlist.grafana.app", "", "")));
    assert!(!key.matches(&ResourceKey::new("other", "", "", "")));
    assert!(!key.matches(&ResourceKey::new("", "", "playlists", "p2")));
}

#[test]
fn test_verify_requires_group_and_resource() {
    assert!(ResourceKey::new("ns", "g", "r", "").verify().is_ok());

    let err = ResourceKey::new("ns", "", "r", "n").verify().unwrap_err();
    assert_eq!(err.code, 400);
    assert_eq!(err.details.unwrap().causes[0].field, "key.group");

    let err = ResourceKey::new("ns", "g", "", "n").verify().unwrap_err();
    assert_eq!(err.code, 400);
}

#[test]
fn test_display_and_collection() {
    let key = ResourceKey::new("", "g", "r", "n");
    assert_eq!(key.to_string(), "/g/r/n");
    assert_eq!(key.collection().to_string(), "/g/r");
}
