use tonic::metadata::MetadataMap;

use super::BulkSettings;
use crate::core::CollectionKey;

#[test]
fn test_parse_repeated_and_comma_separated() {
    let mut md = MetadataMap::new();
    md.append("x-rstore-batch-collection", "default/g/a, default/g/b".parse().unwrap());
    md.append("x-rstore-batch-collection", "other/g/c".parse().unwrap());
    md.append("x-rstore-batch-collection", "default/g/a".parse().unwrap());
    md.insert("x-rstore-batch-rebuild-collection", "true".parse().unwrap());

    let settings = BulkSettings::from_metadata(&md).unwrap();
    assert_eq!(
        settings.collections,
        vec![
            CollectionKey::new("default", "g", "a"),
            CollectionKey::new("default", "g", "b"),
            CollectionKey::new("other", "g", "c"),
        ]
    );
    assert!(settings.rebuild_collection);
    assert!(!settings.skip_validation);
}

#[test]
fn test_invalid_values() {
    let mut md = MetadataMap::new();
    md.insert("x-rstore-batch-rebuild-collection", "yes".parse().unwrap());
    assert_eq!(BulkSettings::from_metadata(&md).unwrap_err().code, 400);

    let mut md = MetadataMap::new();
    md.insert("x-rstore-batch-collection", "missing-parts".parse().unwrap());
    assert!(BulkSettings::from_metadata(&md).is_err());
}

#[test]
fn test_metadata_round_trip() {
    let settings = BulkSettings {
        collections: vec![CollectionKey::new("ns", "g", "r"), CollectionKey::new("", "g", "s")],
        rebuild_collection: true,
        skip_validation: true,
    };
    assert_eq!(BulkSettings::from_metadata(&settings.to_metadata()).unwrap(), settings);
}
