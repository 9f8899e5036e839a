use tonic::metadata::MetadataMap;
use tonic::metadata::MetadataValue;

use crate::constants::BATCH_COLLECTION_KEY;
use crate::constants::BATCH_REBUILD_COLLECTION_KEY;
use crate::constants::BATCH_SKIP_VALIDATION_KEY;
use crate::core::CollectionKey;
use crate::proto::ErrorResult;

/// Out of band parameters of a bulk stream, carried in request metadata.
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct BulkSettings {
    pub collections: Vec<CollectionKey>,
    /// Replace each collection with the streamed items
    pub rebuild_collection: bool,
    pub skip_validation: bool,
}

impl BulkSettings {
    /// Collections may be repeated entries or comma separated in one entry.
    pub fn from_metadata(metadata: &MetadataMap) -> Result<Self, ErrorResult> {
        let mut collections = Vec::new();
        for value in metadata.get_all(BATCH_COLLECTION_KEY) {
            let raw = value
                .to_str()
                .map_err(|_| ErrorResult::bad_request(format!("invalid {BATCH_COLLECTION_KEY} metadata")))?;
            for part in raw.split(',').map(str::trim).filter(|p| !p.is_empty()) {
                let key: CollectionKey = part.parse()?;
                if !collections.contains(&key) {
                    collections.push(key);
                }
            }
        }

        Ok(Self {
            collections,
            rebuild_collection: parse_flag(metadata, BATCH_REBUILD_COLLECTION_KEY)?,
            skip_validation: parse_flag(metadata, BATCH_SKIP_VALIDATION_KEY)?,
        })
    }

    /// The metadata a client attaches to reproduce these settings
    pub fn to_metadata(&self) -> MetadataMap {
        let mut metadata = MetadataMap::new();
        for collection in &self.collections {
            if let Ok(value) = MetadataValue::try_from(collection.to_string()) {
                metadata.append(BATCH_COLLECTION_KEY, value);
            }
        }
        metadata.insert(BATCH_REBUILD_COLLECTION_KEY, bool_value(self.rebuild_collection));
        metadata.insert(BATCH_SKIP_VALIDATION_KEY, bool_value(self.skip_validation));
        metadata
    }
}

fn parse_flag(
    metadata: &MetadataMap,
    key: &str,
) -> Result<bool, ErrorResult> {
    let Some(value) = metadata.get(key) else {
        return Ok(false);
    };
    value
        .to_str()
        .ok()
        .and_then(|v| v.trim().parse::<bool>().ok())
        .ok_or_else(|| ErrorResult::bad_request(format!("invalid boolean for {key}")))
}

fn bool_value(v: bool) -> MetadataValue<tonic::metadata::Ascii> {
    if v {
        MetadataValue::from_static("true")
    } else {
        MetadataValue::from_static("false")
    }
}
