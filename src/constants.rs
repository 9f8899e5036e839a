// -
// Object metadata keys

pub(crate) const ANNO_CREATED_BY: &str = "grafana.app/createdBy";
pub(crate) const ANNO_UPDATED_BY: &str = "grafana.app/updatedBy";
pub(crate) const ANNO_UPDATED_TIMESTAMP: &str = "grafana.app/updatedTimestamp";
pub(crate) const ANNO_FOLDER: &str = "grafana.app/folder";
/// Provenance of a write, e.g. a sync job instead of the UI
pub(crate) const ANNO_ORIGIN_NAME: &str = "grafana.app/originName";
pub(crate) const ANNO_GRANT_PERMISSIONS: &str = "grafana.app/grant-permissions";
pub(crate) const ANNO_LAST_APPLIED_CONFIG: &str = "kubectl.kubernetes.io/last-applied-configuration";

/// Command labels that only make sense on requests and must never be persisted
pub(crate) const FORBIDDEN_LABELS: [&str; 3] = [
    "grafana.app/get-history",
    "grafana.app/get-trash",
    "grafana.app/fullpath",
];

pub(crate) const DEFAULT_ORIGIN: &str = "UI";

/// Generation stamped on delete markers
pub(crate) const DELETED_GENERATION: i64 = -999;

pub(crate) const MAX_NAME_LENGTH: usize = 253;

// -
// Bulk request metadata

pub(crate) const BATCH_COLLECTION_KEY: &str = "x-rstore-batch-collection";
pub(crate) const BATCH_REBUILD_COLLECTION_KEY: &str = "x-rstore-batch-rebuild-collection";
pub(crate) const BATCH_SKIP_VALIDATION_KEY: &str = "x-rstore-batch-skip-validation";
