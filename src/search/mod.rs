//! Search index boundary.
//!
//! Document mapping and querying live elsewhere; the store only needs to
//! tell the index when a collection was rebuilt wholesale.

#[cfg(test)]
use mockall::automock;
use tonic::async_trait;

use crate::core::CollectionKey;
use crate::Result;

#[cfg_attr(test, automock)]
#[async_trait]
pub trait SearchIndex: Send + Sync + 'static {
    /// Reindex `collection`, which now holds `count` items as of
    /// `resource_version`.
    async fn rebuild_index(
        &self,
        collection: &CollectionKey,
        count: i64,
        resource_version: i64,
    ) -> Result<()>;
}
