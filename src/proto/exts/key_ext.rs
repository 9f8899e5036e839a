use std::fmt;

use crate::core::CollectionKey;
use crate::proto::ErrorResult;
use crate::proto::ResourceKey;

impl ResourceKey {
    pub fn new(
        namespace: impl Into<String>,
        group: impl Into<String>,
        resource: impl Into<String>,
        name: impl Into<String>,
    ) -> Self {
        Self {
            namespace: namespace.into(),
            group: group.into(),
            resource: resource.into(),
            name: name.into(),
        }
    }

    /// The `{namespace, group, resource}` collection this key belongs to
    pub fn collection(&self) -> CollectionKey {
        CollectionKey::new(&self.namespace, &self.group, &self.resource)
    }

    /// Group and resource are mandatory on every request key.
    pub fn verify(&self) -> Result<(), ErrorResult> {
        if self.group.is_empty() {
            return Err(ErrorResult::bad_request("request key is missing group").with_field("key.group"));
        }
        if self.resource.is_empty() {
            return Err(ErrorResult::bad_request("request key is missing resource").with_field("key.resource"));
        }
        Ok(())
    }

    /// Used as a watch filter: every non-empty field of `filter` must match.
    pub fn matches(
        &self,
        filter: &ResourceKey,
    ) -> bool {
        (filter.namespace.is_empty() || filter.namespace == self.namespace)
            && (filter.group.is_empty() || filter.group == self.group)
            && (filter.resource.is_empty() || filter.resource == self.resource)
            && (filter.name.is_empty() || filter.name == self.name)
    }
}

impl fmt::Display for ResourceKey {
    fn fmt(
        &self,
        f: &mut fmt::Formatter<'_>,
    ) -> fmt::Result {
        write!(f, "{}/{}/{}/{}", self.namespace, self.group, self.resource, self.name)
    }
}
