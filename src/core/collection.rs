use std::fmt;
use std::str::FromStr;

use crate::proto::ErrorResult;
use crate::proto::ResourceKey;

/// `{namespace, group, resource}`: the unit a bulk rebuild replaces and the
/// scope one compiled authorization checker covers.
#[derive(Debug, Clone, Default, PartialEq, Eq, Hash, PartialOrd, Ord)]
pub struct CollectionKey {
    pub namespace: String,
    pub group: String,
    pub resource: String,
}

impl CollectionKey {
    pub fn new(
        namespace: &str,
        group: &str,
        resource: &str,
    ) -> Self {
        Self {
            namespace: namespace.to_string(),
            group: group.to_string(),
            resource: resource.to_string(),
        }
    }

    /// Key without a name, addressing the whole collection
    pub fn to_resource_key(&self) -> ResourceKey {
        ResourceKey::new(&self.namespace, &self.group, &self.resource, "")
    }

    pub fn contains(
        &self,
        key: &ResourceKey,
    ) -> bool {
        self.namespace == key.namespace && self.group == key.group && self.resource == key.resource
    }
}

impl fmt::Display for CollectionKey {
    fn fmt(
        &self,
        f: &mut fmt::Formatter<'_>,
    ) -> fmt::Result {
        write!(f, "{}/{}/{}", self.namespace, self.group, self.resource)
    }
}

/// Parses `namespace/group/resource`; a trailing `/name` segment is ignored.
impl FromStr for CollectionKey {
    type Err = ErrorResult;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        let parts: Vec<&str> = s.trim().split('/').collect();
        if !(3..=4).contains(&parts.len()) {
            return Err(ErrorResult::bad_request(format!("invalid collection key: {s}")));
        }
        let key = Self::new(parts[0], parts[1], parts[2]);
        if key.group.is_empty() || key.resource.is_empty() {
            return Err(ErrorResult::bad_request(format!(
                "collection key requires group and resource: {s}"
            )));
        }
        Ok(key)
    }
}
