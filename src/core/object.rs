use std::collections::BTreeMap;

use serde::Deserialize;
use serde::Serialize;
use serde_json::Map;
use serde_json::Value;

use crate::constants::ANNO_CREATED_BY;
use crate::constants::ANNO_FOLDER;
use crate::constants::ANNO_ORIGIN_NAME;
use crate::constants::ANNO_UPDATED_BY;
use crate::constants::ANNO_UPDATED_TIMESTAMP;

/// Typed view over a stored JSON object.
///
/// Only the fields the store reasons about are typed; everything else is
/// kept verbatim in the flattened maps so a decode/encode cycle is lossless.
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct ResourceObject {
    #[serde(default, skip_serializing_if = "String::is_empty")]
    pub api_version: String,
    #[serde(default, skip_serializing_if = "String::is_empty")]
    pub kind: String,
    #[serde(default)]
    pub metadata: ObjectMeta,
    #[serde(flatten)]
    pub rest: Map<String, Value>,
}

#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct ObjectMeta {
    #[serde(default, skip_serializing_if = "String::is_empty")]
    pub name: String,
    #[serde(default, skip_serializing_if = "String::is_empty")]
    pub namespace: String,
    #[serde(default, skip_serializing_if = "String::is_empty")]
    pub uid: String,
    #[serde(default, skip_serializing_if = "String::is_empty")]
    pub generate_name: String,
    #[serde(default, skip_serializing_if = "String::is_empty")]
    pub resource_version: String,
    #[serde(default, skip_serializing_if = "is_zero")]
    pub generation: i64,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub creation_timestamp: Option<String>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub deletion_timestamp: Option<String>,
    #[serde(default, skip_serializing_if = "BTreeMap::is_empty")]
    pub labels: BTreeMap<String, String>,
    #[serde(default, skip_serializing_if = "BTreeMap::is_empty")]
    pub annotations: BTreeMap<String, String>,
    #[serde(default, skip_serializing_if = "Vec::is_empty")]
    pub finalizers: Vec<String>,
    #[serde(default, skip_serializing_if = "Vec::is_empty")]
    pub managed_fields: Vec<Value>,
    #[serde(flatten)]
    pub extra: Map<String, Value>,
}

fn is_zero(v: &i64) -> bool {
    *v == 0
}

impl ResourceObject {
    pub fn from_slice(value: &[u8]) -> serde_json::Result<Self> {
        serde_json::from_slice(value)
    }

    pub fn to_vec(&self) -> serde_json::Result<Vec<u8>> {
        serde_json::to_vec(self)
    }

    /// Group half of `apiVersion`; empty for core kinds such as `v1`
    pub fn group(&self) -> &str {
        match self.api_version.split_once('/') {
            Some((group, _)) => group,
            None => "",
        }
    }

    pub fn version(&self) -> &str {
        match self.api_version.split_once('/') {
            Some((_, version)) => version,
            None => &self.api_version,
        }
    }

    pub fn annotation(
        &self,
        key: &str,
    ) -> &str {
        self.metadata.annotations.get(key).map(String::as_str).unwrap_or("")
    }

    pub fn set_annotation(
        &mut self,
        key: &str,
        value: impl Into<String>,
    ) {
        self.metadata.annotations.insert(key.to_string(), value.into());
    }

    pub fn remove_annotation(
        &mut self,
        key: &str,
    ) {
        self.metadata.annotations.remove(key);
    }

    pub fn folder(&self) -> &str {
        self.annotation(ANNO_FOLDER)
    }

    pub fn created_by(&self) -> &str {
        self.annotation(ANNO_CREATED_BY)
    }

    pub fn updated_by(&self) -> &str {
        self.annotation(ANNO_UPDATED_BY)
    }

    pub fn updated_timestamp(&self) -> &str {
        self.annotation(ANNO_UPDATED_TIMESTAMP)
    }

    pub fn origin_name(&self) -> &str {
        self.annotation(ANNO_ORIGIN_NAME)
    }
}
