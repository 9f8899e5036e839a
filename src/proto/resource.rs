/// Identity of a resource slot. The version is not part of the key.
#[derive(Clone, PartialEq, Eq, Hash, PartialOrd, Ord, ::prost::Message, serde::Serialize, serde::Deserialize)]
pub struct ResourceKey {
    /// Empty for cluster scoped resources
    #[prost(string, tag = "1")]
    pub namespace: String,
    #[prost(string, tag = "2")]
    pub group: String,
    #[prost(string, tag = "3")]
    pub resource: String,
    #[prost(string, tag = "4")]
    pub name: String,
}

#[derive(Clone, PartialEq, ::prost::Message)]
pub struct CreateRequest {
    #[prost(message, optional, tag = "1")]
    pub key: Option<ResourceKey>,
    /// JSON encoded object
    #[prost(bytes = "vec", tag = "2")]
    pub value: Vec<u8>,
}

#[derive(Clone, PartialEq, ::prost::Message)]
pub struct CreateResponse {
    #[prost(message, optional, tag = "1")]
    pub error: Option<super::ErrorResult>,
    #[prost(int64, tag = "2")]
    pub resource_version: i64,
}

#[derive(Clone, PartialEq, ::prost::Message)]
pub struct UpdateRequest {
    #[prost(message, optional, tag = "1")]
    pub key: Option<ResourceKey>,
    #[prost(bytes = "vec", tag = "2")]
    pub value: Vec<u8>,
    /// Expected current version. Zero skips the optimistic check.
    #[prost(int64, tag = "3")]
    pub resource_version: i64,
}

#[derive(Clone, PartialEq, ::prost::Message)]
pub struct UpdateResponse {
    #[prost(message, optional, tag = "1")]
    pub error: Option<super::ErrorResult>,
    #[prost(int64, tag = "2")]
    pub resource_version: i64,
}

#[derive(Clone, PartialEq, ::prost::Message)]
pub struct DeleteRequest {
    #[prost(message, optional, tag = "1")]
    pub key: Option<ResourceKey>,
    /// Must match the stored version exactly
    #[prost(int64, tag = "2")]
    pub resource_version: i64,
}

#[derive(Clone, PartialEq, ::prost::Message)]
pub struct DeleteResponse {
    #[prost(message, optional, tag = "1")]
    pub error: Option<super::ErrorResult>,
    #[prost(int64, tag = "2")]
    pub resource_version: i64,
}

#[derive(Clone, PartialEq, ::prost::Message)]
pub struct ReadRequest {
    #[prost(message, optional, tag = "1")]
    pub key: Option<ResourceKey>,
    /// Zero reads the latest value
    #[prost(int64, tag = "2")]
    pub resource_version: i64,
}

#[derive(Clone, PartialEq, ::prost::Message)]
pub struct ReadResponse {
    #[prost(message, optional, tag = "1")]
    pub error: Option<super::ErrorResult>,
    #[prost(int64, tag = "2")]
    pub resource_version: i64,
    #[prost(bytes = "vec", tag = "3")]
    pub value: Vec<u8>,
    #[prost(string, tag = "4")]
    pub folder: String,
}

#[derive(Clone, PartialEq, ::prost::Message)]
pub struct ListRequest {
    /// Name is ignored; namespace may be empty to list across namespaces
    #[prost(message, optional, tag = "1")]
    pub key: Option<ResourceKey>,
    #[prost(int64, tag = "2")]
    pub limit: i64,
    #[prost(string, tag = "3")]
    pub next_page_token: String,
}

#[derive(Clone, PartialEq, ::prost::Message)]
pub struct ResourceWrapper {
    #[prost(int64, tag = "1")]
    pub resource_version: i64,
    #[prost(bytes = "vec", tag = "2")]
    pub value: Vec<u8>,
}

#[derive(Clone, PartialEq, ::prost::Message)]
pub struct ListResponse {
    #[prost(message, repeated, tag = "1")]
    pub items: Vec<ResourceWrapper>,
    #[prost(string, tag = "2")]
    pub next_page_token: String,
    #[prost(int64, tag = "3")]
    pub resource_version: i64,
    #[prost(message, optional, tag = "4")]
    pub error: Option<super::ErrorResult>,
}
