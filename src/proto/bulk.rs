#[derive(Clone, Copy, Debug, PartialEq, Eq, Hash, PartialOrd, Ord, ::prost::Enumeration)]
#[repr(i32)]
pub enum BulkAction {
    Unknown = 0,
    Added = 1,
    Modified = 2,
    Deleted = 3,
}

/// One item of a bulk ingestion stream
#[derive(Clone, PartialEq, ::prost::Message)]
pub struct BulkRequest {
    #[prost(message, optional, tag = "1")]
    pub key: Option<super::ResourceKey>,
    #[prost(enumeration = "BulkAction", tag = "2")]
    pub action: i32,
    #[prost(bytes = "vec", tag = "3")]
    pub value: Vec<u8>,
    #[prost(string, tag = "4")]
    pub folder: String,
}

/// Per collection outcome of a bulk rebuild
#[derive(Clone, PartialEq, ::prost::Message)]
pub struct BulkSummary {
    #[prost(string, tag = "1")]
    pub namespace: String,
    #[prost(string, tag = "2")]
    pub group: String,
    #[prost(string, tag = "3")]
    pub resource: String,
    #[prost(int64, tag = "4")]
    pub count: i64,
    #[prost(int64, tag = "5")]
    pub previous_count: i64,
    #[prost(int64, tag = "6")]
    pub resource_version: i64,
}

/// The single terminal response of a bulk stream
#[derive(Clone, PartialEq, ::prost::Message)]
pub struct BulkResponse {
    #[prost(message, optional, tag = "1")]
    pub error: Option<super::ErrorResult>,
    #[prost(int64, tag = "2")]
    pub processed: i64,
    #[prost(message, repeated, tag = "3")]
    pub summary: Vec<BulkSummary>,
}
