/// Field level cause attached to a structured error
#[derive(Clone, PartialEq, Eq, ::prost::Message, serde::Serialize, serde::Deserialize)]
pub struct ErrorCause {
    #[prost(string, tag = "1")]
    pub reason: String,
    #[prost(string, tag = "2")]
    pub message: String,
    #[prost(string, tag = "3")]
    pub field: String,
}

#[derive(Clone, PartialEq, Eq, ::prost::Message, serde::Serialize, serde::Deserialize)]
pub struct ErrorDetails {
    #[prost(string, tag = "1")]
    pub group: String,
    #[prost(string, tag = "2")]
    pub kind: String,
    #[prost(string, tag = "3")]
    pub name: String,
    #[prost(string, tag = "4")]
    pub uid: String,
    #[prost(int32, tag = "5")]
    pub retry_after_seconds: i32,
    #[prost(message, repeated, tag = "6")]
    pub causes: Vec<ErrorCause>,
}

/// Structured error embedded in every response.
///
/// `code` uses HTTP status numbers, `reason` is the machine readable string.
#[derive(Clone, PartialEq, Eq, ::prost::Message, serde::Serialize, serde::Deserialize)]
pub struct ErrorResult {
    #[prost(string, tag = "1")]
    pub message: String,
    #[prost(string, tag = "2")]
    pub reason: String,
    #[prost(message, optional, tag = "3")]
    pub details: Option<ErrorDetails>,
    #[prost(int32, tag = "4")]
    pub code: i32,
}
