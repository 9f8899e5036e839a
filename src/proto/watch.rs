#[derive(Clone, Copy, Debug, PartialEq, Eq, Hash, PartialOrd, Ord, ::prost::Enumeration)]
#[repr(i32)]
pub enum WatchEventType {
    Unknown = 0,
    Added = 1,
    Modified = 2,
    Deleted = 3,
    Bookmark = 4,
    Error = 5,
}

#[derive(Clone, PartialEq, ::prost::Message)]
pub struct WatchRequest {
    /// Key filter. Empty fields match everything.
    #[prost(message, optional, tag = "1")]
    pub key: Option<super::ResourceKey>,
    /// Only events with a greater version are delivered
    #[prost(int64, tag = "2")]
    pub since: i64,
    #[prost(bool, tag = "3")]
    pub send_initial_events: bool,
    #[prost(bool, tag = "4")]
    pub allow_watch_bookmarks: bool,
}

#[derive(Clone, PartialEq, ::prost::Message)]
pub struct WatchResource {
    #[prost(bytes = "vec", tag = "1")]
    pub value: Vec<u8>,
    #[prost(int64, tag = "2")]
    pub version: i64,
}

#[derive(Clone, PartialEq, ::prost::Message)]
pub struct WatchEvent {
    /// Unix millis of the write
    #[prost(int64, tag = "1")]
    pub timestamp: i64,
    #[prost(enumeration = "WatchEventType", tag = "2")]
    pub event_type: i32,
    #[prost(message, optional, tag = "3")]
    pub resource: Option<WatchResource>,
    #[prost(message, optional, tag = "4")]
    pub previous: Option<WatchResource>,
}
