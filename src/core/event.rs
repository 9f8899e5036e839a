use std::fmt;

use super::ResourceObject;
use crate::access::Requester;
use crate::proto::ErrorResult;
use crate::proto::ResourceKey;
use crate::proto::WatchEventType;

#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum Operation {
    Created,
    Updated,
    Deleted,
}

impl Operation {
    pub fn as_str(&self) -> &'static str {
        match self {
            Operation::Created => "create",
            Operation::Updated => "update",
            Operation::Deleted => "delete",
        }
    }

    pub fn event_type(&self) -> WatchEventType {
        match self {
            Operation::Created => WatchEventType::Added,
            Operation::Updated => WatchEventType::Modified,
            Operation::Deleted => WatchEventType::Deleted,
        }
    }
}

impl fmt::Display for Operation {
    fn fmt(
        &self,
        f: &mut fmt::Formatter<'_>,
    ) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

/// A validated mutation ready to be handed to the backend.
///
/// A rejected event still comes back as a `WriteEvent`, carrying the reason
/// in `status`; only events without a status may be written.
#[derive(Debug, Clone)]
pub struct WriteEvent {
    pub event_id: String,
    pub key: ResourceKey,
    pub operation: Operation,
    /// Encoded object to persist
    pub value: Vec<u8>,
    /// Version being replaced; 0 on create
    pub previous_rv: i64,
    pub requester: Option<Requester>,
    pub object: Option<ResourceObject>,
    pub old_object: Option<ResourceObject>,
    pub folder_changed: bool,
    pub status: Option<ErrorResult>,
}

impl WriteEvent {
    pub(crate) fn new(
        key: ResourceKey,
        operation: Operation,
        requester: &Requester,
    ) -> Self {
        Self {
            event_id: nanoid::nanoid!(),
            key,
            operation,
            value: Vec::new(),
            previous_rv: 0,
            requester: Some(requester.clone()),
            object: None,
            old_object: None,
            folder_changed: false,
            status: None,
        }
    }

    /// Placeholder event for a rejected request
    pub fn rejected(
        key: ResourceKey,
        operation: Operation,
        status: ErrorResult,
    ) -> Self {
        Self {
            event_id: nanoid::nanoid!(),
            key,
            operation,
            value: Vec::new(),
            previous_rv: 0,
            requester: None,
            object: None,
            old_object: None,
            folder_changed: false,
            status: Some(status),
        }
    }

    pub fn is_rejected(&self) -> bool {
        self.status.is_some()
    }

    pub fn into_result(self) -> std::result::Result<Self, ErrorResult> {
        match self.status {
            Some(status) => Err(status),
            None => Ok(self),
        }
    }

    pub fn folder(&self) -> &str {
        self.object.as_ref().map(|o| o.folder()).unwrap_or("")
    }
}

/// Post commit record fanned out to watchers. Shared read-only.
#[derive(Debug, Clone, PartialEq)]
pub struct WrittenEvent {
    pub key: ResourceKey,
    pub event_type: WatchEventType,
    pub value: Vec<u8>,
    pub folder: String,
    pub resource_version: i64,
    /// Unix millis of the commit
    pub timestamp: i64,
    /// Negative for events written by a bulk rebuild
    pub previous_rv: i64,
}
