//! Builds [`WriteEvent`]s out of raw requests.
//!
//! Nothing in here touches storage or awaits: the caller reads the current
//! value and hands it in. Every rule violation yields an event carrying a
//! BadRequest status instead of an `Err`.

use tracing::debug;
use tracing::warn;

use super::Operation;
use super::ResourceObject;
use super::WriteEvent;
use crate::access::Requester;
use crate::access::WriteAccessHooks;
use crate::constants::ANNO_GRANT_PERMISSIONS;
use crate::constants::ANNO_LAST_APPLIED_CONFIG;
use crate::constants::ANNO_UPDATED_BY;
use crate::constants::ANNO_UPDATED_TIMESTAMP;
use crate::constants::DEFAULT_ORIGIN;
use crate::constants::DELETED_GENERATION;
use crate::constants::FORBIDDEN_LABELS;
use crate::constants::MAX_NAME_LENGTH;
use crate::proto::ErrorResult;
use crate::proto::ResourceKey;
use crate::utils::time::format_timestamp;
use crate::utils::time::system_clock;
use crate::utils::time::Clock;

type Checked<T> = std::result::Result<T, ErrorResult>;

#[derive(Clone)]
pub struct EventValidator {
    hooks: WriteAccessHooks,
    clock: Clock,
}

impl Default for EventValidator {
    fn default() -> Self {
        Self::new(WriteAccessHooks::default(), system_clock())
    }
}

impl EventValidator {
    pub fn new(
        hooks: WriteAccessHooks,
        clock: Clock,
    ) -> Self {
        Self { hooks, clock }
    }

    /// On success the returned key has its name filled in from the payload
    /// when the request left it empty.
    pub fn prepare_create(
        &self,
        requester: &Requester,
        key: &ResourceKey,
        value: &[u8],
    ) -> WriteEvent {
        self.build(requester, key, value, None)
            .unwrap_or_else(|status| WriteEvent::rejected(key.clone(), Operation::Created, status))
    }

    pub fn prepare_update(
        &self,
        requester: &Requester,
        key: &ResourceKey,
        value: &[u8],
        current: &[u8],
        current_rv: i64,
    ) -> WriteEvent {
        self.build(requester, key, value, Some((current, current_rv)))
            .unwrap_or_else(|status| WriteEvent::rejected(key.clone(), Operation::Updated, status))
    }

    /// Produces the deleted marker that replaces the stored value.
    pub fn prepare_delete(
        &self,
        requester: &Requester,
        key: &ResourceKey,
        request_rv: i64,
        current: &[u8],
        current_rv: i64,
    ) -> WriteEvent {
        self.build_delete(requester, key, request_rv, current, current_rv)
            .unwrap_or_else(|status| WriteEvent::rejected(key.clone(), Operation::Deleted, status))
    }

    fn build(
        &self,
        requester: &Requester,
        key: &ResourceKey,
        value: &[u8],
        current: Option<(&[u8], i64)>,
    ) -> Checked<WriteEvent> {
        let operation = match current {
            Some(_) => Operation::Updated,
            None => Operation::Created,
        };
        let obj = decode(value)?;
        let mut key = key.clone();
        verify_object(&mut key, &obj, operation)?;

        let mut event = WriteEvent::new(key, operation, requester);
        match current {
            None => {
                verify_create_provenance(requester, &obj)?;
                event.folder_changed = !obj.folder().is_empty();
            }
            Some((current, current_rv)) => {
                let old = decode(current)?;
                verify_update_provenance(requester, &obj, &old)?;
                event.folder_changed = old.folder() != obj.folder();
                event.previous_rv = current_rv;
                event.old_object = Some(old);
            }
        }

        let folder = obj.folder();
        if !folder.is_empty() && !self.hooks.can_write_to_folder(requester, folder) {
            return Err(
                ErrorResult::bad_request(format!("not allowed to write resource to folder: {folder}"))
                    .with_field("metadata.annotations"),
            );
        }

        let origin = obj.origin_name();
        if !origin.is_empty() && origin != DEFAULT_ORIGIN && !self.hooks.can_write_origin(requester, origin) {
            return Err(ErrorResult::bad_request(format!("not allowed to write resource from origin: {origin}"))
                .with_field("metadata.annotations"));
        }

        debug!(key = %event.key, operation = %operation, folder_changed = event.folder_changed, "write event prepared");
        event.value = value.to_vec();
        event.object = Some(obj);
        Ok(event)
    }

    fn build_delete(
        &self,
        requester: &Requester,
        key: &ResourceKey,
        request_rv: i64,
        current: &[u8],
        current_rv: i64,
    ) -> Checked<WriteEvent> {
        // 0 deletes whatever is current
        if request_rv != 0 && request_rv != current_rv {
            return Err(ErrorResult::bad_request(format!(
                "resource version {request_rv} does not match current value {current_rv}"
            ))
            .with_field("resourceVersion"));
        }
        let old = decode(current)?;

        let now = format_timestamp((self.clock)());
        let mut marker = old.clone();
        marker.metadata.deletion_timestamp = Some(now.clone());
        marker.set_annotation(ANNO_UPDATED_TIMESTAMP, now);
        marker.set_annotation(ANNO_UPDATED_BY, requester.identity());
        marker.remove_annotation(ANNO_LAST_APPLIED_CONFIG);
        marker.metadata.managed_fields.clear();
        marker.metadata.finalizers.clear();
        marker.metadata.generation = DELETED_GENERATION;

        let mut event = WriteEvent::new(key.clone(), Operation::Deleted, requester);
        event.value = marker
            .to_vec()
            .map_err(|e| ErrorResult::internal(format!("unable to encode deleted marker: {e}")))?;
        event.previous_rv = current_rv;
        event.object = Some(marker);
        event.old_object = Some(old);
        Ok(event)
    }
}

fn decode(value: &[u8]) -> Checked<ResourceObject> {
    ResourceObject::from_slice(value).map_err(|e| ErrorResult::bad_request(format!("unable to read object: {e}")))
}

fn verify_object(
    key: &mut ResourceKey,
    obj: &ResourceObject,
    operation: Operation,
) -> Checked<()> {
    let meta = &obj.metadata;
    if obj.kind.is_empty() {
        return Err(ErrorResult::bad_request("expecting resources with a kind in the body").with_field("kind"));
    }
    if obj.version().is_empty() {
        return Err(ErrorResult::bad_request("expecting resources with an apiVersion").with_field("apiVersion"));
    }
    if meta.uid.is_empty() {
        return Err(ErrorResult::bad_request("object is missing UID").with_field("metadata.uid"));
    }
    if !meta.resource_version.is_empty() {
        warn!(key = %key, rv = %meta.resource_version, "object must not include a resource version");
    }

    for label in meta.labels.keys() {
        if FORBIDDEN_LABELS.contains(&label.as_str()) {
            return Err(ErrorResult::bad_request(format!("can not save label: {label}")).with_field("metadata.labels"));
        }
    }
    if meta.annotations.contains_key(ANNO_GRANT_PERMISSIONS) {
        return Err(
            ErrorResult::bad_request(format!("can not save annotation: {ANNO_GRANT_PERMISSIONS}"))
                .with_field("metadata.annotations"),
        );
    }
    if !meta.generate_name.is_empty() {
        return Err(ErrorResult::bad_request("generateName is not supported").with_field("metadata.generateName"));
    }

    if key.namespace != meta.namespace {
        return Err(ErrorResult::bad_request("key/namespace do not match").with_field("metadata.namespace"));
    }
    let group = obj.group();
    if !group.is_empty() && group != key.group {
        return Err(ErrorResult::bad_request(format!(
            "group in key does not match group in the body ({} != {group})",
            key.group
        ))
        .with_field("apiVersion"));
    }

    if key.name.is_empty() && operation == Operation::Created {
        if meta.name.is_empty() {
            return Err(ErrorResult::bad_request("missing name").with_field("metadata.name"));
        }
        key.name = meta.name.clone();
    } else if key.name != meta.name {
        return Err(ErrorResult::bad_request(format!(
            "key/name do not match (key: {}, name: {})",
            key.name, meta.name
        ))
        .with_field("metadata.name"));
    }
    validate_name(&meta.name).map_err(|msg| ErrorResult::bad_request(msg).with_field("metadata.name"))
}

fn verify_create_provenance(
    requester: &Requester,
    obj: &ResourceObject,
) -> Checked<()> {
    let identity = requester.identity();
    let created_by = obj.created_by();
    if !created_by.is_empty() && created_by != identity {
        return Err(ErrorResult::bad_request(format!(
            "created by annotation does not match: metadata.annotations#{created_by}"
        ))
        .with_field("metadata.annotations"));
    }

    let updated_by = obj.updated_by();
    if (!updated_by.is_empty() || !obj.updated_timestamp().is_empty()) && updated_by != identity {
        return Err(
            ErrorResult::bad_request("create can not set the updated by or updated timestamp annotations")
                .with_field("metadata.annotations"),
        );
    }
    Ok(())
}

fn verify_update_provenance(
    requester: &Requester,
    obj: &ResourceObject,
    old: &ResourceObject,
) -> Checked<()> {
    let updated_by = obj.updated_by();
    if !updated_by.is_empty() && updated_by != requester.identity() {
        return Err(ErrorResult::bad_request(format!(
            "updated by annotation does not match: metadata.annotations#{updated_by}"
        ))
        .with_field("metadata.annotations"));
    }
    if obj.created_by() != old.created_by() {
        return Err(ErrorResult::bad_request("created by annotation can not be changed").with_field("metadata.annotations"));
    }
    if obj.metadata.creation_timestamp != old.metadata.creation_timestamp {
        return Err(ErrorResult::bad_request("creation timestamp can not be changed").with_field("metadata.creationTimestamp"));
    }
    Ok(())
}

/// 1..=253 characters of `[A-Za-z0-9-_.]`, starting and ending alphanumeric
pub(crate) fn validate_name(name: &str) -> std::result::Result<(), String> {
    if name.is_empty() {
        return Err("name can not be empty".to_string());
    }
    if name.len() > MAX_NAME_LENGTH {
        return Err(format!("name is too long, must be no more than {MAX_NAME_LENGTH} characters"));
    }
    if !name.chars().all(|c| c.is_ascii_alphanumeric() || matches!(c, '-' | '_' | '.')) {
        return Err(format!("name {name:?} contains invalid characters"));
    }
    let first = name.chars().next();
    let last = name.chars().last();
    let alnum = |c: Option<char>| c.map(|c| c.is_ascii_alphanumeric()).unwrap_or(false);
    if !alnum(first) || !alnum(last) {
        return Err(format!("name {name:?} must start and end with an alphanumeric character"));
    }
    Ok(())
}
