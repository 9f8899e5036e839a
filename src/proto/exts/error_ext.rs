use std::fmt;

use tonic::Code;
use tonic::Status;

use crate::proto::ErrorCause;
use crate::proto::ErrorDetails;
use crate::proto::ErrorResult;

pub(crate) const REASON_BAD_REQUEST: &str = "BadRequest";
pub(crate) const REASON_UNAUTHORIZED: &str = "Unauthorized";
pub(crate) const REASON_FORBIDDEN: &str = "Forbidden";
pub(crate) const REASON_NOT_FOUND: &str = "NotFound";
pub(crate) const REASON_CONFLICT: &str = "Conflict";
pub(crate) const REASON_ALREADY_EXISTS: &str = "AlreadyExists";
pub(crate) const REASON_INTERNAL: &str = "InternalError";
pub(crate) const REASON_NOT_IMPLEMENTED: &str = "NotImplemented";

impl ErrorResult {
    pub fn new(
        code: i32,
        reason: &str,
        message: impl Into<String>,
    ) -> Self {
        Self {
            message: message.into(),
            reason: reason.to_string(),
            details: None,
            code,
        }
    }

    pub fn bad_request(message: impl Into<String>) -> Self {
        Self::new(400, REASON_BAD_REQUEST, message)
    }

    pub fn unauthorized(message: impl Into<String>) -> Self {
        Self::new(401, REASON_UNAUTHORIZED, message)
    }

    pub fn forbidden(message: impl Into<String>) -> Self {
        Self::new(403, REASON_FORBIDDEN, message)
    }

    pub fn not_found(message: impl Into<String>) -> Self {
        Self::new(404, REASON_NOT_FOUND, message)
    }

    pub fn conflict(message: impl Into<String>) -> Self {
        Self::new(409, REASON_CONFLICT, message)
    }

    pub fn already_exists(message: impl Into<String>) -> Self {
        Self::new(409, REASON_ALREADY_EXISTS, message)
    }

    pub fn optimistic_locking_failed() -> Self {
        Self::conflict("optimistic locking failed")
    }

    pub fn internal(message: impl Into<String>) -> Self {
        Self::new(500, REASON_INTERNAL, message)
    }

    pub fn not_implemented(message: impl Into<String>) -> Self {
        Self::new(501, REASON_NOT_IMPLEMENTED, message)
    }

    /// Attach a field level cause carrying the same message.
    pub fn with_field(
        mut self,
        field: &str,
    ) -> Self {
        let cause = ErrorCause {
            reason: self.reason.clone(),
            message: self.message.clone(),
            field: field.to_string(),
        };
        self.details.get_or_insert_with(ErrorDetails::default).causes.push(cause);
        self
    }

    pub fn with_details(
        mut self,
        details: ErrorDetails,
    ) -> Self {
        self.details = Some(details);
        self
    }

    pub fn is_conflict(&self) -> bool {
        self.code == 409
    }

    pub fn is_not_found(&self) -> bool {
        self.code == 404
    }
}

impl fmt::Display for ErrorResult {
    fn fmt(
        &self,
        f: &mut fmt::Formatter<'_>,
    ) -> fmt::Result {
        write!(f, "{} ({}): {}", self.code, self.reason, self.message)
    }
}

impl std::error::Error for ErrorResult {}

impl From<ErrorResult> for Status {
    fn from(err: ErrorResult) -> Self {
        let code = match err.code {
            400 => Code::InvalidArgument,
            401 => Code::Unauthenticated,
            403 => Code::PermissionDenied,
            404 => Code::NotFound,
            409 if err.reason == REASON_ALREADY_EXISTS => Code::AlreadyExists,
            409 => Code::Aborted,
            501 => Code::Unimplemented,
            _ => Code::Internal,
        };
        Status::new(code, err.message)
    }
}
