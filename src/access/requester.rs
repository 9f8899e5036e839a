use std::fmt;

use serde::Deserialize;
use serde::Serialize;
use tokio_util::sync::CancellationToken;

use crate::AccessError;
use crate::Result;

/// The authenticated caller of a request
#[derive(Debug, Clone, PartialEq, Eq, Hash, Serialize, Deserialize)]
pub struct Requester {
    pub uid: String,
    pub name: String,
    /// e.g. `user`, `service-account`
    pub identity_type: String,
}

impl Requester {
    pub fn new(
        identity_type: impl Into<String>,
        uid: impl Into<String>,
        name: impl Into<String>,
    ) -> Self {
        Self {
            uid: uid.into(),
            name: name.into(),
            identity_type: identity_type.into(),
        }
    }

    /// `type:uid`, the value written into provenance annotations
    pub fn identity(&self) -> String {
        format!("{}:{}", self.identity_type, self.uid)
    }
}

impl fmt::Display for Requester {
    fn fmt(
        &self,
        f: &mut fmt::Formatter<'_>,
    ) -> fmt::Result {
        f.write_str(&self.identity())
    }
}

/// Per call context: who is calling and when the caller gave up.
#[derive(Debug, Clone, Default)]
pub struct RequestContext {
    pub requester: Option<Requester>,
    pub cancel: CancellationToken,
}

impl RequestContext {
    pub fn new(requester: Requester) -> Self {
        Self {
            requester: Some(requester),
            cancel: CancellationToken::new(),
        }
    }

    pub fn anonymous() -> Self {
        Self::default()
    }

    pub fn with_cancel(
        mut self,
        cancel: CancellationToken,
    ) -> Self {
        self.cancel = cancel;
        self
    }

    /// Picks up the [`Requester`] an authentication interceptor stored in
    /// the request extensions.
    pub fn from_request<T>(request: &tonic::Request<T>) -> Self {
        Self {
            requester: request.extensions().get::<Requester>().cloned(),
            cancel: CancellationToken::new(),
        }
    }

    pub fn requester(&self) -> Result<&Requester> {
        self.requester.as_ref().ok_or_else(|| AccessError::Unauthenticated.into())
    }

    pub fn is_cancelled(&self) -> bool {
        self.cancel.is_cancelled()
    }
}
