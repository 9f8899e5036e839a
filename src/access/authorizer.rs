use std::fmt;
use std::sync::Arc;

#[cfg(test)]
use mockall::automock;
use tonic::async_trait;

use super::Requester;
use crate::proto::ResourceKey;
use crate::AccessError;
use crate::Result;

#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum Verb {
    Get,
    List,
    Watch,
    Create,
    Update,
    Delete,
    DeleteCollection,
}

impl Verb {
    pub fn as_str(&self) -> &'static str {
        match self {
            Verb::Get => "get",
            Verb::List => "list",
            Verb::Watch => "watch",
            Verb::Create => "create",
            Verb::Update => "update",
            Verb::Delete => "delete",
            Verb::DeleteCollection => "deletecollection",
        }
    }
}

impl fmt::Display for Verb {
    fn fmt(
        &self,
        f: &mut fmt::Formatter<'_>,
    ) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

/// Precompiled per item decision over `(namespace, name, folder)`.
pub type ItemChecker = Arc<dyn Fn(&str, &str, &str) -> bool + Send + Sync>;

/// Capability checks consumed by the store.
///
/// A denial is reported as [`AccessError::Forbidden`]; any other error means
/// the decision could not be made.
#[cfg_attr(test, automock)]
#[async_trait]
pub trait Authorizer: Send + Sync + 'static {
    async fn check(
        &self,
        requester: &Requester,
        verb: Verb,
        key: &ResourceKey,
        folder: &str,
    ) -> Result<()>;

    /// Build a reusable checker for many items of the same collection
    async fn compile(
        &self,
        requester: &Requester,
        verb: Verb,
        key: &ResourceKey,
    ) -> Result<ItemChecker>;

    fn can_write_to_folder(
        &self,
        requester: &Requester,
        folder: &str,
    ) -> bool;

    fn can_write_origin(
        &self,
        requester: &Requester,
        origin: &str,
    ) -> bool;
}

/// Named capability checks on top of [`Authorizer`]
#[async_trait]
pub trait AuthorizerExt: Authorizer {
    async fn can_create(
        &self,
        requester: &Requester,
        key: &ResourceKey,
        folder: &str,
    ) -> Result<()> {
        self.check(requester, Verb::Create, key, folder).await
    }

    async fn can_update(
        &self,
        requester: &Requester,
        key: &ResourceKey,
        folder: &str,
    ) -> Result<()> {
        self.check(requester, Verb::Update, key, folder).await
    }

    async fn can_delete(
        &self,
        requester: &Requester,
        key: &ResourceKey,
        folder: &str,
    ) -> Result<()> {
        self.check(requester, Verb::Delete, key, folder).await
    }

    /// Compiled before the value is read; the stored folder is only known
    /// afterwards.
    async fn read_checker(
        &self,
        requester: &Requester,
        key: &ResourceKey,
    ) -> Result<ItemChecker> {
        self.compile(requester, Verb::Get, key).await
    }

    async fn list_filter(
        &self,
        requester: &Requester,
        key: &ResourceKey,
    ) -> Result<ItemChecker> {
        self.compile(requester, Verb::List, key).await
    }
}

impl<A: Authorizer + ?Sized> AuthorizerExt for A {}

/// Constant decision for every check
#[derive(Debug, Clone, Copy)]
pub struct FixedAuthorizer {
    allow: bool,
}

impl FixedAuthorizer {
    pub fn allow_all() -> Self {
        Self { allow: true }
    }

    pub fn deny_all() -> Self {
        Self { allow: false }
    }
}

#[async_trait]
impl Authorizer for FixedAuthorizer {
    async fn check(
        &self,
        requester: &Requester,
        verb: Verb,
        key: &ResourceKey,
        _folder: &str,
    ) -> Result<()> {
        if self.allow {
            Ok(())
        } else {
            Err(AccessError::Forbidden(format!("{requester} can not {verb} {key}")).into())
        }
    }

    async fn compile(
        &self,
        _requester: &Requester,
        _verb: Verb,
        _key: &ResourceKey,
    ) -> Result<ItemChecker> {
        let allow = self.allow;
        Ok(Arc::new(move |_: &str, _: &str, _: &str| allow))
    }

    fn can_write_to_folder(
        &self,
        _requester: &Requester,
        _folder: &str,
    ) -> bool {
        self.allow
    }

    fn can_write_origin(
        &self,
        _requester: &Requester,
        _origin: &str,
    ) -> bool {
        self.allow
    }
}
