use std::sync::Arc;

use super::Authorizer;
use super::Requester;

pub type FolderAccessFn = Arc<dyn Fn(&Requester, &str) -> bool + Send + Sync>;
pub type OriginAccessFn = Arc<dyn Fn(&Requester, &str) -> bool + Send + Sync>;

/// Optional callbacks consulted while validating a write.
///
/// A missing folder callback rejects every non-empty folder; a missing origin
/// callback only admits the default origin.
#[derive(Clone, Default)]
pub struct WriteAccessHooks {
    pub folder_access: Option<FolderAccessFn>,
    pub origin_access: Option<OriginAccessFn>,
}

impl WriteAccessHooks {
    pub fn from_authorizer(authorizer: Arc<dyn Authorizer>) -> Self {
        let folders = authorizer.clone();
        let origins = authorizer;
        Self {
            folder_access: Some(Arc::new(move |requester: &Requester, folder: &str| {
                folders.can_write_to_folder(requester, folder)
            })),
            origin_access: Some(Arc::new(move |requester: &Requester, origin: &str| {
                origins.can_write_origin(requester, origin)
            })),
        }
    }

    pub fn can_write_to_folder(
        &self,
        requester: &Requester,
        folder: &str,
    ) -> bool {
        match &self.folder_access {
            Some(f) => f(requester, folder),
            None => false,
        }
    }

    pub fn can_write_origin(
        &self,
        requester: &Requester,
        origin: &str,
    ) -> bool {
        match &self.origin_access {
            Some(f) => f(requester, origin),
            None => false,
        }
    }
}
