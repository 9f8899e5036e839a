use std::sync::Arc;

use super::*;
use crate::proto::ResourceKey;
use crate::AccessError;
use crate::Error;

fn requester() -> Requester {
    Requester::new("user", "u1", "alice")
}

#[tokio::test]
async fn test_fixed_allow() {
    let auth = FixedAuthorizer::allow_all();
    let key = ResourceKey::new("ns", "g", "r", "n");

    assert!(auth.can_create(&requester(), &key, "").await.is_ok());
    assert!(auth.can_delete(&requester(), &key, "f1").await.is_ok());
    let filter = auth.list_filter(&requester(), &key).await.unwrap();
    assert!(filter("ns", "n", ""));
    assert!(auth.can_write_to_folder(&requester(), "f1"));
}

#[tokio::test]
async fn test_fixed_deny() {
    let auth = FixedAuthorizer::deny_all();
    let key = ResourceKey::new("ns", "g", "r", "n");

    let err = auth.can_update(&requester(), &key, "").await.unwrap_err();
    assert!(matches!(err, Error::Access(AccessError::Forbidden(_))));
    let filter = auth.list_filter(&requester(), &key).await.unwrap();
    assert!(!filter("ns", "n", ""));
    assert!(!auth.can_write_origin(&requester(), "sync"));
}

#[tokio::test]
async fn test_ext_methods_use_matching_verb() {
    let mut auth = MockAuthorizer::new();
    auth.expect_check()
        .withf(|_, verb, _, folder| *verb == Verb::Update && folder == "f")
        .times(1)
        .returning(|_, _, _, _| Ok(()));
    auth.expect_compile()
        .withf(|_, verb, _| *verb == Verb::Get)
        .times(1)
        .returning(|_, _, _| {
            let checker: ItemChecker = Arc::new(|_: &str, _: &str, folder: &str| folder == "f");
            Ok(checker)
        });

    let key = ResourceKey::new("ns", "g", "r", "n");
    assert!(auth.can_update(&requester(), &key, "f").await.is_ok());
    let checker = auth.read_checker(&requester(), &key).await.unwrap();
    assert!(checker("ns", "n", "f"));
    assert!(!checker("ns", "n", "other"));
}

#[test]
fn test_hooks_default_reject() {
    let hooks = WriteAccessHooks::default();
    assert!(!hooks.can_write_to_folder(&requester(), "f1"));
    assert!(!hooks.can_write_origin(&requester(), "sync"));

    let hooks = WriteAccessHooks::from_authorizer(Arc::new(FixedAuthorizer::allow_all()));
    assert!(hooks.can_write_to_folder(&requester(), "f1"));
    assert!(hooks.can_write_origin(&requester(), "sync"));
}
