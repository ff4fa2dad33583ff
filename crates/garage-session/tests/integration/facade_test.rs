use std::sync::Arc;
use std::sync::atomic::Ordering;

use garage_domain::principal::Principal;
use garage_domain::profile::Profile;
use garage_domain::role::Role;
use garage_session::{SessionError, ShadowStore};

use crate::helpers::{
    MockProfileStore, MockProvider, mount, ready, shadow_store, test_profile, test_session,
    test_shadow, wait_until,
};

// ── adopt_shadow_session ─────────────────────────────────────────────────────

#[tokio::test]
async fn should_restore_adopted_shadow_session_after_reload() {
    let store = shadow_store();
    let provider = Arc::new(MockProvider::empty());

    let facade = mount(
        Arc::clone(&provider),
        MockProfileStore::empty(),
        Arc::clone(&store),
    );
    ready(&facade).await;
    facade
        .adopt_shadow_session(test_shadow("e1", "Ana", Role::Manager))
        .unwrap();
    facade.unmount().await;

    // Same session-scoped store, fresh mount: a page reload.
    let reloaded = mount(provider, MockProfileStore::empty(), store);
    ready(&reloaded).await;

    let principal = reloaded.principal();
    assert_eq!(
        principal.profile(),
        Some(&Profile {
            id: "e1".to_owned(),
            email: None,
            full_name: "Ana".to_owned(),
            role: Role::Manager,
        })
    );
    assert_eq!(principal.id(), Some("e1"));
}

#[tokio::test]
async fn should_clear_loading_when_adopting() {
    let provider = Arc::new(MockProvider::empty());
    let facade = mount(provider, MockProfileStore::empty(), shadow_store());

    facade
        .adopt_shadow_session(test_shadow("e1", "Ana", Role::Manager))
        .unwrap();

    assert!(!facade.loading());
    assert_eq!(facade.principal().role(), Some(Role::Manager));
}

#[tokio::test]
async fn should_be_idempotent_for_same_record() {
    let store = shadow_store();
    let facade = mount(
        Arc::new(MockProvider::empty()),
        MockProfileStore::empty(),
        Arc::clone(&store),
    );
    ready(&facade).await;
    let record = test_shadow("e1", "Ana", Role::Manager);

    facade.adopt_shadow_session(record.clone()).unwrap();
    let once = (facade.snapshot(), store.load());
    let mut rx = facade.watch();
    rx.mark_unchanged();

    facade.adopt_shadow_session(record).unwrap();
    let twice = (facade.snapshot(), store.load());

    assert_eq!(once, twice);
    assert!(!rx.has_changed().unwrap());
}

#[tokio::test]
async fn should_replace_previous_shadow_record() {
    let store = shadow_store();
    let facade = mount(
        Arc::new(MockProvider::empty()),
        MockProfileStore::empty(),
        Arc::clone(&store),
    );
    ready(&facade).await;

    facade
        .adopt_shadow_session(test_shadow("e1", "Ana", Role::Manager))
        .unwrap();
    facade
        .adopt_shadow_session(test_shadow("e2", "Luis", Role::Operator))
        .unwrap();

    assert_eq!(
        facade.principal(),
        Principal::shadow(&test_shadow("e2", "Luis", Role::Operator))
    );
    assert_eq!(store.load(), Some(test_shadow("e2", "Luis", Role::Operator)));
}

#[tokio::test]
async fn should_refuse_adoption_while_federated_session_is_active() {
    let store = shadow_store();
    let provider = Arc::new(MockProvider::new(Some(test_session("U1", "t1"))));
    let facade = mount(
        provider,
        MockProfileStore::new(vec![test_profile("U1", Role::Owner)]),
        Arc::clone(&store),
    );
    ready(&facade).await;

    let result = facade.adopt_shadow_session(test_shadow("e1", "Ana", Role::Manager));

    assert!(
        matches!(result, Err(SessionError::FederatedSessionActive)),
        "expected FederatedSessionActive, got {result:?}"
    );
    assert_eq!(store.load(), None);
    assert_eq!(facade.principal().role(), Some(Role::Owner));
}

// ── sign_out ─────────────────────────────────────────────────────────────────

#[tokio::test]
async fn should_sign_out_federated_session() {
    let provider = Arc::new(MockProvider::new(Some(test_session("U1", "t1"))));
    let calls = Arc::clone(&provider.sign_out_calls);
    let facade = mount(
        provider,
        MockProfileStore::new(vec![test_profile("U1", Role::Owner)]),
        shadow_store(),
    );
    wait_until(&facade, |s| s.profile.is_some()).await;

    facade.sign_out().await.unwrap();
    let state = ready(&facade).await;

    assert_eq!(calls.load(Ordering::SeqCst), 1);
    assert_eq!(facade.principal(), Principal::None);
    assert_eq!(state.session, None);
    assert_eq!(state.profile, None);
}

#[tokio::test]
async fn should_clear_shadow_session_on_sign_out() {
    let store = shadow_store();
    let facade = mount(
        Arc::new(MockProvider::empty()),
        MockProfileStore::empty(),
        Arc::clone(&store),
    );
    ready(&facade).await;
    facade
        .adopt_shadow_session(test_shadow("e1", "Ana", Role::Manager))
        .unwrap();

    facade.sign_out().await.unwrap();

    assert_eq!(facade.principal(), Principal::None);
    assert_eq!(store.load(), None);
    assert!(!facade.loading());
}

#[tokio::test]
async fn should_reset_locally_even_when_provider_sign_out_fails() {
    let store = shadow_store();
    let mut provider = MockProvider::empty();
    provider.fail_sign_out = true;
    let facade = mount(Arc::new(provider), MockProfileStore::empty(), Arc::clone(&store));
    ready(&facade).await;
    facade
        .adopt_shadow_session(test_shadow("e1", "Ana", Role::Manager))
        .unwrap();

    let result = facade.sign_out().await;

    assert!(
        matches!(result, Err(SessionError::ProviderUnavailable(_))),
        "expected ProviderUnavailable, got {result:?}"
    );
    assert_eq!(facade.principal(), Principal::None);
    assert_eq!(store.load(), None);
    assert!(!facade.loading());
}
