//! Registration and login

mod common;

use std::sync::Arc;

use common::{issuer, MockHasher};
use robo_auth_core::{AuthError, AuthService};
use robo_db::MemoryStore;

fn auth(store: &MemoryStore) -> AuthService {
    AuthService::new(Arc::new(store.clone()), issuer(), Arc::new(MockHasher::new()))
}

#[tokio::test]
async fn test_register_then_login() {
    let store = MemoryStore::new();
    let auth = auth(&store);

    let user = auth
        .register("Alice", "alice@x.com", "s3cret-password")
        .await
        .unwrap();
    assert_eq!(user.email, "alice@x.com");

    let stored = store.snapshot().await;
    assert_ne!(stored.users[0].password_hash, "s3cret-password");

    let token = auth.login("ALICE@x.com", "s3cret-password").await.unwrap();
    let header = format!("Bearer {}", token.token);
    assert_eq!(auth.authenticate_user(Some(&header)).unwrap(), user.id);
}

#[tokio::test]
async fn test_duplicate_email_conflicts() {
    let store = MemoryStore::new();
    let auth = auth(&store);
    auth.register("Alice", "alice@x.com", "password-1").await.unwrap();

    let err = auth
        .register("Alice Two", "alice@x.com", "password-2")
        .await
        .unwrap_err();
    assert!(matches!(err, AuthError::Conflict(_)));
    assert_eq!(store.snapshot().await.users.len(), 1);
}

#[tokio::test]
async fn test_wrong_password_and_unknown_email() {
    let store = MemoryStore::new();
    let auth = auth(&store);
    auth.register("Alice", "alice@x.com", "password-1").await.unwrap();

    assert!(matches!(
        auth.login("alice@x.com", "password-2").await,
        Err(AuthError::InvalidCredentials)
    ));
    assert!(matches!(
        auth.login("bob@x.com", "password-1").await,
        Err(AuthError::InvalidCredentials)
    ));
}

#[tokio::test]
async fn test_invalid_registration_input() {
    let store = MemoryStore::new();
    let auth = auth(&store);

    for (name, email, password) in [
        ("A", "alice@x.com", "password-1"),
        ("Alice", "not-an-email", "password-1"),
        ("Alice", "alice@x.com", "short"),
    ] {
        let err = auth.register(name, email, password).await.unwrap_err();
        assert_eq!(err.status_code(), 400);
    }
    assert!(store.snapshot().await.users.is_empty());
}

#[tokio::test]
async fn test_profile_lookup() {
    let store = MemoryStore::new();
    let auth = auth(&store);
    let user = auth.register("Alice", "alice@x.com", "password-1").await.unwrap();

    let profile = auth.profile(user.id).await.unwrap();
    assert_eq!(profile.email, "alice@x.com");
    assert_eq!(profile.name, "Alice");

    let err = auth.profile(robo_types::UserId::new()).await.unwrap_err();
    assert!(matches!(err, AuthError::NotFound("user")));
}
