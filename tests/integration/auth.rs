use crate::common::{PASSWORD, login_as, memory_app};
use inkpost::auth::Authenticatable;
use inkpost::error::{AuthError, BlogError, StorageError, ValidationError};

#[tokio::test]
async fn register_hashes_the_password() {
    let app = memory_app(10);
    let user = app.register("alice", PASSWORD, Some("alice@example.com")).await.unwrap();
    assert_ne!(user.password_hash, PASSWORD);
    assert!(user.password_hash.starts_with("$argon2"));
    assert_eq!(user.email.as_deref(), Some("alice@example.com"));
    assert!(!user.is_admin);
}

#[tokio::test]
async fn register_validates_input() {
    let app = memory_app(10);
    let err = app.register("", PASSWORD, None).await.unwrap_err();
    assert!(matches!(err, BlogError::Validation(ValidationError::Required("username"))));

    let long = "x".repeat(65);
    let err = app.register(&long, PASSWORD, None).await.unwrap_err();
    assert!(matches!(
        err,
        BlogError::Validation(ValidationError::TooLong { max: 64, actual: 65, .. })
    ));

    let err = app.register("bob", "", None).await.unwrap_err();
    assert!(matches!(err, BlogError::Validation(ValidationError::Required("password"))));
}

#[tokio::test]
async fn duplicate_registration_conflicts() {
    let app = memory_app(10);
    app.register("alice", PASSWORD, None).await.unwrap();
    let err = app.register("alice", "other", None).await.unwrap_err();
    assert!(matches!(err, BlogError::Storage(StorageError::Duplicate(_))));
    assert_eq!(err.status_code(), 409);
}

#[tokio::test]
async fn login_checks_the_password() {
    let app = memory_app(10);
    app.register("alice", PASSWORD, None).await.unwrap();

    let session = app.login("alice", PASSWORD, true).await.unwrap();
    assert_eq!(session.user().username, "alice");
    assert!(session.remember());

    let err = app.login("alice", "wrong", false).await.unwrap_err();
    assert!(matches!(err, BlogError::Auth(AuthError::InvalidCredentials(_))));

    let err = app.login("mallory", PASSWORD, false).await.unwrap_err();
    assert!(matches!(err, BlogError::Auth(AuthError::InvalidCredentials(_))));
    assert_eq!(err.client_message(), "Invalid username or password");
}

#[tokio::test]
async fn session_token_resumes_the_same_user() {
    let app = memory_app(10);
    let session = login_as(&app, "alice", false).await;
    let cookie = session.token().to_string();

    let resumed = app.resume(&cookie).await.unwrap();
    assert_eq!(resumed.user().id, session.user().id);
    assert_eq!(resumed.user().auth_id(), session.user().id);

    app.logout(session);
}

#[tokio::test]
async fn forged_tokens_are_rejected() {
    let app = memory_app(10);
    let alice = login_as(&app, "alice", false).await;
    let bob = login_as(&app, "bob", false).await;

    // Bob's signature presented with Alice's id.
    let bob_cookie = bob.token().to_string();
    let (_, sig) = bob_cookie.split_once('.').unwrap();
    let forged = format!("{}.{sig}", alice.user().id);

    for raw in [forged.as_str(), "garbage", "999.0.abc", ""] {
        let err = app.resume(raw).await.unwrap_err();
        assert!(
            matches!(err, BlogError::Auth(AuthError::InvalidToken)),
            "{raw}: {err}"
        );
    }
}

#[tokio::test]
async fn tokens_from_another_secret_are_rejected() {
    let app = memory_app(10);
    let session = login_as(&app, "alice", false).await;
    let foreign = session
        .user()
        .session_token("some-other-secret", false)
        .unwrap()
        .to_string();
    assert!(app.resume(&foreign).await.is_err());
    assert!(app.resume(&session.token().to_string()).await.is_ok());
}

#[tokio::test]
async fn resumed_session_keeps_remember_me() {
    let app = memory_app(10);
    app.register("alice", PASSWORD, None).await.unwrap();

    let kept = app.login("alice", PASSWORD, true).await.unwrap();
    let resumed = app.resume(&kept.token().to_string()).await.unwrap();
    assert!(resumed.remember());

    let brief = app.login("alice", PASSWORD, false).await.unwrap();
    let resumed = app.resume(&brief.token().to_string()).await.unwrap();
    assert!(!resumed.remember());

    // Upgrading a short session to a remembered one needs a new signature.
    let upgraded = brief.token().to_string().replacen(".0.", ".1.", 1);
    let err = app.resume(&upgraded).await.unwrap_err();
    assert!(matches!(err, BlogError::Auth(AuthError::InvalidToken)));
}

#[tokio::test]
async fn password_change_invalidates_sessions() {
    let app = memory_app(10);
    let session = login_as(&app, "alice", false).await;
    let mut changed = session.user().clone();
    changed.password_hash = inkpost::auth::hash_password("new password").unwrap();
    assert!(!session.token().verify("test-secret", &changed));
    assert!(session.token().verify("test-secret", session.user()));
}
