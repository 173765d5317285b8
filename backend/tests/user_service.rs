use gatekeeper_backend::{
    error::AppError,
    models::user::{RegisterUser, UserRole, UserStatus},
    services::auth::ADMIN_RIGHTS_MARGIN,
};

#[path = "support/mod.rs"]
mod support;

#[tokio::test]
async fn register_normalizes_email_and_rejects_duplicates() {
    let Some(pool) = support::try_pool().await else {
        return;
    };
    let state = support::test_state(&pool);

    let email = support::unique_email("alice");
    let mixed_case = format!("  {}  ", email.to_ascii_uppercase());

    let user = state
        .users
        .register(RegisterUser {
            email: mixed_case.clone(),
            password: "Aa1!aaaa".into(),
        })
        .await
        .expect("register");
    assert_eq!(user.email, email);
    assert_eq!(user.role, UserRole::User);

    // Same address in different casing is the same account.
    let duplicate = state
        .users
        .register(RegisterUser {
            email,
            password: "Aa1!aaaa".into(),
        })
        .await;
    assert!(matches!(duplicate, Err(AppError::AlreadyExists { .. })));
}

#[tokio::test]
async fn register_applies_the_password_predicate() {
    let Some(pool) = support::try_pool().await else {
        return;
    };
    let state = support::test_state(&pool);

    let rejected = state
        .users
        .register(RegisterUser {
            email: support::unique_email("weak"),
            password: "password".into(),
        })
        .await;
    assert!(matches!(rejected, Err(AppError::Validation(_))));
}

#[tokio::test]
async fn get_initiator_rejects_blocked_accounts() {
    let Some(pool) = support::try_pool().await else {
        return;
    };
    let state = support::test_state(&pool);

    let root = support::seed_user(&pool, UserRole::SuperUser).await;
    let target = support::seed_user(&pool, UserRole::User).await;

    assert!(state.users.get_initiator(target.id).await.is_ok());

    state
        .auth
        .admin_set_status(root.id, target.id, UserStatus::Blocked)
        .await
        .expect("block user");

    let blocked = state.users.get_initiator(target.id).await;
    assert!(matches!(blocked, Err(AppError::Unauthenticated(_))));
}

#[tokio::test]
async fn compare_rights_resolves_both_parties() {
    let Some(pool) = support::try_pool().await else {
        return;
    };
    let state = support::test_state(&pool);

    let admin = support::seed_user(&pool, UserRole::Admin).await;
    let moderator = support::seed_user(&pool, UserRole::Moderator).await;
    let root = support::seed_user(&pool, UserRole::SuperUser).await;

    let (initiator, target) = state
        .users
        .compare_rights_for_admins(admin.id, moderator.id, ADMIN_RIGHTS_MARGIN)
        .await
        .expect("admin outranks moderator");
    assert_eq!(initiator.id, admin.id);
    assert_eq!(target.id, moderator.id);

    let denied = state
        .users
        .compare_rights_for_admins(admin.id, root.id, ADMIN_RIGHTS_MARGIN)
        .await;
    assert!(matches!(denied, Err(AppError::NoPermissions(_))));

    let unknown = state
        .users
        .compare_rights_for_admins(admin.id, gatekeeper_backend::types::UserId::new(), 1)
        .await;
    assert!(matches!(unknown, Err(AppError::NotFound { .. })));
}
