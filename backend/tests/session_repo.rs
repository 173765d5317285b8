use chrono::{Duration as ChronoDuration, Utc};

use gatekeeper_backend::{
    models::session::Session,
    models::user::UserRole,
    models::{SessionSort, SessionSortField, SortDirection},
    repositories::session as session_repo,
    types::{SessionId, UserId},
};

#[path = "support/mod.rs"]
mod support;

fn session_at(
    user_id: UserId,
    client: &str,
    created_offset_minutes: i64,
    used_offset_minutes: i64,
) -> Session {
    let now = Utc::now();
    Session {
        id: SessionId::new(),
        user_id,
        refresh_ciphertext: format!("enc:v1:stub:{}", SessionId::new()),
        client: client.to_string(),
        ip: "192.0.2.1".to_string(),
        created_at: now - ChronoDuration::minutes(created_offset_minutes),
        last_used_at: now - ChronoDuration::minutes(used_offset_minutes),
    }
}

#[tokio::test]
async fn find_session_enforces_ownership_in_the_filter() {
    let Some(pool) = support::try_pool().await else {
        return;
    };

    let owner = support::seed_user(&pool, UserRole::User).await;
    let stranger = support::seed_user(&pool, UserRole::User).await;
    let session = session_at(owner.id, "firefox", 0, 0);
    session_repo::insert_session(&pool, &session)
        .await
        .expect("insert session");

    let found = session_repo::find_session(&pool, session.id, owner.id)
        .await
        .expect("find session");
    assert_eq!(found.expect("session present").id, session.id);

    // Same id, different claimed owner: indistinguishable from absent.
    let foreign = session_repo::find_session(&pool, session.id, stranger.id)
        .await
        .expect("find session");
    assert!(foreign.is_none());
}

#[tokio::test]
async fn list_orders_by_requested_field_and_direction() {
    let Some(pool) = support::try_pool().await else {
        return;
    };

    let user = support::seed_user(&pool, UserRole::User).await;
    // oldest created, most recently used
    let a = session_at(user.id, "a", 30, 1);
    let b = session_at(user.id, "b", 20, 20);
    let c = session_at(user.id, "c", 10, 40);
    for session in [&a, &b, &c] {
        session_repo::insert_session(&pool, session)
            .await
            .expect("insert session");
    }

    let newest_first = SessionSort::default();
    let rows = session_repo::list_sessions_for_user(&pool, user.id, &newest_first, 10, 0)
        .await
        .expect("list sessions");
    let clients: Vec<_> = rows.iter().map(|s| s.client.as_str()).collect();
    assert_eq!(clients, vec!["c", "b", "a"]);

    let by_last_used_asc = SessionSort {
        field: SessionSortField::LastUsedAt,
        direction: SortDirection::Asc,
    };
    let rows = session_repo::list_sessions_for_user(&pool, user.id, &by_last_used_asc, 10, 0)
        .await
        .expect("list sessions");
    let clients: Vec<_> = rows.iter().map(|s| s.client.as_str()).collect();
    assert_eq!(clients, vec!["c", "b", "a"]);

    let rows = session_repo::list_sessions_for_user(&pool, user.id, &newest_first, 2, 1)
        .await
        .expect("list sessions");
    let clients: Vec<_> = rows.iter().map(|s| s.client.as_str()).collect();
    assert_eq!(clients, vec!["b", "a"]);
}

#[tokio::test]
async fn rotation_is_conditional_on_the_current_ciphertext() {
    let Some(pool) = support::try_pool().await else {
        return;
    };

    let user = support::seed_user(&pool, UserRole::User).await;
    let session = session_at(user.id, "firefox", 0, 0);
    session_repo::insert_session(&pool, &session)
        .await
        .expect("insert session");

    let rotated = session_repo::rotate_session_ciphertext(
        &pool,
        session.id,
        &session.refresh_ciphertext,
        "enc:v1:rotated:payload",
        Utc::now(),
    )
    .await
    .expect("rotate");
    assert!(rotated);

    // The original ciphertext no longer matches; a second rotation with it
    // must lose.
    let raced = session_repo::rotate_session_ciphertext(
        &pool,
        session.id,
        &session.refresh_ciphertext,
        "enc:v1:raced:payload",
        Utc::now(),
    )
    .await
    .expect("rotate");
    assert!(!raced);

    let row = session_repo::find_session(&pool, session.id, user.id)
        .await
        .expect("find session")
        .expect("session present");
    assert_eq!(row.refresh_ciphertext, "enc:v1:rotated:payload");
}

#[tokio::test]
async fn delete_all_for_user_leaves_other_users_untouched() {
    let Some(pool) = support::try_pool().await else {
        return;
    };

    let victim = support::seed_user(&pool, UserRole::User).await;
    let bystander = support::seed_user(&pool, UserRole::User).await;
    for i in 0..3 {
        session_repo::insert_session(&pool, &session_at(victim.id, "v", i, i))
            .await
            .expect("insert session");
    }
    let kept = session_at(bystander.id, "ok", 0, 0);
    session_repo::insert_session(&pool, &kept)
        .await
        .expect("insert session");

    let removed = session_repo::delete_sessions_for_user(&pool, victim.id)
        .await
        .expect("delete sessions");
    assert_eq!(removed, 3);

    let remaining =
        session_repo::list_sessions_for_user(&pool, bystander.id, &SessionSort::default(), 10, 0)
            .await
            .expect("list sessions");
    assert_eq!(remaining.len(), 1);
    assert_eq!(remaining[0].id, kept.id);
}

#[tokio::test]
async fn idle_cleanup_removes_only_expired_lineages() {
    let Some(pool) = support::try_pool().await else {
        return;
    };

    let user = support::seed_user(&pool, UserRole::User).await;
    // Offsets far beyond anything other tests write, since the cutoff
    // sweeps the whole table.
    let stale = session_at(user.id, "stale", 600, 590);
    let fresh = session_at(user.id, "fresh", 600, 5);
    session_repo::insert_session(&pool, &stale)
        .await
        .expect("insert session");
    session_repo::insert_session(&pool, &fresh)
        .await
        .expect("insert session");

    let cutoff = Utc::now() - ChronoDuration::minutes(300);
    session_repo::delete_sessions_idle_before(&pool, cutoff)
        .await
        .expect("cleanup");

    let rows = session_repo::list_sessions_for_user(&pool, user.id, &SessionSort::default(), 10, 0)
        .await
        .expect("list sessions");
    let clients: Vec<_> = rows.iter().map(|s| s.client.as_str()).collect();
    assert_eq!(clients, vec!["fresh"]);
}
