//! Shared helpers for the unit tests of this crate

use std::env;

use crate::session::StoredSession;
use crate::storage::{DataEventBus, DataStore, DataStoreConfig};
use crate::userdb::User;

/// Set an environment variable for the duration of `test` and restore the
/// original value afterward. Callers must be `#[serial]`.
pub(crate) fn with_env_var<F, R>(key: &str, value: Option<&str>, test: F) -> R
where
    F: FnOnce() -> R,
{
    let original = env::var(key).ok();

    match value {
        Some(val) => unsafe { env::set_var(key, val) },
        None => unsafe { env::remove_var(key) },
    }

    let result = test();

    match original {
        Some(val) => unsafe { env::set_var(key, val) },
        None => unsafe { env::remove_var(key) },
    }

    result
}

/// A private in-memory SQLite database with the schema in place and an event
/// bus attached.
pub(crate) async fn memory_store() -> DataStore {
    let config = DataStoreConfig {
        store_type: "sqlite".to_string(),
        url: "sqlite::memory:".to_string(),
        debug_sql: false,
    };
    let store = DataStore::connect_lazy(&config)
        .expect("in-memory store")
        .with_event_bus(DataEventBus::new());
    crate::init(&store).await.expect("schema");
    store
}

/// Insert a user directly, bypassing any unit of work.
pub(crate) async fn insert_test_user(
    store: &DataStore,
    username: &str,
    password: &str,
    confirmed: bool,
) -> User {
    let mut user = User::new(username)
        .with_password(password)
        .expect("hash password");
    if confirmed {
        user = user.confirmed();
    }

    sqlx::query(
        r#"
        INSERT INTO users (
            username, identifier, display_name, email, active, confirmed, passwd_hash,
            last_used, last_login, agreed_to_tos, is_admin, items_per_page, tzinfo
        )
        VALUES (?, ?, ?, ?, ?, ?, ?, ?, ?, ?, ?, ?, ?)
        "#,
    )
    .bind(&user.username)
    .bind(&user.identifier)
    .bind(&user.display_name)
    .bind(&user.email)
    .bind(user.active)
    .bind(user.confirmed)
    .bind(&user.passwd_hash)
    .bind(user.last_used)
    .bind(user.last_login)
    .bind(user.agreed_to_tos)
    .bind(user.is_admin)
    .bind(user.items_per_page)
    .bind(&user.tzinfo)
    .execute(store.as_sqlite().expect("sqlite store"))
    .await
    .expect("insert user");

    user
}

pub(crate) async fn fetch_user(store: &DataStore, username: &str) -> Option<User> {
    sqlx::query_as::<_, User>("SELECT * FROM users WHERE username = ?")
        .bind(username)
        .fetch_optional(store.as_sqlite().expect("sqlite store"))
        .await
        .expect("fetch user")
}

pub(crate) async fn stored_session(store: &DataStore, key: &str) -> Option<StoredSession> {
    sqlx::query_as::<_, StoredSession>("SELECT id, last_used, user_id FROM sessions WHERE id = ?")
        .bind(key)
        .fetch_optional(store.as_sqlite().expect("sqlite store"))
        .await
        .expect("fetch session")
}

pub(crate) async fn session_count(store: &DataStore) -> i64 {
    sqlx::query_scalar("SELECT COUNT(*) FROM sessions")
        .fetch_one(store.as_sqlite().expect("sqlite store"))
        .await
        .expect("count sessions")
}
