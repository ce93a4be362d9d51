use std::time::Duration;

use crate::session::errors::SessionError;
use crate::session::storage::SessionStore;
use crate::session::types::{StoredSession, epoch_seconds};
use crate::storage::{DataStore, StorageError, UnitOfWorkError, with_unit_of_work};
use crate::userdb::{User, UserStore};

/// Fetch the persistent session `key`, creating it if it does not exist.
///
/// A new session is bound to `username` when that user exists. Creating the
/// same key twice, even concurrently, leaves a single row.
#[tracing::instrument(skip(store, key))]
pub async fn create_session(
    store: &DataStore,
    key: &str,
    username: Option<&str>,
) -> Result<StoredSession, SessionError> {
    if key.is_empty() {
        return Err(SessionError::Cookie("Empty session key".to_string()));
    }
    let key = key.to_string();
    let username = username.map(str::to_string);

    with_unit_of_work::<_, SessionError, _>(store, move |uow| {
        Box::pin(async move {
            if let Some(existing) = SessionStore::get(uow, &key).await? {
                tracing::debug!("Persistent session already exists");
                return Ok(existing);
            }

            let user_id = match username {
                Some(name) => match UserStore::get_user(uow, &name).await? {
                    Some(user) => Some(user.username),
                    None => {
                        tracing::warn!(username = %name, "Unknown user, leaving session unbound");
                        None
                    }
                },
                None => None,
            };

            let session = StoredSession::new(key.as_str(), user_id);
            let inserted = SessionStore::insert_if_absent(uow, &session).await?;
            uow.commit().await?;

            if inserted {
                tracing::debug!(user_id = ?session.user_id, "Created persistent session");
                return Ok(session);
            }

            // Someone else created it between our read and write
            tracing::debug!("Lost session create race, using the winner's row");
            SessionStore::get(uow, &key).await?.ok_or_else(|| {
                UnitOfWorkError::Data(StorageError::Database(
                    "Session disappeared after a concurrent create".to_string(),
                ))
            })
        })
    })
    .await
    .map_err(UnitOfWorkError::flatten)
}

/// The user bound to persistent session `key`, renewing the session.
///
/// Absent sessions and unbound sessions both give `None`.
#[tracing::instrument(skip_all)]
pub async fn authenticated_user_for_key(
    store: &DataStore,
    key: &str,
) -> Result<Option<User>, SessionError> {
    if key.is_empty() {
        return Ok(None);
    }
    let key = key.to_string();

    with_unit_of_work::<_, SessionError, _>(store, move |uow| {
        Box::pin(async move {
            let Some(mut session) = SessionStore::get(uow, &key).await? else {
                tracing::debug!("No persistent session for key");
                return Ok(None);
            };

            session.renew();
            SessionStore::update_last_used(uow, &session).await?;
            uow.commit().await?;

            match session.user_id {
                Some(username) => Ok(UserStore::get_user(uow, &username).await?),
                None => Ok(None),
            }
        })
    })
    .await
    .map_err(UnitOfWorkError::flatten)
}

/// Delete persistent session `key`. Returns whether a row was removed.
#[tracing::instrument(skip_all)]
pub async fn remove_session(store: &DataStore, key: &str) -> Result<bool, SessionError> {
    let key = key.to_string();

    with_unit_of_work::<_, SessionError, _>(store, move |uow| {
        Box::pin(async move {
            let removed = SessionStore::delete(uow, &key).await?;
            uow.commit().await?;
            Ok(removed > 0)
        })
    })
    .await
    .map_err(UnitOfWorkError::flatten)
}

/// Delete persistent sessions unused for longer than `lifetime`.
pub async fn sweep_expired_sessions(
    store: &DataStore,
    lifetime: Duration,
) -> Result<u64, SessionError> {
    let cutoff = epoch_seconds() - lifetime.as_secs_f64();

    let removed = with_unit_of_work::<_, SessionError, _>(store, move |uow| {
        Box::pin(async move {
            let removed = SessionStore::delete_used_before(uow, cutoff).await?;
            uow.commit().await?;
            Ok(removed)
        })
    })
    .await
    .map_err(UnitOfWorkError::flatten)?;

    tracing::info!(removed, "Swept expired persistent sessions");
    Ok(removed)
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::test_utils::{insert_test_user, memory_store, session_count};

    /// Creating a session twice leaves one row bound to the first user.
    #[tokio::test]
    async fn test_create_session_is_idempotent() {
        let store = memory_store().await;
        insert_test_user(&store, "alice", "secret", true).await;

        let first = create_session(&store, "key-1", Some("alice")).await.unwrap();
        let second = create_session(&store, "key-1", Some("alice")).await.unwrap();

        assert_eq!(first.id, second.id);
        assert_eq!(second.user_id.as_deref(), Some("alice"));
        assert_eq!(session_count(&store).await, 1);
    }

    #[tokio::test]
    async fn test_create_session_for_unknown_user_is_unbound() {
        let store = memory_store().await;

        let session = create_session(&store, "key-2", Some("ghost")).await.unwrap();

        assert!(session.user_id.is_none());
        assert_eq!(session_count(&store).await, 1);
        assert!(
            authenticated_user_for_key(&store, "key-2")
                .await
                .unwrap()
                .is_none()
        );
    }

    #[tokio::test]
    async fn test_create_session_rejects_empty_key() {
        let store = memory_store().await;
        let result = create_session(&store, "", None).await;
        assert!(matches!(result, Err(SessionError::Cookie(_))));
    }

    /// Concurrent creates of one key race benignly.
    #[tokio::test]
    async fn test_concurrent_create_session() {
        let store = memory_store().await;
        insert_test_user(&store, "alice", "secret", true).await;

        let (a, b) = tokio::join!(
            create_session(&store, "shared", Some("alice")),
            create_session(&store, "shared", Some("alice")),
        );

        assert_eq!(a.unwrap().id, "shared");
        assert_eq!(b.unwrap().id, "shared");
        assert_eq!(session_count(&store).await, 1);
    }

    #[tokio::test]
    async fn test_authenticated_user_for_key_renews_session() {
        let store = memory_store().await;
        insert_test_user(&store, "alice", "secret", true).await;
        create_session(&store, "key-3", Some("alice")).await.unwrap();

        // Age the row so the renewal is observable
        sqlx::query("UPDATE sessions SET last_used = last_used - 1000 WHERE id = ?")
            .bind("key-3")
            .execute(store.as_sqlite().unwrap())
            .await
            .unwrap();

        let user = authenticated_user_for_key(&store, "key-3").await.unwrap();
        assert_eq!(user.map(|u| u.username), Some("alice".to_string()));

        let last_used: f64 = sqlx::query_scalar("SELECT last_used FROM sessions WHERE id = ?")
            .bind("key-3")
            .fetch_one(store.as_sqlite().unwrap())
            .await
            .unwrap();
        assert!(epoch_seconds() - last_used < 100.0);
    }

    #[tokio::test]
    async fn test_lookup_after_removal_is_absent() {
        let store = memory_store().await;
        insert_test_user(&store, "alice", "secret", true).await;
        create_session(&store, "key-4", Some("alice")).await.unwrap();

        assert!(remove_session(&store, "key-4").await.unwrap());
        assert!(
            authenticated_user_for_key(&store, "key-4")
                .await
                .unwrap()
                .is_none()
        );

        // Removing again is a no-op
        assert!(!remove_session(&store, "key-4").await.unwrap());
    }

    #[tokio::test]
    async fn test_empty_key_is_absent() {
        let store = memory_store().await;
        assert!(authenticated_user_for_key(&store, "").await.unwrap().is_none());
    }

    /// The sweep deletes only rows older than the lifetime.
    #[tokio::test]
    async fn test_sweep_expired_sessions() {
        let store = memory_store().await;
        insert_test_user(&store, "alice", "secret", true).await;
        create_session(&store, "fresh", Some("alice")).await.unwrap();
        create_session(&store, "stale", Some("alice")).await.unwrap();

        sqlx::query("UPDATE sessions SET last_used = last_used - 7200 WHERE id = ?")
            .bind("stale")
            .execute(store.as_sqlite().unwrap())
            .await
            .unwrap();

        let removed = sweep_expired_sessions(&store, Duration::from_secs(3600))
            .await
            .unwrap();

        assert_eq!(removed, 1);
        assert_eq!(session_count(&store).await, 1);
        assert!(
            authenticated_user_for_key(&store, "fresh")
                .await
                .unwrap()
                .is_some()
        );
    }
}
