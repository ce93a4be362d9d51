use std::time::Instant;

use crate::session::types::StoredSession;
use crate::storage::{StorageError, UnitOfWork};
use crate::userdb::DB_TABLE_USERS;

use super::config::DB_TABLE_SESSIONS;

pub(super) async fn create_tables_postgres(uow: &mut UnitOfWork) -> Result<(), StorageError> {
    let sql = format!(
        r#"
        CREATE TABLE IF NOT EXISTS {DB_TABLE_SESSIONS} (
            id TEXT PRIMARY KEY,
            last_used DOUBLE PRECISION NOT NULL,
            user_id TEXT REFERENCES {DB_TABLE_USERS}(username) ON DELETE CASCADE
        )
        "#
    );
    let started = Instant::now();
    sqlx::query(&sql).execute(uow.postgres().await?).await?;
    uow.record_query(&sql, started);

    let sql = format!(
        "CREATE INDEX IF NOT EXISTS idx_{DB_TABLE_SESSIONS}_last_used ON {DB_TABLE_SESSIONS}(last_used)"
    );
    let started = Instant::now();
    sqlx::query(&sql).execute(uow.postgres().await?).await?;
    uow.record_query(&sql, started);
    uow.mark_dirty();
    Ok(())
}

pub(super) async fn get_session_postgres(
    uow: &mut UnitOfWork,
    key: &str,
) -> Result<Option<StoredSession>, StorageError> {
    let sql = format!("SELECT id, last_used, user_id FROM {DB_TABLE_SESSIONS} WHERE id = $1");
    let started = Instant::now();
    let session = sqlx::query_as::<_, StoredSession>(&sql)
        .bind(key)
        .fetch_optional(uow.postgres().await?)
        .await?;
    uow.record_query(&sql, started);
    Ok(session)
}

pub(super) async fn insert_session_postgres(
    uow: &mut UnitOfWork,
    session: &StoredSession,
) -> Result<bool, StorageError> {
    let sql = format!(
        r#"
        INSERT INTO {DB_TABLE_SESSIONS} (id, last_used, user_id)
        VALUES ($1, $2, $3)
        ON CONFLICT (id) DO NOTHING
        "#
    );
    let started = Instant::now();
    let result = sqlx::query(&sql)
        .bind(&session.id)
        .bind(session.last_used)
        .bind(&session.user_id)
        .execute(uow.postgres().await?)
        .await?;
    uow.record_query(&sql, started);
    uow.mark_dirty();
    Ok(result.rows_affected() > 0)
}

pub(super) async fn update_last_used_postgres(
    uow: &mut UnitOfWork,
    session: &StoredSession,
) -> Result<(), StorageError> {
    let sql = format!("UPDATE {DB_TABLE_SESSIONS} SET last_used = $1 WHERE id = $2");
    let started = Instant::now();
    sqlx::query(&sql)
        .bind(session.last_used)
        .bind(&session.id)
        .execute(uow.postgres().await?)
        .await?;
    uow.record_query(&sql, started);
    uow.mark_dirty();
    Ok(())
}

pub(super) async fn delete_session_postgres(
    uow: &mut UnitOfWork,
    key: &str,
) -> Result<u64, StorageError> {
    let sql = format!("DELETE FROM {DB_TABLE_SESSIONS} WHERE id = $1");
    let started = Instant::now();
    let result = sqlx::query(&sql)
        .bind(key)
        .execute(uow.postgres().await?)
        .await?;
    uow.record_query(&sql, started);
    uow.mark_dirty();
    Ok(result.rows_affected())
}

pub(super) async fn delete_sessions_used_before_postgres(
    uow: &mut UnitOfWork,
    cutoff: f64,
) -> Result<u64, StorageError> {
    let sql = format!("DELETE FROM {DB_TABLE_SESSIONS} WHERE last_used < $1");
    let started = Instant::now();
    let result = sqlx::query(&sql)
        .bind(cutoff)
        .execute(uow.postgres().await?)
        .await?;
    uow.record_query(&sql, started);
    uow.mark_dirty();
    Ok(result.rows_affected())
}
