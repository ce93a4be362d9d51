use std::time::Instant;

use crate::storage::{StorageError, UnitOfWork};
use crate::userdb::types::User;

use super::config::DB_TABLE_USERS;

// PostgreSQL implementations
pub(super) async fn create_tables_postgres(uow: &mut UnitOfWork) -> Result<(), StorageError> {
    let sql = format!(
        r#"
        CREATE TABLE IF NOT EXISTS {DB_TABLE_USERS} (
            username TEXT PRIMARY KEY,
            identifier TEXT,
            display_name TEXT NOT NULL DEFAULT 'Anonymous',
            email TEXT,
            active BOOLEAN NOT NULL DEFAULT false,
            confirmed BOOLEAN NOT NULL DEFAULT false,
            passwd_hash TEXT,
            last_used TIMESTAMPTZ NOT NULL,
            last_login TIMESTAMPTZ NOT NULL,
            agreed_to_tos BOOLEAN NOT NULL DEFAULT false,
            is_admin BOOLEAN NOT NULL DEFAULT false,
            items_per_page BIGINT NOT NULL DEFAULT 15,
            tzinfo TEXT NOT NULL DEFAULT 'UTC'
        )
        "#
    );
    let started = Instant::now();
    sqlx::query(&sql).execute(uow.postgres().await?).await?;
    uow.record_query(&sql, started);
    uow.mark_dirty();
    Ok(())
}

pub(super) async fn get_user_postgres(
    uow: &mut UnitOfWork,
    username: &str,
) -> Result<Option<User>, StorageError> {
    let sql = format!("SELECT * FROM {DB_TABLE_USERS} WHERE username = $1");
    let started = Instant::now();
    let user = sqlx::query_as::<_, User>(&sql)
        .bind(username)
        .fetch_optional(uow.postgres().await?)
        .await?;
    uow.record_query(&sql, started);
    Ok(user)
}

pub(super) async fn upsert_user_postgres(
    uow: &mut UnitOfWork,
    user: &User,
) -> Result<(), StorageError> {
    let sql = format!(
        r#"
        INSERT INTO {DB_TABLE_USERS} (
            username, identifier, display_name, email, active, confirmed, passwd_hash,
            last_used, last_login, agreed_to_tos, is_admin, items_per_page, tzinfo
        )
        VALUES ($1, $2, $3, $4, $5, $6, $7, $8, $9, $10, $11, $12, $13)
        ON CONFLICT (username) DO UPDATE SET
            identifier = EXCLUDED.identifier,
            display_name = EXCLUDED.display_name,
            email = EXCLUDED.email,
            active = EXCLUDED.active,
            confirmed = EXCLUDED.confirmed,
            passwd_hash = EXCLUDED.passwd_hash,
            agreed_to_tos = EXCLUDED.agreed_to_tos,
            is_admin = EXCLUDED.is_admin,
            items_per_page = EXCLUDED.items_per_page,
            tzinfo = EXCLUDED.tzinfo
        "#
    );
    let started = Instant::now();
    sqlx::query(&sql)
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
        .execute(uow.postgres().await?)
        .await?;
    uow.record_query(&sql, started);
    uow.mark_dirty();
    Ok(())
}

pub(super) async fn update_login_times_postgres(
    uow: &mut UnitOfWork,
    user: &User,
) -> Result<(), StorageError> {
    let sql =
        format!("UPDATE {DB_TABLE_USERS} SET last_used = $1, last_login = $2 WHERE username = $3");
    let started = Instant::now();
    sqlx::query(&sql)
        .bind(user.last_used)
        .bind(user.last_login)
        .bind(&user.username)
        .execute(uow.postgres().await?)
        .await?;
    uow.record_query(&sql, started);
    uow.mark_dirty();
    Ok(())
}
