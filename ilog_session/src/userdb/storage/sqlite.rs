use std::time::Instant;

use crate::storage::{StorageError, UnitOfWork};
use crate::userdb::types::User;

use super::config::DB_TABLE_USERS;

// SQLite implementations
pub(super) async fn create_tables_sqlite(uow: &mut UnitOfWork) -> Result<(), StorageError> {
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
            last_used TIMESTAMP NOT NULL,
            last_login TIMESTAMP NOT NULL,
            agreed_to_tos BOOLEAN NOT NULL DEFAULT false,
            is_admin BOOLEAN NOT NULL DEFAULT false,
            items_per_page INTEGER NOT NULL DEFAULT 15,
            tzinfo TEXT NOT NULL DEFAULT 'UTC'
        )
        "#
    );
    let started = Instant::now();
    sqlx::query(&sql).execute(uow.sqlite().await?).await?;
    uow.record_query(&sql, started);
    uow.mark_dirty();
    Ok(())
}

pub(super) async fn get_user_sqlite(
    uow: &mut UnitOfWork,
    username: &str,
) -> Result<Option<User>, StorageError> {
    let sql = format!("SELECT * FROM {DB_TABLE_USERS} WHERE username = ?");
    let started = Instant::now();
    let user = sqlx::query_as::<_, User>(&sql)
        .bind(username)
        .fetch_optional(uow.sqlite().await?)
        .await?;
    uow.record_query(&sql, started);
    Ok(user)
}

pub(super) async fn upsert_user_sqlite(
    uow: &mut UnitOfWork,
    user: &User,
) -> Result<(), StorageError> {
    let sql = format!(
        r#"
        INSERT INTO {DB_TABLE_USERS} (
            username, identifier, display_name, email, active, confirmed, passwd_hash,
            last_used, last_login, agreed_to_tos, is_admin, items_per_page, tzinfo
        )
        VALUES (?, ?, ?, ?, ?, ?, ?, ?, ?, ?, ?, ?, ?)
        ON CONFLICT (username) DO UPDATE SET
            identifier = excluded.identifier,
            display_name = excluded.display_name,
            email = excluded.email,
            active = excluded.active,
            confirmed = excluded.confirmed,
            passwd_hash = excluded.passwd_hash,
            agreed_to_tos = excluded.agreed_to_tos,
            is_admin = excluded.is_admin,
            items_per_page = excluded.items_per_page,
            tzinfo = excluded.tzinfo
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
        .execute(uow.sqlite().await?)
        .await?;
    uow.record_query(&sql, started);
    uow.mark_dirty();
    Ok(())
}

pub(super) async fn update_login_times_sqlite(
    uow: &mut UnitOfWork,
    user: &User,
) -> Result<(), StorageError> {
    let sql = format!("UPDATE {DB_TABLE_USERS} SET last_used = ?, last_login = ? WHERE username = ?");
    let started = Instant::now();
    sqlx::query(&sql)
        .bind(user.last_used)
        .bind(user.last_login)
        .bind(&user.username)
        .execute(uow.sqlite().await?)
        .await?;
    uow.record_query(&sql, started);
    uow.mark_dirty();
    Ok(())
}
