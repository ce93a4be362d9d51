use crate::session::types::StoredSession;
use crate::storage::{Backend, StorageError, UnitOfWork};

use super::postgres::*;
use super::sqlite::*;

/// Persistent session queries. Every call runs inside the caller's unit of work.
pub struct SessionStore;

impl SessionStore {
    /// Create the sessions table. The users table must exist already.
    pub(crate) async fn init(uow: &mut UnitOfWork) -> Result<(), StorageError> {
        match uow.backend() {
            Backend::Sqlite => create_tables_sqlite(uow).await,
            Backend::Postgres => create_tables_postgres(uow).await,
        }
    }

    #[tracing::instrument(skip_all)]
    pub async fn get(
        uow: &mut UnitOfWork,
        key: &str,
    ) -> Result<Option<StoredSession>, StorageError> {
        match uow.backend() {
            Backend::Sqlite => get_session_sqlite(uow, key).await,
            Backend::Postgres => get_session_postgres(uow, key).await,
        }
    }

    /// Insert `session` unless its key is taken. Returns whether a row was written.
    #[tracing::instrument(skip_all, fields(user_id = ?session.user_id))]
    pub async fn insert_if_absent(
        uow: &mut UnitOfWork,
        session: &StoredSession,
    ) -> Result<bool, StorageError> {
        match uow.backend() {
            Backend::Sqlite => insert_session_sqlite(uow, session).await,
            Backend::Postgres => insert_session_postgres(uow, session).await,
        }
    }

    pub async fn update_last_used(
        uow: &mut UnitOfWork,
        session: &StoredSession,
    ) -> Result<(), StorageError> {
        match uow.backend() {
            Backend::Sqlite => update_last_used_sqlite(uow, session).await,
            Backend::Postgres => update_last_used_postgres(uow, session).await,
        }
    }

    #[tracing::instrument(skip_all)]
    pub async fn delete(uow: &mut UnitOfWork, key: &str) -> Result<u64, StorageError> {
        match uow.backend() {
            Backend::Sqlite => delete_session_sqlite(uow, key).await,
            Backend::Postgres => delete_session_postgres(uow, key).await,
        }
    }

    /// Delete sessions last used before `cutoff` seconds since the epoch
    #[tracing::instrument(skip(uow))]
    pub async fn delete_used_before(uow: &mut UnitOfWork, cutoff: f64) -> Result<u64, StorageError> {
        match uow.backend() {
            Backend::Sqlite => delete_sessions_used_before_sqlite(uow, cutoff).await,
            Backend::Postgres => delete_sessions_used_before_postgres(uow, cutoff).await,
        }
    }
}
