use crate::storage::{Backend, StorageError, UnitOfWork};
use crate::userdb::types::User;

use super::postgres::*;
use super::sqlite::*;

/// User account queries. Every call runs inside the caller's unit of work.
pub struct UserStore;

impl UserStore {
    /// Create the users table
    pub(crate) async fn init(uow: &mut UnitOfWork) -> Result<(), StorageError> {
        match uow.backend() {
            Backend::Sqlite => create_tables_sqlite(uow).await,
            Backend::Postgres => create_tables_postgres(uow).await,
        }
    }

    #[tracing::instrument(skip(uow))]
    pub async fn get_user(
        uow: &mut UnitOfWork,
        username: &str,
    ) -> Result<Option<User>, StorageError> {
        let result = match uow.backend() {
            Backend::Sqlite => get_user_sqlite(uow, username).await,
            Backend::Postgres => get_user_postgres(uow, username).await,
        };

        match &result {
            Ok(Some(_)) => tracing::debug!(found = true, "User lookup completed"),
            Ok(None) => tracing::debug!(found = false, "User lookup completed - not found"),
            Err(e) => tracing::error!(error = %e, "User lookup failed"),
        }

        result
    }

    /// Create or update a user
    #[tracing::instrument(skip(uow, user), fields(username = %user.username))]
    pub async fn upsert_user(uow: &mut UnitOfWork, user: &User) -> Result<(), StorageError> {
        match uow.backend() {
            Backend::Sqlite => upsert_user_sqlite(uow, user).await,
            Backend::Postgres => upsert_user_postgres(uow, user).await,
        }
    }

    /// Persist the `last_used` and `last_login` timestamps of `user`
    pub async fn record_login(uow: &mut UnitOfWork, user: &User) -> Result<(), StorageError> {
        match uow.backend() {
            Backend::Sqlite => update_login_times_sqlite(uow, user).await,
            Backend::Postgres => update_login_times_postgres(uow, user).await,
        }
    }
}
