//! ilog-session - Persistent web sessions and authentication for the ILog IRC logger
//!
//! Transient in-memory sessions are backed by "remember me" sessions stored in
//! the database, so returning users are logged in again from their cookie.
//! All database access goes through a [`UnitOfWork`] handed out by
//! [`with_unit_of_work`].

mod auth;
mod config;
mod session;
mod storage;
mod userdb;
mod utils;

#[cfg(test)]
mod test_utils;

pub use auth::{
    ANONYMOUS_USERNAME, AuthError, Credentials, CredentialsChecker, IlogMindFactory, LoginOutcome,
    LoginRequest, Mind, MindFactory, PersistentSessionWrapper, username_from_request,
};

pub use session::{
    DEFAULT_COOKIE_NAME, DEFAULT_PERSISTENT_SESSION_LIFETIME, DEFAULT_SESSION_CLEAN_FREQUENCY,
    DEFAULT_TRANSIENT_SESSION_LIFETIME, SessionConfig, SessionError, SessionPassthrough,
    SessionStore, StoredSession, TransientSession, authenticated_user_for_key,
    cookie_domain_for_request, create_session, expired_session_cookie, logout_cookie,
    remove_session, savor_session_cookie, session_cookie, session_id_from_headers,
    spawn_session_sweeper, sweep_expired_sessions, transient_session_cookie,
};

pub use storage::{
    AttachedFuture, Backend, DataEvent, DataEventBus, DataEventSubscription, DataStore,
    DataStoreConfig, StorageError, UnitOfWork, UnitOfWorkError, UnitOfWorkFuture,
    UnitOfWorkHost, spawn_query_logger, with_attached_unit_of_work, with_unit_of_work,
};

pub use userdb::{User, UserStore};

pub use utils::{UtilError, gen_random_string, hash_password, verify_password};

/// Create the `users` and `sessions` tables if they do not exist
pub async fn init(store: &DataStore) -> Result<(), StorageError> {
    with_unit_of_work::<_, StorageError, _>(store, |uow| {
        Box::pin(async move {
            UserStore::init(uow).await?;
            SessionStore::init(uow).await?;
            uow.commit().await?;
            Ok(())
        })
    })
    .await
    .map_err(UnitOfWorkError::flatten)
}
