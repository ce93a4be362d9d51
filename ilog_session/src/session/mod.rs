mod config;
mod errors;
mod main;
mod storage;
mod types;

pub use config::{
    DEFAULT_COOKIE_NAME, DEFAULT_PERSISTENT_SESSION_LIFETIME, DEFAULT_SESSION_CLEAN_FREQUENCY,
    DEFAULT_TRANSIENT_SESSION_LIFETIME, SessionConfig,
};
pub use errors::SessionError;
pub use main::{
    SessionPassthrough, authenticated_user_for_key, cookie_domain_for_request, create_session,
    expired_session_cookie, logout_cookie, remove_session, savor_session_cookie, session_cookie,
    session_id_from_headers, spawn_session_sweeper, sweep_expired_sessions,
    transient_session_cookie,
};
pub use storage::SessionStore;
pub use types::{StoredSession, TransientSession};
