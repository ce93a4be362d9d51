//! Login and logout on top of the session layer.
//!
//! A browser is in one of four states:
//! 1. new visitor: no persistent session, no transient session
//! 2. anonymous visitor: no persistent session, transient session
//! 3. returning user: persistent session, no transient session
//! 4. active user: persistent session, transient session
//!
//! Returning users are pre-authenticated from their persistent session the
//! first time their cookie is seen, without asking for a password.

use std::sync::Arc;

use http::HeaderMap;
use http::header::SET_COOKIE;

use crate::session::{
    SessionConfig, SessionPassthrough, StoredSession, TransientSession,
    authenticated_user_for_key, create_session, logout_cookie, remove_session,
    savor_session_cookie, transient_session_cookie,
};
use crate::storage::DataStore;
use crate::userdb::User;
use crate::utils::gen_random_string;

use super::checker::CredentialsChecker;
use super::credentials::Credentials;
use super::errors::AuthError;
use super::mind::{IlogMindFactory, Mind, MindFactory};

/// Random bytes in a session key. Encodes to 32 characters.
const SESSION_KEY_BYTES: usize = 24;

/// A login attempt as seen by the strategy
#[derive(Clone, Debug)]
pub struct LoginRequest {
    /// `Host` header of the request, used for cookie scoping
    pub host: Option<String>,
    pub credentials: Credentials,
    /// "Remember me" was ticked on the login form
    pub remember_me: bool,
}

impl LoginRequest {
    /// A request carrying only the session cookie
    pub fn anonymous(host: Option<&str>) -> Self {
        Self {
            host: host.map(str::to_string),
            credentials: Credentials::Anonymous,
            remember_me: false,
        }
    }
}

/// Result of a login or a request resolution.
#[derive(Clone, Debug)]
pub struct LoginOutcome {
    pub session: TransientSession,
    /// Credentials checked by this call after pre-authentication, `Anonymous`
    /// when an existing session was reused
    pub credentials: Credentials,
    /// `Set-Cookie` headers to send back
    pub headers: HeaderMap,
}

impl LoginOutcome {
    pub fn mind(&self) -> Option<&Mind> {
        self.session.mind()
    }
}

/// Session wrapper that re-authenticates users holding a persistent session.
#[derive(Clone)]
pub struct PersistentSessionWrapper {
    store: DataStore,
    config: Arc<SessionConfig>,
    mind_factory: Arc<dyn MindFactory>,
    sessions: SessionPassthrough,
}

impl std::fmt::Debug for PersistentSessionWrapper {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("PersistentSessionWrapper")
            .field("config", &self.config)
            .field("sessions", &self.sessions)
            .finish_non_exhaustive()
    }
}

impl PersistentSessionWrapper {
    pub fn new(store: DataStore, config: SessionConfig) -> Self {
        let sessions = SessionPassthrough::new(store.clone(), config.transient_lifetime());
        Self {
            store,
            config: Arc::new(config),
            mind_factory: Arc::new(IlogMindFactory),
            sessions,
        }
    }

    pub fn with_mind_factory(mut self, factory: impl MindFactory + 'static) -> Self {
        self.mind_factory = Arc::new(factory);
        self
    }

    pub fn config(&self) -> &SessionConfig {
        &self.config
    }

    pub fn store(&self) -> &DataStore {
        &self.store
    }

    pub fn sessions(&self) -> &SessionPassthrough {
        &self.sessions
    }

    pub async fn create_session_for_key(
        &self,
        key: &str,
        username: &str,
    ) -> Result<StoredSession, AuthError> {
        tracing::debug!("Creating session for user {:?}", username);
        Ok(create_session(&self.store, key, Some(username)).await?)
    }

    pub async fn authenticated_user_for_key(&self, key: &str) -> Result<Option<User>, AuthError> {
        Ok(authenticated_user_for_key(&self.store, key).await?)
    }

    /// Delete the persistent session `key`. A missing session is ignored.
    pub async fn remove_session_with_key(&self, key: &str) -> Result<(), AuthError> {
        remove_session(&self.store, key).await?;
        Ok(())
    }

    /// Find or start the session for a request presenting cookie `uid`.
    ///
    /// Known sessions with a mind are returned as they are. A session found
    /// only in the database is pre-authenticated. Anything else starts a new
    /// anonymous session under a fresh key.
    pub async fn resolve(&self, uid: Option<&str>, host: Option<&str>) -> Result<LoginOutcome, AuthError> {
        if let Some(session) = self.sessions.get(uid.unwrap_or_default()).await? {
            if session.mind().is_some() {
                return Ok(LoginOutcome {
                    session,
                    credentials: Credentials::Anonymous,
                    headers: HeaderMap::new(),
                });
            }
            return self.login(session, LoginRequest::anonymous(host)).await;
        }

        let uid = gen_random_string(SESSION_KEY_BYTES)?;
        tracing::debug!("Starting new anonymous session");
        let session = TransientSession::new(uid.as_str(), self.config.transient_lifetime());
        let mut outcome = self.login(session, LoginRequest::anonymous(host)).await?;
        outcome
            .headers
            .extend(transient_session_cookie(&self.config, host, &uid)?);
        Ok(outcome)
    }

    /// Start a fresh session and log it in with `request`.
    ///
    /// The outcome always carries a cookie for the new key: the persistent one
    /// for "remember me" logins, a transient one otherwise.
    pub async fn login_new(&self, request: LoginRequest) -> Result<LoginOutcome, AuthError> {
        let uid = gen_random_string(SESSION_KEY_BYTES)?;
        let host = request.host.clone();
        let session = TransientSession::new(uid.as_str(), self.config.transient_lifetime());
        let mut outcome = self.login(session, request).await?;
        if !outcome.headers.contains_key(SET_COOKIE) {
            outcome.headers.extend(transient_session_cookie(
                &self.config,
                host.as_deref(),
                &uid,
            )?);
        }
        Ok(outcome)
    }

    /// Check `request` and store the resulting mind in `session`.
    ///
    /// Anonymous credentials are upgraded to pre-authenticated ones when the
    /// session key matches a persistent session bound to a user. A successful
    /// password login moves to a fresh session key, dropping whatever the old
    /// key was bound to, and with "remember me" creates the persistent session
    /// for the new key. The outcome then carries the cookie for the new key.
    #[tracing::instrument(skip(self, session), fields(remember_me = request.remember_me))]
    pub async fn login(
        &self,
        mut session: TransientSession,
        request: LoginRequest,
    ) -> Result<LoginOutcome, AuthError> {
        let host = request.host.as_deref();
        let mut headers = HeaderMap::new();
        let mut credentials = request.credentials;

        if credentials.is_anonymous() {
            if let Some(user) = authenticated_user_for_key(&self.store, &session.uid).await? {
                tracing::debug!("Found pre-authenticated credentials for {:?}", user);
                headers.extend(savor_session_cookie(&self.config, host, &session.uid)?);
                credentials = Credentials::PreAuthenticated {
                    username: user.username,
                };
            }
        }

        if !credentials.is_anonymous() {
            CredentialsChecker::new(self.store.clone())
                .request_avatar_id(&credentials)
                .await?;
        }

        if credentials.is_password() {
            session = self.rotate_session_key(session).await?;
        }

        let mind = self.mind_factory.create_mind(&self.store, &credentials).await?;
        session.set_mind(Some(mind));
        session.touch();
        self.sessions.insert(session.uid.clone(), session.clone()).await;

        if let Credentials::UsernamePassword { username, .. } = &credentials {
            tracing::debug!("Successful login of: {}", username);
            if request.remember_me {
                self.create_session_for_key(&session.uid, username).await?;
                headers.extend(savor_session_cookie(&self.config, host, &session.uid)?);
            } else {
                headers.extend(transient_session_cookie(&self.config, host, &session.uid)?);
            }
        }

        Ok(LoginOutcome {
            session,
            credentials,
            headers,
        })
    }

    /// Forget `session` in memory and in the database, and hand back an empty
    /// session under a new key.
    async fn rotate_session_key(
        &self,
        session: TransientSession,
    ) -> Result<TransientSession, AuthError> {
        self.sessions.remove(&session.uid).await;
        self.remove_session_with_key(&session.uid).await?;
        let uid = gen_random_string(SESSION_KEY_BYTES)?;
        tracing::debug!("Rotated session key on password login");
        Ok(TransientSession::new(uid, session.lifetime()))
    }

    /// Log out explicitly: forget the transient session and delete the
    /// persistent one so the next visit asks for a password again.
    pub async fn explicit_logout(&self, uid: &str, host: Option<&str>) -> Result<HeaderMap, AuthError> {
        tracing::debug!("Explicitly logging out session");
        self.sessions.remove(uid).await;
        self.remove_session_with_key(uid).await?;
        Ok(logout_cookie(&self.config, host)?)
    }
}
