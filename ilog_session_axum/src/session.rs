use axum::{
    RequestPartsExt,
    extract::{FromRef, FromRequestParts},
    response::{IntoResponseParts, ResponseParts},
};
use axum_extra::{TypedHeader, headers};
use http::{HeaderMap, StatusCode, header::HOST, request::Parts};
use ilog_session::{Credentials, Mind, PersistentSessionWrapper};

use crate::error::IntoResponseError;

/// The mind behind the request's session, available as an Axum extractor
///
/// Resolving never fails for lack of a login: requests without a usable
/// session cookie get a fresh anonymous session, and cookies matching a
/// persistent session are pre-authenticated. Return the extractor as part of
/// the response so the cookies it produced reach the browser.
///
/// # Example
///
/// ```no_run
/// use axum::{routing::get, Router};
/// use ilog_session_axum::AuthMind;
///
/// async fn greet(auth: AuthMind) -> (AuthMind, String) {
///     let name = auth.mind.display_name.clone();
///     (auth, format!("Hello, {name}!"))
/// }
///
/// let app: Router<ilog_session_axum::PersistentSessionWrapper> =
///     Router::new().route("/hello", get(greet));
/// ```
#[derive(Clone, Debug)]
pub struct AuthMind {
    /// Session key, also the cookie value
    pub uid: String,
    pub mind: Mind,
    /// `PreAuthenticated` when this request restored a persistent session
    pub credentials: Credentials,
    /// `Set-Cookie` headers produced while resolving the session
    pub cookies: HeaderMap,
}

impl AuthMind {
    pub fn is_authenticated(&self) -> bool {
        self.mind.authenticated
    }
}

pub(crate) fn request_host(headers: &HeaderMap) -> Option<&str> {
    headers.get(HOST).and_then(|h| h.to_str().ok())
}

impl<S> FromRequestParts<S> for AuthMind
where
    PersistentSessionWrapper: FromRef<S>,
    S: Send + Sync,
{
    type Rejection = (StatusCode, String);

    async fn from_request_parts(parts: &mut Parts, state: &S) -> Result<Self, Self::Rejection> {
        let wrapper = PersistentSessionWrapper::from_ref(state);

        let cookies = parts
            .extract::<Option<TypedHeader<headers::Cookie>>>()
            .await
            .ok()
            .flatten();
        let uid = cookies
            .as_ref()
            .and_then(|c| c.get(wrapper.config().cookie_name.as_str()))
            .filter(|uid| !uid.is_empty());
        let host = request_host(&parts.headers);

        let outcome = wrapper.resolve(uid, host).await.into_response_error()?;
        let mind = outcome.mind().cloned().ok_or_else(|| {
            tracing::error!("Resolved session has no mind");
            (
                StatusCode::INTERNAL_SERVER_ERROR,
                "Internal server error".to_string(),
            )
        })?;

        Ok(AuthMind {
            uid: outcome.session.uid,
            mind,
            credentials: outcome.credentials,
            cookies: outcome.headers,
        })
    }
}

impl IntoResponseParts for AuthMind {
    type Error = <HeaderMap as IntoResponseParts>::Error;

    fn into_response_parts(self, res: ResponseParts) -> Result<ResponseParts, Self::Error> {
        self.cookies.into_response_parts(res)
    }
}
