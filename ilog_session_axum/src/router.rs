//! Login, logout and whoami endpoints

use axum::{
    Form, Json, Router,
    extract::State,
    response::{IntoResponse, Redirect, Response},
    routing::{get, post},
};
use http::{HeaderMap, StatusCode};
use ilog_session::{Credentials, LoginRequest, PersistentSessionWrapper, session_id_from_headers};
use serde::Deserialize;
use tower_http::LatencyUnit;
use tower_http::trace::{DefaultMakeSpan, DefaultOnRequest, DefaultOnResponse, TraceLayer};
use tracing::Level;

use crate::error::IntoResponseError;
use crate::session::{AuthMind, request_host};

const REDIRECT_AFTER_LOGIN: &str = "/";

/// Create the router for the session endpoints
///
/// Mount it under the configured prefix:
/// - POST {prefix}/login
/// - GET {prefix}/logout
/// - GET {prefix}/whoami
pub fn ilog_session_router(wrapper: PersistentSessionWrapper) -> Router {
    ilog_session_router_no_trace(wrapper).layer(
        TraceLayer::new_for_http()
            .make_span_with(DefaultMakeSpan::new().level(Level::INFO))
            .on_request(DefaultOnRequest::new().level(Level::INFO))
            .on_response(
                DefaultOnResponse::new()
                    .level(Level::INFO)
                    .latency_unit(LatencyUnit::Millis),
            ),
    )
}

/// Same as [`ilog_session_router`] without the HTTP tracing middleware.
pub fn ilog_session_router_no_trace(wrapper: PersistentSessionWrapper) -> Router {
    Router::new()
        .route("/login", post(login))
        .route("/logout", get(logout))
        .route("/whoami", get(whoami))
        .with_state(wrapper)
}

#[derive(Debug, Deserialize)]
struct LoginForm {
    username: String,
    password: String,
    #[serde(rename = "rememberMe", default)]
    remember_me: Option<String>,
}

impl LoginForm {
    fn wants_remember_me(&self) -> bool {
        self.remember_me
            .as_deref()
            .is_some_and(|v| !v.is_empty() && v != "false" && v != "0")
    }
}

async fn login(
    State(wrapper): State<PersistentSessionWrapper>,
    headers: HeaderMap,
    Form(form): Form<LoginForm>,
) -> Result<Response, (StatusCode, String)> {
    let host = request_host(&headers);
    let request = LoginRequest {
        host: host.map(str::to_string),
        credentials: Credentials::from_form(&form.username, &form.password, host),
        remember_me: form.wants_remember_me(),
    };

    // Log in within the browser's current session when it has one
    let uid = session_id_from_headers(&headers, &wrapper.config().cookie_name)
        .ok()
        .flatten();
    let current = match uid {
        Some(uid) => wrapper
            .sessions()
            .get(uid)
            .await
            .map_err(ilog_session::AuthError::from)
            .into_response_error()?,
        None => None,
    };

    let outcome = match current {
        Some(session) => wrapper.login(session, request).await,
        None => wrapper.login_new(request).await,
    }
    .into_response_error()?;

    Ok((outcome.headers, Redirect::to(REDIRECT_AFTER_LOGIN)).into_response())
}

async fn logout(
    State(wrapper): State<PersistentSessionWrapper>,
    headers: HeaderMap,
) -> Result<Response, (StatusCode, String)> {
    let uid = session_id_from_headers(&headers, &wrapper.config().cookie_name)
        .ok()
        .flatten();

    let Some(uid) = uid else {
        tracing::debug!("Logout without a session cookie");
        return Ok(Redirect::to(REDIRECT_AFTER_LOGIN).into_response());
    };

    let cookies = wrapper
        .explicit_logout(uid, request_host(&headers))
        .await
        .into_response_error()?;

    Ok((cookies, Redirect::to(REDIRECT_AFTER_LOGIN)).into_response())
}

async fn whoami(auth: AuthMind) -> impl IntoResponse {
    let mind = auth.mind.clone();
    (auth, Json(mind))
}
