//! ilog-session-axum - Axum integration for ilog-session
//!
//! Mount [`ilog_session_router`] under [`AxumConfig::route_prefix`] and use the
//! [`AuthMind`] extractor in handlers that need to know who is asking.

mod config;
mod error;
mod router;
mod session;

pub use config::{AxumConfig, DEFAULT_ROUTE_PREFIX};
pub use error::IntoResponseError;
pub use router::{ilog_session_router, ilog_session_router_no_trace};
pub use session::AuthMind;

pub use ilog_session::{PersistentSessionWrapper, SessionConfig, init};
