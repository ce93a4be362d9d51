mod cookie;
mod passthrough;
mod session;
mod sweeper;

pub use cookie::{
    cookie_domain_for_request, expired_session_cookie, logout_cookie, savor_session_cookie,
    session_cookie, session_id_from_headers, transient_session_cookie,
};
pub use passthrough::SessionPassthrough;
pub use session::{
    authenticated_user_for_key, create_session, remove_session, sweep_expired_sessions,
};
pub use sweeper::spawn_session_sweeper;
