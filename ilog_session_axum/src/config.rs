//! Route configuration for the axum integration

pub const DEFAULT_ROUTE_PREFIX: &str = "/auth";

#[derive(Clone, Debug, PartialEq, Eq)]
pub struct AxumConfig {
    /// Where [`ilog_session_router`](crate::ilog_session_router) is mounted
    pub route_prefix: String,
}

impl Default for AxumConfig {
    fn default() -> Self {
        Self {
            route_prefix: DEFAULT_ROUTE_PREFIX.to_string(),
        }
    }
}

impl AxumConfig {
    /// Build from `ILOG_ROUTE_PREFIX`.
    pub fn from_env() -> Self {
        Self {
            route_prefix: std::env::var("ILOG_ROUTE_PREFIX")
                .ok()
                .filter(|s| !s.is_empty())
                .unwrap_or_else(|| DEFAULT_ROUTE_PREFIX.to_string()),
        }
    }
}
