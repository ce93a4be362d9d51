/// What a request presents when logging in
#[derive(Clone, PartialEq, Eq)]
pub enum Credentials {
    Anonymous,
    UsernamePassword { username: String, password: String },
    /// A persistent session vouches for the user; no password is checked
    PreAuthenticated { username: String },
}

impl std::fmt::Debug for Credentials {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        match self {
            Self::Anonymous => f.write_str("Anonymous"),
            Self::UsernamePassword { username, .. } => f
                .debug_struct("UsernamePassword")
                .field("username", username)
                .field("password", &"[redacted]")
                .finish(),
            Self::PreAuthenticated { username } => f
                .debug_struct("PreAuthenticated")
                .field("username", username)
                .finish(),
        }
    }
}

impl Credentials {
    /// Password credentials from a login form, qualified with the request host.
    pub fn from_form(username: &str, password: &str, host: Option<&str>) -> Self {
        Self::UsernamePassword {
            username: username_from_request(username, host),
            password: password.to_string(),
        }
    }

    pub fn username(&self) -> Option<&str> {
        match self {
            Self::Anonymous => None,
            Self::UsernamePassword { username, .. } | Self::PreAuthenticated { username } => {
                Some(username)
            }
        }
    }

    pub fn is_anonymous(&self) -> bool {
        matches!(self, Self::Anonymous)
    }

    pub fn is_password(&self) -> bool {
        matches!(self, Self::UsernamePassword { .. })
    }
}

/// Qualify `username` as `user@host` unless it already names a host.
///
/// The port is dropped from `host`. Without a host the name is returned as is.
pub fn username_from_request(username: &str, host: Option<&str>) -> String {
    if username.contains('@') {
        return username.to_string();
    }
    match host.and_then(|h| h.split(':').next()).filter(|h| !h.is_empty()) {
        Some(host) => format!("{username}@{host}"),
        None => username.to_string(),
    }
}
