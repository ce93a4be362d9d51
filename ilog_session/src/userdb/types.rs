use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};
use sqlx::FromRow;

use crate::utils::{UtilError, hash_password, verify_password};

pub const DEFAULT_DISPLAY_NAME: &str = "Anonymous";
pub const DEFAULT_ITEMS_PER_PAGE: i64 = 15;
pub const DEFAULT_TZINFO: &str = "UTC";

/// A registered ILog user
#[derive(Clone, Serialize, Deserialize, FromRow, PartialEq)]
pub struct User {
    /// Login name, `user@host` for virtual-hosted logins
    pub username: String,
    /// External (OpenID style) identifier
    pub identifier: Option<String>,
    pub display_name: String,
    pub email: Option<String>,
    pub active: bool,
    /// Password logins are refused until this is set
    pub confirmed: bool,
    #[serde(skip_serializing)]
    pub passwd_hash: Option<String>,
    pub last_used: DateTime<Utc>,
    pub last_login: DateTime<Utc>,
    pub agreed_to_tos: bool,
    pub is_admin: bool,
    pub items_per_page: i64,
    pub tzinfo: String,
}

impl std::fmt::Debug for User {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        write!(f, "<User {}>", self.username)
    }
}

impl User {
    /// Create an unconfirmed, inactive user without a password
    pub fn new(username: impl Into<String>) -> Self {
        let username = username.into();
        let now = Utc::now();
        Self {
            display_name: username.clone(),
            username,
            identifier: None,
            email: None,
            active: false,
            confirmed: false,
            passwd_hash: None,
            last_used: now,
            last_login: now,
            agreed_to_tos: false,
            is_admin: false,
            items_per_page: DEFAULT_ITEMS_PER_PAGE,
            tzinfo: DEFAULT_TZINFO.to_string(),
        }
    }

    /// Create a user known only by an external identifier.
    pub fn from_identifier(username: impl Into<String>, identifier: impl Into<String>) -> Self {
        let identifier = identifier.into();
        let mut user = Self::new(username);
        if user.username.is_empty() {
            user.display_name = identifier.clone();
        }
        if user.display_name.is_empty() {
            user.display_name = DEFAULT_DISPLAY_NAME.to_string();
        }
        user.identifier = Some(identifier);
        user
    }

    pub fn with_password(mut self, password: &str) -> Result<Self, UtilError> {
        self.set_password(password)?;
        Ok(self)
    }

    pub fn confirmed(mut self) -> Self {
        self.confirmed = true;
        self.active = true;
        self
    }

    pub fn set_password(&mut self, password: &str) -> Result<(), UtilError> {
        self.passwd_hash = Some(hash_password(password)?);
        Ok(())
    }

    /// Check `password`, refusing unconfirmed users outright.
    ///
    /// A successful check marks the user as used and logged in now; a failed
    /// one leaves the user untouched.
    pub fn authenticate(&mut self, password: &str) -> bool {
        let matched = self.confirmed
            && self
                .passwd_hash
                .as_deref()
                .is_some_and(|hash| verify_password(hash, password));
        if matched {
            self.touch();
            self.last_login = Utc::now();
        }
        matched
    }

    pub fn touch(&mut self) {
        self.last_used = Utc::now();
    }

    /// The username without the virtual host part
    pub fn public_username(&self) -> &str {
        self.username
            .split_once('@')
            .map_or(self.username.as_str(), |(name, _)| name)
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use proptest::prelude::*;

    #[test]
    fn test_user_new_defaults() {
        let user = User::new("alice");

        assert_eq!(user.username, "alice");
        assert_eq!(user.display_name, "alice");
        assert!(!user.confirmed);
        assert!(!user.active);
        assert!(!user.is_admin);
        assert_eq!(user.items_per_page, DEFAULT_ITEMS_PER_PAGE);
        assert_eq!(user.tzinfo, "UTC");
        assert!(user.passwd_hash.is_none());
    }

    #[test]
    fn test_from_identifier_display_name() {
        let user = User::from_identifier("", "https://openid.example.com/bob");
        assert_eq!(user.display_name, "https://openid.example.com/bob");

        let user = User::from_identifier("bob", "https://openid.example.com/bob");
        assert_eq!(user.display_name, "bob");
    }

    #[test]
    fn test_authenticate_confirmed_user() {
        // Given a confirmed user with a password
        let mut user = User::new("alice").with_password("secret").unwrap().confirmed();
        let before = user.last_login;

        // When authenticating with the right password
        let matched = user.authenticate("secret");

        // Then it succeeds and the login timestamps move forward
        assert!(matched);
        assert!(user.last_login >= before);
    }

    #[test]
    fn test_authenticate_wrong_password_leaves_user_untouched() {
        let mut user = User::new("alice").with_password("secret").unwrap().confirmed();
        let snapshot = user.clone();

        assert!(!user.authenticate("wrong"));
        assert_eq!(user.last_used, snapshot.last_used);
        assert_eq!(user.last_login, snapshot.last_login);
    }

    #[test]
    fn test_authenticate_without_password_hash() {
        let mut user = User::new("carol").confirmed();
        assert!(!user.authenticate(""));
    }

    #[test]
    fn test_public_username() {
        assert_eq!(User::new("alice@example.com").public_username(), "alice");
        assert_eq!(User::new("alice").public_username(), "alice");
    }

    #[test]
    fn test_debug_does_not_leak_hash() {
        let user = User::new("alice").with_password("secret").unwrap();
        let debug = format!("{user:?}");
        assert_eq!(debug, "<User alice>");
    }

    proptest! {
        #![proptest_config(ProptestConfig::with_cases(8))]

        /// Unconfirmed users never authenticate, whatever the password
        #[test]
        fn prop_unconfirmed_users_never_authenticate(password in "[a-zA-Z0-9]{0,16}") {
            let mut user = User::new("mallory").with_password(&password).unwrap();
            prop_assert!(!user.authenticate(&password));
        }
    }
}
