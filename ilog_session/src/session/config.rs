use std::time::Duration;

use crate::config::{env_flag, env_list, env_or};

pub const DEFAULT_COOKIE_NAME: &str = "ilog_cookie";
pub const DEFAULT_TRANSIENT_SESSION_LIFETIME: u64 = 752;
pub const DEFAULT_PERSISTENT_SESSION_LIFETIME: u64 = 1_209_600;
pub const DEFAULT_SESSION_CLEAN_FREQUENCY: u64 = 2_160_000;

/// Session lifetimes and cookie scoping.
///
/// Built once at startup and handed to the components that need it.
#[derive(Clone, Debug, PartialEq, Eq)]
pub struct SessionConfig {
    /// Idle lifetime of in-memory sessions, in seconds
    pub transient_lifetime: u64,
    /// Lifetime of "remember me" sessions and their cookies, in seconds
    pub persistent_lifetime: u64,
    /// Seconds between sweeps of stale persistent sessions
    pub clean_frequency: u64,
    /// Scope cookies to the parent domain so subdomains share the session
    pub enable_subdomains: bool,
    pub domains: Vec<String>,
    pub cookie_name: String,
}

impl Default for SessionConfig {
    fn default() -> Self {
        Self {
            transient_lifetime: DEFAULT_TRANSIENT_SESSION_LIFETIME,
            persistent_lifetime: DEFAULT_PERSISTENT_SESSION_LIFETIME,
            clean_frequency: DEFAULT_SESSION_CLEAN_FREQUENCY,
            enable_subdomains: false,
            domains: Vec::new(),
            cookie_name: DEFAULT_COOKIE_NAME.to_string(),
        }
    }
}

impl SessionConfig {
    pub fn from_env() -> Self {
        let defaults = Self::default();
        Self {
            transient_lifetime: env_or(
                "ILOG_TRANSIENT_SESSION_LIFETIME",
                defaults.transient_lifetime,
            ),
            persistent_lifetime: env_or(
                "ILOG_PERSISTENT_SESSION_LIFETIME",
                defaults.persistent_lifetime,
            ),
            clean_frequency: match env_or("ILOG_SESSION_CLEAN_FREQUENCY", defaults.clean_frequency) {
                0 => {
                    tracing::warn!(
                        "ILOG_SESSION_CLEAN_FREQUENCY must be positive, using {}",
                        defaults.clean_frequency
                    );
                    defaults.clean_frequency
                }
                secs => secs,
            },
            enable_subdomains: env_flag("ILOG_ENABLE_SUBDOMAINS", defaults.enable_subdomains),
            domains: env_list("ILOG_DOMAINS"),
            cookie_name: env_or("ILOG_COOKIE_NAME", defaults.cookie_name),
        }
    }

    pub fn transient_lifetime(&self) -> Duration {
        Duration::from_secs(self.transient_lifetime)
    }

    pub fn persistent_lifetime(&self) -> Duration {
        Duration::from_secs(self.persistent_lifetime)
    }

    /// Interval between sweeps. Zero is not a usable interval and falls back
    /// to the default.
    pub fn clean_frequency(&self) -> Duration {
        if self.clean_frequency == 0 {
            tracing::error!(
                "Session clean frequency of zero, using {} seconds",
                DEFAULT_SESSION_CLEAN_FREQUENCY
            );
            return Duration::from_secs(DEFAULT_SESSION_CLEAN_FREQUENCY);
        }
        Duration::from_secs(self.clean_frequency)
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::test_utils::with_env_var;
    use serial_test::serial;

    #[test]
    fn test_default_lifetimes() {
        let config = SessionConfig::default();

        assert_eq!(config.transient_lifetime, 752);
        assert_eq!(config.persistent_lifetime, 1_209_600);
        assert_eq!(config.clean_frequency, 2_160_000);
        assert_eq!(config.cookie_name, "ilog_cookie");
        assert!(!config.enable_subdomains);
        assert!(config.domains.is_empty());
    }

    #[test]
    #[serial]
    fn test_from_env_overrides() {
        with_env_var("ILOG_PERSISTENT_SESSION_LIFETIME", Some("3600"), || {
            with_env_var("ILOG_ENABLE_SUBDOMAINS", Some("true"), || {
                with_env_var("ILOG_DOMAINS", Some("example.com, ilog.org"), || {
                    let config = SessionConfig::from_env();

                    assert_eq!(config.persistent_lifetime, 3600);
                    assert_eq!(config.persistent_lifetime(), Duration::from_secs(3600));
                    assert!(config.enable_subdomains);
                    assert_eq!(config.domains, vec!["example.com", "ilog.org"]);
                    assert_eq!(config.transient_lifetime, 752);
                })
            })
        });
    }

    #[test]
    #[serial]
    fn test_from_env_invalid_values_use_defaults() {
        with_env_var("ILOG_TRANSIENT_SESSION_LIFETIME", Some("soon"), || {
            with_env_var("ILOG_ENABLE_SUBDOMAINS", Some("perhaps"), || {
                let config = SessionConfig::from_env();

                assert_eq!(config.transient_lifetime, 752);
                assert!(!config.enable_subdomains);
            })
        });
    }

    #[test]
    #[serial]
    fn test_zero_clean_frequency_uses_default() {
        with_env_var("ILOG_SESSION_CLEAN_FREQUENCY", Some("0"), || {
            let config = SessionConfig::from_env();
            assert_eq!(config.clean_frequency, 2_160_000);
        });

        let config = SessionConfig {
            clean_frequency: 0,
            ..SessionConfig::default()
        };
        assert_eq!(config.clean_frequency(), Duration::from_secs(2_160_000));
    }
}
