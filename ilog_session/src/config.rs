//! Environment helpers shared by the configuration structs of this crate

use std::env;
use std::str::FromStr;

/// Read `key` from the environment and parse it, falling back to `default`
/// when the variable is unset or does not parse.
pub(crate) fn env_or<T: FromStr>(key: &str, default: T) -> T {
    env::var(key)
        .ok()
        .and_then(|s| s.trim().parse().ok())
        .unwrap_or(default)
}

/// Read a boolean flag. Accepts `true`/`1` and `false`/`0`, case-insensitive.
pub(crate) fn env_flag(key: &str, default: bool) -> bool {
    match env::var(key) {
        Ok(value) => parse_flag(&value).unwrap_or(default),
        Err(_) => default,
    }
}

pub(crate) fn parse_flag(value: &str) -> Option<bool> {
    match value.trim().to_ascii_lowercase().as_str() {
        "true" | "1" => Some(true),
        "false" | "0" => Some(false),
        _ => None,
    }
}

/// Read a comma separated list, dropping empty entries.
pub(crate) fn env_list(key: &str) -> Vec<String> {
    env::var(key)
        .map(|value| parse_list(&value))
        .unwrap_or_default()
}

pub(crate) fn parse_list(value: &str) -> Vec<String> {
    value
        .split(',')
        .map(str::trim)
        .filter(|s| !s.is_empty())
        .map(str::to_string)
        .collect()
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::test_utils::with_env_var;
    use serial_test::serial;

    #[test]
    #[serial]
    fn test_env_or_default_and_custom() {
        with_env_var("ILOG_TEST_NUMBER", None, || {
            assert_eq!(env_or("ILOG_TEST_NUMBER", 752u64), 752);
        });

        with_env_var("ILOG_TEST_NUMBER", Some("1800"), || {
            assert_eq!(env_or("ILOG_TEST_NUMBER", 752u64), 1800);
        });

        // Invalid value falls back to the default
        with_env_var("ILOG_TEST_NUMBER", Some("invalid"), || {
            assert_eq!(env_or("ILOG_TEST_NUMBER", 752u64), 752);
        });
    }

    #[test]
    fn test_parse_flag() {
        assert_eq!(parse_flag("TRUE"), Some(true));
        assert_eq!(parse_flag("1"), Some(true));
        assert_eq!(parse_flag("False"), Some(false));
        assert_eq!(parse_flag("0"), Some(false));
        assert_eq!(parse_flag("yes"), None);
    }

    #[test]
    #[serial]
    fn test_env_flag_invalid_uses_default() {
        with_env_var("ILOG_TEST_FLAG", Some("maybe"), || {
            assert!(env_flag("ILOG_TEST_FLAG", true));
            assert!(!env_flag("ILOG_TEST_FLAG", false));
        });
    }

    #[test]
    fn test_parse_list() {
        assert_eq!(
            parse_list("example.com, ilog.org,,"),
            vec!["example.com".to_string(), "ilog.org".to_string()]
        );
        assert!(parse_list("").is_empty());
    }
}
