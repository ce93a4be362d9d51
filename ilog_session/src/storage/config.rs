//! Data store configuration

use std::str::FromStr;

use sqlx::postgres::PgPoolOptions;
use sqlx::sqlite::{SqliteConnectOptions, SqlitePoolOptions};

use crate::config::{env_flag, env_or};

use super::errors::StorageError;
use super::events::DataEventBus;
use super::types::DataStore;

pub const DEFAULT_DATA_STORE_TYPE: &str = "sqlite";
pub const DEFAULT_DATA_STORE_URL: &str = "sqlite:ilog.db";

/// Where the database lives and how verbose data access should be.
#[derive(Clone, Debug, PartialEq, Eq)]
pub struct DataStoreConfig {
    /// `sqlite` or `postgres`
    pub store_type: String,
    pub url: String,
    /// Publish every statement on a [`DataEventBus`]
    pub debug_sql: bool,
}

impl Default for DataStoreConfig {
    fn default() -> Self {
        Self {
            store_type: DEFAULT_DATA_STORE_TYPE.to_string(),
            url: DEFAULT_DATA_STORE_URL.to_string(),
            debug_sql: false,
        }
    }
}

impl DataStoreConfig {
    /// Build from `ILOG_DATA_STORE_TYPE`, `ILOG_DATA_STORE_URL` and `ILOG_DEBUG_SQL`.
    pub fn from_env() -> Self {
        let defaults = Self::default();
        Self {
            store_type: env_or("ILOG_DATA_STORE_TYPE", defaults.store_type),
            url: env_or("ILOG_DATA_STORE_URL", defaults.url),
            debug_sql: env_flag("ILOG_DEBUG_SQL", defaults.debug_sql),
        }
    }
}

fn is_sqlite_memory_url(url: &str) -> bool {
    url.contains(":memory:") || url.contains("mode=memory")
}

impl DataStore {
    /// Create a lazily connecting store from `config`.
    ///
    /// An in-memory SQLite database only exists for the lifetime of its
    /// connection, so such pools are pinned to a single connection that never
    /// idles out.
    pub fn connect_lazy(config: &DataStoreConfig) -> Result<Self, StorageError> {
        tracing::info!(
            "Initializing data store with type: {}, url: {}",
            config.store_type,
            config.url
        );

        let store = match config.store_type.as_str() {
            "sqlite" => {
                let opts = SqliteConnectOptions::from_str(&config.url)
                    .map_err(|e| StorageError::Configuration(e.to_string()))?
                    .create_if_missing(true);
                let pool_options = if is_sqlite_memory_url(&config.url) {
                    SqlitePoolOptions::new()
                        .max_connections(1)
                        .idle_timeout(None)
                        .max_lifetime(None)
                } else {
                    SqlitePoolOptions::new()
                };
                DataStore::from_sqlite_pool(pool_options.connect_lazy_with(opts))
            }
            "postgres" => DataStore::from_postgres_pool(
                PgPoolOptions::new()
                    .connect_lazy(&config.url)
                    .map_err(|e| StorageError::Configuration(e.to_string()))?,
            ),
            t => {
                return Err(StorageError::Configuration(format!(
                    "Unsupported store type: {t}. Supported types are 'sqlite' and 'postgres'"
                )));
            }
        };

        if config.debug_sql {
            tracing::info!("SQL debugging enabled, publishing data events");
            Ok(store.with_event_bus(DataEventBus::new()))
        } else {
            Ok(store)
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::storage::Backend;
    use crate::test_utils::with_env_var;
    use serial_test::serial;

    #[test]
    #[serial]
    fn test_from_env_defaults() {
        with_env_var("ILOG_DATA_STORE_TYPE", None, || {
            with_env_var("ILOG_DATA_STORE_URL", None, || {
                with_env_var("ILOG_DEBUG_SQL", None, || {
                    assert_eq!(DataStoreConfig::from_env(), DataStoreConfig::default());
                })
            })
        });
    }

    #[test]
    #[serial]
    fn test_from_env_custom() {
        with_env_var("ILOG_DATA_STORE_URL", Some("sqlite::memory:"), || {
            with_env_var("ILOG_DEBUG_SQL", Some("1"), || {
                let config = DataStoreConfig::from_env();
                assert_eq!(config.url, "sqlite::memory:");
                assert!(config.debug_sql);
            })
        });
    }

    #[test]
    fn test_is_sqlite_memory_url() {
        assert!(is_sqlite_memory_url("sqlite::memory:"));
        assert!(is_sqlite_memory_url("sqlite:file:test?mode=memory&cache=shared"));
        assert!(!is_sqlite_memory_url("sqlite:/tmp/ilog.db"));
    }

    #[tokio::test]
    async fn test_unsupported_store_type() {
        let config = DataStoreConfig {
            store_type: "oracle".to_string(),
            ..DataStoreConfig::default()
        };
        match DataStore::connect_lazy(&config) {
            Err(StorageError::Configuration(msg)) => assert!(msg.contains("Unsupported store type")),
            other => panic!("Expected configuration error, got {other:?}"),
        }
    }

    #[tokio::test]
    async fn test_connect_lazy_sqlite_with_debug_sql() {
        let config = DataStoreConfig {
            store_type: "sqlite".to_string(),
            url: "sqlite::memory:".to_string(),
            debug_sql: true,
        };
        let store = DataStore::connect_lazy(&config).expect("sqlite store");
        assert_eq!(store.backend(), Backend::Sqlite);
        assert!(store.as_sqlite().is_some());
        assert!(store.as_postgres().is_none());
        assert!(store.events().is_some());
    }
}
