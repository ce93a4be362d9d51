use sqlx::{Pool, Postgres, Sqlite};

use super::events::DataEventBus;

/// Connection pool of one of the supported backends.
#[derive(Clone, Debug)]
pub(crate) enum DataPool {
    Sqlite(sqlx::SqlitePool),
    Postgres(sqlx::PgPool),
}

/// Which backend a [`DataStore`] talks to. Store modules dispatch on this
/// to pick their SQLite or PostgreSQL statements.
#[derive(Clone, Copy, Debug, PartialEq, Eq)]
pub enum Backend {
    Sqlite,
    Postgres,
}

/// Handle to the application database.
///
/// Cheap to clone: the pools are reference counted. Every component that needs
/// data access receives one of these at construction time.
#[derive(Clone, Debug)]
pub struct DataStore {
    pub(crate) pool: DataPool,
    pub(crate) events: Option<DataEventBus>,
}

impl DataStore {
    pub fn from_sqlite_pool(pool: sqlx::SqlitePool) -> Self {
        Self {
            pool: DataPool::Sqlite(pool),
            events: None,
        }
    }

    pub fn from_postgres_pool(pool: sqlx::PgPool) -> Self {
        Self {
            pool: DataPool::Postgres(pool),
            events: None,
        }
    }

    /// Publish unit-of-work lifecycle and query events on `bus`.
    pub fn with_event_bus(mut self, bus: DataEventBus) -> Self {
        self.events = Some(bus);
        self
    }

    pub fn backend(&self) -> Backend {
        match self.pool {
            DataPool::Sqlite(_) => Backend::Sqlite,
            DataPool::Postgres(_) => Backend::Postgres,
        }
    }

    pub fn events(&self) -> Option<&DataEventBus> {
        self.events.as_ref()
    }

    pub fn as_sqlite(&self) -> Option<&Pool<Sqlite>> {
        match &self.pool {
            DataPool::Sqlite(pool) => Some(pool),
            DataPool::Postgres(_) => None,
        }
    }

    pub fn as_postgres(&self) -> Option<&Pool<Postgres>> {
        match &self.pool {
            DataPool::Sqlite(_) => None,
            DataPool::Postgres(pool) => Some(pool),
        }
    }
}
