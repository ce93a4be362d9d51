//! Scoped database access.
//!
//! A [`UnitOfWork`] is one acquire, use, commit-or-rollback, release cycle
//! against the data store. Operations get one through [`with_unit_of_work`]
//! (explicit parameter) or [`with_attached_unit_of_work`] (stored on the
//! caller for the duration of the call). Either way the unit is closed
//! exactly once when the operation finishes, and its open transaction is
//! rolled back on drop if the calling future is cancelled.

use std::future::Future;
use std::pin::Pin;
use std::time::Instant;

use sqlx::{PgConnection, SqliteConnection};
use uuid::Uuid;

use super::errors::{StorageError, UnitOfWorkError};
use super::events::DataEvent;
use super::types::{Backend, DataPool, DataStore};

/// Future returned by operations run through [`with_unit_of_work`].
pub type UnitOfWorkFuture<'a, T, E> =
    Pin<Box<dyn Future<Output = Result<T, UnitOfWorkError<E>>> + Send + 'a>>;

enum Transaction {
    Sqlite(sqlx::Transaction<'static, sqlx::Sqlite>),
    Postgres(sqlx::Transaction<'static, sqlx::Postgres>),
}

pub struct UnitOfWork {
    id: Uuid,
    store: DataStore,
    tx: Option<Transaction>,
    dirty: bool,
    closed: bool,
}

impl std::fmt::Debug for UnitOfWork {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("UnitOfWork")
            .field("id", &self.id)
            .field("backend", &self.store.backend())
            .field("in_transaction", &self.tx.is_some())
            .field("dirty", &self.dirty)
            .finish()
    }
}

impl UnitOfWork {
    pub(crate) fn open(store: &DataStore) -> Self {
        let uow = Self {
            id: Uuid::new_v4(),
            store: store.clone(),
            tx: None,
            dirty: false,
            closed: false,
        };
        tracing::debug!(unit = %uow.id, "Opening database unit of work");
        uow.publish(DataEvent::Opened { unit: uow.id });
        uow
    }

    pub fn id(&self) -> Uuid {
        self.id
    }

    pub fn backend(&self) -> Backend {
        self.store.backend()
    }

    /// True when changes were made since the last commit.
    pub fn is_dirty(&self) -> bool {
        self.dirty
    }

    pub(crate) fn mark_dirty(&mut self) {
        self.dirty = true;
    }

    async fn begin_if_needed(&mut self) -> Result<(), StorageError> {
        if self.tx.is_none() {
            let tx = match &self.store.pool {
                DataPool::Sqlite(pool) => Transaction::Sqlite(pool.begin().await?),
                DataPool::Postgres(pool) => Transaction::Postgres(pool.begin().await?),
            };
            self.tx = Some(tx);
        }
        Ok(())
    }

    /// The SQLite connection of the current transaction, beginning one if needed.
    pub(crate) async fn sqlite(&mut self) -> Result<&mut SqliteConnection, StorageError> {
        self.begin_if_needed().await?;
        match self.tx.as_mut() {
            Some(Transaction::Sqlite(tx)) => Ok(&mut **tx),
            _ => Err(StorageError::Configuration(
                "unit of work is not backed by SQLite".to_string(),
            )),
        }
    }

    /// The PostgreSQL connection of the current transaction, beginning one if needed.
    pub(crate) async fn postgres(&mut self) -> Result<&mut PgConnection, StorageError> {
        self.begin_if_needed().await?;
        match self.tx.as_mut() {
            Some(Transaction::Postgres(tx)) => Ok(&mut **tx),
            _ => Err(StorageError::Configuration(
                "unit of work is not backed by PostgreSQL".to_string(),
            )),
        }
    }

    pub async fn commit(&mut self) -> Result<(), StorageError> {
        if let Some(tx) = self.tx.take() {
            match tx {
                Transaction::Sqlite(tx) => tx.commit().await?,
                Transaction::Postgres(tx) => tx.commit().await?,
            }
            tracing::debug!(unit = %self.id, "Committed unit of work");
            self.publish(DataEvent::Committed { unit: self.id });
        }
        self.dirty = false;
        Ok(())
    }

    pub async fn rollback(&mut self) -> Result<(), StorageError> {
        self.dirty = false;
        if let Some(tx) = self.tx.take() {
            match tx {
                Transaction::Sqlite(tx) => tx.rollback().await?,
                Transaction::Postgres(tx) => tx.rollback().await?,
            }
            tracing::debug!(unit = %self.id, "Rolled back unit of work");
            self.publish(DataEvent::RolledBack { unit: self.id });
        }
        Ok(())
    }

    /// Release the unit. An open transaction is rolled back; failures doing so
    /// are logged since the connection goes back to the pool either way.
    pub(crate) async fn close(mut self) {
        if self.tx.is_some() {
            if let Err(e) = self.rollback().await {
                tracing::error!(unit = %self.id, "Failed to roll back on close: {}", e);
            }
        }
        tracing::debug!(unit = %self.id, "Closing database unit of work");
        self.closed = true;
        self.publish(DataEvent::Closed { unit: self.id });
    }

    /// Report an executed statement to the SQL debug listeners.
    #[track_caller]
    pub(crate) fn record_query(&self, statement: &str, started: Instant) {
        let elapsed = started.elapsed();
        tracing::trace!(unit = %self.id, ?elapsed, "{}", statement.trim());
        if self.store.events.is_some() {
            let caller = std::panic::Location::caller();
            self.publish(DataEvent::Query {
                unit: self.id,
                statement: statement.to_string(),
                context: format!("{}:{}", caller.file(), caller.line()),
                elapsed_ms: elapsed.as_secs_f64() * 1000.0,
            });
        }
    }

    fn publish(&self, event: DataEvent) {
        if let Some(bus) = &self.store.events {
            bus.publish(event);
        }
    }

    async fn settle<T, E>(
        &mut self,
        result: Result<T, UnitOfWorkError<E>>,
    ) -> Result<T, UnitOfWorkError<E>> {
        match result {
            Ok(value) => {
                if self.dirty {
                    tracing::warn!(
                        unit = %self.id,
                        "Unit of work finished with uncommitted changes, committing them"
                    );
                    self.commit().await?;
                }
                Ok(value)
            }
            Err(UnitOfWorkError::Data(e)) => {
                tracing::error!(unit = %self.id, "Data layer failure, rolling back: {}", e);
                if let Err(rollback_error) = self.rollback().await {
                    tracing::error!(unit = %self.id, "Rollback failed: {}", rollback_error);
                }
                Err(UnitOfWorkError::Data(e))
            }
            Err(UnitOfWorkError::Operation(e)) => {
                tracing::debug!(unit = %self.id, "Operation failed, rolling back");
                if let Err(rollback_error) = self.rollback().await {
                    tracing::error!(unit = %self.id, "Rollback failed: {}", rollback_error);
                }
                Err(UnitOfWorkError::Operation(e))
            }
        }
    }
}

impl Drop for UnitOfWork {
    fn drop(&mut self) {
        if !self.closed {
            // Cancelled mid-operation: sqlx rolls the transaction back when it drops.
            tracing::warn!(unit = %self.id, "Unit of work dropped without being closed");
            self.closed = true;
            self.publish(DataEvent::Closed { unit: self.id });
        }
    }
}

/// Run `op` inside a fresh unit of work.
///
/// On success any uncommitted change is committed (with a warning, callers are
/// expected to commit themselves). On failure the unit is rolled back. In every
/// case the unit is closed before this returns.
pub async fn with_unit_of_work<T, E, F>(store: &DataStore, op: F) -> Result<T, UnitOfWorkError<E>>
where
    F: for<'a> FnOnce(&'a mut UnitOfWork) -> UnitOfWorkFuture<'a, T, E>,
{
    let mut uow = UnitOfWork::open(store);
    let result = op(&mut uow).await;
    let result = uow.settle(result).await;
    uow.close().await;
    result
}

/// A caller that can carry a unit of work for the duration of an operation.
pub trait UnitOfWorkHost: Send {
    fn unit_of_work_slot(&mut self) -> &mut Option<UnitOfWork>;

    /// The attached unit, or [`StorageError::Detached`] outside of
    /// [`with_attached_unit_of_work`].
    fn unit_of_work(&mut self) -> Result<&mut UnitOfWork, StorageError> {
        self.unit_of_work_slot()
            .as_mut()
            .ok_or(StorageError::Detached)
    }
}

/// Empties the host's slot when the attaching call is cancelled.
struct AttachedUnit<'h, H: UnitOfWorkHost> {
    host: &'h mut H,
}

impl<H: UnitOfWorkHost> Drop for AttachedUnit<'_, H> {
    fn drop(&mut self) {
        if let Some(uow) = self.host.unit_of_work_slot().take() {
            tracing::warn!(unit = %uow.id(), "Detaching unit of work of a cancelled operation");
            drop(uow);
        }
    }
}

/// Future returned by operations run through [`with_attached_unit_of_work`].
pub type AttachedFuture<'a, T, E> = UnitOfWorkFuture<'a, T, E>;

/// Attach a fresh unit of work to `host`, run `op`, then detach and close it.
///
/// Same commit/rollback/close rules as [`with_unit_of_work`]. The slot is
/// emptied on return whatever the outcome; a previously attached unit is
/// closed first.
pub async fn with_attached_unit_of_work<H, T, E, F>(
    store: &DataStore,
    host: &mut H,
    op: F,
) -> Result<T, UnitOfWorkError<E>>
where
    H: UnitOfWorkHost,
    F: for<'a> FnOnce(&'a mut H) -> AttachedFuture<'a, T, E>,
{
    let mut attached = AttachedUnit { host };

    if let Some(stale) = attached.host.unit_of_work_slot().take() {
        tracing::warn!(unit = %stale.id(), "Replacing a unit of work that was still attached");
        stale.close().await;
    }

    *attached.host.unit_of_work_slot() = Some(UnitOfWork::open(store));
    let result = op(&mut *attached.host).await;

    match attached.host.unit_of_work_slot().take() {
        Some(mut uow) => {
            let result = uow.settle(result).await;
            uow.close().await;
            result
        }
        None => {
            tracing::warn!("Operation detached its unit of work itself");
            result
        }
    }
}
