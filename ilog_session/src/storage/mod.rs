mod config;
mod errors;
mod events;
mod types;
mod unit_of_work;

pub use config::DataStoreConfig;
pub use errors::{StorageError, UnitOfWorkError};
pub use events::{DataEvent, DataEventBus, DataEventSubscription, spawn_query_logger};
pub use types::{Backend, DataStore};
pub use unit_of_work::{
    AttachedFuture, UnitOfWork, UnitOfWorkFuture, UnitOfWorkHost, with_attached_unit_of_work,
    with_unit_of_work,
};
