mod storage;
mod types;

pub(crate) use storage::DB_TABLE_USERS;
pub use storage::UserStore;
pub use types::{DEFAULT_DISPLAY_NAME, DEFAULT_ITEMS_PER_PAGE, DEFAULT_TZINFO, User};
