/// Users table name
pub(crate) const DB_TABLE_USERS: &str = "users";
