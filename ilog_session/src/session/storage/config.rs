/// Persistent sessions table name
pub(crate) const DB_TABLE_SESSIONS: &str = "sessions";
