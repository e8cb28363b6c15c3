/// All database primary keys are PostgreSQL BIGSERIAL, including the `id`
/// column of every generated module table.
pub type DbId = i64;

/// All timestamps are UTC.
pub type Timestamp = chrono::DateTime<chrono::Utc>;
