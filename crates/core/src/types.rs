/// Account (user) identifiers are PostgreSQL BIGINT.
pub type DbId = i64;

/// Jobs, requests and workers are identified by UUID.
pub type EntityId = uuid::Uuid;

/// All timestamps are UTC.
pub type Timestamp = chrono::DateTime<chrono::Utc>;
