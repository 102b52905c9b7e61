// Database adapter trait for multi-database support
use crate::api::middleware::AppError;
use crate::models::DatabaseMetadata;
use serde_json::Value;

/// Query execution result
#[derive(Debug)]
pub struct QueryResult {
    pub rows: Vec<Value>,
    pub row_count: usize,
    pub execution_time_ms: u64,
}

/// Database adapter trait - abstraction layer for different database types.
///
/// An adapter is a request-scoped binding to one connection string. It is
/// constructed fresh per request and dropped when the request completes;
/// whether connections behind it are pooled is a driver concern.
#[async_trait::async_trait]
pub trait DatabaseAdapter: Send + Sync {
    /// Introspect table/column metadata. Failures here are connection-class
    /// errors so `/schema` maps them to a client error.
    async fn fetch_metadata(&self) -> Result<DatabaseMetadata, AppError>;

    /// Execute a SQL statement with a per-call timeout, returning JSON rows.
    async fn execute_query(&self, sql: &str, timeout_secs: u64) -> Result<QueryResult, AppError>;

    /// Get database type
    fn database_type(&self) -> &str;

    /// Verify the database is reachable before any agent work starts.
    async fn test_connection(&self) -> Result<(), AppError>;
}
