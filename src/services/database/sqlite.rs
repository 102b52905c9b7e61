// SQLite adapter backed by rusqlite, which is synchronous: every database
// touch runs inside spawn_blocking so the request task is never blocked.
use crate::api::middleware::AppError;
use crate::models::{Column, DatabaseMetadata, Table, View};
use crate::services::database::adapter::{DatabaseAdapter, QueryResult};
use rusqlite::{Connection, OpenFlags};
use serde_json::{json, Value};
use std::path::PathBuf;
use std::time::{Duration, Instant};

pub struct SqliteAdapter {
    path: PathBuf,
}

impl SqliteAdapter {
    pub fn new(connection_url: &str) -> Result<Self, AppError> {
        let path = Self::parse_path(connection_url)?;
        Ok(Self { path })
    }

    /// Extract the file path from a `sqlite://` URI. Three slashes mean a
    /// relative path, four an absolute one (SQLAlchemy convention, which is
    /// what callers of this service are used to writing).
    fn parse_path(connection_url: &str) -> Result<PathBuf, AppError> {
        let rest = connection_url.strip_prefix("sqlite://").ok_or_else(|| {
            AppError::Validation(format!(
                "Invalid SQLite URI '{}': expected sqlite:// scheme",
                connection_url
            ))
        })?;

        let path = if let Some(abs) = rest.strip_prefix("//") {
            format!("/{}", abs.trim_start_matches('/'))
        } else {
            rest.trim_start_matches('/').to_string()
        };

        if path.is_empty() {
            return Err(AppError::Validation(format!(
                "Invalid SQLite URI '{}': missing database path",
                connection_url
            )));
        }

        Ok(PathBuf::from(path))
    }

    /// Open without SQLITE_OPEN_CREATE: a URI pointing at a nonexistent
    /// file must be a connection error, not a fresh empty database.
    fn open(path: &PathBuf) -> Result<Connection, AppError> {
        Connection::open_with_flags(
            path,
            OpenFlags::SQLITE_OPEN_READ_WRITE | OpenFlags::SQLITE_OPEN_URI,
        )
        .map_err(|e| {
            AppError::Connection(format!(
                "Failed to open SQLite database '{}': {}",
                path.display(),
                e
            ))
        })
    }

    fn introspect(conn: &Connection) -> Result<DatabaseMetadata, AppError> {
        let map_err = |e: rusqlite::Error| AppError::Connection(format!("Introspection failed: {}", e));

        let mut stmt = conn
            .prepare(
                "SELECT name, type FROM sqlite_master \
                 WHERE type IN ('table', 'view') AND name NOT LIKE 'sqlite_%' \
                 ORDER BY name",
            )
            .map_err(map_err)?;

        let relations: Vec<(String, String)> = stmt
            .query_map([], |row| Ok((row.get(0)?, row.get(1)?)))
            .map_err(map_err)?
            .collect::<Result<_, _>>()
            .map_err(map_err)?;

        let mut tables = Vec::new();
        let mut views = Vec::new();

        for (name, kind) in relations {
            let mut pragma = conn
                .prepare(&format!("PRAGMA table_info({})", quote_identifier(&name)))
                .map_err(map_err)?;
            let columns: Vec<Column> = pragma
                .query_map([], |row| {
                    let not_null: i64 = row.get(3)?;
                    let pk: i64 = row.get(5)?;
                    Ok(Column {
                        name: row.get(1)?,
                        data_type: row.get(2)?,
                        is_nullable: not_null == 0,
                        is_primary_key: pk > 0,
                        default_value: row.get(4)?,
                    })
                })
                .map_err(map_err)?
                .collect::<Result<_, _>>()
                .map_err(map_err)?;

            if kind == "view" {
                views.push(View {
                    name,
                    schema: None,
                    columns,
                });
            } else {
                tables.push(Table {
                    name,
                    schema: None,
                    columns,
                });
            }
        }

        Ok(DatabaseMetadata::new(tables, views, Vec::new()))
    }

    fn run_query(conn: &Connection, sql: &str) -> Result<Vec<Value>, AppError> {
        let map_err = |e: rusqlite::Error| AppError::Database(format!("Query execution failed: {}", e));

        let mut stmt = conn.prepare(sql).map_err(map_err)?;
        let column_names: Vec<String> = stmt
            .column_names()
            .into_iter()
            .map(|s| s.to_string())
            .collect();

        let mut rows = stmt.query([]).map_err(map_err)?;
        let mut json_rows = Vec::new();

        while let Some(row) = rows.next().map_err(map_err)? {
            let mut row_obj = serde_json::Map::new();
            for (idx, name) in column_names.iter().enumerate() {
                let value = match row.get_ref(idx).map_err(map_err)? {
                    rusqlite::types::ValueRef::Null => Value::Null,
                    rusqlite::types::ValueRef::Integer(v) => json!(v),
                    rusqlite::types::ValueRef::Real(v) => json!(v),
                    rusqlite::types::ValueRef::Text(v) => {
                        json!(String::from_utf8_lossy(v).to_string())
                    }
                    rusqlite::types::ValueRef::Blob(v) => json!(format!("<blob {} bytes>", v.len())),
                };
                row_obj.insert(name.clone(), value);
            }
            json_rows.push(Value::Object(row_obj));
        }

        Ok(json_rows)
    }
}

/// Double-quote an identifier for use in PRAGMA statements.
fn quote_identifier(name: &str) -> String {
    format!("\"{}\"", name.replace('"', "\"\""))
}

#[async_trait::async_trait]
impl DatabaseAdapter for SqliteAdapter {
    async fn fetch_metadata(&self) -> Result<DatabaseMetadata, AppError> {
        let path = self.path.clone();
        tokio::task::spawn_blocking(move || {
            let conn = SqliteAdapter::open(&path)?;
            SqliteAdapter::introspect(&conn)
        })
        .await
        .map_err(|e| AppError::Internal(format!("Blocking task failed: {}", e)))?
    }

    async fn execute_query(&self, sql: &str, timeout_secs: u64) -> Result<QueryResult, AppError> {
        let path = self.path.clone();
        let sql = sql.to_string();
        let start_time = Instant::now();

        let task = tokio::task::spawn_blocking(move || {
            let conn = SqliteAdapter::open(&path)?;
            SqliteAdapter::run_query(&conn, &sql)
        });

        let json_rows = tokio::time::timeout(Duration::from_secs(timeout_secs), task)
            .await
            .map_err(|_| {
                AppError::Database(format!("Query timeout after {} seconds", timeout_secs))
            })?
            .map_err(|e| AppError::Internal(format!("Blocking task failed: {}", e)))??;

        let row_count = json_rows.len();
        let execution_time_ms = start_time.elapsed().as_millis() as u64;

        Ok(QueryResult {
            rows: json_rows,
            row_count,
            execution_time_ms,
        })
    }

    fn database_type(&self) -> &str {
        "sqlite"
    }

    async fn test_connection(&self) -> Result<(), AppError> {
        let path = self.path.clone();
        tokio::task::spawn_blocking(move || {
            let conn = SqliteAdapter::open(&path)?;
            conn.query_row("SELECT 1", [], |_| Ok(()))
                .map_err(|e| AppError::Connection(format!("Connection test failed: {}", e)))
        })
        .await
        .map_err(|e| AppError::Internal(format!("Blocking task failed: {}", e)))?
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn fixture_db() -> tempfile::NamedTempFile {
        let file = tempfile::NamedTempFile::new().unwrap();
        let conn = Connection::open(file.path()).unwrap();
        conn.execute_batch(
            "CREATE TABLE customers (id INTEGER PRIMARY KEY, name TEXT NOT NULL, city TEXT);
             INSERT INTO customers (name, city) VALUES ('Ada', 'London'), ('Linus', 'Helsinki');
             CREATE VIEW customer_names AS SELECT name FROM customers;",
        )
        .unwrap();
        file
    }

    fn uri_for(file: &tempfile::NamedTempFile) -> String {
        // Four slashes: absolute path
        format!("sqlite:///{}", file.path().display())
    }

    #[test]
    fn test_parse_path_relative_and_absolute() {
        assert_eq!(
            SqliteAdapter::parse_path("sqlite://Chinook.db").unwrap(),
            PathBuf::from("Chinook.db")
        );
        assert_eq!(
            SqliteAdapter::parse_path("sqlite:///Chinook.db").unwrap(),
            PathBuf::from("Chinook.db")
        );
        assert_eq!(
            SqliteAdapter::parse_path("sqlite:////var/data/app.db").unwrap(),
            PathBuf::from("/var/data/app.db")
        );
        assert!(SqliteAdapter::parse_path("sqlite://").is_err());
    }

    #[tokio::test]
    async fn test_missing_file_is_connection_error() {
        let adapter = SqliteAdapter::new("sqlite:///no/such/file.db").unwrap();
        let err = adapter.test_connection().await.unwrap_err();
        assert!(matches!(err, AppError::Connection(_)));
    }

    #[tokio::test]
    async fn test_fetch_metadata() {
        let file = fixture_db();
        let adapter = SqliteAdapter::new(&uri_for(&file)).unwrap();
        let metadata = adapter.fetch_metadata().await.unwrap();

        assert_eq!(metadata.tables.len(), 1);
        assert_eq!(metadata.tables[0].name, "customers");
        assert_eq!(metadata.views.len(), 1);
        assert_eq!(metadata.views[0].name, "customer_names");

        let id_column = &metadata.tables[0].columns[0];
        assert_eq!(id_column.name, "id");
        assert!(id_column.is_primary_key);

        // Rendering is stable for an unchanged database
        assert_eq!(metadata.table_info(), metadata.table_info());
    }

    #[tokio::test]
    async fn test_execute_query_returns_json_rows() {
        let file = fixture_db();
        let adapter = SqliteAdapter::new(&uri_for(&file)).unwrap();
        let result = adapter
            .execute_query("SELECT name, city FROM customers ORDER BY name", 5)
            .await
            .unwrap();

        assert_eq!(result.row_count, 2);
        assert_eq!(result.rows[0]["name"], "Ada");
        assert_eq!(result.rows[1]["city"], "Helsinki");
    }

    #[tokio::test]
    async fn test_execute_query_bad_sql_is_database_error() {
        let file = fixture_db();
        let adapter = SqliteAdapter::new(&uri_for(&file)).unwrap();
        let err = adapter
            .execute_query("SELECT * FROM no_such_table", 5)
            .await
            .unwrap_err();
        assert!(matches!(err, AppError::Database(_)));
    }
}
