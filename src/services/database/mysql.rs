// MySQL adapter; mysql_async brings its own per-adapter pool
use crate::api::middleware::AppError;
use crate::models::{Column, DatabaseMetadata, Table, View};
use crate::services::database::adapter::{DatabaseAdapter, QueryResult};
use mysql_async::{prelude::*, Conn, Opts, Pool, Row, Value as MySqlValue};
use serde_json::{json, Value};
use std::time::Instant;
use url::Url;

pub struct MySQLAdapter {
    pool: Pool,
}

impl MySQLAdapter {
    pub fn new(connection_url: &str) -> Result<Self, AppError> {
        // Validate MySQL URL format
        let url = Url::parse(connection_url)
            .map_err(|e| AppError::Validation(format!("Invalid MySQL URL: {}", e)))?;

        if url.scheme() != "mysql" && url.scheme() != "mariadb" {
            return Err(AppError::Validation(
                "URL must use mysql:// or mariadb:// scheme".to_string(),
            ));
        }

        // mysql_async only understands the mysql:// scheme
        let normalized = match connection_url.strip_prefix("mariadb://") {
            Some(rest) => format!("mysql://{}", rest),
            None => connection_url.to_string(),
        };
        let opts = Opts::from_url(&normalized)
            .map_err(|e| AppError::Validation(format!("Invalid MySQL URL: {}", e)))?;
        let pool = Pool::new(opts);

        Ok(Self { pool })
    }

    async fn get_conn(&self) -> Result<Conn, AppError> {
        self.pool.get_conn().await.map_err(|e| {
            AppError::Connection(format!("Failed to get MySQL connection from pool: {}", e))
        })
    }

    /// Helper function to convert MySQL Value to JSON Value
    fn mysql_value_to_json(mysql_val: MySqlValue) -> Value {
        match mysql_val {
            MySqlValue::NULL => Value::Null,
            MySqlValue::Bytes(bytes) => match String::from_utf8(bytes) {
                Ok(s) => json!(s),
                Err(_) => Value::Null,
            },
            MySqlValue::Int(i) => json!(i),
            MySqlValue::UInt(u) => json!(u),
            MySqlValue::Float(f) => json!(f),
            MySqlValue::Double(d) => json!(d),
            MySqlValue::Date(y, m, d, h, min, s, _) => {
                json!(format!(
                    "{:04}-{:02}-{:02} {:02}:{:02}:{:02}",
                    y, m, d, h, min, s
                ))
            }
            MySqlValue::Time(is_neg, d, h, m, s, _) => {
                let sign = if is_neg { "-" } else { "" };
                let total_hours = d * 24 + h as u32;
                json!(format!("{}{}:{:02}:{:02}", sign, total_hours, m, s))
            }
        }
    }

    async fn get_schemas(conn: &mut Conn) -> Result<Vec<String>, AppError> {
        let rows: Vec<String> = conn
            .query(
                "SELECT SCHEMA_NAME FROM information_schema.SCHEMATA
                 WHERE SCHEMA_NAME NOT IN ('information_schema', 'mysql', 'performance_schema', 'sys')
                 ORDER BY SCHEMA_NAME",
            )
            .await
            .map_err(|e| AppError::Connection(format!("Failed to get schemas: {}", e)))?;

        Ok(rows)
    }

    async fn get_tables(conn: &mut Conn) -> Result<Vec<Table>, AppError> {
        let rows: Vec<(String, String)> = conn
            .query(
                r#"
                SELECT TABLE_SCHEMA, TABLE_NAME
                FROM information_schema.TABLES
                WHERE TABLE_TYPE = 'BASE TABLE'
                  AND TABLE_SCHEMA NOT IN ('information_schema', 'mysql', 'performance_schema', 'sys')
                ORDER BY TABLE_SCHEMA, TABLE_NAME
                "#,
            )
            .await
            .map_err(|e| AppError::Connection(format!("Failed to get tables: {}", e)))?;

        let mut tables = Vec::new();
        for (schema, name) in rows {
            let columns = Self::get_table_columns(conn, &schema, &name).await?;
            tables.push(Table {
                name,
                schema: Some(schema),
                columns,
            });
        }

        Ok(tables)
    }

    async fn get_views(conn: &mut Conn) -> Result<Vec<View>, AppError> {
        let rows: Vec<(String, String)> = conn
            .query(
                r#"
                SELECT TABLE_SCHEMA, TABLE_NAME
                FROM information_schema.VIEWS
                WHERE TABLE_SCHEMA NOT IN ('information_schema', 'mysql', 'performance_schema', 'sys')
                ORDER BY TABLE_SCHEMA, TABLE_NAME
                "#,
            )
            .await
            .map_err(|e| AppError::Connection(format!("Failed to get views: {}", e)))?;

        let mut views = Vec::new();
        for (schema, name) in rows {
            let columns = Self::get_table_columns(conn, &schema, &name).await?;
            views.push(View {
                name,
                schema: Some(schema),
                columns,
            });
        }

        Ok(views)
    }

    async fn get_table_columns(
        conn: &mut Conn,
        schema: &str,
        table_name: &str,
    ) -> Result<Vec<Column>, AppError> {
        let query = r#"
            SELECT
                c.COLUMN_NAME,
                c.DATA_TYPE,
                c.IS_NULLABLE,
                c.COLUMN_DEFAULT,
                CASE WHEN c.COLUMN_KEY = 'PRI' THEN 1 ELSE 0 END as is_primary_key
            FROM information_schema.COLUMNS c
            WHERE c.TABLE_SCHEMA = ? AND c.TABLE_NAME = ?
            ORDER BY c.ORDINAL_POSITION
        "#;

        let rows: Vec<(String, String, String, Option<String>, u8)> = conn
            .exec(query, (schema, table_name))
            .await
            .map_err(|e| AppError::Connection(format!("Failed to get columns: {}", e)))?;

        Ok(rows
            .into_iter()
            .map(
                |(name, data_type, is_nullable, default_value, is_pk)| Column {
                    name,
                    data_type,
                    is_nullable: is_nullable == "YES",
                    is_primary_key: is_pk == 1,
                    default_value,
                },
            )
            .collect())
    }
}

#[async_trait::async_trait]
impl DatabaseAdapter for MySQLAdapter {
    async fn fetch_metadata(&self) -> Result<DatabaseMetadata, AppError> {
        let mut conn = self.get_conn().await?;

        let schemas = Self::get_schemas(&mut conn).await?;
        let tables = Self::get_tables(&mut conn).await?;
        let views = Self::get_views(&mut conn).await?;

        Ok(DatabaseMetadata::new(tables, views, schemas))
    }

    async fn execute_query(&self, sql: &str, timeout_secs: u64) -> Result<QueryResult, AppError> {
        let mut conn = self.get_conn().await?;

        let start_time = Instant::now();

        let rows: Vec<Row> = tokio::time::timeout(
            std::time::Duration::from_secs(timeout_secs),
            conn.query(sql),
        )
        .await
        .map_err(|_| AppError::Database(format!("Query timeout after {} seconds", timeout_secs)))?
        .map_err(|e| AppError::Database(format!("Query execution failed: {}", e)))?;

        // Convert rows to JSON
        let mut json_rows = Vec::new();
        for row in rows {
            let mut row_obj = serde_json::Map::new();
            let columns = row.columns_ref();

            for (idx, column) in columns.iter().enumerate() {
                let column_name = column.name_str();
                let value: Value = match row.get_opt::<MySqlValue, usize>(idx) {
                    Some(Ok(mysql_val)) => Self::mysql_value_to_json(mysql_val),
                    Some(Err(_)) => Value::Null,
                    None => Value::Null,
                };
                row_obj.insert(column_name.to_string(), value);
            }
            json_rows.push(Value::Object(row_obj));
        }

        let row_count = json_rows.len();
        let execution_time_ms = start_time.elapsed().as_millis() as u64;

        Ok(QueryResult {
            rows: json_rows,
            row_count,
            execution_time_ms,
        })
    }

    fn database_type(&self) -> &str {
        "mysql"
    }

    async fn test_connection(&self) -> Result<(), AppError> {
        let _conn = self.get_conn().await?;
        Ok(())
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_rejects_wrong_scheme() {
        let result = MySQLAdapter::new("postgresql://localhost/db");
        assert!(matches!(result, Err(AppError::Validation(_))));
    }

    #[test]
    fn test_accepts_mariadb_scheme() {
        assert!(MySQLAdapter::new("mariadb://root@localhost:3306/shop").is_ok());
    }

    #[test]
    fn test_mysql_value_to_json() {
        assert_eq!(MySQLAdapter::mysql_value_to_json(MySqlValue::NULL), Value::Null);
        assert_eq!(MySQLAdapter::mysql_value_to_json(MySqlValue::Int(42)), json!(42));
        assert_eq!(
            MySQLAdapter::mysql_value_to_json(MySqlValue::Bytes(b"hello".to_vec())),
            json!("hello")
        );
    }
}
