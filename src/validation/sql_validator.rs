use crate::api::middleware::AppError;
use sqlparser::ast::Statement;
use sqlparser::dialect::GenericDialect;
use sqlparser::parser::Parser;

/// Guard for LLM-generated SQL: read-only statements with a bounded row count.
/// Parses with the generic dialect since the same guard runs in front of
/// SQLite, PostgreSQL and MySQL.
pub struct SqlValidator;

impl SqlValidator {
    /// Validate SQL and ensure it is a SELECT statement
    pub fn validate_select_only(sql: &str) -> Result<String, AppError> {
        let dialect = GenericDialect {};
        let mut parser = Parser::new(&dialect)
            .try_with_sql(sql)
            .map_err(|e| AppError::InvalidSql(format!("SQL parsing error: {}", e)))?;

        let ast = parser
            .parse_statements()
            .map_err(|e| AppError::InvalidSql(format!("SQL parsing error: {}", e)))?;

        if ast.is_empty() {
            return Err(AppError::InvalidSql("Empty SQL query".to_string()));
        }

        // A single statement only: the LIMIT injection below operates on the
        // whole string and a script of several SELECTs would end up with one
        // dangling LIMIT appended after the last semicolon.
        if ast.len() > 1 {
            return Err(AppError::InvalidSql(
                "Only a single SELECT statement is permitted.".to_string(),
            ));
        }

        for stmt in ast {
            match stmt {
                Statement::Query(_) => {
                    // Valid SELECT query
                }
                Statement::Insert { .. }
                | Statement::Update { .. }
                | Statement::Delete { .. }
                | Statement::Drop { .. }
                | Statement::CreateTable { .. }
                | Statement::AlterTable { .. } => {
                    return Err(AppError::InvalidSql(
                        "Only SELECT queries are permitted.".to_string(),
                    ));
                }
                _ => {
                    return Err(AppError::InvalidSql(format!(
                        "Only SELECT queries are permitted. Found: {:?}",
                        stmt
                    )));
                }
            }
        }

        Ok(sql.to_string())
    }

    /// Append a LIMIT clause if the statement does not already carry one.
    /// AST-based so identifiers or comments containing "limit" do not
    /// produce false positives.
    pub fn ensure_limit(sql: &str, default_limit: u64) -> Result<String, AppError> {
        if Self::has_limit(sql) {
            Ok(sql.to_string())
        } else {
            let trimmed_sql = sql.trim_end_matches(';').trim();
            Ok(format!("{} LIMIT {}", trimmed_sql, default_limit))
        }
    }

    /// Check if a statement has a LIMIT clause using AST analysis
    fn check_limit_in_statement(stmt: &Statement) -> bool {
        match stmt {
            Statement::Query(query) => query.limit_clause.is_some(),
            _ => false,
        }
    }

    /// Validate (SELECT-only) and ensure a LIMIT; returns the prepared SQL
    /// and whether a LIMIT was injected.
    pub fn validate_and_prepare(sql: &str, default_limit: u64) -> Result<(String, bool), AppError> {
        let validated_sql = Self::validate_select_only(sql)?;

        let original_has_limit = Self::has_limit(&validated_sql);
        let final_sql = Self::ensure_limit(&validated_sql, default_limit)?;

        Ok((final_sql, !original_has_limit))
    }

    /// Check if SQL has LIMIT clause using AST parsing
    fn has_limit(sql: &str) -> bool {
        let dialect = GenericDialect {};
        let mut parser = match Parser::new(&dialect).try_with_sql(sql) {
            Ok(p) => p,
            Err(_) => return false,
        };

        let ast = match parser.parse_statements() {
            Ok(statements) => statements,
            Err(_) => return false,
        };

        if ast.is_empty() {
            return false;
        }

        Self::check_limit_in_statement(&ast[0])
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_validate_select_only() {
        assert!(SqlValidator::validate_select_only("SELECT * FROM users").is_ok());
        assert!(SqlValidator::validate_select_only("INSERT INTO users VALUES (1)").is_err());
        assert!(SqlValidator::validate_select_only("UPDATE users SET name = 'test'").is_err());
        assert!(SqlValidator::validate_select_only("DELETE FROM users").is_err());
        assert!(SqlValidator::validate_select_only("DROP TABLE users").is_err());
    }

    #[test]
    fn test_rejects_multiple_statements() {
        let err = SqlValidator::validate_and_prepare(
            "SELECT name FROM artists; SELECT title FROM albums",
            1000,
        )
        .unwrap_err();
        assert!(matches!(err, AppError::InvalidSql(_)));

        // A trailing semicolon is still a single statement
        let (sql, _) = SqlValidator::validate_and_prepare("SELECT name FROM artists;", 1000)
            .unwrap();
        assert!(sql.contains("LIMIT 1000"));

        // Smuggling a write after a read is rejected as well
        assert!(
            SqlValidator::validate_select_only("SELECT 1; DELETE FROM users").is_err()
        );
    }

    #[test]
    fn test_ensure_limit() {
        let result = SqlValidator::ensure_limit("SELECT * FROM users", 1000).unwrap();
        assert!(result.contains("LIMIT 1000"));

        let sql = "SELECT * FROM users LIMIT 100";
        let result = SqlValidator::ensure_limit(sql, 1000).unwrap();
        assert_eq!(result, sql);
    }

    #[test]
    fn test_validate_and_prepare() {
        let (sql, limit_applied) =
            SqlValidator::validate_and_prepare("SELECT * FROM users", 1000).unwrap();
        assert!(sql.contains("LIMIT 1000"));
        assert!(limit_applied);

        let (sql, limit_applied) =
            SqlValidator::validate_and_prepare("SELECT * FROM users LIMIT 50", 1000).unwrap();
        assert!(sql.contains("LIMIT 50"));
        assert!(!limit_applied);

        assert!(SqlValidator::validate_and_prepare("DELETE FROM users", 1000).is_err());
    }

    #[test]
    fn test_limit_detection_with_ast() {
        // Identifiers containing "limit" must not be detected as a LIMIT clause
        let (result, limit_applied) =
            SqlValidator::validate_and_prepare("SELECT * FROM table_limit", 1000).unwrap();
        assert!(result.contains("LIMIT 1000"));
        assert!(limit_applied);

        let (result, limit_applied) =
            SqlValidator::validate_and_prepare("SELECT limit_value FROM users", 1000).unwrap();
        assert!(result.contains("LIMIT 1000"));
        assert!(limit_applied);

        let (result, limit_applied) =
            SqlValidator::validate_and_prepare("SELECT * FROM users LIMIT 100 OFFSET 10", 1000)
                .unwrap();
        assert!(result.contains("LIMIT 100"));
        assert!(!limit_applied);
    }
}
