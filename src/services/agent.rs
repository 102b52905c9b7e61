use crate::api::middleware::AppError;
use crate::services::database::adapter::QueryResult;
use crate::services::database::DatabaseAdapter;
use crate::services::llm::{strip_code_fences, LlmClient};
use crate::validation::SqlValidator;
use std::time::Duration;

/// Maximum rows fed back into the answer prompt; anything past this is
/// summarized as a count so the context stays bounded.
const MAX_ROWS_IN_PROMPT: usize = 50;

const DEFAULT_ROW_LIMIT: u64 = 1000;

const SQL_SYSTEM_PROMPT: &str =
    "You are a SQL expert. Given a database schema and a natural language question, \
     generate exactly one valid SELECT query. Return only the SQL, no explanations \
     and no markdown formatting.";

const ANSWER_SYSTEM_PROMPT: &str =
    "You are a helpful data analyst. Given a question, the SQL that was executed and \
     its result rows, answer the question in plain language. Be concise and only use \
     the provided rows.";

/// The injected natural-language-to-SQL capability: one question in, one
/// final answer out. The service depends on this seam, not on a concrete
/// agent implementation.
#[async_trait::async_trait]
pub trait QueryAgent: Send + Sync {
    async fn run(&self, question: &str) -> Result<String, AppError>;
}

/// LLM-backed agent bound to one database adapter for one request.
///
/// Pipeline: introspect schema, generate SQL, guard it, execute, phrase the
/// rows as an answer. The whole run is bounded by `max_execution_secs`; the
/// bound is cooperative, nothing cancels the underlying calls early.
pub struct SqlAgent {
    llm: LlmClient,
    db: Box<dyn DatabaseAdapter>,
    max_execution_secs: u64,
}

impl SqlAgent {
    pub fn new(llm: LlmClient, db: Box<dyn DatabaseAdapter>, max_execution_secs: u64) -> Self {
        Self {
            llm,
            db,
            max_execution_secs,
        }
    }

    fn dialect_hints(&self) -> &'static str {
        match self.db.database_type() {
            "mysql" => {
                "- Use MySQL syntax and functions\n\
                 - Use LIMIT syntax (not TOP or FETCH FIRST)\n\
                 - String concatenation uses CONCAT()\n\
                 - Use backticks for identifier quoting if needed: `table_name`"
            }
            "sqlite" => {
                "- Use SQLite syntax and functions\n\
                 - Use LIMIT syntax\n\
                 - For dates, use functions like date(), strftime()\n\
                 - String concatenation uses the || operator"
            }
            _ => {
                "- Use PostgreSQL syntax and functions\n\
                 - Use LIMIT syntax (or FETCH FIRST)\n\
                 - String concatenation uses || or CONCAT()\n\
                 - Use double quotes for identifier quoting if needed: \"table_name\""
            }
        }
    }

    async fn generate_sql(&self, question: &str, schema_context: &str) -> Result<String, AppError> {
        let prompt = format!(
            "Database Schema:\n{schema_context}\n\n\
             Question: {question}\n\n\
             Instructions:\n\
             1. Generate ONLY a valid {dialect} SELECT query\n\
             2. Use proper table and column names from the schema above\n\
             3. Return ONLY the SQL query, nothing else\n\
             {hints}\n\n\
             SQL Query:",
            schema_context = schema_context,
            question = question,
            dialect = self.db.database_type(),
            hints = self.dialect_hints(),
        );

        let raw = self.llm.complete(SQL_SYSTEM_PROMPT, &prompt).await?;
        Ok(strip_code_fences(&raw))
    }

    async fn phrase_answer(
        &self,
        question: &str,
        sql: &str,
        result: &QueryResult,
    ) -> Result<String, AppError> {
        let shown = result.rows.len().min(MAX_ROWS_IN_PROMPT);
        let rows_json = serde_json::to_string(&result.rows[..shown])
            .map_err(|e| AppError::Agent(format!("Failed to serialize result rows: {}", e)))?;

        let mut prompt = format!(
            "Question: {}\n\nExecuted SQL: {}\n\nResult rows ({} total):\n{}",
            question, sql, result.row_count, rows_json
        );
        if result.row_count > shown {
            prompt.push_str(&format!("\n(only the first {} rows are shown)", shown));
        }

        self.llm.complete(ANSWER_SYSTEM_PROMPT, &prompt).await
    }

    async fn run_pipeline(&self, question: &str) -> Result<String, AppError> {
        let metadata = self.db.fetch_metadata().await?;
        let schema_context = metadata.table_info();
        tracing::info!(
            "Agent: introspected {} tables, {} views",
            metadata.tables.len(),
            metadata.views.len()
        );

        let sql = self.generate_sql(question, &schema_context).await?;
        tracing::info!("Agent: generated SQL: {}", sql);

        // Guard the generated statement; a rejected statement is an agent
        // failure, not a client error.
        let (prepared_sql, limit_applied) =
            SqlValidator::validate_and_prepare(&sql, DEFAULT_ROW_LIMIT)
                .map_err(|e| AppError::Agent(format!("Generated SQL was rejected: {}", e)))?;
        if limit_applied {
            tracing::debug!("Agent: applied default LIMIT {}", DEFAULT_ROW_LIMIT);
        }

        let result = self
            .db
            .execute_query(&prepared_sql, self.max_execution_secs)
            .await?;
        tracing::info!(
            "Agent: query returned {} rows in {} ms",
            result.row_count,
            result.execution_time_ms
        );

        let answer = self.phrase_answer(question, &prepared_sql, &result).await?;
        tracing::info!("Agent: final answer produced ({} chars)", answer.len());

        Ok(answer)
    }
}

#[async_trait::async_trait]
impl QueryAgent for SqlAgent {
    async fn run(&self, question: &str) -> Result<String, AppError> {
        tokio::time::timeout(
            Duration::from_secs(self.max_execution_secs),
            self.run_pipeline(question),
        )
        .await
        .map_err(|_| {
            AppError::Agent(format!(
                "Agent execution exceeded {} seconds",
                self.max_execution_secs
            ))
        })?
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::config::LlmSettings;
    use crate::models::DatabaseMetadata;

    struct StubAdapter;

    #[async_trait::async_trait]
    impl DatabaseAdapter for StubAdapter {
        async fn fetch_metadata(&self) -> Result<DatabaseMetadata, AppError> {
            Ok(DatabaseMetadata::new(vec![], vec![], vec![]))
        }

        async fn execute_query(
            &self,
            _sql: &str,
            _timeout_secs: u64,
        ) -> Result<QueryResult, AppError> {
            Ok(QueryResult {
                rows: vec![],
                row_count: 0,
                execution_time_ms: 0,
            })
        }

        fn database_type(&self) -> &str {
            "sqlite"
        }

        async fn test_connection(&self) -> Result<(), AppError> {
            Ok(())
        }
    }

    fn agent_with_stub() -> SqlAgent {
        let llm = LlmClient::new(&LlmSettings {
            model: "test-model".to_string(),
            base_url: "http://localhost:9".to_string(),
            api_key: "test".to_string(),
        });
        SqlAgent::new(llm, Box::new(StubAdapter), 1)
    }

    #[test]
    fn test_dialect_hints_follow_database_type() {
        let agent = agent_with_stub();
        assert!(agent.dialect_hints().contains("SQLite"));
    }

    #[tokio::test]
    async fn test_unreachable_llm_is_reported_not_swallowed() {
        // Port 9 (discard) refuses connections; the run must fail with an
        // error message rather than hang past its bound.
        let agent = agent_with_stub();
        let err = agent.run("how many customers?").await.unwrap_err();
        match err {
            AppError::Llm(msg) | AppError::Agent(msg) => assert!(!msg.is_empty()),
            other => panic!("unexpected error kind: {:?}", other),
        }
    }
}
