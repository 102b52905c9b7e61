use axum::{extract::State, Json};

use crate::api::handlers::AppState;
use crate::api::middleware::AppError;
use crate::models::{QueryRequest, QueryResponse};
use crate::services::agent::{QueryAgent, SqlAgent};
use crate::services::database::{create_adapter, DatabaseType};
use crate::services::llm::LlmClient;

/// Execute a natural language query against the requested database.
///
/// Per-request flow: resolve URI, build adapter, verify connectivity (so a
/// bad database is a 400 and the LLM is never contacted), then build an
/// agent and invoke it once. No retries, no caching.
pub async fn execute_query(
    State(state): State<AppState>,
    Json(payload): Json<QueryRequest>,
) -> Result<Json<QueryResponse>, AppError> {
    let db_uri = payload
        .db_uri
        .as_deref()
        .unwrap_or(&state.settings.database.default_uri);

    tracing::info!("Executing natural language query against {}", db_uri);

    let db_type = DatabaseType::from_uri(db_uri)?;
    let adapter = create_adapter(db_type, db_uri, state.pool_manager.clone()).await?;
    adapter.test_connection().await?;

    // The query string is handed to the agent unchanged, empty or not.
    let llm = LlmClient::new(&state.settings.llm);
    let agent = SqlAgent::new(llm, adapter, state.settings.database.query_timeout_secs);
    let result = agent.run(&payload.query).await?;

    Ok(Json(QueryResponse { result }))
}
