use axum::{
    extract::{Query, State},
    Json,
};
use serde::Deserialize;

use crate::api::handlers::AppState;
use crate::api::middleware::AppError;
use crate::models::SchemaResponse;
use crate::services::database::{create_adapter, DatabaseType};

#[derive(Debug, Deserialize)]
pub struct SchemaParams {
    pub db_uri: Option<String>,
}

/// Retrieve a textual rendering of the database schema.
///
/// Direct passthrough to the database layer's introspection; the agent and
/// the LLM are not involved. Any failure is a connection-class 400.
pub async fn get_schema(
    State(state): State<AppState>,
    Query(params): Query<SchemaParams>,
) -> Result<Json<SchemaResponse>, AppError> {
    let db_uri = params
        .db_uri
        .as_deref()
        .unwrap_or(&state.settings.database.default_uri);

    tracing::info!("Retrieving schema for {}", db_uri);

    let db_type = DatabaseType::from_uri(db_uri)?;
    let adapter = create_adapter(db_type, db_uri, state.pool_manager.clone()).await?;
    let metadata = adapter.fetch_metadata().await?;

    Ok(Json(SchemaResponse {
        schema: metadata.table_info(),
    }))
}
