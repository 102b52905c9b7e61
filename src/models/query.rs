use serde::{Deserialize, Serialize};

/// Body of `POST /query`. `db_uri` falls back to the configured default.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct QueryRequest {
    pub query: String,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub db_uri: Option<String>,
}

/// Successful `POST /query` response: the agent's final answer text.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct QueryResponse {
    pub result: String,
}

/// Successful `GET /schema` response.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct SchemaResponse {
    pub schema: String,
}
