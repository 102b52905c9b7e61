pub mod query;
pub mod schema;

pub use query::*;
pub use schema::*;

use std::sync::Arc;

use crate::config::Settings;
use crate::services::ConnectionPoolManager;

/// Shared application state, passed into every handler via axum state.
/// Settings are the immutable startup snapshot; the pool manager holds
/// the per-URL postgres pools.
#[derive(Clone)]
pub struct AppState {
    pub settings: Settings,
    pub pool_manager: Arc<ConnectionPoolManager>,
}
