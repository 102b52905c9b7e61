pub mod agent;
pub mod connection_pool;
pub mod database; // Multi-database support keyed by URI scheme
pub mod llm;

pub use agent::*;
pub use connection_pool::*;
pub use llm::*;
