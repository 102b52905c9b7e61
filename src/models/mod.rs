pub mod metadata;
pub mod query;

pub use metadata::*;
pub use query::*;
