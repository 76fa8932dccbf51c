pub mod schema;

pub use schema::{ConfigError, ServerConfig};
