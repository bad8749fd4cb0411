pub mod config;
pub mod error;
pub mod extract;
pub mod module;
pub mod types;

pub use config::ServiceConfig;
pub use error::ServiceError;
pub use extract::JsonBody;
pub use module::Module;
pub use types::{now_rfc3339, optional_text, required_text};
