pub mod config;
pub mod error;
pub mod types;

pub use config::LexisConfig;
pub use error::{LexisError, Result};
pub use types::*;
