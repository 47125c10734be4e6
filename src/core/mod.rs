// Public modules
pub mod confirm;
pub mod context;
pub mod dotenv;
pub mod error;
pub mod executor;
pub mod notify;
pub mod project_file;
pub mod recipes;
pub mod ssh;
pub mod version;

// Re-export common types for convenience
pub use error::{Error, ErrorCode, Result};
