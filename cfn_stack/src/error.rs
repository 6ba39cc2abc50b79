use thiserror::Error;

pub type Result<T> = std::result::Result<T, Error>;

#[derive(Error, Debug)]
pub enum Error {
    #[error("Invalid resource name {name:?}\n{reason}")]
    InvalidResourceName { name: String, reason: String },

    #[error("Validation failed on resource '{resource}'\n{message}")]
    Validation { resource: String, message: String },

    #[error("Invalid stack name {name}\n{reason}")]
    InvalidStackName { name: String, reason: String },

    /// a value that has to be looked up before rendering was never resolved.
    #[error("No context value for '{key}'. Resolve lookups before rendering the template")]
    MissingContext { key: String },

    #[error("Stack {stack} failed: {reason}")]
    StackFailed { stack: String, reason: String },

    #[error("Stack {0} not found")]
    StackNotFound(String),

    #[error("{operation} failed\n{message}")]
    Aws { operation: &'static str, message: String },

    #[error("Failed to serialize template\n{0}")]
    Json(#[from] serde_json::Error),
}
