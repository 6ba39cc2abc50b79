use thiserror::Error;

pub type Result<T> = std::result::Result<T, Error>;

#[derive(Error, Debug)]
pub enum Error {
    #[error("Configuration file not found: {path}")]
    ConfigNotFound { path: String },

    #[error("Invalid configuration: {message}")]
    InvalidConfig { message: String },

    #[error("Invalid bucket name {name:?}\n{reason}")]
    InvalidBucketName { name: String, reason: String },

    #[error("Duplicate logical id '{0}'. Every subdomain must map to a distinct record")]
    DuplicateLogicalId(String),

    #[error("Lookup {key} found nothing")]
    LookupNotFound { key: String },

    #[error("Lookups not resolved: {}", keys.join(", "))]
    UnresolvedLookups { keys: Vec<String> },

    #[error("Stack output '{0}' is missing. Was the stack deployed?")]
    MissingOutput(String),

    #[error("Deployment step '{step}' must run after '{dependency}'")]
    StepOrder { step: String, dependency: String },

    #[error("{operation} failed\n{message}")]
    Aws { operation: &'static str, message: String },

    #[error(transparent)]
    Stack(#[from] cfn_stack::Error),

    #[error("IO error: {0}")]
    Io(#[from] std::io::Error),

    #[error("TOML parse error: {0}")]
    Toml(#[from] toml::de::Error),

    #[error("JSON error: {0}")]
    Json(#[from] serde_json::Error),
}

pub(crate) fn aws_error<E: std::error::Error>(operation: &'static str) -> impl Fn(E) -> Error {
    move |e| Error::Aws {
        operation,
        message: aws_sdk_s3::error::DisplayErrorContext(&e).to_string(),
    }
}
