use thiserror::Error;

/// Failures that abort a pipeline run. Parse and schema problems are fatal by
/// design: inputs are static files, so a retry would reproduce the failure.
#[derive(Error, Debug)]
pub enum PipelineError {
    #[error("parse error in {file}, field '{field}': {message}")]
    Parse {
        file: String,
        field: String,
        message: String,
    },

    #[error("schema error in {file}: {message}")]
    Schema { file: String, message: String },

    #[error("CSV read failed: {0}")]
    Csv(#[from] csv::Error),

    #[error("I/O error: {0}")]
    Io(#[from] std::io::Error),

    #[error("JSON serialization failed: {0}")]
    Json(#[from] serde_json::Error),

    #[error("TOML deserialization failed: {0}")]
    Toml(#[from] toml::de::Error),

    #[error("Configuration error: {0}")]
    Config(String),

    #[error("model fitting failed: {0}")]
    Model(String),
}

impl PipelineError {
    /// Shorthand for a parse failure tied to a file and field.
    pub fn parse(file: &str, field: &str, message: impl Into<String>) -> Self {
        PipelineError::Parse {
            file: file.to_string(),
            field: field.to_string(),
            message: message.into(),
        }
    }

    /// Shorthand for a schema failure tied to a file.
    pub fn schema(file: &str, message: impl Into<String>) -> Self {
        PipelineError::Schema {
            file: file.to_string(),
            message: message.into(),
        }
    }
}

pub type Result<T> = std::result::Result<T, PipelineError>;
