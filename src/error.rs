//! Error handling for the job agent

use std::path::PathBuf;
use thiserror::Error;

#[derive(Error, Debug)]
pub enum JobAgentError {
    #[error("IO error: {0}")]
    Io(#[from] std::io::Error),

    #[error("Prompt catalogue not found at {}", .path.display())]
    CatalogueMissing { path: PathBuf },

    #[error("Prompt catalogue is malformed: {0}")]
    CatalogueMalformed(String),

    #[error("Prompt template not found: {0}")]
    TemplateNotFound(String),

    #[error("Template '{template}' has no value for placeholder '{{{placeholder}}}'")]
    MissingPlaceholder { template: String, placeholder: String },

    #[error("Stage '{stage}' cannot run, missing artifacts: {}", .missing.join(", "))]
    UnmetDependency { stage: String, missing: Vec<String> },

    #[error("Ingestion failed in stage '{stage}': {message}")]
    IngestionFailure { stage: String, message: String },

    #[error("Stage '{stage}' aborted the run: {message}")]
    StageAborted { stage: String, message: String },

    #[error("Duplicate stage name in pipeline: {0}")]
    DuplicateStage(String),

    #[error("Model call failed: {0}")]
    ModelCall(String),

    #[error("PDF extraction error: {0}")]
    PdfExtraction(String),

    #[error("Configuration error: {0}")]
    Configuration(String),

    #[error("File format not supported: {0}")]
    UnsupportedFormat(String),

    #[error("Network error: {0}")]
    Network(#[from] reqwest::Error),

    #[error("Serialization error: {0}")]
    Serialization(#[from] serde_json::Error),

    #[error("Invalid input: {0}")]
    InvalidInput(String),
}

pub type Result<T> = std::result::Result<T, JobAgentError>;

/// Convert anyhow errors (raised by the Model2Vec loader) to our error type
impl From<anyhow::Error> for JobAgentError {
    fn from(err: anyhow::Error) -> Self {
        JobAgentError::ModelCall(err.to_string())
    }
}
