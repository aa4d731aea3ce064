//! Error types for the grading library
//!
//! Only request validation and infrastructure failures surface as errors.
//! Compilation failures, timeouts, missing tools and malformed model output
//! are recorded inside the `Evaluation` instead.

use thiserror::Error;

pub type GraderResult<T> = Result<T, GraderError>;

#[derive(Error, Debug)]
pub enum GraderError {
    /// Missing title or empty source
    #[error("Invalid submission: {0}")]
    InvalidSubmission(String),

    /// Required host tool (compiler) is absent
    #[error("Toolchain unavailable: {0}")]
    ToolchainUnavailable(String),

    #[error("IO error: {0}")]
    Io(#[from] std::io::Error),

    #[error("Serialization error: {0}")]
    Serialization(#[from] serde_json::Error),

    #[error("Template error: {0}")]
    Template(String),
}

impl From<handlebars::RenderError> for GraderError {
    fn from(e: handlebars::RenderError) -> Self {
        GraderError::Template(e.to_string())
    }
}

impl From<handlebars::TemplateError> for GraderError {
    fn from(e: handlebars::TemplateError) -> Self {
        GraderError::Template(e.to_string())
    }
}
