use thiserror::Error;

/// Failures that abort a pipeline invocation.
///
/// `Structural` covers input that cannot be shaped into a table at all (too
/// few rows, a required column missing). `Validation` covers well-formed input
/// whose selection leaves nothing to report.
#[derive(Debug, Error)]
pub enum PipelineError {
    #[error("structural error: {0}")]
    Structural(String),

    #[error("validation error: {0}")]
    Validation(String),

    #[error(transparent)]
    Io(#[from] std::io::Error),

    #[error(transparent)]
    Csv(#[from] csv::Error),

    #[error(transparent)]
    Arrow(#[from] arrow::error::ArrowError),

    #[error(transparent)]
    Parquet(#[from] parquet::errors::ParquetError),

    #[error(transparent)]
    Zip(#[from] zip::result::ZipError),

    #[error(transparent)]
    Yaml(#[from] serde_yaml::Error),

    #[error(transparent)]
    Json(#[from] serde_json::Error),
}

impl PipelineError {
    pub fn structural(msg: impl Into<String>) -> Self {
        PipelineError::Structural(msg.into())
    }

    pub fn validation(msg: impl Into<String>) -> Self {
        PipelineError::Validation(msg.into())
    }

    /// True for "no data for this selection" style failures the caller can fix
    /// by changing the request.
    pub fn is_user_correctable(&self) -> bool {
        matches!(self, PipelineError::Validation(_))
    }
}

pub type Result<T> = std::result::Result<T, PipelineError>;
