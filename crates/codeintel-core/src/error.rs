use thiserror::Error;

pub type Result<T> = std::result::Result<T, AnalysisError>;

/// Errors that abort a whole run. Per-file problems are recorded as
/// [`crate::config::ParseFailure`] diagnostics instead.
#[derive(Error, Debug)]
pub enum AnalysisError {
    #[error("Source root not found: {0}")]
    RootNotFound(String),

    #[error("I/O error on {path}: {source}")]
    Io {
        path: String,
        #[source]
        source: std::io::Error,
    },

    #[error("JSON error: {0}")]
    Json(#[from] serde_json::Error),
}
