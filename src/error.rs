//! Error types for metric export.

/// Result type alias for export operations
pub type ExportResult<T> = std::result::Result<T, ExportError>;

/// Everything that can go wrong while pushing one metric to the backend.
///
/// None of these ever reach the request path: the exporter logs them at
/// the task boundary and drops them.
#[derive(Debug, thiserror::Error)]
pub enum ExportError {
    /// A required export setting is absent or empty
    #[error("metrics configuration missing: {0}")]
    MissingConfig(&'static str),

    /// Network / transport error
    #[error("transport error: {0}")]
    Http(#[from] reqwest::Error),

    /// Backend answered with a non-success status
    #[error("backend rejected metric ({status}): {body}")]
    Rejected { status: u16, body: String },

    /// Payload could not be encoded
    #[error("serialization error: {0}")]
    Serialize(#[from] serde_json::Error),
}
