use thiserror::Error;

/// Errors produced anywhere in the upload-and-summarize pipeline
///
/// Parsing and validation failures map to 4xx responses and are never
/// retried. Storage failures are fatal for the current request only.
#[derive(Debug, Error)]
pub enum VisualizerError {
    /// The upload could not be read as delimited text with a header row
    #[error("invalid CSV format: {0}")]
    MalformedInput(String),

    /// One or more required columns are absent, listed in canonical order
    #[error("missing required columns: {}", .0.join(", "))]
    MissingColumns(Vec<String>),

    /// The multipart body had no `file` field
    #[error("no file uploaded")]
    NoFile,

    /// The upload body exceeded the configured limit (in bytes)
    #[error("upload exceeds the {0} byte limit")]
    UploadTooLarge(usize),

    /// No dataset exists for the given id
    #[error("dataset {0} not found")]
    NotFound(u64),

    /// The store holds no datasets yet
    #[error("no dataset found")]
    NoDatasets,

    /// Missing or invalid credentials
    #[error("{0}")]
    Unauthorized(&'static str),

    /// Communication failure between client and server
    #[error("transport error: {0}")]
    Transport(String),

    /// The dataset store is in an unusable state
    #[error("storage error: {0}")]
    Storage(String),

    /// A PDF report or chart could not be produced
    #[error("rendering failed: {0}")]
    Report(String),

    #[error("configuration error: {0}")]
    Config(String),

    #[error(transparent)]
    Io(#[from] std::io::Error),

    #[error(transparent)]
    Json(#[from] serde_json::Error),
}

impl VisualizerError {
    /// Machine-readable reason, used in JSON error bodies
    pub fn code(&self) -> &'static str {
        match self {
            VisualizerError::MalformedInput(_) => "malformed_input",
            VisualizerError::MissingColumns(_) => "missing_columns",
            VisualizerError::NoFile => "no_file",
            VisualizerError::UploadTooLarge(_) => "upload_too_large",
            VisualizerError::NotFound(_) | VisualizerError::NoDatasets => "not_found",
            VisualizerError::Unauthorized(_) => "unauthorized",
            VisualizerError::Transport(_) => "transport",
            VisualizerError::Storage(_)
            | VisualizerError::Io(_)
            | VisualizerError::Json(_) => "storage",
            VisualizerError::Report(_) => "report",
            VisualizerError::Config(_) => "config",
        }
    }

    /// True for failures caused by the caller's input rather than the server
    pub fn is_client_error(&self) -> bool {
        matches!(
            self,
            VisualizerError::MalformedInput(_)
                | VisualizerError::MissingColumns(_)
                | VisualizerError::NoFile
                | VisualizerError::UploadTooLarge(_)
                | VisualizerError::NotFound(_)
                | VisualizerError::NoDatasets
                | VisualizerError::Unauthorized(_)
        )
    }
}

pub type Result<T> = std::result::Result<T, VisualizerError>;
