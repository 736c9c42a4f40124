//! Error types for the fm-app coordinating layer.

/// Application error type that wraps errors from the data and layers crates.
#[derive(Debug, thiserror::Error)]
pub enum AppError {
    #[error("Config error: {0}")]
    Config(String),

    #[error("Data error: {0}")]
    Data(#[from] fm_data::DataError),

    #[error("Layers error: {0}")]
    Layers(#[from] fm_layers::LayersError),

    #[error("Not ready: {what}")]
    NotReady { what: &'static str },

    #[error("Worker error: {message}")]
    Worker { message: String },

    #[error("JSON error: {0}")]
    Json(#[from] serde_json::Error),

    #[error("I/O error: {0}")]
    Io(#[from] std::io::Error),
}

/// Result type for fm-app operations.
pub type AppResult<T> = Result<T, AppError>;
