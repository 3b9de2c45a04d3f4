use thiserror::Error;

#[derive(Error, Debug, Clone)]
pub enum DeckError {
    /// User-correctable input problem. Shown as a blocking message,
    /// never written to history or logged as a fault.
    #[error("{0}")]
    Validation(String),

    #[error("not found: {0}")]
    NotFound(String),

    #[error("Network error: {0}")]
    Network(String),

    /// Non-success backend response, message already extracted for display.
    #[error("{message}")]
    Server { status: u16, message: String },

    #[error("Storage error: {0}")]
    Storage(String),

    #[error("Serialization error: {0}")]
    Serialization(String),

    /// Refused: closing the only open tab would leave nothing to show.
    #[error("the last tab cannot be closed")]
    LastSession,

    #[error("{0}")]
    Other(String),
}

impl From<serde_json::Error> for DeckError {
    fn from(e: serde_json::Error) -> Self {
        DeckError::Serialization(e.to_string())
    }
}
