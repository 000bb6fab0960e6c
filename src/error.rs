//! Error types for the mural conversation engine.

/// Top-level error type for the talking-poster conversation system.
#[derive(Debug, thiserror::Error)]
pub enum MuralError {
    /// Content gateway request construction or transport error.
    #[error("gateway error: {0}")]
    Gateway(String),

    /// Speech capture error.
    #[error("speech error: {0}")]
    Speech(String),

    /// Configuration error.
    #[error("config error: {0}")]
    Config(String),

    /// Conversation engine coordination error.
    #[error("engine error: {0}")]
    Engine(String),

    /// I/O error.
    #[error("I/O error: {0}")]
    Io(#[from] std::io::Error),

    /// Channel send/receive error.
    #[error("channel error: {0}")]
    Channel(String),
}

/// Convenience result type.
pub type Result<T> = std::result::Result<T, MuralError>;
