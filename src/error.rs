//! Custom error types for the application

use std::fmt;

/// Application-specific error type
#[derive(Debug)]
pub enum AppError {
    /// ALSA mixer related errors
    Mixer(String),

    /// General I/O errors
    Io(std::io::Error),
}

impl fmt::Display for AppError {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            AppError::Mixer(msg) => write!(f, "Mixer error: {}", msg),
            AppError::Io(err) => write!(f, "I/O error: {}", err),
        }
    }
}

impl std::error::Error for AppError {}

impl From<std::io::Error> for AppError {
    fn from(err: std::io::Error) -> Self {
        AppError::Io(err)
    }
}

impl From<alsa::Error> for AppError {
    fn from(err: alsa::Error) -> Self {
        AppError::Mixer(err.to_string())
    }
}

/// Result type alias for application operations
pub type AppResult<T> = Result<T, AppError>;

/// Errors raised while talking to CamillaDSP.
///
/// The synchronizer swallows these; they never become an [`AppError`].
#[derive(Debug, Clone, PartialEq)]
pub enum DspError {
    /// Websocket could not be opened
    Connect(String),
    /// Socket failed mid-exchange
    Transport(String),
    /// No reply within the request timeout (milliseconds)
    Timeout(u64),
    /// Reply could not be understood
    Protocol(String),
    /// CamillaDSP answered with an error result
    Rejected { command: String, message: String },
    /// A request was issued without an open socket
    NotConnected,
}

impl fmt::Display for DspError {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            DspError::Connect(msg) => write!(f, "Failed to connect: {}", msg),
            DspError::Transport(msg) => write!(f, "Lost connection: {}", msg),
            DspError::Timeout(ms) => write!(f, "No reply within {} ms", ms),
            DspError::Protocol(msg) => write!(f, "Unexpected reply: {}", msg),
            DspError::Rejected { command, message } => {
                write!(f, "{} rejected: {}", command, message)
            }
            DspError::NotConnected => write!(f, "Not connected"),
        }
    }
}

impl std::error::Error for DspError {}

impl From<tokio_tungstenite::tungstenite::Error> for DspError {
    fn from(err: tokio_tungstenite::tungstenite::Error) -> Self {
        DspError::Transport(err.to_string())
    }
}

impl From<serde_json::Error> for DspError {
    fn from(err: serde_json::Error) -> Self {
        DspError::Protocol(format!("Invalid JSON: {}", err))
    }
}

/// Result type alias for CamillaDSP operations
pub type DspResult<T> = Result<T, DspError>;
