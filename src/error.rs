//! Error types for the library bot
//!
//! Each concern owns a small error enum (`LibraryError` for the upstream
//! API, `PayloadError` for button payloads). `BotError` wraps them for the
//! start-up and transport paths, and `Result<T>` is the crate-wide alias.

use thiserror::Error;

pub use crate::conversation::PayloadError;
pub use crate::library::LibraryError;

/// Crate-wide error type.
#[derive(Debug, Error)]
pub enum BotError {
    /// Missing or invalid configuration value
    #[error("Configuration error: {0}")]
    Config(String),

    /// The remote library API failed
    #[error(transparent)]
    Library(#[from] LibraryError),

    /// A button payload could not be encoded or decoded
    #[error(transparent)]
    Payload(#[from] PayloadError),

    /// The Telegram Bot API rejected a request
    #[error("Telegram error: {0}")]
    Telegram(#[from] teloxide::RequestError),

    /// Socket or filesystem failure (listener bind, signal setup)
    #[error("I/O error: {0}")]
    Io(#[from] std::io::Error),
}

/// Result alias used throughout the crate.
pub type Result<T> = std::result::Result<T, BotError>;
