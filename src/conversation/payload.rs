//! Button payload encoding
//!
//! A payload is `<kind>:<value>`. Telegram returns it verbatim when the
//! button is pressed and caps it at 64 bytes, so both directions enforce
//! the limit.

use thiserror::Error;

/// Telegram's limit on `callback_data`.
pub const MAX_PAYLOAD_BYTES: usize = 64;

const RESERVE_KIND: &str = "r";

/// Why a payload could not be encoded or decoded.
#[derive(Debug, Clone, PartialEq, Eq, Error)]
pub enum PayloadError {
    #[error("malformed payload: unknown kind '{0}'")]
    UnknownKind(String),

    #[error("malformed payload: missing book id")]
    MissingId,

    #[error("malformed payload: {0} bytes exceeds the {MAX_PAYLOAD_BYTES}-byte limit")]
    TooLong(usize),
}

/// What pressing a button asks the bot to do.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum SelectionPayload {
    /// Reserve the book with this upstream id
    Reserve { book_id: String },
}

impl SelectionPayload {
    pub fn reserve(book_id: impl Into<String>) -> Self {
        SelectionPayload::Reserve {
            book_id: book_id.into(),
        }
    }

    /// Encode for use as button `callback_data`.
    pub fn encode(&self) -> Result<String, PayloadError> {
        let encoded = match self {
            SelectionPayload::Reserve { book_id } => {
                if book_id.is_empty() {
                    return Err(PayloadError::MissingId);
                }
                format!("{}:{}", RESERVE_KIND, book_id)
            }
        };
        if encoded.len() > MAX_PAYLOAD_BYTES {
            return Err(PayloadError::TooLong(encoded.len()));
        }
        Ok(encoded)
    }

    /// Decode a payload returned by a button press.
    pub fn decode(raw: &str) -> Result<Self, PayloadError> {
        if raw.len() > MAX_PAYLOAD_BYTES {
            return Err(PayloadError::TooLong(raw.len()));
        }
        let (kind, value) = raw
            .split_once(':')
            .ok_or_else(|| PayloadError::UnknownKind(raw.to_string()))?;
        match kind {
            RESERVE_KIND if value.is_empty() => Err(PayloadError::MissingId),
            RESERVE_KIND => Ok(SelectionPayload::reserve(value)),
            other => Err(PayloadError::UnknownKind(other.to_string())),
        }
    }
}
