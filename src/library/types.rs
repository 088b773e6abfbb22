//! Wire types exchanged with the remote library API

use serde::{Deserialize, Deserializer, Serialize};

/// Minimum number of characters a search query must have after trimming.
pub const MIN_QUERY_CHARS: usize = 2;

/// A validated search query: trimmed, at least [`MIN_QUERY_CHARS`] characters.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct SearchQuery(String);

impl SearchQuery {
    /// Trim `raw` and accept it if it is long enough.
    ///
    /// Length is counted in characters, so a two-letter Cyrillic query is
    /// accepted even though it is four bytes.
    pub fn parse(raw: &str) -> Option<Self> {
        let trimmed = raw.trim();
        if trimmed.chars().count() < MIN_QUERY_CHARS {
            return None;
        }
        Some(Self(trimmed.to_string()))
    }

    pub fn as_str(&self) -> &str {
        &self.0
    }
}

/// One catalog entry as returned by a search.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct BookSummary {
    /// Spreadsheet row id; numbers are normalized to strings
    #[serde(deserialize_with = "string_or_number")]
    pub id: String,
    #[serde(default)]
    pub title: String,
    #[serde(default)]
    pub author: String,
}

impl BookSummary {
    pub fn new(id: impl Into<String>, title: impl Into<String>, author: impl Into<String>) -> Self {
        Self {
            id: id.into(),
            title: title.into(),
            author: author.into(),
        }
    }
}

/// Body of every request sent to the library API.
#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
#[serde(tag = "action", rename_all = "lowercase")]
pub enum LibraryRequest {
    Search {
        query: String,
    },
    #[serde(rename = "book")]
    Reserve {
        #[serde(rename = "bookId")]
        book_id: String,
        #[serde(rename = "userName")]
        user_name: String,
    },
}

/// A reservation attempt for one book on behalf of one user.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct ReservationRequest {
    pub book_id: String,
    pub user_name: String,
}

impl From<ReservationRequest> for LibraryRequest {
    fn from(req: ReservationRequest) -> Self {
        LibraryRequest::Reserve {
            book_id: req.book_id,
            user_name: req.user_name,
        }
    }
}

/// Response body of a search call.
#[derive(Debug, Clone, Default, Deserialize)]
pub(crate) struct SearchResponse {
    #[serde(default)]
    pub results: Option<Vec<BookSummary>>,
}

/// Reservation response, kept as the upstream sent it.
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
pub struct ReservationResult {
    #[serde(default)]
    pub success: bool,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub title: Option<String>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub error: Option<String>,
}

/// Error code the upstream uses when the book is already reserved.
pub const ALREADY_BOOKED: &str = "already_booked";

/// How a reservation attempt ended, as seen by the user.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum ReservationOutcome {
    /// Reserved; the title is echoed back when the upstream sends it
    Reserved { title: Option<String> },
    /// Someone else holds the book
    AlreadyBooked,
    /// Book missing or otherwise unavailable
    Unavailable,
}

impl ReservationResult {
    pub fn reserved(title: impl Into<String>) -> Self {
        Self {
            success: true,
            title: Some(title.into()),
            error: None,
        }
    }

    pub fn already_booked() -> Self {
        Self {
            success: false,
            title: None,
            error: Some(ALREADY_BOOKED.to_string()),
        }
    }

    pub fn unavailable() -> Self {
        Self::default()
    }

    /// Interpret the `success` / `error` fields.
    pub fn outcome(&self) -> ReservationOutcome {
        if self.success {
            ReservationOutcome::Reserved {
                title: self.title.clone(),
            }
        } else if self.error.as_deref() == Some(ALREADY_BOOKED) {
            ReservationOutcome::AlreadyBooked
        } else {
            ReservationOutcome::Unavailable
        }
    }
}

fn string_or_number<'de, D>(deserializer: D) -> std::result::Result<String, D::Error>
where
    D: Deserializer<'de>,
{
    #[derive(Deserialize)]
    #[serde(untagged)]
    enum Id {
        Text(String),
        Int(i64),
        Float(f64),
    }

    Ok(match Id::deserialize(deserializer)? {
        Id::Text(s) => s,
        Id::Int(n) => n.to_string(),
        // Sheets hands back whole numbers as floats
        Id::Float(f) if f.fract() == 0.0 && f.abs() < 1e15 => (f as i64).to_string(),
        Id::Float(f) => f.to_string(),
    })
}
