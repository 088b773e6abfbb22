//! Library module - client for the remote library API
//!
//! The catalog, the reservation ledger and the double-booking check all live
//! in an external spreadsheet-backed service. This module only knows how to
//! talk to it:
//!
//! - `search` sends `{"action": "search", "query": ...}` and returns the
//!   `results` array (empty when absent)
//! - `reserve` sends `{"action": "book", "bookId": ..., "userName": ...}` and
//!   returns the result object as-is
//!
//! Every call is a fresh round trip. Nothing is cached and nothing is retried.
//!
//! # Example
//!
//! ```rust,ignore
//! use library_bot::library::{HttpLibraryClient, LibraryApi, SearchQuery};
//!
//! async fn find() {
//!     let client = HttpLibraryClient::new(url::Url::parse("https://example.com/exec").unwrap());
//!     let query = SearchQuery::parse("Tolstoy").unwrap();
//!     let books = client.search(&query).await.unwrap();
//!     println!("{} books", books.len());
//! }
//! ```

mod client;
pub mod types;

pub use client::HttpLibraryClient;
pub use types::{
    BookSummary, LibraryRequest, ReservationOutcome, ReservationRequest, ReservationResult,
    SearchQuery, MIN_QUERY_CHARS,
};

use async_trait::async_trait;
use thiserror::Error;

/// Failure talking to the library API.
///
/// All variants are reported to the user the same way; the detail only goes
/// to the logs.
#[derive(Debug, Error)]
pub enum LibraryError {
    /// Connection, TLS or timeout failure
    #[error("library API request failed: {0}")]
    Transport(String),

    /// The API answered with a non-2xx status
    #[error("library API returned HTTP {0}")]
    Status(u16),

    /// The body was missing or not the JSON we expect
    #[error("library API returned an unreadable body: {0}")]
    Decode(String),

    /// The process is shutting down
    #[error("library API request cancelled")]
    Cancelled,
}

/// Operations offered by the remote library API.
#[cfg_attr(test, mockall::automock)]
#[async_trait]
pub trait LibraryApi: Send + Sync {
    /// Search the catalog.
    async fn search(&self, query: &SearchQuery) -> Result<Vec<BookSummary>, LibraryError>;

    /// Try to reserve `book_id` for `user_name`.
    async fn reserve(&self, book_id: &str, user_name: &str)
        -> Result<ReservationResult, LibraryError>;
}
