//! Conversation module - turns user events into library calls and replies
//!
//! Each user moves between two states:
//!
//! ```text
//!            text (hits)                      button press
//!   ┌──────┐ ─────────────> ┌───────────────────┐ ───────────> ┌──────┐
//!   │ Idle │                │ AwaitingSelection │              │ Idle │
//!   └──────┘ <───────────── └───────────────────┘              └──────┘
//!            /start, text (too short, no hits, API failure)
//! ```
//!
//! Every event produces exactly one [`Reply`]. Library failures are logged
//! and turned into a generic message, so a failed call never escapes the
//! handler.

pub mod messages;
mod payload;
mod types;

pub use payload::{PayloadError, SelectionPayload, MAX_PAYLOAD_BYTES};
pub use types::{Button, ConversationState, InboundEvent, MessageText, Reply, Span, Turn};

use std::sync::Arc;

use tracing::{debug, error, warn};

use crate::library::{BookSummary, LibraryApi, ReservationOutcome, SearchQuery};

/// At most this many search hits are offered as buttons.
pub const MAX_CHOICES: usize = 10;

/// Maps inbound events to library calls and replies.
#[derive(Clone)]
pub struct ConversationHandler {
    library: Arc<dyn LibraryApi>,
}

impl ConversationHandler {
    pub fn new(library: Arc<dyn LibraryApi>) -> Self {
        Self { library }
    }

    /// Handle one event and return the reply plus the state it leaves the
    /// user in.
    pub async fn handle(&self, event: InboundEvent) -> Turn {
        match event {
            InboundEvent::Greeting => Turn::idle(Reply::send(messages::WELCOME)),
            InboundEvent::Text(text) => self.search(&text).await,
            InboundEvent::Selection { payload, user_name } => {
                self.select(&payload, &user_name).await
            }
        }
    }

    async fn search(&self, text: &str) -> Turn {
        let Some(query) = SearchQuery::parse(text) else {
            debug!("Query too short, not searching");
            return Turn::idle(Reply::send(messages::QUERY_TOO_SHORT));
        };

        let books = match self.library.search(&query).await {
            Ok(books) => books,
            Err(e) => {
                error!(query = query.as_str(), error = %e, "Search failed");
                return Turn::idle(Reply::send(messages::SEARCH_FAILED));
            }
        };

        let buttons = render_choices(&books);
        if buttons.is_empty() {
            return Turn::idle(Reply::send(messages::NOTHING_FOUND));
        }

        Turn::awaiting_selection(Reply::Choices {
            prompt: messages::CHOOSE_BOOK.to_string(),
            buttons,
        })
    }

    async fn select(&self, raw_payload: &str, user_name: &str) -> Turn {
        let book_id = match SelectionPayload::decode(raw_payload) {
            Ok(SelectionPayload::Reserve { book_id }) => book_id,
            Err(e) => {
                warn!(payload = raw_payload, error = %e, "Ignoring malformed button payload");
                return Turn::idle(Reply::edit(messages::BOOKING_FAILED));
            }
        };

        let result = match self.library.reserve(&book_id, user_name).await {
            Ok(result) => result,
            Err(e) => {
                error!(book_id = %book_id, error = %e, "Reservation failed");
                return Turn::idle(Reply::edit(messages::BOOKING_FAILED));
            }
        };

        let reply = match result.outcome() {
            ReservationOutcome::Reserved { title } => {
                Reply::Edit(messages::reserved(title.as_deref()))
            }
            ReservationOutcome::AlreadyBooked => Reply::edit(messages::ALREADY_BOOKED),
            ReservationOutcome::Unavailable => Reply::edit(messages::NOT_FOUND),
        };
        Turn::idle(reply)
    }
}

/// One button per hit, in upstream order, capped at [`MAX_CHOICES`].
///
/// A hit whose id cannot fit in a payload is skipped.
fn render_choices(books: &[BookSummary]) -> Vec<Button> {
    books
        .iter()
        .take(MAX_CHOICES)
        .filter_map(|book| match SelectionPayload::reserve(book.id.as_str()).encode() {
            Ok(payload) => Some(Button {
                label: messages::book_label(&book.title, &book.author),
                payload,
            }),
            Err(e) => {
                warn!(book_id = %book.id, error = %e, "Skipping book that cannot be offered");
                None
            }
        })
        .collect()
}
