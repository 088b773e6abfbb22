//! User-facing texts

use super::types::MessageText;

pub const WELCOME: &str = "Hello! 📚\nType a book title or an author:";
pub const QUERY_TOO_SHORT: &str = "Please type at least 2 characters.";
pub const SEARCH_FAILED: &str = "❌ Could not connect to the library.";
pub const NOTHING_FOUND: &str = "No books found 😕";
pub const CHOOSE_BOOK: &str = "Choose a book:";
pub const BOOKING_FAILED: &str = "❌ Booking failed.";
pub const ALREADY_BOOKED: &str = "❌ This book is already booked!";
pub const NOT_FOUND: &str = "Book not found.";

/// Confirmation with the title in bold.
pub fn reserved(title: Option<&str>) -> MessageText {
    match title {
        Some(title) if !title.trim().is_empty() => MessageText::plain("✅ You have booked:\n\n📘 ")
            .bold(title)
            .then("\n\nThank you!"),
        _ => MessageText::plain("✅ You have booked the book.\n\nThank you!"),
    }
}

/// Button label for one search hit.
pub fn book_label(title: &str, author: &str) -> String {
    format!("{} — {}", title, author)
}
