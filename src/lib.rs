//! Library Bot - Telegram front end for a library reservation API
//!
//! A user types a title or an author, the bot forwards it to a remote
//! spreadsheet-backed API, shows the hits as buttons, and books the chosen
//! one on a button press. The catalog and the reservation ledger belong to
//! the remote API; the bot keeps no state between events.
//!
//! # Modules
//!
//! - [`library`]: client for the remote API
//! - [`conversation`]: event handling and reply rendering
//! - [`transport`]: Telegram long polling or webhook delivery
//! - [`app`]: lifecycle of a running bot
//! - [`config`], [`error`]: ambient plumbing

pub mod app;
pub mod config;
pub mod conversation;
pub mod error;
pub mod library;
pub mod transport;

pub use app::BotApp;
pub use config::{Config, TransportMode};
pub use error::{BotError, Result};
