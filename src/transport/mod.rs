//! Transport module - moves events between Telegram and the conversation handler
//!
//! Exactly one delivery mode runs per process:
//!
//! - **Pull** ([`polling`]): one loop long-polls `getUpdates` and handles each
//!   update to completion before asking for the next one.
//! - **Push** ([`webhook`]): an HTTP endpoint acknowledges every POST at once
//!   and hands the update to a bounded queue; a single worker drains it.
//!
//! Either way every update goes through [`EventRelay::process`], which
//! decodes it, runs the handler and sends the one reply it produced.
//!
//! ```text
//! ┌──────────────┐     ┌────────────┐     ┌─────────────────────┐     ┌────────────┐
//! │ poll/webhook │────>│ EventRelay │────>│ ConversationHandler │────>│ LibraryApi │
//! └──────────────┘     └────────────┘     └─────────────────────┘     └────────────┘
//!                            │
//!                            ▼
//!                      ┌────────────┐
//!                      │ ChatOutbox │
//!                      └────────────┘
//! ```
//!
//! Duplicate deliveries (Telegram retrying a webhook) are processed again;
//! there is no de-duplication.

pub mod polling;
mod telegram;
pub mod webhook;

pub use telegram::{decode_update, render_markdown, TelegramOutbox};

use std::sync::Arc;

use async_trait::async_trait;
use teloxide::types::{CallbackQuery, ChatId, MessageId, Update};
use tracing::{debug, error, warn};

use crate::conversation::{ConversationHandler, InboundEvent, Reply};
use crate::error::Result;

/// Where the reply to an event goes.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct ReplyTarget {
    pub chat_id: ChatId,
    /// Message to edit in place, when the event came from one of its buttons
    pub edit_message: Option<MessageId>,
}

impl ReplyTarget {
    pub fn chat(chat_id: ChatId) -> Self {
        Self {
            chat_id,
            edit_message: None,
        }
    }
}

/// A decoded update, ready for the handler.
#[derive(Debug, Clone)]
pub struct Delivery {
    pub event: InboundEvent,
    pub target: ReplyTarget,
    /// The button press to acknowledge, if any
    pub callback: Option<CallbackQuery>,
}

/// Outbound side of the chat platform.
#[async_trait]
pub trait ChatOutbox: Send + Sync {
    /// Stop the client-side spinner of a pressed button.
    async fn acknowledge(&self, query: &CallbackQuery) -> Result<()>;

    /// Send or apply one reply.
    async fn deliver(&self, target: &ReplyTarget, reply: &Reply) -> Result<()>;
}

/// Glue between a transport loop, the handler and the outbox.
#[derive(Clone)]
pub struct EventRelay {
    handler: ConversationHandler,
    outbox: Arc<dyn ChatOutbox>,
}

impl EventRelay {
    pub fn new(handler: ConversationHandler, outbox: Arc<dyn ChatOutbox>) -> Self {
        Self { handler, outbox }
    }

    /// Handle one raw update. Never fails; problems are logged.
    pub async fn process(&self, update: Update) {
        match decode_update(&update) {
            Some(delivery) => self.dispatch(delivery).await,
            None => debug!(update_id = ?update.id, "Ignoring update"),
        }
    }

    /// Handle one decoded update and send its single reply.
    pub async fn dispatch(&self, delivery: Delivery) {
        if let Some(query) = &delivery.callback {
            if let Err(e) = self.outbox.acknowledge(query).await {
                warn!(error = %e, "Failed to acknowledge button press");
            }
        }

        let turn = self.handler.handle(delivery.event).await;
        debug!(chat_id = ?delivery.target.chat_id, state = ?turn.state, "Event handled");

        if let Err(e) = self.outbox.deliver(&delivery.target, &turn.reply).await {
            error!(chat_id = ?delivery.target.chat_id, error = %e, "Failed to deliver reply");
        }
    }
}
