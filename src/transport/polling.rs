//! Pull mode: a single `getUpdates` long-poll loop

use std::time::Duration;

use teloxide::payloads::GetUpdatesSetters;
use teloxide::requests::{Request, Requester};
use teloxide::types::AllowedUpdate;
use teloxide::Bot;
use tokio_util::sync::CancellationToken;
use tracing::{debug, info, warn};

use super::EventRelay;

/// Server-side wait per `getUpdates` call. Must stay below the HTTP client
/// timeout of the default teloxide `Bot`.
pub const POLL_TIMEOUT_SECS: u32 = 10;

const MIN_BACKOFF: Duration = Duration::from_secs(1);
const MAX_BACKOFF: Duration = Duration::from_secs(30);

/// Update kinds the bot reacts to.
pub fn allowed_updates() -> Vec<AllowedUpdate> {
    vec![AllowedUpdate::Message, AllowedUpdate::CallbackQuery]
}

/// Fetch and handle updates one at a time until `cancel` fires.
///
/// The offset only advances past an update after it has been handled, so
/// the next batch is not requested while a reply is still in flight.
pub async fn run(bot: Bot, relay: EventRelay, cancel: CancellationToken) {
    let mut offset: Option<i32> = None;
    let mut backoff = MIN_BACKOFF;

    info!("Polling for updates");
    loop {
        let mut request = bot
            .get_updates()
            .timeout(POLL_TIMEOUT_SECS)
            .allowed_updates(allowed_updates());
        if let Some(offset) = offset {
            request = request.offset(offset);
        }

        let result = tokio::select! {
            biased;
            _ = cancel.cancelled() => break,
            result = request.send() => result,
        };

        match result {
            Ok(updates) => {
                backoff = MIN_BACKOFF;
                if !updates.is_empty() {
                    debug!(count = updates.len(), "Received updates");
                }
                for update in updates {
                    offset = Some(update.id.as_offset());
                    relay.process(update).await;
                }
            }
            Err(e) => {
                warn!(error = %e, retry_in = ?backoff, "getUpdates failed");
                tokio::select! {
                    biased;
                    _ = cancel.cancelled() => break,
                    _ = tokio::time::sleep(backoff) => {}
                }
                backoff = next_backoff(backoff);
            }
        }
    }
    info!("Polling stopped");
}

fn next_backoff(current: Duration) -> Duration {
    (current * 2).min(MAX_BACKOFF)
}
