//! Application context
//!
//! `BotApp` owns everything a running bot needs: configuration, the
//! Telegram client, the relay and the shutdown token. `main` builds one and
//! drives it through `initialize` -> `run` -> `shutdown`.
//!
//! # Example
//!
//! ```rust,ignore
//! use library_bot::{BotApp, Config};
//!
//! async fn serve() -> library_bot::Result<()> {
//!     let config = Config::from_env()?;
//!     let mode = config.default_mode();
//!     let app = BotApp::new(config, mode);
//!     app.initialize().await?;
//!     app.run().await?;
//!     app.shutdown();
//!     Ok(())
//! }
//! ```

use std::sync::Arc;

use teloxide::payloads::SetWebhookSetters;
use teloxide::requests::Requester;
use teloxide::Bot;
use tokio_util::sync::CancellationToken;
use tracing::info;

use crate::config::{Config, TransportMode};
use crate::conversation::ConversationHandler;
use crate::error::Result;
use crate::library::HttpLibraryClient;
use crate::transport::{polling, webhook, EventRelay, TelegramOutbox};

/// A configured bot, ready to be started.
pub struct BotApp {
    config: Config,
    mode: TransportMode,
    bot: Bot,
    relay: EventRelay,
    cancel: CancellationToken,
}

impl BotApp {
    /// Wire the library client, handler and outbox together.
    ///
    /// No network calls happen here.
    pub fn new(config: Config, mode: TransportMode) -> Self {
        let cancel = CancellationToken::new();
        let bot = Bot::new(config.bot_token.clone());
        let library =
            HttpLibraryClient::with_cancellation(config.library_api_url.clone(), cancel.clone());
        let relay = EventRelay::new(
            ConversationHandler::new(Arc::new(library)),
            Arc::new(TelegramOutbox::new(bot.clone())),
        );

        Self {
            config,
            mode,
            bot,
            relay,
            cancel,
        }
    }

    pub fn mode(&self) -> TransportMode {
        self.mode
    }

    /// Token that stops `run` and aborts in-flight library calls.
    pub fn shutdown_token(&self) -> CancellationToken {
        self.cancel.clone()
    }

    /// Check the credential and point Telegram at the chosen delivery mode.
    pub async fn initialize(&self) -> Result<()> {
        let me = self.bot.get_me().await?;
        info!(username = me.username(), mode = ?self.mode, "Bot authenticated");

        match self.mode {
            TransportMode::Pull => {
                // getUpdates is refused while a webhook is registered
                self.bot.delete_webhook().await?;
                info!("Webhook removed, using long polling");
            }
            TransportMode::Push => {
                let url = self.config.webhook_url()?;
                self.bot
                    .set_webhook(url)
                    .allowed_updates(polling::allowed_updates())
                    .await?;
                info!(url = %self.config.redacted_webhook_url(), "Webhook registered");
            }
        }
        Ok(())
    }

    /// Process events until shutdown is requested.
    pub async fn run(&self) -> Result<()> {
        match self.mode {
            TransportMode::Pull => {
                polling::run(self.bot.clone(), self.relay.clone(), self.cancel.clone()).await;
                Ok(())
            }
            TransportMode::Push => {
                webhook::run(
                    self.config.port,
                    &self.config.bot_token,
                    self.config.queue_capacity,
                    self.relay.clone(),
                    self.cancel.clone(),
                )
                .await
            }
        }
    }

    /// Stop the transport loop and cancel in-flight library calls.
    pub fn shutdown(&self) {
        if !self.cancel.is_cancelled() {
            info!("Shutting down");
            self.cancel.cancel();
        }
    }
}
