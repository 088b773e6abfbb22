//! Runtime configuration
//!
//! All settings come from environment-style key/value pairs. `main` loads a
//! `.env` file with dotenvy first, then calls [`Config::from_env`]. Tests use
//! [`Config::from_lookup`] with a closure so they never touch the real
//! process environment.
//!
//! The original deployment used `TELEGRAM_TOKEN`, `APPS_SCRIPT_URL` and
//! `RENDER_EXTERNAL_URL`; those names are still accepted as fallbacks.

use url::Url;

use crate::error::{BotError, Result};

/// Default HTTP listen port for push mode.
pub const DEFAULT_PORT: u16 = 10000;

/// Default capacity of the webhook intake queue.
pub const DEFAULT_QUEUE_CAPACITY: usize = 256;

/// How inbound Telegram updates reach the process.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum TransportMode {
    /// Long-poll `getUpdates` in a single loop
    Pull,
    /// Telegram pushes updates to our HTTP endpoint
    Push,
}

/// Process configuration.
#[derive(Clone)]
pub struct Config {
    /// Bot API credential, also the secret webhook path segment
    pub bot_token: String,
    /// Remote library API endpoint
    pub library_api_url: Url,
    /// HTTP listen port (push mode)
    pub port: u16,
    /// Externally reachable base URL (required in push mode)
    pub public_url: Option<Url>,
    /// Webhook intake queue capacity
    pub queue_capacity: usize,
}

impl Config {
    /// Load configuration from the process environment.
    pub fn from_env() -> Result<Self> {
        Self::from_lookup(|key| std::env::var(key).ok())
    }

    /// Load configuration through an arbitrary key lookup.
    ///
    /// Empty values are treated as unset.
    pub fn from_lookup<F>(lookup: F) -> Result<Self>
    where
        F: Fn(&str) -> Option<String>,
    {
        let get = |keys: &[&str]| {
            keys.iter()
                .filter_map(|key| lookup(*key))
                .map(|value| value.trim().to_string())
                .find(|value| !value.is_empty())
        };

        let bot_token = get(&["BOT_TOKEN", "TELEGRAM_TOKEN"])
            .ok_or_else(|| BotError::Config("BOT_TOKEN is not set".into()))?;

        let raw_api_url = get(&["LIBRARY_API_URL", "APPS_SCRIPT_URL"])
            .ok_or_else(|| BotError::Config("LIBRARY_API_URL is not set".into()))?;
        let library_api_url = Url::parse(&raw_api_url)
            .map_err(|e| BotError::Config(format!("LIBRARY_API_URL is not a valid URL: {}", e)))?;

        let port = match get(&["PORT"]) {
            Some(raw) => raw
                .parse::<u16>()
                .map_err(|_| BotError::Config(format!("PORT must be a port number, got '{}'", raw)))?,
            None => DEFAULT_PORT,
        };

        let public_url = get(&["PUBLIC_URL", "RENDER_EXTERNAL_URL"])
            .map(|raw| parse_public_url(&raw))
            .transpose()?;

        let queue_capacity = match get(&["WEBHOOK_QUEUE_CAPACITY"]) {
            Some(raw) => match raw.parse::<usize>() {
                Ok(n) if n > 0 => n,
                _ => {
                    return Err(BotError::Config(format!(
                        "WEBHOOK_QUEUE_CAPACITY must be a positive integer, got '{}'",
                        raw
                    )))
                }
            },
            None => DEFAULT_QUEUE_CAPACITY,
        };

        Ok(Self {
            bot_token,
            library_api_url,
            port,
            public_url,
            queue_capacity,
        })
    }

    /// Mode used when the CLI does not pick one explicitly.
    pub fn default_mode(&self) -> TransportMode {
        if self.public_url.is_some() {
            TransportMode::Push
        } else {
            TransportMode::Pull
        }
    }

    /// Full webhook URL: `PUBLIC_URL/BOT_TOKEN`.
    pub fn webhook_url(&self) -> Result<Url> {
        let base = self
            .public_url
            .as_ref()
            .ok_or_else(|| BotError::Config("PUBLIC_URL is required in webhook mode".into()))?;

        let mut url = base.clone();
        url.path_segments_mut()
            .map_err(|_| BotError::Config("PUBLIC_URL cannot be used as a base URL".into()))?
            .pop_if_empty()
            .push(&self.bot_token);
        Ok(url)
    }

    /// Webhook URL with the secret segment masked, safe for logs.
    pub fn redacted_webhook_url(&self) -> String {
        match &self.public_url {
            Some(base) => format!("{}/<token>", base.as_str().trim_end_matches('/')),
            None => "<unset>".to_string(),
        }
    }
}

impl std::fmt::Debug for Config {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("Config")
            .field("bot_token", &"<redacted>")
            .field("library_api_url", &self.library_api_url.as_str())
            .field("port", &self.port)
            .field("public_url", &self.public_url.as_ref().map(Url::as_str))
            .field("queue_capacity", &self.queue_capacity)
            .finish()
    }
}

/// Hosting platforms often expose the bare host name; assume https then.
///
/// The webhook router serves `/<token>` at the root, so a base path would
/// register a URL that is never routed.
fn parse_public_url(raw: &str) -> Result<Url> {
    let with_scheme = if raw.contains("://") {
        raw.to_string()
    } else {
        format!("https://{}", raw)
    };
    let url = Url::parse(&with_scheme)
        .map_err(|e| BotError::Config(format!("PUBLIC_URL is not a valid URL: {}", e)))?;
    if url.cannot_be_a_base() || url.path() != "/" {
        return Err(BotError::Config(format!(
            "PUBLIC_URL must be an origin without a path, got '{}'",
            raw
        )));
    }
    Ok(url)
}
