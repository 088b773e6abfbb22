//! Telegram binding: update decoding and the teloxide-backed outbox

use async_trait::async_trait;
use teloxide::payloads::{EditMessageTextSetters, SendMessageSetters};
use teloxide::requests::Requester;
use teloxide::types::{
    CallbackQuery, ChatId, InlineKeyboardButton, InlineKeyboardMarkup, Message, MessageId,
    ParseMode, Update, UpdateKind,
};
use teloxide::utils::markdown;
use teloxide::Bot;
use tracing::warn;

use super::{ChatOutbox, Delivery, ReplyTarget};
use crate::conversation::{InboundEvent, MessageText, Reply, Span};
use crate::error::Result;

const GREETING_COMMAND: &str = "start";

/// Turn a raw update into something the conversation handler understands.
///
/// Returns `None` for updates the bot does not react to: edits, stickers,
/// commands other than `/start`, callbacks without data, and so on.
pub fn decode_update(update: &Update) -> Option<Delivery> {
    match &update.kind {
        UpdateKind::Message(message) => decode_message(message),
        UpdateKind::CallbackQuery(query) => decode_callback(query),
        _ => None,
    }
}

fn decode_message(message: &Message) -> Option<Delivery> {
    let text = message.text()?;
    let event = match text.strip_prefix('/') {
        Some(command) => {
            // "/start@LibraryBot payload" -> "start"
            let name = command
                .split_whitespace()
                .next()
                .and_then(|word| word.split('@').next())
                .unwrap_or_default();
            if name != GREETING_COMMAND {
                return None;
            }
            InboundEvent::Greeting
        }
        None => InboundEvent::Text(text.to_string()),
    };

    Some(Delivery {
        event,
        target: ReplyTarget::chat(message.chat.id),
        callback: None,
    })
}

fn decode_callback(query: &CallbackQuery) -> Option<Delivery> {
    let payload = query.data.clone()?;
    let target = match &query.message {
        Some(origin) => ReplyTarget {
            chat_id: origin.chat().id,
            edit_message: Some(origin.id()),
        },
        // Inline-mode buttons have no chat message; answer in private
        None => ReplyTarget::chat(ChatId::from(query.from.id)),
    };

    Some(Delivery {
        event: InboundEvent::Selection {
            payload,
            user_name: query.from.first_name.clone(),
        },
        target,
        callback: Some(query.clone()),
    })
}

/// Render spans as MarkdownV2, escaping every user-supplied character.
pub fn render_markdown(text: &MessageText) -> String {
    text.spans()
        .iter()
        .map(|span| match span {
            Span::Plain(t) => markdown::escape(t),
            Span::Bold(t) => markdown::bold(&markdown::escape(t)),
        })
        .collect()
}

fn keyboard(buttons: &[crate::conversation::Button]) -> InlineKeyboardMarkup {
    let rows: Vec<Vec<InlineKeyboardButton>> = buttons
        .iter()
        .map(|b| vec![InlineKeyboardButton::callback(b.label.clone(), b.payload.clone())])
        .collect();
    InlineKeyboardMarkup::new(rows)
}

/// Sends replies through the Telegram Bot API.
#[derive(Clone)]
pub struct TelegramOutbox {
    bot: Bot,
}

impl TelegramOutbox {
    pub fn new(bot: Bot) -> Self {
        Self { bot }
    }

    async fn send_text(&self, chat_id: ChatId, text: &MessageText) -> Result<()> {
        if text.is_rich() {
            self.bot
                .send_message(chat_id, render_markdown(text))
                .parse_mode(ParseMode::MarkdownV2)
                .await?;
        } else {
            self.bot.send_message(chat_id, text.to_plain()).await?;
        }
        Ok(())
    }

    /// Editing without `reply_markup` also removes the buttons.
    async fn edit_text(&self, chat_id: ChatId, message_id: MessageId, text: &MessageText) -> Result<()> {
        if text.is_rich() {
            self.bot
                .edit_message_text(chat_id, message_id, render_markdown(text))
                .parse_mode(ParseMode::MarkdownV2)
                .await?;
        } else {
            self.bot
                .edit_message_text(chat_id, message_id, text.to_plain())
                .await?;
        }
        Ok(())
    }
}

#[async_trait]
impl ChatOutbox for TelegramOutbox {
    async fn acknowledge(&self, query: &CallbackQuery) -> Result<()> {
        self.bot.answer_callback_query(query.id.clone()).await?;
        Ok(())
    }

    async fn deliver(&self, target: &ReplyTarget, reply: &Reply) -> Result<()> {
        match reply {
            Reply::Send(text) => self.send_text(target.chat_id, text).await,
            Reply::Choices { prompt, buttons } => {
                self.bot
                    .send_message(target.chat_id, prompt.clone())
                    .reply_markup(keyboard(buttons))
                    .await?;
                Ok(())
            }
            Reply::Edit(text) => {
                let Some(message_id) = target.edit_message else {
                    return self.send_text(target.chat_id, text).await;
                };
                match self.edit_text(target.chat_id, message_id, text).await {
                    Ok(()) => Ok(()),
                    Err(e) => {
                        warn!(chat_id = ?target.chat_id, error = %e, "Edit failed, sending a new message");
                        self.send_text(target.chat_id, text).await
                    }
                }
            }
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::conversation::{messages, Button};
    use serde_json::{json, Value};
    use url::Url;
    use wiremock::matchers::{method, path_regex};
    use wiremock::{Mock, MockServer, ResponseTemplate};

    const TOKEN: &str = "123:abc";

    // teloxide only decodes an update kind from a borrowed string; going
    // through `from_value` falls back to `UpdateKind::Error`
    fn message_update(text: &str) -> Update {
        let body = json!({
            "update_id": 1,
            "message": {
                "message_id": 10,
                "date": 1700000000,
                "chat": {"id": 42, "type": "private", "first_name": "Anna"},
                "from": {"id": 42, "is_bot": false, "first_name": "Anna"},
                "text": text
            }
        });
        serde_json::from_str(&body.to_string()).unwrap()
    }

    fn callback_update(data: Option<&str>) -> Update {
        let mut query = json!({
            "id": "4382",
            "from": {"id": 42, "is_bot": false, "first_name": "Anna"},
            "chat_instance": "-8",
            "message": {
                "message_id": 11,
                "date": 1700000000,
                "chat": {"id": 42, "type": "private", "first_name": "Anna"},
                "text": "Choose a book:"
            }
        });
        if let Some(data) = data {
            query["data"] = json!(data);
        }
        let body = json!({"update_id": 2, "callback_query": query});
        serde_json::from_str(&body.to_string()).unwrap()
    }

    #[test]
    fn test_text_message_becomes_search_text() {
        let delivery = decode_update(&message_update("Tolstoy")).unwrap();
        assert_eq!(delivery.event, InboundEvent::Text("Tolstoy".into()));
        assert_eq!(delivery.target, ReplyTarget::chat(ChatId(42)));
        assert!(delivery.callback.is_none());
    }

    #[test]
    fn test_start_command_becomes_greeting() {
        for text in ["/start", "/start@LibraryBot", "/start deep-link"] {
            let delivery = decode_update(&message_update(text)).unwrap();
            assert_eq!(delivery.event, InboundEvent::Greeting);
        }
    }

    #[test]
    fn test_fixtures_decode_as_their_kind() {
        assert!(matches!(message_update("hi").kind, UpdateKind::Message(_)));
        assert!(matches!(
            callback_update(Some("r:1")).kind,
            UpdateKind::CallbackQuery(_)
        ));
    }

    #[test]
    fn test_other_commands_are_ignored() {
        assert!(matches!(message_update("/help").kind, UpdateKind::Message(_)));
        assert!(decode_update(&message_update("/help")).is_none());
        assert!(decode_update(&message_update("/")).is_none());
    }

    #[test]
    fn test_callback_becomes_selection_with_edit_target() {
        let delivery = decode_update(&callback_update(Some("r:17"))).unwrap();
        assert_eq!(
            delivery.event,
            InboundEvent::Selection {
                payload: "r:17".into(),
                user_name: "Anna".into(),
            }
        );
        assert_eq!(delivery.target.chat_id, ChatId(42));
        assert_eq!(delivery.target.edit_message, Some(MessageId(11)));
        assert!(delivery.callback.is_some());
    }

    #[test]
    fn test_callback_without_data_is_ignored() {
        assert!(decode_update(&callback_update(None)).is_none());
    }

    #[test]
    fn test_markdown_escapes_plain_and_bold() {
        let text = MessageText::plain("Booked: ").bold("C++ (2nd ed.)").then("!");
        assert_eq!(render_markdown(&text), "Booked: *C\\+\\+ \\(2nd ed\\.\\)*\\!");
    }

    #[test]
    fn test_keyboard_has_one_button_per_row() {
        let markup = keyboard(&[
            Button {
                label: "A — X".into(),
                payload: "r:1".into(),
            },
            Button {
                label: "B — Y".into(),
                payload: "r:2".into(),
            },
        ]);
        assert_eq!(markup.inline_keyboard.len(), 2);
        assert!(markup.inline_keyboard.iter().all(|row| row.len() == 1));
        assert_eq!(markup.inline_keyboard[1][0].text, "B — Y");
    }

    fn sent_message(text: &str) -> Value {
        json!({
            "ok": true,
            "result": {
                "message_id": 11,
                "date": 1700000000,
                "chat": {"id": 42, "type": "private", "first_name": "Anna"},
                "from": {"id": 1, "is_bot": true, "first_name": "LibraryBot", "username": "library_bot"},
                "text": text
            }
        })
    }

    fn outbox_for(server: &MockServer) -> TelegramOutbox {
        TelegramOutbox::new(Bot::new(TOKEN).set_api_url(Url::parse(&server.uri()).unwrap()))
    }

    fn edit_target() -> ReplyTarget {
        ReplyTarget {
            chat_id: ChatId(42),
            edit_message: Some(MessageId(11)),
        }
    }

    #[tokio::test]
    async fn test_edit_replaces_button_message() {
        let server = MockServer::start().await;
        Mock::given(method("POST"))
            .and(path_regex("(?i)/editmessagetext$"))
            .respond_with(ResponseTemplate::new(200).set_body_json(sent_message(messages::NOT_FOUND)))
            .expect(1)
            .mount(&server)
            .await;
        Mock::given(method("POST"))
            .and(path_regex("(?i)/sendmessage$"))
            .respond_with(ResponseTemplate::new(200).set_body_json(sent_message(messages::NOT_FOUND)))
            .expect(0)
            .mount(&server)
            .await;

        outbox_for(&server)
            .deliver(&edit_target(), &Reply::edit(messages::NOT_FOUND))
            .await
            .unwrap();
    }

    #[tokio::test]
    async fn test_failed_edit_falls_back_to_new_message() {
        let server = MockServer::start().await;
        Mock::given(method("POST"))
            .and(path_regex("(?i)/editmessagetext$"))
            .respond_with(ResponseTemplate::new(400).set_body_json(json!({
                "ok": false,
                "error_code": 400,
                "description": "Bad Request: message to edit not found"
            })))
            .expect(1)
            .mount(&server)
            .await;
        Mock::given(method("POST"))
            .and(path_regex("(?i)/sendmessage$"))
            .respond_with(
                ResponseTemplate::new(200).set_body_json(sent_message(messages::BOOKING_FAILED)),
            )
            .expect(1)
            .mount(&server)
            .await;

        outbox_for(&server)
            .deliver(&edit_target(), &Reply::edit(messages::BOOKING_FAILED))
            .await
            .unwrap();

        let requests = server.received_requests().await.unwrap();
        let sent: Value = requests.last().unwrap().body_json().unwrap();
        assert_eq!(sent["chat_id"], 42);
        assert_eq!(sent["text"], messages::BOOKING_FAILED);
    }
}
