//! Inbound events and outbound replies, independent of the chat SDK

/// Something the user did, already stripped of transport details.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum InboundEvent {
    /// `/start`
    Greeting,
    /// Free text, treated as a search query
    Text(String),
    /// A button press carrying its opaque payload
    Selection { payload: String, user_name: String },
}

/// Per-user conversation state.
///
/// Nothing stores it: the state a turn ends in is returned in [`Turn`] and
/// the chat itself (the message carrying the buttons) is the only memory.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default)]
pub enum ConversationState {
    #[default]
    Idle,
    AwaitingSelection,
}

/// A run of text with optional emphasis.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum Span {
    Plain(String),
    Bold(String),
}

/// Outgoing text made of spans; the transport picks the markup.
#[derive(Debug, Clone, PartialEq, Eq, Default)]
pub struct MessageText {
    spans: Vec<Span>,
}

impl MessageText {
    pub fn plain(text: impl Into<String>) -> Self {
        Self {
            spans: vec![Span::Plain(text.into())],
        }
    }

    pub fn bold(mut self, text: impl Into<String>) -> Self {
        self.spans.push(Span::Bold(text.into()));
        self
    }

    pub fn then(mut self, text: impl Into<String>) -> Self {
        self.spans.push(Span::Plain(text.into()));
        self
    }

    pub fn spans(&self) -> &[Span] {
        &self.spans
    }

    /// Whether any span needs markup.
    pub fn is_rich(&self) -> bool {
        self.spans.iter().any(|s| matches!(s, Span::Bold(_)))
    }

    /// The text with all emphasis dropped.
    pub fn to_plain(&self) -> String {
        self.spans
            .iter()
            .map(|s| match s {
                Span::Plain(t) | Span::Bold(t) => t.as_str(),
            })
            .collect()
    }
}

impl From<&str> for MessageText {
    fn from(text: &str) -> Self {
        MessageText::plain(text)
    }
}

/// One selectable button.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Button {
    pub label: String,
    pub payload: String,
}

/// The single message the bot produces for an event.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum Reply {
    /// New message in the chat
    Send(MessageText),
    /// New message with one button per row
    Choices { prompt: String, buttons: Vec<Button> },
    /// Replace the text of the message whose button was pressed
    Edit(MessageText),
}

impl Reply {
    pub fn send(text: impl Into<MessageText>) -> Self {
        Reply::Send(text.into())
    }

    pub fn edit(text: impl Into<MessageText>) -> Self {
        Reply::Edit(text.into())
    }

    /// Plain rendering of the reply text, for logs and tests.
    pub fn text(&self) -> String {
        match self {
            Reply::Send(t) | Reply::Edit(t) => t.to_plain(),
            Reply::Choices { prompt, .. } => prompt.clone(),
        }
    }
}

/// Result of handling one event.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Turn {
    pub reply: Reply,
    pub state: ConversationState,
}

impl Turn {
    pub fn idle(reply: Reply) -> Self {
        Self {
            reply,
            state: ConversationState::Idle,
        }
    }

    pub fn awaiting_selection(reply: Reply) -> Self {
        Self {
            reply,
            state: ConversationState::AwaitingSelection,
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_message_text_builder() {
        let text = MessageText::plain("a ").bold("b").then(" c");
        assert_eq!(text.to_plain(), "a b c");
        assert!(text.is_rich());
        assert_eq!(text.spans().len(), 3);
    }

    #[test]
    fn test_plain_text_is_not_rich() {
        assert!(!MessageText::from("hello").is_rich());
    }

    #[test]
    fn test_reply_text() {
        assert_eq!(Reply::send("hi").text(), "hi");
        assert_eq!(Reply::edit("done").text(), "done");
        let choices = Reply::Choices {
            prompt: "pick".into(),
            buttons: vec![],
        };
        assert_eq!(choices.text(), "pick");
    }

    #[test]
    fn test_default_state_is_idle() {
        assert_eq!(ConversationState::default(), ConversationState::Idle);
    }
}
