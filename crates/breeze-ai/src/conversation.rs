use crate::assembler::MessageAssembler;
use crate::{ChatMessage, Sender};

pub const CHAT_CLEARED_TEXT: &str = "Chat cleared! Ask me about the weather in any city. 🌤️";

#[derive(Debug, Clone, Default, PartialEq)]
/// Ordered chat history; insertion order is temporal order.
pub struct Conversation {
    messages: Vec<ChatMessage>,
}

impl Conversation {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn messages(&self) -> &[ChatMessage] {
        &self.messages
    }

    pub fn last(&self) -> Option<&ChatMessage> {
        self.messages.last()
    }

    pub fn len(&self) -> usize {
        self.messages.len()
    }

    pub fn is_empty(&self) -> bool {
        self.messages.is_empty()
    }

    pub fn push_user(&mut self, text: impl Into<String>) -> &ChatMessage {
        self.messages.push(ChatMessage::user(text));
        &self.messages[self.messages.len() - 1]
    }

    /// Appends an empty bot message and returns the assembler that fills it.
    ///
    /// The assembler borrows the conversation mutably, so only one reply can
    /// be in flight at a time.
    pub fn begin_reply(&mut self) -> MessageAssembler<'_> {
        self.messages.push(ChatMessage::bot(String::new()));
        let index = self.messages.len() - 1;
        MessageAssembler::new(&mut self.messages[index])
    }

    /// Drops every message and seeds the history with a single greeting.
    pub fn reset(&mut self) {
        self.messages.clear();
        self.messages.push(ChatMessage::bot(CHAT_CLEARED_TEXT));
    }

    pub fn count_by(&self, sender: Sender) -> usize {
        self.messages
            .iter()
            .filter(|message| message.sender == sender)
            .count()
    }
}
