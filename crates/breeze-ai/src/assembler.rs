use crate::ChatMessage;

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
/// Lifecycle of the bot message being assembled.
pub enum AssemblyState {
    Open,
    Finished,
    Failed,
}

#[derive(Debug)]
/// Appends streamed text deltas to the in-flight bot message.
pub struct MessageAssembler<'a> {
    message: &'a mut ChatMessage,
    state: AssemblyState,
}

impl<'a> MessageAssembler<'a> {
    pub fn new(message: &'a mut ChatMessage) -> Self {
        Self {
            message,
            state: AssemblyState::Open,
        }
    }

    /// Appends `payload`; returns `false` once the message is closed.
    pub fn on_delta(&mut self, payload: &str) -> bool {
        if self.is_closed() {
            return false;
        }
        self.message.text.push_str(payload);
        true
    }

    pub fn finish(&mut self) {
        if self.state == AssemblyState::Open {
            self.state = AssemblyState::Finished;
        }
    }

    /// Replaces the text with a terminal error message and closes the message.
    ///
    /// Returns `false` when the message was already closed.
    pub fn fail(&mut self, text: impl Into<String>) -> bool {
        if self.is_closed() {
            return false;
        }
        self.message.text = text.into();
        self.state = AssemblyState::Failed;
        true
    }

    pub fn is_closed(&self) -> bool {
        self.state != AssemblyState::Open
    }

    pub fn state(&self) -> AssemblyState {
        self.state
    }

    pub fn text(&self) -> &str {
        &self.message.text
    }

    pub fn message_id(&self) -> &str {
        &self.message.id
    }
}
