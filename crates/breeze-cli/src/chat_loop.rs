use std::future::Future;
use std::io::{self, Write};

use anyhow::{Context, Result};
use breeze_ai::{
    apology_text, run_turn, AgentClient, Conversation, RunParameters, TurnObserver, TurnOutcome,
    CHAT_CLEARED_TEXT,
};
use tracing::debug;

use crate::notifier::Notifier;

pub(crate) const HELP_TEXT: &str = "\
commands:
  /clear  start a new conversation
  /sound  toggle the completion bell
  /quit   exit
anything else is sent to the weather agent";

#[derive(Debug, Clone, PartialEq, Eq)]
pub(crate) enum ChatCommand {
    Clear,
    ToggleSound,
    Quit,
    Help,
    Empty,
    Message(String),
}

impl ChatCommand {
    pub(crate) fn parse(line: &str) -> Self {
        let trimmed = line.trim();
        match trimmed {
            "" => Self::Empty,
            "/clear" => Self::Clear,
            "/sound" => Self::ToggleSound,
            "/quit" | "/exit" => Self::Quit,
            "/help" => Self::Help,
            _ => Self::Message(trimmed.to_string()),
        }
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub(crate) enum LoopControl {
    Continue,
    Quit,
}

/// Streams chunks straight to the terminal and prints the apology on failure.
struct TerminalObserver<'a, W: Write> {
    out: &'a mut W,
    wrote_text: bool,
    io_error: Option<io::Error>,
}

impl<'a, W: Write> TerminalObserver<'a, W> {
    fn new(out: &'a mut W) -> Self {
        Self {
            out,
            wrote_text: false,
            io_error: None,
        }
    }

    fn write(&mut self, text: &str) {
        if self.io_error.is_some() {
            return;
        }
        if let Err(error) = self
            .out
            .write_all(text.as_bytes())
            .and_then(|_| self.out.flush())
        {
            self.io_error = Some(error);
        }
    }

    fn into_result(self) -> io::Result<bool> {
        match self.io_error {
            Some(error) => Err(error),
            None => Ok(self.wrote_text),
        }
    }
}

impl<W: Write> TurnObserver for TerminalObserver<'_, W> {
    fn on_chunk(&mut self, text: &str) {
        self.wrote_text = true;
        self.write(text);
    }

    fn on_error(&mut self, message: &str) {
        if self.wrote_text {
            self.write("\n");
        }
        self.wrote_text = true;
        self.write(&apology_text(message));
    }
}

/// One terminal chat: the conversation, its run parameters, and where output goes.
pub(crate) struct ChatSession<'c, C: ?Sized, W: Write, N: Write> {
    client: &'c C,
    params: RunParameters,
    conversation: Conversation,
    notifier: Notifier<N>,
    out: W,
}

impl<'c, C, W, N> ChatSession<'c, C, W, N>
where
    C: AgentClient + ?Sized,
    W: Write,
    N: Write,
{
    pub(crate) fn new(
        client: &'c C,
        params: RunParameters,
        notifier: Notifier<N>,
        out: W,
    ) -> Self {
        Self {
            client,
            params,
            conversation: Conversation::new(),
            notifier,
            out,
        }
    }

    pub(crate) fn conversation(&self) -> &Conversation {
        &self.conversation
    }

    /// Runs one turn and prints the reply as it streams.
    pub(crate) async fn send<F>(&mut self, text: &str, cancellation: F) -> Result<TurnOutcome>
    where
        F: Future<Output = ()>,
    {
        self.notifier.message_sent();
        let mut observer = TerminalObserver::new(&mut self.out);
        let outcome = run_turn(
            self.client,
            &mut self.conversation,
            &self.params,
            text,
            cancellation,
            &mut observer,
        )
        .await;
        let wrote_text = observer.into_result().context("failed to write reply")?;

        match &outcome {
            TurnOutcome::Completed(summary) => {
                debug!(
                    message_id = ?summary.message_id,
                    finish_reason = ?summary.finish_reason,
                    "reply completed"
                );
                self.notifier.message_received();
            }
            TurnOutcome::Failed(_) => self.notifier.message_received(),
            TurnOutcome::Cancelled => {
                if wrote_text {
                    writeln!(self.out)?;
                }
                write!(self.out, "[cancelled]")?;
            }
        }
        writeln!(self.out)?;
        self.out.flush()?;
        Ok(outcome)
    }

    pub(crate) async fn handle_line<F>(
        &mut self,
        line: &str,
        cancellation: F,
    ) -> Result<LoopControl>
    where
        F: Future<Output = ()>,
    {
        match ChatCommand::parse(line) {
            ChatCommand::Empty => {}
            ChatCommand::Quit => return Ok(LoopControl::Quit),
            ChatCommand::Clear => {
                self.conversation.reset();
                self.print_line(CHAT_CLEARED_TEXT)?;
            }
            ChatCommand::ToggleSound => {
                let enabled = self.notifier.toggle();
                self.print_line(if enabled {
                    "Sound enabled"
                } else {
                    "Sound disabled"
                })?;
            }
            ChatCommand::Help => self.print_line(HELP_TEXT)?,
            ChatCommand::Message(text) => {
                self.send(&text, cancellation).await?;
            }
        }
        Ok(LoopControl::Continue)
    }

    fn print_line(&mut self, text: &str) -> Result<()> {
        writeln!(self.out, "{text}")?;
        self.out.flush()?;
        Ok(())
    }

    #[cfg(test)]
    fn output(&self) -> &W {
        &self.out
    }
}

#[cfg(test)]
mod tests {
    use std::future::pending;

    use async_trait::async_trait;
    use breeze_ai::{
        AgentClient, AgentRequest, BreezeAiError, DecoderConfig, ReplyStream, RunParameters,
        Sender, TurnOutcome, CHAT_CLEARED_TEXT,
    };

    use super::{apology_text, ChatCommand, ChatSession, LoopControl};
    use crate::notifier::{Notifier, SoundSettings};

    struct FixedClient {
        body: Option<&'static str>,
    }

    #[async_trait]
    impl AgentClient for FixedClient {
        async fn open_reply(&self, _request: &AgentRequest) -> Result<ReplyStream, BreezeAiError> {
            match self.body {
                Some(body) => Ok(ReplyStream::from_chunks(
                    vec![body],
                    DecoderConfig::default(),
                )),
                None => Err(BreezeAiError::StreamUnavailable),
            }
        }
    }

    fn session(client: &FixedClient) -> ChatSession<'_, FixedClient, Vec<u8>, Vec<u8>> {
        session_with_sound(client, false)
    }

    fn session_with_sound(
        client: &FixedClient,
        enabled: bool,
    ) -> ChatSession<'_, FixedClient, Vec<u8>, Vec<u8>> {
        ChatSession::new(
            client,
            RunParameters::default(),
            Notifier::new(SoundSettings { enabled }, Vec::new()),
            Vec::new(),
        )
    }

    fn printed(session: &ChatSession<'_, FixedClient, Vec<u8>, Vec<u8>>) -> String {
        String::from_utf8_lossy(session.output()).into_owned()
    }

    #[test]
    fn parses_commands_and_messages() {
        assert_eq!(ChatCommand::parse("  /clear "), ChatCommand::Clear);
        assert_eq!(ChatCommand::parse("/sound"), ChatCommand::ToggleSound);
        assert_eq!(ChatCommand::parse("/exit"), ChatCommand::Quit);
        assert_eq!(ChatCommand::parse("\n"), ChatCommand::Empty);
        assert_eq!(
            ChatCommand::parse(" weather in Lima \n"),
            ChatCommand::Message("weather in Lima".to_string())
        );
    }

    #[tokio::test]
    async fn message_line_prints_streamed_reply() {
        let client = FixedClient {
            body: Some("0:\"Lima: \"0:\"19°C\"e:{\"finishReason\":\"stop\"}"),
        };
        let mut session = session(&client);

        let control = session
            .handle_line("weather in Lima", pending())
            .await
            .expect("line handled");

        assert_eq!(control, LoopControl::Continue);
        assert_eq!(printed(&session), "Lima: 19°C\n");
        assert_eq!(session.conversation().count_by(Sender::Bot), 1);
    }

    #[tokio::test]
    async fn failed_turn_prints_apology() {
        let client = FixedClient { body: None };
        let mut session = session(&client);

        let outcome = session
            .send("weather in Lima", pending())
            .await
            .expect("send");

        assert_eq!(
            outcome,
            TurnOutcome::Failed("No response body reader available".to_string())
        );
        assert_eq!(
            printed(&session),
            format!("{}\n", apology_text("No response body reader available"))
        );
    }

    #[tokio::test]
    async fn clear_and_sound_commands_print_status() {
        let client = FixedClient {
            body: Some("0:\"hi\""),
        };
        let mut session = session(&client);

        session.handle_line("hello", pending()).await.expect("turn");
        session
            .handle_line("/clear", pending())
            .await
            .expect("clear");
        session
            .handle_line("/sound", pending())
            .await
            .expect("sound");
        let control = session.handle_line("/quit", pending()).await.expect("quit");

        assert_eq!(control, LoopControl::Quit);
        assert_eq!(
            printed(&session),
            format!("hi\n{CHAT_CLEARED_TEXT}\nSound enabled\n")
        );
        assert_eq!(session.conversation().len(), 1);
    }

    #[tokio::test]
    async fn sound_cues_ring_on_send_and_on_reply() {
        let client = FixedClient {
            body: Some("0:\"sunny\""),
        };
        let mut session = session_with_sound(&client, true);
        session
            .send("weather in Lima", pending())
            .await
            .expect("send");
        assert_eq!(session.notifier.output(), b"\x07\x07");

        let failing = FixedClient { body: None };
        let mut session = session_with_sound(&failing, true);
        session
            .send("weather in Lima", pending())
            .await
            .expect("send");
        assert_eq!(session.notifier.output(), b"\x07\x07");

        let mut quiet = session_with_sound(&client, false);
        quiet
            .send("weather in Lima", pending())
            .await
            .expect("send");
        assert!(quiet.notifier.output().is_empty());
    }
}
