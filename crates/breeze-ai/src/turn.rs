use std::future::Future;

use tracing::debug;

use crate::assembler::MessageAssembler;
use crate::client::AgentClient;
use crate::conversation::Conversation;
use crate::error_report::{error_detail, ErrorReporter};
use crate::{build_agent_request, BreezeAiError, RunParameters, StreamSummary};

/// Receives the consumer-facing callbacks of a turn.
pub trait TurnObserver {
    /// Called once per non-empty text delta, in stream order.
    fn on_chunk(&mut self, text: &str);
    /// Called at most once per turn, after which no chunks follow.
    fn on_error(&mut self, message: &str);
}

#[derive(Debug, Clone, PartialEq, Eq)]
/// Enumerates how a turn ended.
pub enum TurnOutcome {
    Completed(StreamSummary),
    Failed(String),
    Cancelled,
}

/// Runs one request/response cycle against `client`.
///
/// The user message and the bot reply are appended to `conversation`. Errors
/// never escape: they rewrite the reply and are reported through `observer`.
/// If `cancellation` resolves first, reading stops, decoder state is dropped,
/// and the partial reply is kept as is.
pub async fn run_turn<C, F, O>(
    client: &C,
    conversation: &mut Conversation,
    params: &RunParameters,
    user_text: &str,
    cancellation: F,
    observer: &mut O,
) -> TurnOutcome
where
    C: AgentClient + ?Sized,
    F: Future<Output = ()>,
    O: TurnObserver + ?Sized,
{
    conversation.push_user(user_text);
    let request = build_agent_request(conversation.messages(), params);
    let mut assembler = conversation.begin_reply();
    let mut reporter = ErrorReporter::new();
    tokio::pin!(cancellation);

    let opened = tokio::select! {
        opened = client.open_reply(&request) => opened,
        _ = &mut cancellation => return cancel(&mut assembler),
    };
    let mut reply = match opened {
        Ok(reply) => reply,
        Err(error) => return fail(&mut reporter, &mut assembler, observer, &error),
    };

    loop {
        let next = tokio::select! {
            next = reply.next_deltas() => next,
            _ = &mut cancellation => return cancel(&mut assembler),
        };
        match next {
            Some(Ok(deltas)) => {
                for delta in deltas {
                    if assembler.on_delta(&delta) {
                        observer.on_chunk(&delta);
                    }
                }
            }
            Some(Err(error)) => return fail(&mut reporter, &mut assembler, observer, &error),
            None => break,
        }
    }

    assembler.finish();
    let summary = reply.into_summary();
    debug!(
        message_id = assembler.message_id(),
        text_deltas = summary.text_deltas,
        "turn completed"
    );
    TurnOutcome::Completed(summary)
}

fn cancel(assembler: &mut MessageAssembler<'_>) -> TurnOutcome {
    debug!(message_id = assembler.message_id(), "turn cancelled");
    assembler.finish();
    TurnOutcome::Cancelled
}

fn fail<O>(
    reporter: &mut ErrorReporter,
    assembler: &mut MessageAssembler<'_>,
    observer: &mut O,
    error: &BreezeAiError,
) -> TurnOutcome
where
    O: TurnObserver + ?Sized,
{
    match reporter.report(assembler, error) {
        Some(detail) => {
            observer.on_error(&detail);
            TurnOutcome::Failed(detail)
        }
        None => TurnOutcome::Failed(error_detail(error)),
    }
}
