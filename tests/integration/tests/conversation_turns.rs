use std::collections::VecDeque;
use std::future::pending;

use async_trait::async_trait;
use breeze_ai::{
    run_turn, AgentClient, AgentRequest, AgentRole, BreezeAiError, Conversation, DecoderConfig,
    ReplyStream, RunParameters, Sender, TurnObserver, TurnOutcome, CHAT_CLEARED_TEXT,
};
use serde_json::json;
use tokio::sync::Mutex as AsyncMutex;

enum ScriptedReply {
    Body(Vec<Vec<u8>>),
    Status(u16),
}

impl ScriptedReply {
    fn whole(body: &str) -> Self {
        Self::Body(vec![body.as_bytes().to_vec()])
    }

    fn byte_by_byte(body: &str) -> Self {
        Self::Body(body.bytes().map(|byte| vec![byte]).collect())
    }
}

struct ScriptedClient {
    replies: AsyncMutex<VecDeque<ScriptedReply>>,
    requests: AsyncMutex<Vec<AgentRequest>>,
}

impl ScriptedClient {
    fn new(replies: Vec<ScriptedReply>) -> Self {
        Self {
            replies: AsyncMutex::new(VecDeque::from(replies)),
            requests: AsyncMutex::new(Vec::new()),
        }
    }

    async fn requests(&self) -> Vec<AgentRequest> {
        self.requests.lock().await.clone()
    }
}

#[async_trait]
impl AgentClient for ScriptedClient {
    async fn open_reply(&self, request: &AgentRequest) -> Result<ReplyStream, BreezeAiError> {
        self.requests.lock().await.push(request.clone());
        match self.replies.lock().await.pop_front() {
            Some(ScriptedReply::Body(chunks)) => {
                Ok(ReplyStream::from_chunks(chunks, DecoderConfig::default()))
            }
            Some(ScriptedReply::Status(status)) => Err(BreezeAiError::HttpStatus {
                status,
                body: String::new(),
            }),
            None => Err(BreezeAiError::Decode(
                "scripted reply queue exhausted".to_string(),
            )),
        }
    }
}

#[derive(Default)]
struct Transcript {
    chunks: Vec<String>,
    errors: Vec<String>,
}

impl TurnObserver for Transcript {
    fn on_chunk(&mut self, text: &str) {
        self.chunks.push(text.to_string());
    }

    fn on_error(&mut self, message: &str) {
        self.errors.push(message.to_string());
    }
}

async fn turn(
    client: &ScriptedClient,
    conversation: &mut Conversation,
    text: &str,
    transcript: &mut Transcript,
) -> TurnOutcome {
    run_turn(
        client,
        conversation,
        &RunParameters::default(),
        text,
        pending(),
        transcript,
    )
    .await
}

fn roles(request: &AgentRequest) -> Vec<AgentRole> {
    request.messages.iter().map(|message| message.role).collect()
}

#[tokio::test]
async fn integration_multi_turn_history_is_sent_in_order() {
    let client = ScriptedClient::new(vec![
        ScriptedReply::whole(
            "f:{\"messageId\":\"m1\"}\n0:\"Paris: \"\n0:\"18°C\"\ne:{\"finishReason\":\"stop\"}\n",
        ),
        ScriptedReply::byte_by_byte(concat!(
            "9:{\"toolCallId\":\"c\",\"args\":{\"city\":\"Oslo\"}}\n",
            "a:{\"result\":{\"note\":\"}\"}}\n",
            "0:\"Oslo: \\\"-2°C\\\"\"\n",
            "d:{\"finishReason\":\"stop\"}\n",
        )),
    ]);
    let mut conversation = Conversation::new();
    let mut transcript = Transcript::default();

    let first = turn(
        &client,
        &mut conversation,
        "weather in Paris",
        &mut transcript,
    )
    .await;
    let second = turn(&client, &mut conversation, "and Oslo?", &mut transcript).await;

    assert!(matches!(first, TurnOutcome::Completed(_)));
    match second {
        TurnOutcome::Completed(summary) => {
            assert_eq!(summary.finish_reason.as_deref(), Some("stop"));
            assert_eq!(summary.skipped_bytes, 0);
        }
        other => panic!("expected completed second turn, got {other:?}"),
    }
    assert!(transcript.errors.is_empty());
    assert_eq!(transcript.chunks.concat(), "Paris: 18°COslo: \"-2°C\"");

    let texts: Vec<&str> = conversation
        .messages()
        .iter()
        .map(|message| message.text.as_str())
        .collect();
    assert_eq!(
        texts,
        vec!["weather in Paris", "Paris: 18°C", "and Oslo?", "Oslo: \"-2°C\""]
    );

    let requests = client.requests().await;
    assert_eq!(requests.len(), 2);
    assert_eq!(roles(&requests[0]), vec![AgentRole::User]);
    assert_eq!(
        roles(&requests[1]),
        vec![AgentRole::User, AgentRole::Assistant, AgentRole::User]
    );
    assert_eq!(
        serde_json::to_value(&requests[1].messages).expect("serialize messages"),
        json!([
            {"role": "user", "content": "weather in Paris"},
            {"role": "assistant", "content": "Paris: 18°C"},
            {"role": "user", "content": "and Oslo?"}
        ])
    );
}

#[tokio::test]
async fn integration_failed_turn_does_not_block_the_next_turn() {
    let client = ScriptedClient::new(vec![
        ScriptedReply::Status(502),
        ScriptedReply::whole("0:\"Back online.\""),
    ]);
    let mut conversation = Conversation::new();
    let mut transcript = Transcript::default();

    let failed = turn(&client, &mut conversation, "weather in Lima", &mut transcript).await;
    let recovered = turn(&client, &mut conversation, "try again", &mut transcript).await;

    assert_eq!(
        failed,
        TurnOutcome::Failed("HTTP error! status: 502".to_string())
    );
    assert!(matches!(recovered, TurnOutcome::Completed(_)));
    assert_eq!(transcript.errors, vec!["HTTP error! status: 502"]);
    assert_eq!(transcript.chunks, vec!["Back online."]);
    assert_eq!(
        conversation.messages()[1].text,
        "Sorry, I encountered an error: HTTP error! status: 502 Please try again! 😔"
    );
    assert_eq!(conversation.count_by(Sender::Bot), 2);
}

#[tokio::test]
async fn integration_reset_seeds_greeting_before_next_request() {
    let client = ScriptedClient::new(vec![
        ScriptedReply::whole("0:\"Sunny.\""),
        ScriptedReply::whole("0:\"Rainy.\""),
    ]);
    let mut conversation = Conversation::new();
    let mut transcript = Transcript::default();

    turn(&client, &mut conversation, "weather in Rome", &mut transcript).await;
    conversation.reset();
    turn(&client, &mut conversation, "weather in Bergen", &mut transcript).await;

    let requests = client.requests().await;
    let second = &requests[1];
    assert_eq!(roles(second), vec![AgentRole::Assistant, AgentRole::User]);
    assert_eq!(second.messages[0].content, CHAT_CLEARED_TEXT);
    assert_eq!(second.messages[1].content, "weather in Bergen");
    assert_eq!(conversation.last().expect("bot reply").text, "Rainy.");
}
