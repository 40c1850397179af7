use serde_json::Map;

use crate::{AgentMessage, AgentRequest, ChatMessage, RunParameters};

/// Maps the conversation so far into the agent's request body.
///
/// Pass the history including the newest user message but before the empty
/// bot placeholder for the reply is added.
pub fn build_agent_request(messages: &[ChatMessage], params: &RunParameters) -> AgentRequest {
    AgentRequest {
        messages: messages
            .iter()
            .map(|message| AgentMessage {
                role: message.sender.into(),
                content: message.text.clone(),
            })
            .collect(),
        run_id: params.run_id.clone(),
        max_retries: params.max_retries,
        max_steps: params.max_steps,
        temperature: params.temperature,
        top_p: params.top_p,
        runtime_context: Map::new(),
        thread_id: params.thread_id.clone(),
        resource_id: params.resource_id.clone(),
    }
}
