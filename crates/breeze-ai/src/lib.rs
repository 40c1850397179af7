//! Streaming client and frame decoder for the Breeze weather agent.
//!
//! Replies arrive as a stream of tagged frames that network reads may split or
//! merge anywhere. The decoder reassembles text deltas from that stream and the
//! turn runner applies them to the conversation in order.
mod assembler;
mod buffer;
mod client;
mod conversation;
mod decoder;
mod error_report;
mod frames;
mod ids;
mod request;
mod stream;
mod turn;
mod types;
mod utf8;

pub use assembler::{AssemblyState, MessageAssembler};
pub use client::{
    AgentClient, AgentClientConfig, AgentStreamClient, DEFAULT_AGENT_URL, DEV_PLAYGROUND_HEADER,
};
pub use conversation::{Conversation, CHAT_CLEARED_TEXT};
pub use decoder::{DecoderConfig, FrameDecoder, DEFAULT_MAX_BUFFERED_BYTES};
pub use error_report::{apology_text, error_detail, ErrorReporter, FALLBACK_ERROR_DETAIL};
pub use frames::{classify, unescape_payload, Classification, Frame, FrameKind};
pub use ids::generate_message_id;
pub use request::build_agent_request;
pub use stream::{ByteChunkStream, ReplyStream};
pub use turn::{run_turn, TurnObserver, TurnOutcome};
pub use types::{
    AgentMessage, AgentRequest, AgentRole, BreezeAiError, ChatMessage, RunParameters, Sender,
    StreamDeltaHandler, StreamSummary, DEFAULT_RESOURCE_ID, DEFAULT_RUN_ID, DEFAULT_THREAD_ID,
};
pub use utf8::Utf8ChunkDecoder;
