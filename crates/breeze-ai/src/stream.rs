use futures_util::stream::{self, BoxStream};
use futures_util::StreamExt;
use tracing::{debug, warn};

use crate::decoder::{DecoderConfig, FrameDecoder};
use crate::frames::Frame;
use crate::utf8::Utf8ChunkDecoder;
use crate::{BreezeAiError, StreamSummary};

pub type ByteChunkStream = BoxStream<'static, Result<Vec<u8>, BreezeAiError>>;

/// A reply body being decoded into text deltas.
///
/// Each call to [`ReplyStream::next_deltas`] awaits the next network read and
/// returns the text it completed. Dropping the stream abandons the reply.
pub struct ReplyStream {
    chunks: ByteChunkStream,
    text: Utf8ChunkDecoder,
    frames: FrameDecoder,
    summary: StreamSummary,
    done: bool,
    deferred_error: Option<BreezeAiError>,
}

impl ReplyStream {
    pub fn new(chunks: ByteChunkStream, config: DecoderConfig) -> Self {
        Self {
            chunks,
            text: Utf8ChunkDecoder::default(),
            frames: FrameDecoder::new(config),
            summary: StreamSummary::default(),
            done: false,
            deferred_error: None,
        }
    }

    /// Builds a stream over in-memory chunks.
    pub fn from_chunks<I, C>(chunks: I, config: DecoderConfig) -> Self
    where
        I: IntoIterator<Item = C>,
        C: Into<Vec<u8>>,
    {
        let chunks: Vec<Result<Vec<u8>, BreezeAiError>> =
            chunks.into_iter().map(|chunk| Ok(chunk.into())).collect();
        Self::new(stream::iter(chunks).boxed(), config)
    }

    /// Returns the next non-empty batch of deltas, `None` at end of stream.
    pub async fn next_deltas(&mut self) -> Option<Result<Vec<String>, BreezeAiError>> {
        if let Some(error) = self.deferred_error.take() {
            return Some(Err(error));
        }
        while !self.done {
            let decoded = match self.chunks.next().await {
                Some(Ok(bytes)) => self.text.decode(&bytes),
                Some(Err(error)) => {
                    self.done = true;
                    self.frames.reset();
                    return Some(Err(error));
                }
                None => {
                    self.done = true;
                    self.text.finish()
                }
            };

            let deltas = match self.apply(&decoded) {
                Ok(deltas) => deltas,
                Err(error) => {
                    self.done = true;
                    return Some(Err(error));
                }
            };

            if self.done {
                self.deferred_error = self.frames.take_error();
                if let Some(leftover) = self.frames.finish() {
                    warn!(
                        bytes = leftover.len(),
                        "reply stream ended inside an unfinished frame"
                    );
                }
                debug!(
                    text_deltas = self.summary.text_deltas,
                    skipped_bytes = self.summary.skipped_bytes,
                    finish_reason = ?self.summary.finish_reason,
                    "reply stream finished"
                );
            }
            if !deltas.is_empty() {
                return Some(Ok(deltas));
            }
            if let Some(error) = self.deferred_error.take() {
                return Some(Err(error));
            }
        }
        None
    }

    pub fn summary(&self) -> &StreamSummary {
        &self.summary
    }

    pub fn into_summary(self) -> StreamSummary {
        self.summary
    }

    fn apply(&mut self, text: &str) -> Result<Vec<String>, BreezeAiError> {
        let mut deltas = Vec::new();
        for frame in self.frames.feed_frames(text)? {
            match frame {
                Frame::TextDelta { payload } => {
                    if !payload.is_empty() {
                        self.summary.text_deltas += 1;
                        deltas.push(payload);
                    }
                }
                frame @ Frame::Metadata { .. } => {
                    if let Some(id) = frame.message_id() {
                        self.summary.message_id = Some(id);
                    }
                }
                frame @ Frame::FinishSignal { .. } => {
                    if let Some(reason) = frame.finish_reason() {
                        self.summary.finish_reason = Some(reason);
                    }
                }
                Frame::ToolCall { .. } | Frame::Unrecognized { .. } => {}
            }
        }
        self.summary.skipped_bytes = self.frames.skipped_bytes();
        Ok(deltas)
    }
}

#[cfg(test)]
mod tests {
    use futures_util::stream;
    use futures_util::StreamExt;

    use super::ReplyStream;
    use crate::decoder::DecoderConfig;
    use crate::BreezeAiError;

    async fn collect(
        mut reply: ReplyStream,
    ) -> (Vec<String>, Option<BreezeAiError>, ReplyStream) {
        let mut deltas = Vec::new();
        while let Some(batch) = reply.next_deltas().await {
            match batch {
                Ok(batch) => deltas.extend(batch),
                Err(error) => return (deltas, Some(error), reply),
            }
        }
        (deltas, None, reply)
    }

    #[tokio::test]
    async fn decodes_text_split_inside_multibyte_characters() {
        let body =
            "f:{\"messageId\":\"msg-7\"}\n0:\"London: 15°C\"\ne:{\"finishReason\":\"stop\"}\n";
        let bytes = body.as_bytes();
        let split = body.find('°').expect("degree sign") + 1;
        let reply = ReplyStream::from_chunks(
            vec![bytes[..split].to_vec(), bytes[split..].to_vec()],
            DecoderConfig::default(),
        );

        let (deltas, error, reply) = collect(reply).await;
        assert!(error.is_none());
        assert_eq!(deltas.concat(), "London: 15°C");
        let summary = reply.into_summary();
        assert_eq!(summary.message_id.as_deref(), Some("msg-7"));
        assert_eq!(summary.finish_reason.as_deref(), Some("stop"));
        assert_eq!(summary.text_deltas, 1);
    }

    #[tokio::test]
    async fn chunks_without_complete_frames_yield_nothing_until_completed() {
        let reply = ReplyStream::from_chunks(
            vec!["0:\"Lo", "n", "don\"0:\"", "\""],
            DecoderConfig::default(),
        );
        let (deltas, error, _) = collect(reply).await;
        assert!(error.is_none());
        assert_eq!(deltas, vec!["London".to_string()]);
    }

    #[tokio::test]
    async fn transport_error_ends_the_stream_after_earlier_deltas() {
        let chunks = vec![
            Ok(b"0:\"Hello \"".to_vec()),
            Err(BreezeAiError::Decode("connection reset".to_string())),
            Ok(b"0:\"never\"".to_vec()),
        ];
        let reply = ReplyStream::new(stream::iter(chunks).boxed(), DecoderConfig::default());
        let (deltas, error, mut reply) = collect(reply).await;
        assert_eq!(deltas, vec!["Hello ".to_string()]);
        assert!(matches!(error, Some(BreezeAiError::Decode(_))));
        assert!(reply.next_deltas().await.is_none());
    }

    #[tokio::test]
    async fn oversized_frame_surfaces_protocol_anomaly() {
        let reply = ReplyStream::from_chunks(
            vec!["0:\"aaaa", "aaaaaaaa"],
            DecoderConfig {
                max_buffered_bytes: 10,
            },
        );
        let (deltas, error, _) = collect(reply).await;
        assert!(deltas.is_empty());
        assert!(matches!(
            error,
            Some(BreezeAiError::ProtocolAnomaly { limit: 10, .. })
        ));
    }

    #[tokio::test]
    async fn deltas_completed_before_a_bound_overrun_reach_the_caller() {
        let mut reply = ReplyStream::from_chunks(
            vec!["0:\"ok\"0:\"aaaaaaaaaaaa"],
            DecoderConfig {
                max_buffered_bytes: 8,
            },
        );

        let first = reply.next_deltas().await.expect("first batch");
        assert_eq!(first.expect("deltas before the overrun"), vec!["ok"]);
        let second = reply.next_deltas().await.expect("anomaly batch");
        assert!(matches!(
            second,
            Err(BreezeAiError::ProtocolAnomaly { limit: 8, .. })
        ));
        assert!(reply.next_deltas().await.is_none());
    }

    #[tokio::test]
    async fn counts_skipped_bytes_in_summary() {
        let reply = ReplyStream::from_chunks(vec!["2:[\"x\"]\n0:\"ok\""], DecoderConfig::default());
        let (deltas, _, reply) = collect(reply).await;
        assert_eq!(deltas, vec!["ok".to_string()]);
        assert_eq!(reply.summary().skipped_bytes, 7);
    }
}
