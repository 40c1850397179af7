use tracing::trace;

use crate::buffer::StreamBuffer;
use crate::frames::{
    classify, complete_frame, Classification, Frame, FrameKind, ScanProgress, ScanState,
};
use crate::BreezeAiError;

pub const DEFAULT_MAX_BUFFERED_BYTES: usize = 1024 * 1024;

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct DecoderConfig {
    /// Upper bound on text held for a single unfinished frame.
    pub max_buffered_bytes: usize,
}

impl Default for DecoderConfig {
    fn default() -> Self {
        Self {
            max_buffered_bytes: DEFAULT_MAX_BUFFERED_BYTES,
        }
    }
}

#[derive(Debug, Clone, Copy)]
struct PendingFrame {
    kind: FrameKind,
    start: usize,
    scan: ScanState,
}

#[derive(Debug, Default)]
/// Incremental decoder for the agent's frame stream.
///
/// Text may arrive split at any character boundary. Complete frames are
/// returned in stream order; an unfinished frame is held, together with its
/// scan position, until the rest of it arrives.
pub struct FrameDecoder {
    config: DecoderConfig,
    buffer: StreamBuffer,
    pending: Option<PendingFrame>,
    skipped_bytes: usize,
    /// Bound overrun found in a feed that also completed frames.
    deferred_anomaly: Option<(usize, usize)>,
}

impl FrameDecoder {
    pub fn new(config: DecoderConfig) -> Self {
        Self {
            config,
            ..Self::default()
        }
    }

    /// Feeds newly decoded text and returns the non-empty text deltas it completed.
    pub fn feed(&mut self, text: &str) -> Result<Vec<String>, BreezeAiError> {
        Ok(self
            .feed_frames(text)?
            .into_iter()
            .filter_map(|frame| match frame {
                Frame::TextDelta { payload } if !payload.is_empty() => Some(payload),
                _ => None,
            })
            .collect())
    }

    /// Feeds newly decoded text and returns every frame it completed.
    ///
    /// When the buffer bound is exceeded in a call that also completed frames,
    /// those frames are returned first and the anomaly is raised by the next
    /// call, or by [`FrameDecoder::take_error`].
    pub fn feed_frames(&mut self, text: &str) -> Result<Vec<Frame>, BreezeAiError> {
        if let Some(error) = self.take_error() {
            return Err(error);
        }
        self.buffer.push(text);
        let mut frames = Vec::new();
        let mut unrecognized = String::new();

        loop {
            if let Some(pending) = self.pending.take() {
                match pending.scan.resume(self.buffer.as_str().as_bytes()) {
                    ScanProgress::Complete { end } => {
                        frames.push(complete_frame(
                            pending.kind,
                            self.buffer.as_str(),
                            pending.start,
                            end,
                        ));
                        self.buffer.consume_through(end);
                    }
                    ScanProgress::Pending(scan) => {
                        self.pending = Some(PendingFrame { scan, ..pending });
                        break;
                    }
                }
                continue;
            }

            let rest = self.buffer.unconsumed();
            match classify(rest) {
                Classification::Frame { kind, body_offset } => {
                    flush_unrecognized(&mut unrecognized, &mut frames);
                    let start = self.buffer.consumed();
                    self.pending = Some(PendingFrame {
                        kind,
                        start,
                        scan: ScanState::start(kind, start + body_offset),
                    });
                }
                Classification::NeedMore => break,
                Classification::Whitespace(len) => self.buffer.advance(len),
                Classification::Unrecognized(len) => {
                    unrecognized.push_str(&rest[..len]);
                    self.skipped_bytes += len;
                    self.buffer.advance(len);
                }
            }
        }
        flush_unrecognized(&mut unrecognized, &mut frames);

        let removed = self.buffer.compact();
        if let Some(pending) = self.pending.as_mut() {
            pending.start -= removed;
            pending.scan = pending.scan.shift_back(removed);
        }

        let buffered = self.buffer.retained_len();
        if buffered > self.config.max_buffered_bytes {
            self.reset();
            self.deferred_anomaly = Some((buffered, self.config.max_buffered_bytes));
            if frames.is_empty() {
                if let Some(error) = self.take_error() {
                    return Err(error);
                }
            }
        }

        Ok(frames)
    }

    /// Returns a bound overrun that was held back so earlier frames could be delivered.
    pub fn take_error(&mut self) -> Option<BreezeAiError> {
        self.deferred_anomaly
            .take()
            .map(|(buffered, limit)| BreezeAiError::ProtocolAnomaly { buffered, limit })
    }

    /// Ends the stream, returning any unfinished frame text that was dropped.
    pub fn finish(&mut self) -> Option<String> {
        let leftover = self.buffer.unconsumed().trim().to_string();
        self.reset();
        if leftover.is_empty() {
            None
        } else {
            Some(leftover)
        }
    }

    pub fn reset(&mut self) {
        self.buffer.clear();
        self.pending = None;
        self.deferred_anomaly = None;
    }

    pub fn buffered(&self) -> &str {
        self.buffer.unconsumed()
    }

    pub fn buffered_len(&self) -> usize {
        self.buffer.retained_len()
    }

    pub fn skipped_bytes(&self) -> usize {
        self.skipped_bytes
    }
}

fn flush_unrecognized(unrecognized: &mut String, frames: &mut Vec<Frame>) {
    if unrecognized.is_empty() {
        return;
    }
    trace!(bytes = unrecognized.len(), "skipping unrecognized stream input");
    frames.push(Frame::Unrecognized {
        skipped: std::mem::take(unrecognized),
    });
}
