/// Decoded reply text that has not yet been turned into frames.
///
/// Text is appended at the tail and released as a contiguous prefix once the
/// frames covering it are complete. `consumed` marks how far that prefix runs.
#[derive(Debug, Default)]
pub(crate) struct StreamBuffer {
    text: String,
    consumed: usize,
}

impl StreamBuffer {
    pub(crate) fn push(&mut self, text: &str) {
        self.text.push_str(text);
    }

    pub(crate) fn as_str(&self) -> &str {
        &self.text
    }

    pub(crate) fn unconsumed(&self) -> &str {
        &self.text[self.consumed..]
    }

    pub(crate) fn consumed(&self) -> usize {
        self.consumed
    }

    pub(crate) fn consume_through(&mut self, end: usize) {
        debug_assert!(end >= self.consumed && end <= self.text.len());
        self.consumed = end;
    }

    pub(crate) fn advance(&mut self, len: usize) {
        self.consume_through(self.consumed + len);
    }

    /// Drops the consumed prefix and returns how many bytes were removed.
    pub(crate) fn compact(&mut self) -> usize {
        let removed = self.consumed;
        if removed > 0 {
            self.text.drain(..removed);
            self.consumed = 0;
        }
        removed
    }

    pub(crate) fn retained_len(&self) -> usize {
        self.text.len() - self.consumed
    }

    pub(crate) fn clear(&mut self) {
        self.text.clear();
        self.consumed = 0;
    }
}
