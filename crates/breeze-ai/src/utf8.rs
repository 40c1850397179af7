/// Streaming UTF-8 decoder for response bodies.
///
/// A character split across two network reads is held back until its remaining
/// bytes arrive. Invalid sequences decode to U+FFFD.
#[derive(Debug, Default)]
pub struct Utf8ChunkDecoder {
    pending: Vec<u8>,
}

impl Utf8ChunkDecoder {
    pub fn decode(&mut self, chunk: &[u8]) -> String {
        self.pending.extend_from_slice(chunk);
        let mut out = String::with_capacity(self.pending.len());
        let mut offset = 0;

        loop {
            match std::str::from_utf8(&self.pending[offset..]) {
                Ok(valid) => {
                    out.push_str(valid);
                    offset = self.pending.len();
                    break;
                }
                Err(error) => {
                    let valid_up_to = offset + error.valid_up_to();
                    out.push_str(&String::from_utf8_lossy(&self.pending[offset..valid_up_to]));
                    match error.error_len() {
                        Some(invalid) => {
                            out.push(char::REPLACEMENT_CHARACTER);
                            offset = valid_up_to + invalid;
                        }
                        None => {
                            offset = valid_up_to;
                            break;
                        }
                    }
                }
            }
        }

        self.pending.drain(..offset);
        out
    }

    /// Flushes bytes left at end of stream; an incomplete sequence becomes U+FFFD.
    pub fn finish(&mut self) -> String {
        if self.pending.is_empty() {
            return String::new();
        }
        let tail = String::from_utf8_lossy(&self.pending).into_owned();
        self.pending.clear();
        tail
    }
}
