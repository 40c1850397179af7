//! Frame grammar of the agent's streaming reply protocol.
//!
//! Every frame starts with a one-character discriminant and a `:`. Text deltas
//! carry a JSON-escaped string; every other recognized frame carries a JSON
//! object that is skipped without interpretation.

use serde_json::Value;

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
/// Enumerates the frame types the decoder recognizes.
pub enum FrameKind {
    TextDelta,
    ToolCall,
    Metadata,
    FinishSignal,
}

const FRAME_HEADERS: [(&str, FrameKind); 6] = [
    ("0:\"", FrameKind::TextDelta),
    ("9:{", FrameKind::ToolCall),
    ("a:{", FrameKind::ToolCall),
    ("f:{\"messageId\"", FrameKind::Metadata),
    ("e:{\"finishReason\"", FrameKind::FinishSignal),
    ("d:{\"finishReason\"", FrameKind::FinishSignal),
];

/// Offset of the first payload byte after the discriminant and `:`.
const OBJECT_BODY_OFFSET: usize = 2;
const TEXT_BODY_OFFSET: usize = 3;

#[derive(Debug, Clone, PartialEq, Eq)]
/// One decoded unit of the reply stream.
pub enum Frame {
    TextDelta { payload: String },
    ToolCall { raw: String },
    Metadata { raw: String },
    FinishSignal { raw: String },
    /// A run of input that matched no frame header and was skipped.
    Unrecognized { skipped: String },
}

impl Frame {
    /// Best-effort lookup of `messageId` in a metadata frame.
    pub fn message_id(&self) -> Option<String> {
        match self {
            Frame::Metadata { raw } => object_string_field(raw, "messageId"),
            _ => None,
        }
    }

    /// Best-effort lookup of `finishReason` in a finish frame.
    pub fn finish_reason(&self) -> Option<String> {
        match self {
            Frame::FinishSignal { raw } => object_string_field(raw, "finishReason"),
            _ => None,
        }
    }
}

fn object_string_field(raw: &str, field: &str) -> Option<String> {
    let value = serde_json::from_str::<Value>(raw).ok()?;
    value.get(field)?.as_str().map(str::to_string)
}

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
/// Result of looking at the unconsumed input from one position.
pub enum Classification {
    /// A frame header starts here; its body begins `body_offset` bytes in.
    Frame { kind: FrameKind, body_offset: usize },
    /// The input is a strict prefix of some header; wait for more text.
    NeedMore,
    /// Inter-frame whitespace of the given byte length.
    Whitespace(usize),
    /// A character that starts no frame, with its byte length.
    Unrecognized(usize),
}

pub fn classify(input: &str) -> Classification {
    let Some(first) = input.chars().next() else {
        return Classification::NeedMore;
    };

    for (header, kind) in FRAME_HEADERS {
        if input.starts_with(header) {
            let body_offset = match kind {
                FrameKind::TextDelta => TEXT_BODY_OFFSET,
                _ => OBJECT_BODY_OFFSET,
            };
            return Classification::Frame { kind, body_offset };
        }
        if header.starts_with(input) {
            return Classification::NeedMore;
        }
    }

    if first.is_ascii_whitespace() {
        Classification::Whitespace(first.len_utf8())
    } else {
        Classification::Unrecognized(first.len_utf8())
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
/// Resumable position inside a frame body. Offsets index the decoder buffer.
pub(crate) enum ScanState {
    Text {
        pos: usize,
        escaped: bool,
    },
    Object {
        pos: usize,
        depth: usize,
        in_string: bool,
        escaped: bool,
    },
}

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub(crate) enum ScanProgress {
    /// The frame ends just before `end`.
    Complete { end: usize },
    Pending(ScanState),
}

impl ScanState {
    pub(crate) fn start(kind: FrameKind, body_start: usize) -> Self {
        match kind {
            FrameKind::TextDelta => ScanState::Text {
                pos: body_start,
                escaped: false,
            },
            _ => ScanState::Object {
                pos: body_start,
                depth: 0,
                in_string: false,
                escaped: false,
            },
        }
    }

    pub(crate) fn shift_back(self, by: usize) -> Self {
        match self {
            ScanState::Text { pos, escaped } => ScanState::Text {
                pos: pos - by,
                escaped,
            },
            ScanState::Object {
                pos,
                depth,
                in_string,
                escaped,
            } => ScanState::Object {
                pos: pos - by,
                depth,
                in_string,
                escaped,
            },
        }
    }

    /// Continues scanning `buf` from where the previous call stopped.
    ///
    /// Every delimiter is ASCII, so scanning bytes never splits a character.
    pub(crate) fn resume(self, buf: &[u8]) -> ScanProgress {
        match self {
            ScanState::Text { pos, escaped } => scan_text(buf, pos, escaped),
            ScanState::Object {
                pos,
                depth,
                in_string,
                escaped,
            } => scan_object(buf, pos, depth, in_string, escaped),
        }
    }
}

fn scan_text(buf: &[u8], mut pos: usize, mut escaped: bool) -> ScanProgress {
    while pos < buf.len() {
        let byte = buf[pos];
        if escaped {
            escaped = false;
        } else if byte == b'\\' {
            escaped = true;
        } else if byte == b'"' {
            return ScanProgress::Complete { end: pos + 1 };
        }
        pos += 1;
    }
    ScanProgress::Pending(ScanState::Text { pos, escaped })
}

fn scan_object(
    buf: &[u8],
    mut pos: usize,
    mut depth: usize,
    mut in_string: bool,
    mut escaped: bool,
) -> ScanProgress {
    while pos < buf.len() {
        let byte = buf[pos];
        if in_string {
            if escaped {
                escaped = false;
            } else if byte == b'\\' {
                escaped = true;
            } else if byte == b'"' {
                in_string = false;
            }
        } else {
            match byte {
                b'"' => in_string = true,
                b'{' => depth += 1,
                b'}' => {
                    depth = depth.saturating_sub(1);
                    if depth == 0 {
                        return ScanProgress::Complete { end: pos + 1 };
                    }
                }
                _ => {}
            }
        }
        pos += 1;
    }
    ScanProgress::Pending(ScanState::Object {
        pos,
        depth,
        in_string,
        escaped,
    })
}

/// Builds the frame that spans `buf[start..end]`.
pub(crate) fn complete_frame(kind: FrameKind, buf: &str, start: usize, end: usize) -> Frame {
    match kind {
        FrameKind::TextDelta => Frame::TextDelta {
            payload: unescape_payload(&buf[start + TEXT_BODY_OFFSET..end - 1]),
        },
        FrameKind::ToolCall => Frame::ToolCall {
            raw: buf[start + OBJECT_BODY_OFFSET..end].to_string(),
        },
        FrameKind::Metadata => Frame::Metadata {
            raw: buf[start + OBJECT_BODY_OFFSET..end].to_string(),
        },
        FrameKind::FinishSignal => Frame::FinishSignal {
            raw: buf[start + OBJECT_BODY_OFFSET..end].to_string(),
        },
    }
}

/// Decodes the body of a quoted text payload.
///
/// Standard JSON escapes are honoured. Bodies JSON rejects (raw control
/// characters, unknown escapes, malformed `\u`) are decoded one escape at a
/// time: valid escapes still decode and an invalid one keeps its character
/// without the backslash.
pub fn unescape_payload(raw: &str) -> String {
    if !raw.contains('\\') {
        return raw.to_string();
    }
    match serde_json::from_str::<String>(&format!("\"{raw}\"")) {
        Ok(text) => text,
        Err(_) => lenient_unescape(raw),
    }
}

fn lenient_unescape(raw: &str) -> String {
    let mut out = String::with_capacity(raw.len());
    let mut rest = raw;
    while let Some(at) = rest.find('\\') {
        out.push_str(&rest[..at]);
        rest = &rest[at + 1..];
        let Some(next) = rest.chars().next() else {
            break;
        };
        let decoded = match next {
            '"' => Some('"'),
            '\\' => Some('\\'),
            '/' => Some('/'),
            'b' => Some('\u{8}'),
            'f' => Some('\u{c}'),
            'n' => Some('\n'),
            'r' => Some('\r'),
            't' => Some('\t'),
            _ => None,
        };
        if let Some(ch) = decoded {
            out.push(ch);
            rest = &rest[1..];
            continue;
        }
        if next == 'u' {
            if let Some((ch, used)) = unicode_escape(&rest[1..]) {
                out.push(ch);
                rest = &rest[1 + used..];
                continue;
            }
        }
        out.push(next);
        rest = &rest[next.len_utf8()..];
    }
    out.push_str(rest);
    out
}

/// Decodes the hex digits after `\u`, joining a surrogate pair when one follows.
///
/// Returns the character and how many bytes of `input` it used.
fn unicode_escape(input: &str) -> Option<(char, usize)> {
    let high = hex_unit(input)?;
    if !(0xD800..0xDC00).contains(&high) {
        return Some((char::from_u32(high).unwrap_or(char::REPLACEMENT_CHARACTER), 4));
    }
    let low = input
        .get(4..)
        .and_then(|tail| tail.strip_prefix("\\u"))
        .and_then(hex_unit)
        .filter(|low| (0xDC00..0xE000).contains(low));
    match low {
        Some(low) => {
            let code = 0x10000 + ((high - 0xD800) << 10) + (low - 0xDC00);
            Some((char::from_u32(code).unwrap_or(char::REPLACEMENT_CHARACTER), 10))
        }
        None => Some((char::REPLACEMENT_CHARACTER, 4)),
    }
}

fn hex_unit(input: &str) -> Option<u32> {
    let digits = input.get(..4)?;
    if !digits.bytes().all(|byte| byte.is_ascii_hexdigit()) {
        return None;
    }
    u32::from_str_radix(digits, 16).ok()
}
