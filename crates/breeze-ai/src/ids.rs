use std::sync::atomic::{AtomicU64, Ordering};
use std::time::{SystemTime, UNIX_EPOCH};

const SUFFIX_LEN: usize = 9;
const BASE36: &[u8; 36] = b"0123456789abcdefghijklmnopqrstuvwxyz";

static ID_COUNTER: AtomicU64 = AtomicU64::new(1);

/// Builds a message id from the current epoch milliseconds and a base-36 suffix.
///
/// Ids are unique within the process, which is all the conversation list needs;
/// they are not suitable as security tokens.
pub fn generate_message_id() -> String {
    let elapsed = SystemTime::now()
        .duration_since(UNIX_EPOCH)
        .unwrap_or_default();
    let seed = ID_COUNTER.fetch_add(1, Ordering::Relaxed);
    let mixed = (seed ^ u64::from(elapsed.subsec_nanos()))
        .wrapping_mul(0x9E37_79B9_7F4A_7C15)
        .rotate_left(17)
        ^ 0xA24B_AED4_963E_E407;
    format!("{}{}", elapsed.as_millis(), base36_suffix(mixed))
}

fn base36_suffix(mut value: u64) -> String {
    let mut out = String::with_capacity(SUFFIX_LEN);
    for _ in 0..SUFFIX_LEN {
        out.push(char::from(BASE36[(value % 36) as usize]));
        value /= 36;
    }
    out
}
