use tracing::error;

use crate::assembler::MessageAssembler;
use crate::BreezeAiError;

pub const FALLBACK_ERROR_DETAIL: &str = "Failed to get weather information";

/// Text shown in place of the reply when a turn fails.
pub fn apology_text(detail: &str) -> String {
    format!("Sorry, I encountered an error: {detail} Please try again! 😔")
}

/// Short description of `error` suitable for showing to the person chatting.
pub fn error_detail(error: &BreezeAiError) -> String {
    let detail = error.to_string();
    if detail.trim().is_empty() {
        FALLBACK_ERROR_DETAIL.to_string()
    } else {
        detail
    }
}

#[derive(Debug, Default)]
/// Turns the first failure of a turn into the terminal bot message.
pub struct ErrorReporter {
    reported: bool,
}

impl ErrorReporter {
    pub fn new() -> Self {
        Self::default()
    }

    /// Rewrites the in-flight message and returns the detail for `on_error`.
    ///
    /// Returns `None` for every error after the first one.
    pub fn report(
        &mut self,
        assembler: &mut MessageAssembler<'_>,
        error: &BreezeAiError,
    ) -> Option<String> {
        if self.reported {
            return None;
        }
        self.reported = true;

        let detail = error_detail(error);
        error!(error = %detail, "weather agent turn failed");
        assembler.fail(apology_text(&detail));
        Some(detail)
    }

    pub fn has_reported(&self) -> bool {
        self.reported
    }
}
