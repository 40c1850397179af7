use std::io::Write;

use tracing::debug;

const BELL: &[u8] = b"\x07";

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
/// Whether sending and receiving messages produce an audible cue.
pub struct SoundSettings {
    pub enabled: bool,
}

impl Default for SoundSettings {
    fn default() -> Self {
        Self { enabled: true }
    }
}

/// Rings the terminal bell when a message is sent and when its reply ends.
pub struct Notifier<W: Write> {
    settings: SoundSettings,
    out: W,
}

impl<W: Write> Notifier<W> {
    pub fn new(settings: SoundSettings, out: W) -> Self {
        Self { settings, out }
    }

    /// Plays the cue for a message just sent to the agent.
    pub fn message_sent(&mut self) {
        if self.settings.enabled {
            self.ring();
        }
    }

    /// Plays the cue for a finished bot reply. Silent when sound is off.
    pub fn message_received(&mut self) {
        if self.settings.enabled {
            self.ring();
        }
    }

    /// Flips the setting and returns the new state. Turning sound on rings once as a preview.
    pub fn toggle(&mut self) -> bool {
        self.settings.enabled = !self.settings.enabled;
        if self.settings.enabled {
            self.ring();
        }
        self.settings.enabled
    }

    // A broken terminal must never fail a turn.
    fn ring(&mut self) {
        if let Err(error) = self.out.write_all(BELL).and_then(|_| self.out.flush()) {
            debug!(%error, "failed to ring terminal bell");
        }
    }

    #[cfg(test)]
    pub(crate) fn output(&self) -> &W {
        &self.out
    }

    #[cfg(test)]
    pub(crate) fn into_inner(self) -> W {
        self.out
    }
}
