//! User-facing status narration
//!
//! The narration channel (spoken status on the original device) is an
//! external collaborator; the pipeline only needs a fire-and-forget sink.

/// Fire-and-forget sink for user-facing status text
pub trait Narrator {
    /// Emit a status notice; must not block or fail
    fn narrate(&self, text: &str);
}

/// Narrator that logs notices via `tracing`
pub struct LogNarrator;

impl Narrator for LogNarrator {
    fn narrate(&self, text: &str) {
        tracing::info!(notice = text, "status");
    }
}
