//! Utterance endpoint detection
//!
//! Decides when the speaker has stopped talking: a block whose peak
//! amplitude exceeds the threshold refreshes the voice timestamp, and the
//! utterance completes once trailing silence exceeds the timeout. A
//! session that never crosses the threshold still completes, timed from
//! session start.

use std::time::{Duration, Instant};

use crate::config::VoiceConfig;

/// Verdict for one observed block
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Endpoint {
    /// Keep capturing
    Continue,
    /// Utterance is complete
    Complete,
}

/// Trailing-silence endpoint detector
///
/// Deterministic: the verdict depends only on the amplitude sequence and
/// the timestamps passed to [`observe`](Self::observe), never on how the
/// sequence is split into blocks.
pub struct EndpointDetector {
    threshold: u16,
    silence_timeout: Duration,
    max_utterance: Option<Duration>,
    started_at: Instant,
    last_voice: Instant,
}

impl EndpointDetector {
    /// Create a detector for a session starting at `now`
    #[must_use]
    pub fn new(config: &VoiceConfig, now: Instant) -> Self {
        Self {
            threshold: config.silence_threshold,
            silence_timeout: config.silence_timeout,
            max_utterance: config.max_utterance,
            started_at: now,
            last_voice: now,
        }
    }

    /// Observe one sample block at timestamp `now`
    pub fn observe(&mut self, block: &[i16], now: Instant) -> Endpoint {
        // unsigned_abs avoids overflow on i16::MIN
        let peak = block.iter().map(|s| s.unsigned_abs()).max().unwrap_or(0);

        if peak > self.threshold {
            self.last_voice = now;
        }

        tracing::trace!(peak, samples = block.len(), "observed block");

        if let Some(limit) = self.max_utterance {
            if now.duration_since(self.started_at) > limit {
                tracing::debug!("utterance ceiling reached");
                return Endpoint::Complete;
            }
        }

        if now.duration_since(self.last_voice) > self.silence_timeout {
            Endpoint::Complete
        } else {
            Endpoint::Continue
        }
    }
}
