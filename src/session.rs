//! Session state machine
//!
//! Sequences one voice session: Listening (capture + endpoint detection),
//! Processing (encode, best-effort evidence capture, exchange),
//! AwaitingEvidence (the exchange's single evidence retry), Playing, and
//! back to Idle. Exactly one session runs at a time; triggers received
//! mid-session are ignored. Every failure narrates a notice and returns
//! the controller to Idle so the next trigger starts cleanly.

use std::time::Instant;

use tokio::sync::mpsc;

use crate::audio::{encode_wav, Endpoint, EndpointDetector, ReplySink, SampleSource, Utterance};
use crate::config::VoiceConfig;
use crate::evidence::EvidenceSource;
use crate::exchange::ExchangeClient;
use crate::notify::Narrator;
use crate::{Error, Result};

/// Session lifecycle state, owned exclusively by the controller
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum SessionState {
    /// Waiting for a trigger
    Idle,
    /// Capturing an utterance
    Listening,
    /// Encoding and exchanging with the service
    Processing,
    /// Exchange is retrying with freshly captured evidence
    AwaitingEvidence,
    /// Playing the service's reply
    Playing,
}

/// Orchestrates the capture → encode → exchange → playback pipeline
pub struct SessionController {
    voice: VoiceConfig,
    exchange: ExchangeClient,
    /// None when the microphone capability is unavailable
    source: Option<Box<dyn SampleSource>>,
    evidence: Box<dyn EvidenceSource>,
    playback: Box<dyn ReplySink>,
    narrator: Box<dyn Narrator>,
    state: SessionState,
    events: Option<mpsc::UnboundedSender<SessionState>>,
}

impl SessionController {
    /// Create a controller in the Idle state
    #[must_use]
    pub fn new(
        voice: VoiceConfig,
        exchange: ExchangeClient,
        source: Option<Box<dyn SampleSource>>,
        evidence: Box<dyn EvidenceSource>,
        playback: Box<dyn ReplySink>,
        narrator: Box<dyn Narrator>,
    ) -> Self {
        Self {
            voice,
            exchange,
            source,
            evidence,
            playback,
            narrator,
            state: SessionState::Idle,
            events: None,
        }
    }

    /// Post state transitions to a channel (for a presentation layer)
    #[must_use]
    pub fn with_events(mut self, events: mpsc::UnboundedSender<SessionState>) -> Self {
        self.events = Some(events);
        self
    }

    /// Current session state
    #[must_use]
    pub const fn state(&self) -> SessionState {
        self.state
    }

    /// Run sessions until the trigger channel closes
    ///
    /// A trigger starts a session only from Idle with the microphone
    /// available; triggers that arrive while a session is running are
    /// drained afterwards, never queued.
    pub async fn run(mut self, mut triggers: mpsc::Receiver<()>) {
        self.narrator.narrate("Ready. Trigger to speak.");

        while triggers.recv().await.is_some() {
            if self.state != SessionState::Idle {
                tracing::debug!(state = ?self.state, "trigger ignored, session active");
                continue;
            }

            if self.source.is_none() {
                self.narrator.narrate("Microphone required");
                continue;
            }

            self.run_session().await;

            // Discard triggers delivered mid-session
            while triggers.try_recv().is_ok() {}
        }

        tracing::info!("trigger channel closed, controller stopping");
    }

    /// Run one full session; always ends back in Idle
    pub async fn run_session(&mut self) {
        let started = Instant::now();

        match self.try_session().await {
            Ok(()) => {
                tracing::info!(elapsed_ms = started.elapsed().as_millis() as u64, "session complete");
            }
            Err(e) => {
                tracing::warn!(error = %e, "session failed");
                self.narrator.narrate(notice_for(&e));
                // Capture may still be live if the session died mid-listen
                if let Some(source) = self.source.as_mut() {
                    source.finish();
                }
            }
        }

        transition(
            &mut self.state,
            self.events.as_ref(),
            SessionState::Idle,
        );
    }

    async fn try_session(&mut self) -> Result<()> {
        let source = self
            .source
            .as_mut()
            .ok_or_else(|| Error::CapabilityDenied("microphone".to_string()))?;

        transition(&mut self.state, self.events.as_ref(), SessionState::Listening);
        self.narrator.narrate("Listening");

        let session_start = Instant::now();
        let mut detector = EndpointDetector::new(&self.voice, session_start);
        let mut utterance = Utterance::new(source.sample_rate());

        loop {
            let block = source.next_block().await?;
            let now = Instant::now();
            utterance.append(&block);

            if detector.observe(&block, now) == Endpoint::Complete {
                break;
            }
        }
        source.finish();

        tracing::debug!(
            samples = utterance.len(),
            duration_ms = utterance.duration_ms(),
            "utterance finalized"
        );

        transition(&mut self.state, self.events.as_ref(), SessionState::Processing);
        self.narrator.narrate("Processing");

        let wav = encode_wav(&utterance)?;

        // Best-effort: a failed capture attaches no image, never aborts
        let image = match self.evidence.capture().await {
            Ok(image) => image,
            Err(e) => {
                tracing::warn!(error = %e, "initial evidence capture failed");
                None
            }
        };

        let state = &mut self.state;
        let events = self.events.as_ref();
        let reply = self
            .exchange
            .run(&wav, image, &mut *self.evidence, || {
                transition(state, events, SessionState::AwaitingEvidence);
            })
            .await?;

        transition(&mut self.state, self.events.as_ref(), SessionState::Playing);
        tracing::debug!(bytes = reply.len(), "playing reply");

        self.playback.play(&reply).await?;

        Ok(())
    }
}

/// Set the state and post it to the event channel
fn transition(
    state: &mut SessionState,
    events: Option<&mpsc::UnboundedSender<SessionState>>,
    next: SessionState,
) {
    tracing::debug!(from = ?*state, to = ?next, "state transition");
    *state = next;
    if let Some(tx) = events {
        let _ = tx.send(next);
    }
}

/// User-facing notice for a failed session
fn notice_for(error: &Error) -> &'static str {
    match error {
        Error::Transport(_) => "Network error. Try again.",
        Error::Protocol(_) => "Error processing response",
        Error::Playback(_) => "Error playing response",
        Error::EvidenceUnavailable(_) => "Could not capture the requested image",
        Error::CaptureDevice(_) | Error::Io(_) => "Recording failed",
        Error::CapabilityDenied(_) => "Microphone required",
        _ => "Something went wrong. Try again.",
    }
}
