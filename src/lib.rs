//! Murmur - hands-free voice interaction client
//!
//! Captures a spoken utterance, detects the end of speech by trailing
//! silence, uploads it as a WAV container (optionally with a still image)
//! to a remote inference service, and plays back the audio reply.
//!
//! # Architecture
//!
//! ```text
//! ┌──────────────────────────────────────────────────────┐
//! │                     Trigger (CLI)                    │
//! └──────────────────────────┬───────────────────────────┘
//!                            │
//! ┌──────────────────────────▼───────────────────────────┐
//! │                  SessionController                   │
//! │  Listening │ Processing │ AwaitingEvidence │ Playing │
//! └──────┬───────────┬───────────────┬──────────────┬────┘
//!        │           │               │              │
//!    SampleSource  WAV encode   ExchangeClient   ReplySink
//!    + endpoint                 (+ EvidenceSource)
//! ```

pub mod audio;
pub mod config;
pub mod error;
pub mod evidence;
pub mod exchange;
pub mod notify;
pub mod session;

pub use audio::{
    encode_wav, Endpoint, EndpointDetector, MicSource, ReplySink, SampleBlock, SampleSource,
    SpeakerPlayback, Utterance, SAMPLE_RATE,
};
pub use config::{Config, EvidenceConfig, HttpConfig, VoiceConfig};
pub use error::{Error, Result};
pub use evidence::{CameraCommand, EvidenceSource, NullEvidence};
pub use exchange::{ExchangeClient, ExchangeReply};
pub use notify::{LogNarrator, Narrator};
pub use session::{SessionController, SessionState};
