//! Audio pipeline: capture, endpoint detection, container encoding, playback

mod capture;
mod endpoint;
mod playback;
mod wav;

pub use capture::{MicSource, SampleBlock, SampleSource, POLL_INTERVAL, SAMPLE_RATE};
pub use endpoint::{Endpoint, EndpointDetector};
pub use playback::{ReplySink, SpeakerPlayback};
pub use wav::{encode_wav, Utterance};
