//! WAV container encoding
//!
//! Wraps a finalized utterance in a standard uncompressed linear-PCM
//! container: 44-byte header with little-endian size fields, then raw
//! sample bytes.

use crate::{Error, Result};

/// Bit depth of utterance samples
const BITS_PER_SAMPLE: u16 = 16;

/// A finalized utterance: every sample captured during one Listening phase
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Utterance {
    samples: Vec<i16>,
    sample_rate: u32,
}

impl Utterance {
    /// Create an empty utterance at the given sample rate
    #[must_use]
    pub const fn new(sample_rate: u32) -> Self {
        Self {
            samples: Vec::new(),
            sample_rate,
        }
    }

    /// Append a captured block
    pub fn append(&mut self, block: &[i16]) {
        self.samples.extend_from_slice(block);
    }

    /// The captured samples
    #[must_use]
    pub fn samples(&self) -> &[i16] {
        &self.samples
    }

    /// Sample rate in Hz
    #[must_use]
    pub const fn sample_rate(&self) -> u32 {
        self.sample_rate
    }

    /// Number of captured samples
    #[must_use]
    pub fn len(&self) -> usize {
        self.samples.len()
    }

    /// True when no samples were captured
    #[must_use]
    pub fn is_empty(&self) -> bool {
        self.samples.is_empty()
    }

    /// Capture duration in milliseconds
    #[must_use]
    #[allow(clippy::cast_possible_truncation)]
    pub fn duration_ms(&self) -> u64 {
        (self.samples.len() as u64 * 1000) / u64::from(self.sample_rate)
    }
}

/// Encode an utterance as WAV bytes (mono, 16-bit PCM)
///
/// Deterministic; any utterance encodes, including an empty one.
///
/// # Errors
///
/// Returns error only if the in-memory writer fails, which does not
/// happen for well-formed specs
pub fn encode_wav(utterance: &Utterance) -> Result<Vec<u8>> {
    let spec = hound::WavSpec {
        channels: 1,
        sample_rate: utterance.sample_rate(),
        bits_per_sample: BITS_PER_SAMPLE,
        sample_format: hound::SampleFormat::Int,
    };

    let mut cursor = std::io::Cursor::new(Vec::new());
    {
        let mut writer = hound::WavWriter::new(&mut cursor, spec)
            .map_err(|e| Error::Encode(e.to_string()))?;

        for &sample in utterance.samples() {
            writer
                .write_sample(sample)
                .map_err(|e| Error::Encode(e.to_string()))?;
        }

        writer.finalize().map_err(|e| Error::Encode(e.to_string()))?;
    }

    Ok(cursor.into_inner())
}
