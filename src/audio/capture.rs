//! Audio capture from microphone

use std::sync::{Arc, Mutex};
use std::time::Duration;

use async_trait::async_trait;
use cpal::traits::{DeviceTrait, HostTrait, StreamTrait};
use cpal::{Device, SampleRate, Stream, StreamConfig};

use crate::{Error, Result};

/// Sample rate for audio capture (16kHz for speech)
pub const SAMPLE_RATE: u32 = 16000;

/// Interval between buffer polls while listening
pub const POLL_INTERVAL: Duration = Duration::from_millis(100);

/// One block of signed 16-bit mono samples
pub type SampleBlock = Vec<i16>;

/// Source of raw sample blocks
///
/// Implementations yield a potentially infinite sequence of blocks; the
/// caller decides when to stop reading (endpoint detection).
///
/// `?Send` because cpal streams are not `Send`; the session loop runs on
/// the main task (same constraint the capture hardware imposes anyway).
#[async_trait(?Send)]
pub trait SampleSource {
    /// Read the next block of samples, blocking (asynchronously) until
    /// some are available
    async fn next_block(&mut self) -> Result<SampleBlock>;

    /// Sample rate of the produced blocks
    fn sample_rate(&self) -> u32 {
        SAMPLE_RATE
    }

    /// Called when the utterance is complete; releases capture resources
    /// so the next session starts from a clean buffer
    fn finish(&mut self) {}
}

/// Captures audio from the default input device
pub struct MicSource {
    device: Device,
    config: StreamConfig,
    buffer: Arc<Mutex<Vec<i16>>>,
    stream: Option<Stream>,
}

impl MicSource {
    /// Create a new microphone source
    ///
    /// # Errors
    ///
    /// Returns error if no input device supports 16kHz mono i16
    pub fn new() -> Result<Self> {
        let host = cpal::default_host();

        let device = host
            .default_input_device()
            .ok_or_else(|| Error::CapabilityDenied("no input device available".to_string()))?;

        let supported_config = device
            .supported_input_configs()
            .map_err(|e| Error::CaptureDevice(e.to_string()))?
            .find(|c| {
                c.channels() == 1
                    && c.sample_format() == cpal::SampleFormat::I16
                    && c.min_sample_rate() <= SampleRate(SAMPLE_RATE)
                    && c.max_sample_rate() >= SampleRate(SAMPLE_RATE)
            })
            .ok_or_else(|| Error::CaptureDevice("no suitable audio config found".to_string()))?;

        let config = supported_config
            .with_sample_rate(SampleRate(SAMPLE_RATE))
            .config();

        tracing::debug!(
            device = device.name().unwrap_or_default(),
            sample_rate = SAMPLE_RATE,
            channels = config.channels,
            "audio capture initialized"
        );

        Ok(Self {
            device,
            config,
            buffer: Arc::new(Mutex::new(Vec::new())),
            stream: None,
        })
    }

    /// Start the input stream
    ///
    /// # Errors
    ///
    /// Returns error if the stream cannot be built or started
    pub fn start(&mut self) -> Result<()> {
        if self.stream.is_some() {
            return Ok(());
        }

        let buffer = Arc::clone(&self.buffer);

        let stream = self
            .device
            .build_input_stream(
                &self.config,
                move |data: &[i16], _: &cpal::InputCallbackInfo| {
                    if let Ok(mut buf) = buffer.lock() {
                        buf.extend_from_slice(data);
                    }
                },
                |err| {
                    tracing::error!(error = %err, "audio capture error");
                },
                None,
            )
            .map_err(|e| Error::CaptureDevice(e.to_string()))?;

        stream.play().map_err(|e| Error::CaptureDevice(e.to_string()))?;
        self.stream = Some(stream);

        tracing::debug!("audio capture started");
        Ok(())
    }

    /// Stop the input stream
    pub fn stop(&mut self) {
        if let Some(stream) = self.stream.take() {
            drop(stream);
            tracing::debug!("audio capture stopped");
        }
    }

    /// Take the captured samples accumulated since the last call
    #[must_use]
    pub fn take_buffer(&self) -> Vec<i16> {
        self.buffer
            .lock()
            .map(|mut buf| std::mem::take(&mut *buf))
            .unwrap_or_default()
    }

    /// Captured samples without clearing (diagnostics)
    #[must_use]
    pub fn peek_buffer(&self) -> Vec<i16> {
        self.buffer
            .lock()
            .map(|buf| buf.clone())
            .unwrap_or_default()
    }

    /// Clear the capture buffer
    pub fn clear_buffer(&self) {
        if let Ok(mut buf) = self.buffer.lock() {
            buf.clear();
        }
    }

    /// Check if currently capturing
    #[must_use]
    pub const fn is_capturing(&self) -> bool {
        self.stream.is_some()
    }
}

#[async_trait(?Send)]
impl SampleSource for MicSource {
    async fn next_block(&mut self) -> Result<SampleBlock> {
        if !self.is_capturing() {
            // Discard anything buffered since the last session
            self.clear_buffer();
            self.start()?;
        }

        loop {
            tokio::time::sleep(POLL_INTERVAL).await;
            let block = self.take_buffer();
            if !block.is_empty() {
                return Ok(block);
            }
        }
    }

    fn finish(&mut self) {
        self.stop();
        self.clear_buffer();
    }
}
