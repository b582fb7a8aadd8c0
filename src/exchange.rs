//! Exchange protocol client
//!
//! One exchange is a multipart POST of the utterance container (plus an
//! optional evidence image) and the classification of whatever comes back:
//! either the service's audio reply, or a request for image evidence. An
//! evidence request triggers exactly one capture-and-resend; a second
//! request in a row fails the exchange rather than looping.

use reqwest::multipart::{Form, Part};
use reqwest::Client;

use crate::config::HttpConfig;
use crate::evidence::EvidenceSource;
use crate::{Error, Result};

/// Marker token the service puts in a JSON body to request an image
const NEED_IMAGE_TOKEN: &str = "need_image";

/// A classified service response, decided once at the protocol boundary
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum ExchangeReply {
    /// Service wants a retry with an image attached
    EvidenceRequest,
    /// Opaque decodable audio bytes
    AudioReply(Vec<u8>),
}

/// Client for the exchange endpoint
pub struct ExchangeClient {
    client: Client,
    url: String,
}

impl ExchangeClient {
    /// Create a client with the configured timeout policy
    ///
    /// # Errors
    ///
    /// Returns error if the HTTP client cannot be constructed
    pub fn new(url: impl Into<String>, http: &HttpConfig) -> Result<Self> {
        let client = Client::builder()
            .connect_timeout(http.connect_timeout)
            .timeout(http.read_timeout)
            .build()?;

        Ok(Self {
            client,
            url: url.into(),
        })
    }

    /// Issue one physical round-trip
    ///
    /// # Errors
    ///
    /// `Transport` when no response was received, `Protocol` when the
    /// response body could not be read
    pub async fn send(&self, audio: &[u8], image: Option<&[u8]>) -> Result<ExchangeReply> {
        let mut form = Form::new().part(
            "audio",
            Part::bytes(audio.to_vec())
                .file_name("speech.wav")
                .mime_str("audio/wav")
                .map_err(|e| Error::Protocol(format!("invalid audio part: {e}")))?,
        );

        if let Some(image) = image {
            form = form.part(
                "image",
                Part::bytes(image.to_vec())
                    .file_name("vision.jpg")
                    .mime_str("image/jpeg")
                    .map_err(|e| Error::Protocol(format!("invalid image part: {e}")))?,
            );
        }

        tracing::debug!(
            audio_bytes = audio.len(),
            has_image = image.is_some(),
            url = %self.url,
            "sending exchange request"
        );

        let response = self
            .client
            .post(&self.url)
            .multipart(form)
            .send()
            .await
            .map_err(|e| Error::Transport(e.to_string()))?;

        let content_type = response
            .headers()
            .get(reqwest::header::CONTENT_TYPE)
            .and_then(|v| v.to_str().ok())
            .unwrap_or_default()
            .to_string();

        let body = response
            .bytes()
            .await
            .map_err(|e| Error::Protocol(format!("failed to read response body: {e}")))?;

        Ok(classify_reply(&content_type, &body))
    }

    /// Run a full exchange: initial request plus at most one evidence
    /// retry
    ///
    /// `on_evidence_request` fires when the service asks for an image,
    /// before the capture attempt, so the caller can surface the state.
    ///
    /// # Errors
    ///
    /// `Transport`/`Protocol` per round-trip, `EvidenceUnavailable` when
    /// the retry needs an image and none can be captured, `Protocol` when
    /// the service requests evidence again after receiving it
    pub async fn run<E>(
        &self,
        audio: &[u8],
        mut image: Option<Vec<u8>>,
        evidence: &mut E,
        mut on_evidence_request: impl FnMut(),
    ) -> Result<Vec<u8>>
    where
        E: EvidenceSource + ?Sized,
    {
        let mut retried = false;

        loop {
            match self.send(audio, image.as_deref()).await? {
                ExchangeReply::AudioReply(bytes) => return Ok(bytes),
                ExchangeReply::EvidenceRequest if retried => {
                    return Err(Error::Protocol(
                        "service requested evidence again after a retry".to_string(),
                    ));
                }
                ExchangeReply::EvidenceRequest => {
                    retried = true;
                    tracing::info!("service requested image evidence");
                    on_evidence_request();

                    image = Some(evidence.capture().await?.ok_or_else(|| {
                        Error::EvidenceUnavailable(
                            "no image available for evidence retry".to_string(),
                        )
                    })?);
                }
            }
        }
    }
}

/// Classify a response by its declared content type and body
///
/// A structured (JSON) body containing the `need_image` token is an
/// evidence request regardless of further structure; everything else is
/// treated as opaque audio.
fn classify_reply(content_type: &str, body: &[u8]) -> ExchangeReply {
    if content_type.contains("application/json") {
        if let Ok(text) = std::str::from_utf8(body) {
            if text.contains(NEED_IMAGE_TOKEN) {
                return ExchangeReply::EvidenceRequest;
            }
        }
    }

    ExchangeReply::AudioReply(body.to_vec())
}
