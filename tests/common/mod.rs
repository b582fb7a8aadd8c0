//! Shared test utilities: a local exchange server and pipeline doubles
#![allow(dead_code)]

use std::collections::VecDeque;
use std::sync::{Arc, Mutex};
use std::time::Duration;

use async_trait::async_trait;
use axum::body::Bytes;
use axum::extract::State;
use axum::http::header;
use axum::response::{IntoResponse, Response};
use axum::routing::post;
use axum::Router;

use murmur::{EvidenceSource, Narrator, ReplySink, Result, SampleBlock, SampleSource};

/// Canned reply the mock service returns for one request
#[derive(Clone)]
pub enum CannedReply {
    /// JSON body containing the `need_image` marker
    NeedImage,
    /// Opaque audio bytes
    Audio(Vec<u8>),
}

/// What the mock service observed about one request
#[derive(Clone, Debug)]
pub struct RecordedRequest {
    pub had_audio: bool,
    pub had_image: bool,
    pub wav_payload: bool,
}

#[derive(Clone)]
struct ServerState {
    script: Arc<Mutex<VecDeque<CannedReply>>>,
    requests: Arc<Mutex<Vec<RecordedRequest>>>,
}

/// Handle to a running mock exchange server
pub struct MockServer {
    pub url: String,
    requests: Arc<Mutex<Vec<RecordedRequest>>>,
}

impl MockServer {
    /// Spawn a mock server that replies according to `script`, repeating
    /// the last entry once the script is exhausted
    pub async fn spawn(script: Vec<CannedReply>) -> Self {
        let requests = Arc::new(Mutex::new(Vec::new()));
        let state = ServerState {
            script: Arc::new(Mutex::new(script.into_iter().collect())),
            requests: Arc::clone(&requests),
        };

        let app = Router::new()
            .route("/process", post(handle_exchange))
            .with_state(state);

        let listener = tokio::net::TcpListener::bind("127.0.0.1:0")
            .await
            .expect("bind mock server");
        let addr = listener.local_addr().expect("mock server addr");

        tokio::spawn(async move {
            axum::serve(listener, app).await.expect("mock server");
        });

        Self {
            url: format!("http://{addr}/process"),
            requests,
        }
    }

    /// Requests observed so far
    pub fn requests(&self) -> Vec<RecordedRequest> {
        self.requests.lock().unwrap().clone()
    }

    /// Number of requests observed so far
    pub fn hits(&self) -> usize {
        self.requests.lock().unwrap().len()
    }
}

async fn handle_exchange(State(state): State<ServerState>, body: Bytes) -> Response {
    state.requests.lock().unwrap().push(RecordedRequest {
        had_audio: contains(&body, b"name=\"audio\""),
        had_image: contains(&body, b"name=\"image\""),
        wav_payload: contains(&body, b"RIFF"),
    });

    let reply = {
        let mut script = state.script.lock().unwrap();
        if script.len() > 1 {
            script.pop_front()
        } else {
            script.front().cloned()
        }
    };

    match reply {
        Some(CannedReply::NeedImage) => (
            [(header::CONTENT_TYPE, "application/json")],
            r#"{"status":"need_image"}"#,
        )
            .into_response(),
        Some(CannedReply::Audio(bytes)) => {
            ([(header::CONTENT_TYPE, "audio/mpeg")], bytes).into_response()
        }
        None => ([(header::CONTENT_TYPE, "audio/mpeg")], Vec::new()).into_response(),
    }
}

/// Naive subslice search (multipart bodies are small in tests)
fn contains(haystack: &[u8], needle: &[u8]) -> bool {
    haystack.windows(needle.len()).any(|w| w == needle)
}

/// Sample source that replays scripted blocks, then endless silence
pub struct ScriptedSource {
    blocks: VecDeque<SampleBlock>,
}

impl ScriptedSource {
    pub fn new(blocks: Vec<SampleBlock>) -> Self {
        Self {
            blocks: blocks.into_iter().collect(),
        }
    }

    /// A source that speaks briefly, then falls silent
    pub fn speech_then_silence() -> Self {
        Self::new(vec![voice_block(), voice_block()])
    }

    /// A source that never crosses the voice threshold
    pub fn silent_room() -> Self {
        Self::new(Vec::new())
    }
}

/// 10ms of loud samples
pub fn voice_block() -> SampleBlock {
    vec![3000; 160]
}

/// 10ms of silence
pub fn silence_block() -> SampleBlock {
    vec![0; 160]
}

#[async_trait(?Send)]
impl SampleSource for ScriptedSource {
    async fn next_block(&mut self) -> Result<SampleBlock> {
        // Real time advances between blocks so the trailing-silence
        // deadline can pass
        tokio::time::sleep(Duration::from_millis(5)).await;
        Ok(self.blocks.pop_front().unwrap_or_else(silence_block))
    }
}

/// Evidence source with a fixed number of images to give out
pub struct ScriptedEvidence {
    images: Arc<Mutex<VecDeque<Option<Vec<u8>>>>>,
    captures: Arc<Mutex<usize>>,
}

impl ScriptedEvidence {
    pub fn new(images: Vec<Option<Vec<u8>>>) -> (Self, Arc<Mutex<usize>>) {
        let captures = Arc::new(Mutex::new(0));
        (
            Self {
                images: Arc::new(Mutex::new(images.into_iter().collect())),
                captures: Arc::clone(&captures),
            },
            captures,
        )
    }

    /// Always produces the same JPEG-ish bytes
    pub fn always() -> (Self, Arc<Mutex<usize>>) {
        Self::new(vec![Some(jpeg_bytes()); 4])
    }

    /// Never produces an image
    pub fn never() -> (Self, Arc<Mutex<usize>>) {
        Self::new(Vec::new())
    }
}

pub fn jpeg_bytes() -> Vec<u8> {
    vec![0xFF, 0xD8, 0xFF, 0xE0, 0x00, 0x10]
}

#[async_trait]
impl EvidenceSource for ScriptedEvidence {
    async fn capture(&mut self) -> Result<Option<Vec<u8>>> {
        *self.captures.lock().unwrap() += 1;
        Ok(self.images.lock().unwrap().pop_front().flatten())
    }
}

/// Reply sink that records what it was asked to play
pub struct SpyPlayback {
    played: Arc<Mutex<Vec<Vec<u8>>>>,
}

impl SpyPlayback {
    pub fn new() -> (Self, Arc<Mutex<Vec<Vec<u8>>>>) {
        let played = Arc::new(Mutex::new(Vec::new()));
        (
            Self {
                played: Arc::clone(&played),
            },
            played,
        )
    }
}

#[async_trait(?Send)]
impl ReplySink for SpyPlayback {
    async fn play(&mut self, reply: &[u8]) -> Result<()> {
        self.played.lock().unwrap().push(reply.to_vec());
        Ok(())
    }
}

/// Narrator that records every notice
pub struct SpyNarrator {
    notices: Arc<Mutex<Vec<String>>>,
}

impl SpyNarrator {
    pub fn new() -> (Self, Arc<Mutex<Vec<String>>>) {
        let notices = Arc::new(Mutex::new(Vec::new()));
        (
            Self {
                notices: Arc::clone(&notices),
            },
            notices,
        )
    }
}

impl Narrator for SpyNarrator {
    fn narrate(&self, text: &str) {
        self.notices.lock().unwrap().push(text.to_string());
    }
}
