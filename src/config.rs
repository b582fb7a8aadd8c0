//! Configuration for the murmur client
//!
//! Layered resolution: environment variables override the optional TOML
//! config file (`~/.config/murmur/config.toml`), which overrides built-in
//! defaults. All file fields are optional — the file is a partial overlay.

use std::path::PathBuf;
use std::time::Duration;

use serde::Deserialize;

use crate::Result;

/// Client configuration
#[derive(Debug, Clone)]
pub struct Config {
    /// Exchange endpoint URL
    pub server_url: String,

    /// Voice capture configuration
    pub voice: VoiceConfig,

    /// Evidence (still image) capture configuration
    pub evidence: EvidenceConfig,

    /// HTTP timeout policy
    pub http: HttpConfig,
}

/// Voice capture configuration
#[derive(Debug, Clone)]
pub struct VoiceConfig {
    /// Peak amplitude above which a block counts as voice (i16 scale)
    pub silence_threshold: u16,

    /// Trailing silence that ends an utterance
    pub silence_timeout: Duration,

    /// Optional hard ceiling on utterance duration, measured from session
    /// start. Unset means silence-only cutoff.
    pub max_utterance: Option<Duration>,
}

impl Default for VoiceConfig {
    fn default() -> Self {
        Self {
            silence_threshold: 1500,
            silence_timeout: Duration::from_millis(2000),
            max_utterance: None,
        }
    }
}

/// Evidence capture configuration
#[derive(Debug, Clone, Default)]
pub struct EvidenceConfig {
    /// External command that writes a JPEG to the path given as its last
    /// argument (e.g. `fswebcam --no-banner`). None disables the camera.
    pub capture_command: Option<String>,
}

/// HTTP timeout policy for the exchange client
#[derive(Debug, Clone)]
pub struct HttpConfig {
    /// Connection establishment timeout
    pub connect_timeout: Duration,

    /// Full request/response timeout (covers write and read)
    pub read_timeout: Duration,
}

impl Default for HttpConfig {
    fn default() -> Self {
        Self {
            connect_timeout: Duration::from_secs(30),
            read_timeout: Duration::from_secs(60),
        }
    }
}

/// Top-level TOML configuration file schema
#[derive(Debug, Default, Deserialize)]
struct ConfigFile {
    #[serde(default)]
    server: ServerFileConfig,

    #[serde(default)]
    voice: VoiceFileConfig,

    #[serde(default)]
    evidence: EvidenceFileConfig,

    #[serde(default)]
    http: HttpFileConfig,
}

#[derive(Debug, Default, Deserialize)]
struct ServerFileConfig {
    /// Exchange endpoint URL
    url: Option<String>,
}

#[derive(Debug, Default, Deserialize)]
struct VoiceFileConfig {
    silence_threshold: Option<u16>,
    silence_timeout_ms: Option<u64>,
    max_utterance_ms: Option<u64>,
}

#[derive(Debug, Default, Deserialize)]
struct EvidenceFileConfig {
    capture_command: Option<String>,
}

#[derive(Debug, Default, Deserialize)]
struct HttpFileConfig {
    connect_timeout_secs: Option<u64>,
    read_timeout_secs: Option<u64>,
}

/// Default config file location: `~/.config/murmur/config.toml`
fn config_file_path() -> Option<PathBuf> {
    directories::BaseDirs::new().map(|d| d.config_dir().join("murmur").join("config.toml"))
}

/// Load the optional TOML overlay, returning defaults when absent or bad
fn load_config_file() -> ConfigFile {
    let Some(path) = config_file_path() else {
        return ConfigFile::default();
    };

    if !path.exists() {
        return ConfigFile::default();
    }

    match std::fs::read_to_string(&path) {
        Ok(content) => match toml::from_str(&content) {
            Ok(fc) => {
                tracing::debug!(path = %path.display(), "loaded config file");
                fc
            }
            Err(e) => {
                tracing::warn!(
                    path = %path.display(),
                    error = %e,
                    "failed to parse config file, using defaults"
                );
                ConfigFile::default()
            }
        },
        Err(e) => {
            tracing::warn!(path = %path.display(), error = %e, "failed to read config file");
            ConfigFile::default()
        }
    }
}

impl Config {
    /// Load configuration (env > toml > default)
    ///
    /// # Errors
    ///
    /// Returns error if an env override fails to parse
    pub fn load(server_url: Option<&str>) -> Result<Self> {
        let fc = load_config_file();

        let server_url = server_url
            .map(ToString::to_string)
            .or_else(|| std::env::var("MURMUR_SERVER_URL").ok())
            .or(fc.server.url)
            .unwrap_or_else(|| "http://localhost:8787/process".to_string());

        let silence_threshold = env_parsed("MURMUR_SILENCE_THRESHOLD")?
            .or(fc.voice.silence_threshold)
            .unwrap_or(VoiceConfig::default().silence_threshold);

        let silence_timeout = env_parsed("MURMUR_SILENCE_TIMEOUT_MS")?
            .or(fc.voice.silence_timeout_ms)
            .map_or(VoiceConfig::default().silence_timeout, Duration::from_millis);

        let max_utterance = env_parsed("MURMUR_MAX_UTTERANCE_MS")?
            .or(fc.voice.max_utterance_ms)
            .map(Duration::from_millis);

        let capture_command = std::env::var("MURMUR_CAPTURE_COMMAND")
            .ok()
            .or(fc.evidence.capture_command);

        let connect_timeout = env_parsed("MURMUR_CONNECT_TIMEOUT_SECS")?
            .or(fc.http.connect_timeout_secs)
            .map_or(HttpConfig::default().connect_timeout, Duration::from_secs);

        let read_timeout = env_parsed("MURMUR_READ_TIMEOUT_SECS")?
            .or(fc.http.read_timeout_secs)
            .map_or(HttpConfig::default().read_timeout, Duration::from_secs);

        Ok(Self {
            server_url,
            voice: VoiceConfig {
                silence_threshold,
                silence_timeout,
                max_utterance,
            },
            evidence: EvidenceConfig { capture_command },
            http: HttpConfig {
                connect_timeout,
                read_timeout,
            },
        })
    }
}

/// Read and parse an env var, erroring on malformed values instead of
/// silently falling through to the file layer
fn env_parsed<T: std::str::FromStr>(name: &str) -> Result<Option<T>> {
    match std::env::var(name) {
        Ok(raw) => raw
            .parse()
            .map(Some)
            .map_err(|_| crate::Error::Config(format!("invalid value for {name}: {raw}"))),
        Err(_) => Ok(None),
    }
}
