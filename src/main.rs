use std::process::ExitCode;
use std::time::Duration;

use clap::{Parser, Subcommand};
use tokio::io::AsyncBufReadExt;
use tokio::sync::mpsc;
use tracing_subscriber::EnvFilter;

use murmur::{
    CameraCommand, Config, EvidenceSource, ExchangeClient, LogNarrator, MicSource, Narrator,
    NullEvidence, SessionController, SpeakerPlayback,
};

/// Murmur - hands-free voice interaction client
#[derive(Parser)]
#[command(name = "murmur", version, about)]
struct Cli {
    /// Exchange endpoint URL
    #[arg(short, long, env = "MURMUR_SERVER_URL")]
    server: Option<String>,

    /// Increase verbosity (-v, -vv, -vvv)
    #[arg(short, long, action = clap::ArgAction::Count)]
    verbose: u8,

    #[command(subcommand)]
    command: Option<Command>,
}

#[derive(Subcommand)]
enum Command {
    /// Test microphone input
    TestMic {
        /// Duration in seconds
        #[arg(short, long, default_value = "5")]
        duration: u64,
    },
    /// Test speaker output
    TestSpeaker,
}

#[tokio::main]
async fn main() -> ExitCode {
    let cli = Cli::parse();

    // Set up logging based on verbosity
    let filter = match cli.verbose {
        0 => "info,murmur=info",
        1 => "info,murmur=debug",
        2 => "debug",
        _ => "trace",
    };

    tracing_subscriber::fmt()
        .with_env_filter(EnvFilter::new(filter))
        .init();

    match run(cli).await {
        Ok(()) => ExitCode::SUCCESS,
        Err(e) => {
            tracing::error!("fatal: {e}");
            ExitCode::FAILURE
        }
    }
}

#[allow(clippy::future_not_send)]
async fn run(cli: Cli) -> anyhow::Result<()> {
    if let Some(cmd) = cli.command {
        return match cmd {
            Command::TestMic { duration } => test_mic(duration).await,
            Command::TestSpeaker => test_speaker(),
        };
    }

    let config = Config::load(cli.server.as_deref())?;
    tracing::info!(server = %config.server_url, "starting murmur");

    let narrator = LogNarrator;

    // Microphone capability: a missing device downgrades to a notice on
    // trigger rather than a startup failure
    let source: Option<Box<dyn murmur::SampleSource>> = match MicSource::new() {
        Ok(mic) => Some(Box::new(mic)),
        Err(e) => {
            tracing::warn!(error = %e, "microphone unavailable");
            narrator.narrate("Microphone required");
            None
        }
    };

    // Camera capability: optional, downgrades to no-image requests
    let evidence: Box<dyn EvidenceSource> = match &config.evidence.capture_command {
        Some(cmd) => match CameraCommand::parse(cmd) {
            Some(cam) => Box::new(cam),
            None => {
                tracing::warn!("empty capture command, camera disabled");
                Box::new(NullEvidence)
            }
        },
        None => Box::new(NullEvidence),
    };

    let playback = SpeakerPlayback::new()?;
    let exchange = ExchangeClient::new(config.server_url.clone(), &config.http)?;

    let controller = SessionController::new(
        config.voice.clone(),
        exchange,
        source,
        evidence,
        Box::new(playback),
        Box::new(narrator),
    );

    // Map Enter keypresses on stdin to session triggers
    let (trigger_tx, trigger_rx) = mpsc::channel(1);
    tokio::spawn(async move {
        let mut lines = tokio::io::BufReader::new(tokio::io::stdin()).lines();
        while let Ok(Some(_)) = lines.next_line().await {
            if trigger_tx.send(()).await.is_err() {
                break;
            }
        }
    });

    println!("Press Enter to speak (Ctrl-D to quit).");
    controller.run(trigger_rx).await;

    Ok(())
}

/// Test microphone input
#[allow(clippy::future_not_send)]
async fn test_mic(duration: u64) -> anyhow::Result<()> {
    println!("Testing microphone for {duration} seconds...");
    println!("Speak into your microphone!\n");

    let mut capture = MicSource::new()?;
    capture.start()?;

    println!("Sample rate: {} Hz", murmur::SAMPLE_RATE);
    println!("---");

    for i in 0..duration {
        tokio::time::sleep(Duration::from_secs(1)).await;

        let samples = capture.peek_buffer();
        let peak = samples.iter().map(|s| s.unsigned_abs()).max().unwrap_or(0);
        let rms = calculate_rms(&samples);

        // Visual meter
        #[allow(clippy::cast_possible_truncation, clippy::cast_sign_loss)]
        let meter_len = ((rms / 32768.0) * 400.0).min(50.0) as usize;
        let meter: String = "█".repeat(meter_len) + &" ".repeat(50 - meter_len);

        println!("[{:2}s] RMS: {:7.1} | Peak: {:5} | [{}]", i + 1, rms, peak, meter);

        // Clear buffer each second
        capture.clear_buffer();
    }

    capture.stop();

    println!("\n---");
    println!("If you saw movement in the meter, your mic is working.");
    println!("A peak above 1500 counts as voice for endpoint detection.");

    Ok(())
}

/// Calculate RMS energy over i16 samples
#[allow(clippy::cast_precision_loss)]
fn calculate_rms(samples: &[i16]) -> f32 {
    if samples.is_empty() {
        return 0.0;
    }
    let sum_squares: f32 = samples.iter().map(|&s| f32::from(s) * f32::from(s)).sum();
    (sum_squares / samples.len() as f32).sqrt()
}

/// Test speaker output with a sine wave
fn test_speaker() -> anyhow::Result<()> {
    println!("Testing speaker output...");
    println!("You should hear a 440Hz tone for 2 seconds\n");

    let playback = SpeakerPlayback::new()?;

    // 2 seconds of 440Hz sine at the playback sample rate
    let sample_rate = 24000_f32;
    let frequency = 440.0_f32;
    #[allow(clippy::cast_possible_truncation, clippy::cast_sign_loss)]
    let num_samples = (sample_rate * 2.0) as usize;

    #[allow(clippy::cast_precision_loss)]
    let samples: Vec<f32> = (0..num_samples)
        .map(|i| {
            let t = i as f32 / sample_rate;
            (2.0 * std::f32::consts::PI * frequency * t).sin() * 0.3
        })
        .collect();

    playback.play_samples(samples)?;

    println!("\n---");
    println!("If you heard the tone, your speakers are working.");

    Ok(())
}
