//! Microphone capture seam and the bounded recording session.

use std::time::Duration;

use async_trait::async_trait;
use thiserror::Error;
use tokio::{
    sync::oneshot,
    time::{self, Instant, MissedTickBehavior},
};
use tracing::{debug, info, warn};

pub const CHUNK_INTERVAL: Duration = Duration::from_millis(100);
pub const RECORDING_CEILING: Duration = Duration::from_millis(10_000);
pub const SUCCESS_NOTICE_DELAY: Duration = Duration::from_millis(1_000);
pub const DEFAULT_AUDIO_MIME: &str = "audio/webm";

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct CaptureConstraints {
    pub echo_cancellation: bool,
    pub noise_suppression: bool,
    pub sample_rate_hz: Option<u32>,
}

impl CaptureConstraints {
    /// Constraints used for every recording.
    pub const VOICE_COMMAND: Self = Self {
        echo_cancellation: true,
        noise_suppression: true,
        sample_rate_hz: Some(16_000),
    };

    /// Plain audio request used by the availability probe.
    pub const PROBE: Self = Self {
        echo_cancellation: false,
        noise_suppression: false,
        sample_rate_hz: None,
    };
}

#[derive(Debug, Clone, Error, PartialEq, Eq)]
pub enum CaptureError {
    #[error("permission denied")]
    PermissionDenied,
    #[error("no input device found")]
    NoDevice,
    #[error("capture not supported: {0}")]
    Unsupported(String),
    #[error("{0}")]
    Stream(String),
}

#[async_trait]
pub trait AudioCapture: Send + Sync {
    /// Acquires a new stream. Implementations must prompt or re-check
    /// permission on every call rather than reuse an earlier grant.
    async fn acquire(
        &self,
        constraints: CaptureConstraints,
    ) -> Result<Box<dyn CaptureStream>, CaptureError>;
}

#[async_trait]
pub trait CaptureStream: Send {
    /// Returns the audio accumulated since the previous call, if any.
    async fn read_chunk(&mut self) -> Result<Option<Vec<u8>>, CaptureError>;
    /// Releases the device. Called at most once per stream; dropping a
    /// stream that was never stopped must release the device too.
    fn stop(&mut self);
    fn mime_type(&self) -> String {
        DEFAULT_AUDIO_MIME.to_string()
    }
}

#[async_trait]
pub trait AudioPlayer: Send + Sync {
    async fn play(&self, audio_url: &str) -> anyhow::Result<()>;
}

pub struct SilentPlayer;

#[async_trait]
impl AudioPlayer for SilentPlayer {
    async fn play(&self, audio_url: &str) -> anyhow::Result<()> {
        debug!(audio_url, "playback disabled; skipping");
        Ok(())
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct VoiceTimings {
    pub chunk_interval: Duration,
    pub ceiling: Duration,
    pub success_notice_delay: Duration,
}

impl Default for VoiceTimings {
    fn default() -> Self {
        Self {
            chunk_interval: CHUNK_INTERVAL,
            ceiling: RECORDING_CEILING,
            success_notice_delay: SUCCESS_NOTICE_DELAY,
        }
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum StopReason {
    Manual,
    Watchdog,
}

#[derive(Debug)]
pub struct RecordingOutcome {
    pub chunks: Vec<Vec<u8>>,
    pub mime_type: String,
    pub elapsed: Duration,
    pub reason: StopReason,
    pub error: Option<CaptureError>,
}

impl RecordingOutcome {
    pub fn byte_len(&self) -> usize {
        self.chunks.iter().map(Vec::len).sum()
    }
}

/// Drains `stream` every chunk interval until a manual stop arrives on
/// `stop` or the ceiling elapses. The stream is stopped on every exit path.
pub async fn record_session(
    mut stream: Box<dyn CaptureStream>,
    mut stop: oneshot::Receiver<()>,
    timings: VoiceTimings,
) -> RecordingOutcome {
    let started = Instant::now();
    let deadline = started + timings.ceiling;
    let watchdog = time::sleep_until(deadline);
    tokio::pin!(watchdog);
    let mut ticker = time::interval(timings.chunk_interval);
    ticker.set_missed_tick_behavior(MissedTickBehavior::Delay);

    let mut chunks = Vec::new();
    let mut error = None;

    let reason = loop {
        tokio::select! {
            biased;
            // a dropped sender counts as a stop request
            _ = &mut stop => break StopReason::Manual,
            _ = &mut watchdog => {
                info!(ceiling_ms = timings.ceiling.as_millis() as u64, "recording ceiling reached; stopping");
                break StopReason::Watchdog;
            }
            _ = ticker.tick() => {
                match stream.read_chunk().await {
                    Ok(Some(chunk)) if !chunk.is_empty() => chunks.push(chunk),
                    Ok(_) => {}
                    Err(err) => {
                        warn!(error = %err, "capture stream failed during recording");
                        error = Some(err);
                        break StopReason::Manual;
                    }
                }
            }
        }
    };

    // the recorder flushes whatever is still buffered when it stops
    if error.is_none() {
        match stream.read_chunk().await {
            Ok(Some(chunk)) if !chunk.is_empty() => chunks.push(chunk),
            Ok(_) => {}
            Err(err) => warn!(error = %err, "final capture flush failed"),
        }
    }
    let mime_type = stream.mime_type();
    stream.stop();

    let elapsed = started.elapsed();
    debug!(
        chunks = chunks.len(),
        elapsed_ms = elapsed.as_millis() as u64,
        ?reason,
        "recording session finished"
    );

    RecordingOutcome {
        chunks,
        mime_type,
        elapsed,
        reason,
        error,
    }
}

#[cfg(test)]
#[path = "tests/voice_tests.rs"]
mod tests;
