//! Collaborator seams for sensors and actuators.
//!
//! Camera, geolocation, speech and siren are external collaborators. Each is
//! an injected capability handle so tests can substitute doubles and the
//! engine never reaches for a process-wide singleton.

use crate::error::{GuardianError, Result};
use crate::types::{GeoFix, ImageFrame};
use async_trait::async_trait;

/// Single-frame camera capture.
#[async_trait]
pub trait FrameSource: Send + Sync {
    /// Capture one frame. Failure is tolerated by callers, which proceed
    /// without an image.
    async fn capture(&self) -> Result<ImageFrame>;
}

/// Geolocation provider.
#[async_trait]
pub trait LocationProvider: Send + Sync {
    /// Acquire a fix. Callers bound this with a timeout and proceed with
    /// null coordinates on failure.
    async fn locate(&self) -> Result<GeoFix>;
}

/// Speech output with cancel-and-replace semantics: a new utterance
/// interrupts any in-progress one.
#[async_trait]
pub trait SpeechSink: Send + Sync {
    async fn speak(&self, text: &str);
    /// Silence any in-progress utterance.
    async fn cancel(&self);
}

/// Emergency siren.
#[async_trait]
pub trait SirenSink: Send + Sync {
    async fn start(&self);
    async fn stop(&self);
}

/// Frame source for headless deployments without a camera.
#[derive(Debug, Default)]
pub struct NoFrameSource;

#[async_trait]
impl FrameSource for NoFrameSource {
    async fn capture(&self) -> Result<ImageFrame> {
        Err(GuardianError::SensorUnavailable("no camera attached".into()))
    }
}

/// Location provider for deployments without a geolocation source.
#[derive(Debug, Default)]
pub struct NoLocationProvider;

#[async_trait]
impl LocationProvider for NoLocationProvider {
    async fn locate(&self) -> Result<GeoFix> {
        Err(GuardianError::SensorUnavailable(
            "no geolocation source".into(),
        ))
    }
}

/// Speech sink that logs utterances instead of synthesizing audio.
#[derive(Debug, Default)]
pub struct LoggingSpeechSink;

#[async_trait]
impl SpeechSink for LoggingSpeechSink {
    async fn speak(&self, text: &str) {
        tracing::info!(utterance = text, "speak");
    }

    async fn cancel(&self) {
        tracing::debug!("speech cancelled");
    }
}

/// Siren sink that logs instead of producing audio.
#[derive(Debug, Default)]
pub struct LoggingSirenSink;

#[async_trait]
impl SirenSink for LoggingSirenSink {
    async fn start(&self) {
        tracing::warn!("siren started");
    }

    async fn stop(&self) {
        tracing::info!("siren stopped");
    }
}
