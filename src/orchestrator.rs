//! Analysis orchestration.
//!
//! `run_analysis` is the entry point invoked on every user or voice query:
//! it gathers best-effort sensor data, calls the reasoning gateway, feeds
//! the validated result into the state machine and dispatches the side
//! effects. At most one analysis runs at a time; the in-flight latch is
//! acquired before the first suspension point and released on every exit
//! path by a drop guard.

use crate::config::GuardianConfig;
use crate::error::Result;
use crate::gateway::ReasoningGateway;
use crate::sensors::{FrameSource, LocationProvider, SirenSink, SpeechSink};
use crate::state::{CRITICAL_RISK, SafetyStateMachine, SystemState};
use crate::types::{
    AnalysisRequest, AnalysisResult, EmergencyContact, EmergencyContext, GeoFix, LogEntry,
    Provenance,
};
use crate::validator;
use crate::{alert::EmergencyNotifier, sensors};
use std::sync::atomic::{AtomicBool, Ordering};
use std::sync::{Arc, Mutex, MutexGuard, PoisonError};
use std::time::Duration;

/// Lockdown announcement spoken and logged exactly once on entry.
const LOCKDOWN_ANNOUNCEMENT: &str =
    "Emergency Lockdown activated. Sharing live location and alerting emergency contacts.";

/// Injected sensor and actuator handles.
pub struct GuardianSinks {
    pub frames: Arc<dyn FrameSource>,
    pub location: Arc<dyn LocationProvider>,
    pub speech: Arc<dyn SpeechSink>,
    pub siren: Arc<dyn SirenSink>,
    pub notifier: Arc<dyn EmergencyNotifier>,
}

impl GuardianSinks {
    /// Headless wiring: no camera or geolocation, log-only speech, siren
    /// and SMS simulation.
    pub fn headless() -> Self {
        Self {
            frames: Arc::new(sensors::NoFrameSource),
            location: Arc::new(sensors::NoLocationProvider),
            speech: Arc::new(sensors::LoggingSpeechSink),
            siren: Arc::new(sensors::LoggingSirenSink),
            notifier: Arc::new(crate::alert::SimulatedSmsNotifier),
        }
    }
}

/// The safety-analysis orchestrator.
///
/// Owns the state machine and the append-only transcript; both are mutated
/// only through this type.
pub struct GuardianOrchestrator {
    gateway: Arc<ReasoningGateway>,
    sinks: GuardianSinks,
    machine: Mutex<SafetyStateMachine>,
    transcript: Mutex<Vec<LogEntry>>,
    pending_alert: Mutex<Option<AnalysisResult>>,
    in_flight: AtomicBool,
    location_timeout: Duration,
}

/// Clears the in-flight latch on every exit path, including panics in
/// side-effect dispatch.
struct InFlightGuard<'a>(&'a AtomicBool);

impl Drop for InFlightGuard<'_> {
    fn drop(&mut self) {
        self.0.store(false, Ordering::Release);
    }
}

impl GuardianOrchestrator {
    pub fn new(gateway: Arc<ReasoningGateway>, sinks: GuardianSinks, config: &GuardianConfig) -> Self {
        let contact = EmergencyContact {
            name: config.emergency.contact_name.clone(),
            phone: config.emergency.contact_phone.clone(),
        };
        Self {
            gateway,
            sinks,
            machine: Mutex::new(SafetyStateMachine::new(contact)),
            transcript: Mutex::new(Vec::new()),
            pending_alert: Mutex::new(None),
            in_flight: AtomicBool::new(false),
            location_timeout: Duration::from_millis(config.sensors.location_timeout_ms),
        }
    }

    /// Run one safety analysis for the given query.
    ///
    /// A call while another analysis is in flight is a no-op. Sensor
    /// failures degrade the request but never abort it; gateway and
    /// validation failures leave the system state unchanged.
    pub async fn run_analysis(&self, query_text: &str) {
        let query = query_text.trim();
        if query.is_empty() {
            self.log(LogEntry::system("Query too short for analysis."));
            return;
        }

        // Latch set synchronously, before the first suspension point.
        if self
            .in_flight
            .compare_exchange(false, true, Ordering::AcqRel, Ordering::Acquire)
            .is_err()
        {
            tracing::debug!("analysis already in flight; ignoring query");
            return;
        }
        let _guard = InFlightGuard(&self.in_flight);

        self.log(LogEntry::user(query));
        self.log(LogEntry::system("Analyzing environment..."));

        let image = match self.sinks.frames.capture().await {
            Ok(frame) => Some(frame),
            Err(err) => {
                tracing::warn!(error = %err, "frame capture failed; continuing without image");
                None
            }
        };
        let fix = self.best_effort_fix().await;
        let request = AnalysisRequest::new(query, image, fix);

        let outcome = match self.gateway.analyze(&request).await {
            Ok(reply) => validator::validate(&reply.text).map(|result| (result, reply.provenance)),
            Err(err) => Err(err),
        };

        match outcome {
            Ok((result, provenance)) => self.apply_result(result, provenance).await,
            Err(err) => {
                tracing::error!(error = %err, "safety analysis failed");
                let message = err.user_message();
                self.log(LogEntry::system(message));
                self.sinks.speech.speak(message).await;
            }
        }
    }

    /// Manual emergency trigger. Idempotent while already in lockdown.
    ///
    /// Entering lockdown announces once, starts the siren, captures a
    /// best-effort location and notifies the emergency contact.
    pub async fn trigger_emergency(&self) {
        self.trigger_emergency_at(None).await;
    }

    /// Manual emergency trigger with a caller-supplied location, skipping
    /// the sensor fetch when a fix is already known.
    pub async fn trigger_emergency_at(&self, known_fix: Option<GeoFix>) {
        let entered = self.machine().enter_lockdown().is_some();
        if !entered {
            tracing::debug!("emergency trigger ignored; already in lockdown");
            return;
        }

        self.log(LogEntry::assistant(LOCKDOWN_ANNOUNCEMENT));
        self.sinks.speech.speak(LOCKDOWN_ANNOUNCEMENT).await;
        self.sinks.siren.start().await;

        // Best-effort fix; the alert goes out either way.
        let fix = match known_fix {
            Some(fix) => Some(fix),
            None => self.best_effort_fix().await,
        };
        let contact = {
            let mut machine = self.machine();
            if let Some(fix) = fix {
                machine.record_location(fix);
            }
            machine
                .emergency()
                .map(|emergency| emergency.contact.clone())
        };

        if let Some(contact) = contact {
            self.sinks.notifier.notify(&contact, fix).await;
            self.machine().mark_alert_sent();
            let detail = match fix {
                Some(fix) => format!(
                    "Live location shared with {}. Lat: {:.5}, Lng: {:.5}",
                    contact.name, fix.latitude, fix.longitude
                ),
                None => format!(
                    "Emergency alert sent to {} without a location fix.",
                    contact.name
                ),
            };
            self.log(LogEntry::system(detail));
        }
    }

    /// User accepted the critical-risk alert prompt: clear it and enter
    /// lockdown.
    pub async fn confirm_emergency(&self) {
        self.pending_alert().take();
        self.trigger_emergency().await;
    }

    /// User declined the critical-risk alert prompt.
    pub fn dismiss_alert(&self) {
        self.pending_alert().take();
    }

    /// Explicit reset: leaves lockdown, clears the emergency context and
    /// silences alert audio.
    pub async fn reset_emergency(&self) {
        let transition = self.machine().reset();
        self.sinks.siren.stop().await;
        self.sinks.speech.cancel().await;
        if transition.is_some() {
            self.log(LogEntry::system("System reset to SAFE."));
        }
    }

    /// Current system state.
    pub fn state(&self) -> SystemState {
        self.machine().state()
    }

    /// Snapshot of the append-only transcript.
    pub fn transcript(&self) -> Vec<LogEntry> {
        self.transcript
            .lock()
            .unwrap_or_else(PoisonError::into_inner)
            .clone()
    }

    /// Emergency context while in lockdown.
    pub fn emergency(&self) -> Option<EmergencyContext> {
        self.machine().emergency().cloned()
    }

    /// Critical-risk analysis awaiting user confirmation, if any.
    pub fn pending_emergency_alert(&self) -> Option<AnalysisResult> {
        self.pending_alert().clone()
    }

    /// Run a pre-collected request through gateway and validation without
    /// touching the state machine. Used by the HTTP surface, where sensor
    /// payloads arrive already collected and the caller owns the reaction.
    pub async fn analyze_remote(&self, request: &AnalysisRequest) -> Result<AnalysisResult> {
        let reply = self.gateway.analyze(request).await?;
        validator::validate(&reply.text)
    }

    async fn apply_result(&self, result: AnalysisResult, provenance: Provenance) {
        self.machine().apply_risk(result.risk_level);

        self.log(LogEntry::assistant(&result.spoken_response));
        for recommendation in &result.recommendations {
            self.log(LogEntry::system(format!("• {recommendation}")));
        }
        self.sinks.speech.speak(&result.spoken_response).await;

        // The confirmation prompt is tied to critical risk alone; the
        // model's alert suggestion rides along in the recorded result.
        match provenance {
            Provenance::Model if result.risk_level >= CRITICAL_RISK => {
                *self.pending_alert() = Some(result);
            }
            Provenance::Canned => {
                // A substituted reply may inform, but never escalate.
                tracing::info!("canned reply applied; emergency confirmation suppressed");
            }
            _ => {}
        }
    }

    async fn best_effort_fix(&self) -> Option<GeoFix> {
        match tokio::time::timeout(self.location_timeout, self.sinks.location.locate()).await {
            Ok(Ok(fix)) => Some(fix),
            Ok(Err(err)) => {
                tracing::warn!(error = %err, "geolocation failed; continuing without a fix");
                None
            }
            Err(_) => {
                tracing::warn!(
                    timeout_ms = self.location_timeout.as_millis() as u64,
                    "geolocation timed out; continuing without a fix"
                );
                None
            }
        }
    }

    fn log(&self, entry: LogEntry) {
        self.transcript
            .lock()
            .unwrap_or_else(PoisonError::into_inner)
            .push(entry);
    }

    fn machine(&self) -> MutexGuard<'_, SafetyStateMachine> {
        self.machine.lock().unwrap_or_else(PoisonError::into_inner)
    }

    fn pending_alert(&self) -> MutexGuard<'_, Option<AnalysisResult>> {
        self.pending_alert
            .lock()
            .unwrap_or_else(PoisonError::into_inner)
    }
}
