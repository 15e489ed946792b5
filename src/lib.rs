//! Sentinel: event-driven AI safety guardian engine.
//!
//! Fuses sensor snapshots (camera frame, approximate location) with a
//! natural-language query, sends them to a remote reasoning service for a
//! risk judgment, and drives a safety state machine with bounded side
//! effects (speech, transcript entries, emergency notification, siren).
//!
//! # Architecture
//!
//! The pipeline is built from independent stages behind trait seams:
//! - **Sensors**: best-effort camera and geolocation collaborators
//! - **Gateway**: the single outbound reasoning call, with timeout, retry
//!   and a last-resort canned fallback
//! - **Validator**: strict schema and range checks on raw model text
//! - **State machine**: pure risk-to-state mapping, manual-only lockdown
//! - **Orchestrator**: sequences the stages and dispatches side effects,
//!   at most one analysis at a time

pub mod alert;
pub mod config;
pub mod error;
pub mod gateway;
pub mod orchestrator;
pub mod retry;
pub mod sensors;
pub mod server;
pub mod state;
pub mod types;
pub mod validator;

pub use config::GuardianConfig;
pub use error::{GuardianError, Result};
pub use gateway::{HttpReasoningBackend, ReasoningBackend, ReasoningGateway};
pub use orchestrator::{GuardianOrchestrator, GuardianSinks};
pub use state::{SafetyStateMachine, SystemState};
pub use types::{AnalysisRequest, AnalysisResult, LogEntry, LogKind, Provenance};
