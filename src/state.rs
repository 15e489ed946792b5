//! Safety state machine.
//!
//! Pure logic: a validated risk score maps to a state, lockdown is
//! manual-only and sticky, and self-transitions are no-ops. The machine is
//! the single source of truth for the current mode; side effects are
//! dispatched by the orchestrator from the returned transitions.

use crate::types::{EmergencyContact, EmergencyContext, GeoFix};
use serde::{Deserialize, Serialize};

/// Risk score at or above which the system goes critical.
pub const CRITICAL_RISK: u8 = 7;

/// Risk score at or above which the system is elevated.
pub const ELEVATED_RISK: u8 = 4;

/// Operating mode of the guardian.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "UPPERCASE")]
pub enum SystemState {
    /// Before the first interaction.
    Idle,
    Safe,
    Elevated,
    Critical,
    /// High-alert mode with active emergency side effects. Exited only by
    /// an explicit reset.
    Lockdown,
}

impl SystemState {
    /// Map a validated risk score to its target state.
    pub fn from_risk(risk_level: u8) -> Self {
        if risk_level >= CRITICAL_RISK {
            Self::Critical
        } else if risk_level >= ELEVATED_RISK {
            Self::Elevated
        } else {
            Self::Safe
        }
    }

    pub fn as_str(&self) -> &'static str {
        match self {
            Self::Idle => "IDLE",
            Self::Safe => "SAFE",
            Self::Elevated => "ELEVATED",
            Self::Critical => "CRITICAL",
            Self::Lockdown => "LOCKDOWN",
        }
    }
}

impl std::fmt::Display for SystemState {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.write_str(self.as_str())
    }
}

/// A state change that actually happened.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct Transition {
    pub from: SystemState,
    pub to: SystemState,
}

/// The guardian's safety state machine.
///
/// Owns the current [`SystemState`] and, while in lockdown, the
/// [`EmergencyContext`].
#[derive(Debug)]
pub struct SafetyStateMachine {
    state: SystemState,
    contact: EmergencyContact,
    emergency: Option<EmergencyContext>,
}

impl SafetyStateMachine {
    pub fn new(contact: EmergencyContact) -> Self {
        Self {
            state: SystemState::Idle,
            contact,
            emergency: None,
        }
    }

    pub fn state(&self) -> SystemState {
        self.state
    }

    pub fn emergency(&self) -> Option<&EmergencyContext> {
        self.emergency.as_ref()
    }

    /// Apply a validated risk score.
    ///
    /// No-op while in lockdown (lockdown is sticky) and on self-transitions.
    /// Lockdown is never entered from a risk score.
    pub fn apply_risk(&mut self, risk_level: u8) -> Option<Transition> {
        if self.state == SystemState::Lockdown {
            tracing::debug!(risk_level, "risk score ignored while in lockdown");
            return None;
        }
        self.transition_to(SystemState::from_risk(risk_level))
    }

    /// Enter lockdown from a manual trigger or a user-confirmed critical
    /// alert. Idempotent while already in lockdown.
    ///
    /// Creates the [`EmergencyContext`] on entry.
    pub fn enter_lockdown(&mut self) -> Option<Transition> {
        if self.state == SystemState::Lockdown {
            return None;
        }
        self.emergency = Some(EmergencyContext::new(self.contact.clone()));
        self.transition_to(SystemState::Lockdown)
    }

    /// Record the location captured on lockdown entry.
    pub fn record_location(&mut self, fix: GeoFix) {
        if let Some(emergency) = &mut self.emergency {
            emergency.last_known_location = Some(fix);
        }
    }

    /// Record that the emergency contact was notified.
    pub fn mark_alert_sent(&mut self) {
        if let Some(emergency) = &mut self.emergency {
            emergency.alert_sent = true;
        }
    }

    /// Explicit reset: the only way out of lockdown. Clears the emergency
    /// context and returns to SAFE.
    pub fn reset(&mut self) -> Option<Transition> {
        self.emergency = None;
        self.transition_to(SystemState::Safe)
    }

    fn transition_to(&mut self, next: SystemState) -> Option<Transition> {
        if next == self.state {
            return None;
        }
        let transition = Transition {
            from: self.state,
            to: next,
        };
        tracing::info!(from = %transition.from, to = %transition.to, "state transition");
        self.state = next;
        Some(transition)
    }
}
