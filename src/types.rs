//! Wire and domain types for the guardian engine.

use base64::Engine as _;
use base64::engine::general_purpose::STANDARD as BASE64;
use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};

/// A single captured camera frame.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct ImageFrame {
    /// Base64-encoded JPEG data, without a data-URL prefix.
    pub base64_jpeg: String,
    /// Mean luminance sampled at capture time, 0–255.
    pub brightness: Option<f64>,
}

impl ImageFrame {
    /// Encode raw JPEG bytes for the wire.
    pub fn from_jpeg_bytes(jpeg: &[u8], brightness: Option<f64>) -> Self {
        Self {
            base64_jpeg: BASE64.encode(jpeg),
            brightness,
        }
    }
}

/// Approximate device location.
#[derive(Debug, Clone, Copy, PartialEq, Serialize, Deserialize)]
pub struct GeoFix {
    pub latitude: f64,
    pub longitude: f64,
}

/// Everything the engine knows when a safety query is analyzed.
///
/// `query_text` is always present; the image and location are best-effort
/// and may be absent when a sensor fails or times out.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct AnalysisRequest {
    pub query_text: String,
    pub image: Option<ImageFrame>,
    pub latitude: Option<f64>,
    pub longitude: Option<f64>,
    pub captured_at: DateTime<Utc>,
}

impl AnalysisRequest {
    /// Build a request with the current timestamp.
    pub fn new(query_text: impl Into<String>, image: Option<ImageFrame>, fix: Option<GeoFix>) -> Self {
        Self {
            query_text: query_text.into(),
            image,
            latitude: fix.map(|f| f.latitude),
            longitude: fix.map(|f| f.longitude),
            captured_at: Utc::now(),
        }
    }
}

/// Validated output of the reasoning service.
///
/// All five fields are required and range-checked by the validator before
/// an instance is constructed; the result is never partially trusted.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct AnalysisResult {
    /// Severity score, 0–10.
    pub risk_level: u8,
    /// Model confidence, 0.0–1.0.
    pub confidence: f64,
    /// Guardian-style reply spoken to the user.
    pub spoken_response: String,
    /// Ordered recommendations, possibly empty.
    pub recommendations: Vec<String>,
    /// Whether the model suggests alerting the emergency contact.
    pub should_alert_emergency: bool,
}

/// Where an analysis reply came from.
///
/// Canned replies are last-resort substitutions after a wholly failed
/// remote call; they must stay distinguishable from genuine model output
/// and never lead to an automatic lockdown.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum Provenance {
    /// Genuine reasoning-service output.
    Model,
    /// Synthetic last-resort reply.
    Canned,
}

/// Author of a transcript entry.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "UPPERCASE")]
pub enum LogKind {
    User,
    Assistant,
    System,
}

/// One append-only transcript entry. Never mutated after creation;
/// insertion order is display order.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct LogEntry {
    pub kind: LogKind,
    pub message: String,
    pub at: DateTime<Utc>,
}

impl LogEntry {
    pub fn new(kind: LogKind, message: impl Into<String>) -> Self {
        Self {
            kind,
            message: message.into(),
            at: Utc::now(),
        }
    }

    pub fn user(message: impl Into<String>) -> Self {
        Self::new(LogKind::User, message)
    }

    pub fn assistant(message: impl Into<String>) -> Self {
        Self::new(LogKind::Assistant, message)
    }

    pub fn system(message: impl Into<String>) -> Self {
        Self::new(LogKind::System, message)
    }
}

/// The person notified when lockdown engages.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct EmergencyContact {
    pub name: String,
    pub phone: String,
}

/// Live emergency bookkeeping while in lockdown.
///
/// Created on first lockdown entry, cleared on reset.
#[derive(Debug, Clone, PartialEq)]
pub struct EmergencyContext {
    pub contact: EmergencyContact,
    pub last_known_location: Option<GeoFix>,
    pub alert_sent: bool,
}

impl EmergencyContext {
    pub fn new(contact: EmergencyContact) -> Self {
        Self {
            contact,
            last_known_location: None,
            alert_sent: false,
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn image_frame_encodes_jpeg_bytes() {
        let frame = ImageFrame::from_jpeg_bytes(b"\xff\xd8\xff\xe0", Some(120.0));
        assert_eq!(frame.base64_jpeg, "/9j/4A==");
        assert_eq!(frame.brightness, Some(120.0));
    }

    #[test]
    fn request_carries_optional_location() {
        let fix = GeoFix {
            latitude: 12.9716,
            longitude: 77.5946,
        };
        let req = AnalysisRequest::new("am I safe here", None, Some(fix));
        assert_eq!(req.latitude, Some(12.9716));
        assert_eq!(req.longitude, Some(77.5946));
        assert!(req.image.is_none());
    }

    #[test]
    fn request_without_fix_has_null_coordinates() {
        let req = AnalysisRequest::new("check my surroundings", None, None);
        assert!(req.latitude.is_none());
        assert!(req.longitude.is_none());
    }

    #[test]
    fn analysis_result_serde_round_trip() {
        let result = AnalysisResult {
            risk_level: 5,
            confidence: 0.78,
            spoken_response: "I've detected low lighting in your vicinity.".into(),
            recommendations: vec!["Move toward streetlights".into()],
            should_alert_emergency: false,
        };
        let json = serde_json::to_string(&result).expect("serialize");
        let back: AnalysisResult = serde_json::from_str(&json).expect("deserialize");
        assert_eq!(back, result);
    }

    #[test]
    fn log_kind_serializes_uppercase() {
        let entry = LogEntry::system("Analyzing environment...");
        let json = serde_json::to_value(&entry).expect("serialize");
        assert_eq!(json["kind"], "SYSTEM");
    }

    #[test]
    fn emergency_context_starts_unsent() {
        let ctx = EmergencyContext::new(EmergencyContact {
            name: "Mom".into(),
            phone: "+91-1234567890".into(),
        });
        assert!(!ctx.alert_sent);
        assert!(ctx.last_known_location.is_none());
    }
}
