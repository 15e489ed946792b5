//! Strict validation of raw reasoning output.
//!
//! The gateway returns raw model text; nothing in it is trusted until it
//! passes this module. Any violation rejects the whole result — values are
//! never clamped or coerced into range.

use crate::error::{GuardianError, Result};
use crate::types::AnalysisResult;

/// Fields the model must return. Order matters only for error messages.
const REQUIRED_FIELDS: [&str; 5] = [
    "risk_level",
    "confidence",
    "spoken_response",
    "recommendations",
    "should_alert_emergency",
];

/// Locate the JSON object embedded in raw model text.
///
/// Models wrap their JSON in prose or code fences despite instructions, so
/// the span from the first `{` to the last `}` is taken as the candidate
/// object.
fn json_span(raw: &str) -> Option<&str> {
    let start = raw.find('{')?;
    let end = raw.rfind('}')?;
    if end < start {
        return None;
    }
    Some(&raw[start..=end])
}

fn reject(reason: impl Into<String>) -> GuardianError {
    GuardianError::MalformedResponse(reason.into())
}

/// Validate raw model text into an [`AnalysisResult`].
///
/// Rejects with [`GuardianError::MalformedResponse`] when no JSON object can
/// be located, the object is unparseable, any required field is absent, or
/// any value is out of its documented range.
pub fn validate(raw: &str) -> Result<AnalysisResult> {
    let span = json_span(raw).ok_or_else(|| reject("no JSON object in model output"))?;
    let value: serde_json::Value =
        serde_json::from_str(span).map_err(|e| reject(format!("unparseable JSON: {e}")))?;
    let obj = value
        .as_object()
        .ok_or_else(|| reject("model output is not a JSON object"))?;

    for field in REQUIRED_FIELDS {
        if !obj.contains_key(field) {
            return Err(reject(format!("missing field: {field}")));
        }
    }

    let risk = obj["risk_level"]
        .as_f64()
        .ok_or_else(|| reject("risk_level is not a number"))?;
    if !(0.0..=10.0).contains(&risk) {
        return Err(reject(format!("risk_level out of range: {risk}")));
    }
    if risk.fract() != 0.0 {
        return Err(reject(format!("risk_level is not an integer: {risk}")));
    }

    let confidence = obj["confidence"]
        .as_f64()
        .ok_or_else(|| reject("confidence is not a number"))?;
    if !(0.0..=1.0).contains(&confidence) {
        return Err(reject(format!("confidence out of range: {confidence}")));
    }

    let spoken_response = obj["spoken_response"]
        .as_str()
        .ok_or_else(|| reject("spoken_response is not a string"))?;
    if spoken_response.is_empty() {
        return Err(reject("spoken_response is empty"));
    }

    let recommendations = obj["recommendations"]
        .as_array()
        .ok_or_else(|| reject("recommendations is not a sequence"))?
        .iter()
        .map(|v| {
            v.as_str()
                .map(str::to_owned)
                .ok_or_else(|| reject("recommendations must contain strings"))
        })
        .collect::<Result<Vec<String>>>()?;

    let should_alert_emergency = obj["should_alert_emergency"]
        .as_bool()
        .ok_or_else(|| reject("should_alert_emergency is not a boolean"))?;

    Ok(AnalysisResult {
        risk_level: risk as u8,
        confidence,
        spoken_response: spoken_response.to_owned(),
        recommendations,
        should_alert_emergency,
    })
}
