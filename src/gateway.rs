//! Remote reasoning gateway.
//!
//! Wraps a single outbound reasoning call with a hard timeout, sequential
//! retries driven by [`RetryPolicy`], and an optional last-resort canned
//! responder. The gateway returns raw model text and carries no knowledge
//! of the response schema — that is the validator's concern.

use crate::config::GatewayConfig;
use crate::error::{GuardianError, Result};
use crate::retry::{RetryDecision, RetryPolicy};
use crate::types::{AnalysisRequest, Provenance};
use async_trait::async_trait;
use rand::seq::SliceRandom;
use std::sync::Arc;
use std::time::Duration;
use uuid::Uuid;

// ── Backend seam ───────────────────────────────────────────────

/// One reasoning attempt against the remote service.
///
/// Implementations perform a single call with no timeout or retry; both
/// live in [`ReasoningGateway`].
#[async_trait]
pub trait ReasoningBackend: Send + Sync {
    async fn infer(&self, request: &AnalysisRequest) -> Result<String>;

    /// Backend name for logs.
    fn name(&self) -> &str {
        "backend"
    }
}

// ── HTTP backend ───────────────────────────────────────────────

/// Production backend: POSTs the serialized request to the reasoning
/// service and returns the generated text.
#[derive(Debug)]
pub struct HttpReasoningBackend {
    client: reqwest::Client,
    base_url: String,
    api_key: String,
    model: String,
}

impl HttpReasoningBackend {
    pub fn new(config: &GatewayConfig) -> Self {
        Self {
            client: reqwest::Client::new(),
            base_url: config.base_url.trim_end_matches('/').to_owned(),
            api_key: config.api_key.clone(),
            model: config.model.clone(),
        }
    }
}

#[async_trait]
impl ReasoningBackend for HttpReasoningBackend {
    async fn infer(&self, request: &AnalysisRequest) -> Result<String> {
        let mut body = serde_json::json!({
            "model": self.model,
            "prompt": build_prompt(request),
        });
        if let Some(image) = &request.image {
            body["image_jpeg_base64"] = serde_json::Value::String(image.base64_jpeg.clone());
        }

        let url = format!("{}/v1/generate", self.base_url);
        let mut req = self.client.post(&url).json(&body);
        if !self.api_key.is_empty() {
            req = req.bearer_auth(&self.api_key);
        }

        let response = req
            .send()
            .await
            .map_err(|e| GuardianError::Request(format!("reasoning request failed: {e}")))?;

        let status = response.status();
        if status == reqwest::StatusCode::TOO_MANY_REQUESTS {
            return Err(GuardianError::RateLimited(format!(
                "reasoning service returned {status}"
            )));
        }
        if status.is_server_error() {
            return Err(GuardianError::ServiceUnavailable(format!(
                "reasoning service returned {status}"
            )));
        }
        if !status.is_success() {
            return Err(GuardianError::Request(format!(
                "reasoning service returned {status}"
            )));
        }

        let value: serde_json::Value = response
            .json()
            .await
            .map_err(|e| GuardianError::Request(format!("unreadable reasoning reply: {e}")))?;
        match value["text"].as_str() {
            Some(text) if !text.is_empty() => Ok(text.to_owned()),
            _ => Err(GuardianError::Request(
                "empty text returned from model".into(),
            )),
        }
    }

    fn name(&self) -> &str {
        "http"
    }
}

/// Build the guardian prompt sent alongside the sensor payload.
///
/// The contract at the end matters most: the model must answer with a bare
/// JSON object in the exact `AnalysisResult` shape.
pub fn build_prompt(request: &AnalysisRequest) -> String {
    let latitude = request
        .latitude
        .map_or_else(|| "Unknown".to_owned(), |v| v.to_string());
    let longitude = request
        .longitude
        .map_or_else(|| "Unknown".to_owned(), |v| v.to_string());

    format!(
        "You are an AI Safety Guardian analyzing a real-world environment.\n\
         User Query:\n{query}\n\n\
         Environment Data:\n\
         Latitude: {latitude}\n\
         Longitude: {longitude}\n\
         Timestamp: {timestamp}\n\n\
         Instructions:\n\
         Analyze lighting conditions from the image if provided.\n\
         Detect presence of people.\n\
         Detect signs of aggression or threat.\n\
         Detect isolation level (crowded vs empty).\n\
         Infer risk level from 0 to 10.\n\
         If lighting is poor, suggest moving to a brighter area.\n\
         If isolation risk is high, suggest moving to a populated area.\n\n\
         After analysis, respond in valid JSON format only.\n\
         Do NOT use markdown, backticks, comments, or any text outside the JSON object.\n\
         Ensure \"risk_level\" is an integer between 0 and 10.\n\
         Ensure \"confidence\" is a decimal number between 0 and 1.\n\n\
         Return JSON in this exact format:\n\
         {{\n\
           \"risk_level\": number,\n\
           \"confidence\": number,\n\
           \"spoken_response\": \"short 1-2 sentence guardian-style response\",\n\
           \"recommendations\": [\"string\", \"string\"],\n\
           \"should_alert_emergency\": true/false\n\
         }}",
        query = request.query_text,
        timestamp = request.captured_at.to_rfc3339(),
    )
}

// ── Canned fallback ────────────────────────────────────────────

/// Last-resort replies substituted when every reasoning attempt fails.
///
/// Shaped like genuine model output so the validator path stays uniform.
/// All canned replies keep the risk comfortably below the critical
/// threshold; a substitution can never argue for an emergency.
#[derive(Debug, Clone)]
pub struct CannedResponder {
    replies: Vec<&'static str>,
}

impl Default for CannedResponder {
    fn default() -> Self {
        Self {
            replies: vec![
                r#"{"risk_level": 2, "confidence": 0.85, "spoken_response": "Lighting conditions are stable and the area appears populated. I recommend maintaining your current route while I continue to monitor.", "recommendations": ["Stay in well-lit areas", "Keep your phone accessible"], "should_alert_emergency": false}"#,
                r#"{"risk_level": 5, "confidence": 0.78, "spoken_response": "I've detected low lighting in your immediate vicinity. I recommend moving toward the nearest main road to improve visibility.", "recommendations": ["Increase walking pace", "Move toward streetlights"], "should_alert_emergency": false}"#,
            ],
        }
    }
}

impl CannedResponder {
    /// Pick one canned reply.
    pub fn reply(&self) -> String {
        self.replies
            .choose(&mut rand::thread_rng())
            .copied()
            .unwrap_or_default()
            .to_owned()
    }
}

// ── Gateway ────────────────────────────────────────────────────

/// Raw reply from the gateway, tagged with its provenance.
#[derive(Debug, Clone)]
pub struct RawReply {
    pub text: String,
    pub provenance: Provenance,
}

/// The outbound reasoning boundary: timeout, retry, canned fallback.
pub struct ReasoningGateway {
    backend: Arc<dyn ReasoningBackend>,
    timeout: Duration,
    policy: RetryPolicy,
    canned: Option<CannedResponder>,
}

impl ReasoningGateway {
    pub fn new(backend: Arc<dyn ReasoningBackend>, config: &GatewayConfig) -> Self {
        Self {
            backend,
            timeout: Duration::from_millis(config.timeout_ms),
            policy: RetryPolicy {
                max_retries: config.max_retries,
                base_backoff: Duration::from_millis(config.base_backoff_ms),
                unavailable_backoff: Duration::from_millis(config.unavailable_backoff_ms),
            },
            canned: config.canned_fallback.then(CannedResponder::default),
        }
    }

    /// Disable the canned responder so terminal failures surface as errors.
    pub fn without_fallback(mut self) -> Self {
        self.canned = None;
        self
    }

    /// Run the reasoning call to completion under the retry policy.
    ///
    /// Retries are sequential, never parallel. On terminal failure a canned
    /// reply is substituted when the responder is enabled; the substitution
    /// is logged and tagged [`Provenance::Canned`].
    pub async fn analyze(&self, request: &AnalysisRequest) -> Result<RawReply> {
        let request_id = Uuid::new_v4();
        let mut attempt: u32 = 0;

        let terminal = loop {
            match self.attempt_once(request).await {
                Ok(text) => {
                    tracing::debug!(%request_id, attempt, backend = self.backend.name(), "reasoning call succeeded");
                    return Ok(RawReply {
                        text,
                        provenance: Provenance::Model,
                    });
                }
                Err(err) => {
                    tracing::warn!(
                        %request_id,
                        attempt,
                        remaining_retries = self.policy.remaining(attempt),
                        backend = self.backend.name(),
                        error = %err,
                        "reasoning attempt failed"
                    );
                    match self.policy.decide(attempt, err.failure_kind()) {
                        RetryDecision::Retry(delay) => {
                            tokio::time::sleep(delay).await;
                            attempt += 1;
                        }
                        RetryDecision::Fail => break err,
                    }
                }
            }
        };

        match &self.canned {
            Some(responder) => {
                tracing::warn!(
                    %request_id,
                    error = %terminal,
                    "substituting canned guardian reply after terminal failure"
                );
                Ok(RawReply {
                    text: responder.reply(),
                    provenance: Provenance::Canned,
                })
            }
            None => Err(terminal),
        }
    }

    /// One attempt under the hard deadline. A timeout aborts the in-flight
    /// call; the surrounding orchestration is untouched.
    async fn attempt_once(&self, request: &AnalysisRequest) -> Result<String> {
        match tokio::time::timeout(self.timeout, self.backend.infer(request)).await {
            Ok(result) => result,
            Err(_) => Err(GuardianError::Timeout(format!(
                "no reply within {}ms",
                self.timeout.as_millis()
            ))),
        }
    }
}
