//! Guardian HTTP surface tests.
//!
//! Spin up the real server on an ephemeral port with a mock reasoning
//! service behind it and exercise the endpoint contract with a plain
//! HTTP client.

use sentinel::config::GuardianConfig;
use sentinel::gateway::HttpReasoningBackend;
use sentinel::orchestrator::{GuardianOrchestrator, GuardianSinks};
use sentinel::types::AnalysisResult;
use sentinel::{ReasoningGateway, server};
use std::net::SocketAddr;
use std::sync::Arc;
use std::time::Duration;
use wiremock::matchers::{method, path};
use wiremock::{Mock, MockServer, ResponseTemplate};

async fn spawn_guardian(reasoning_url: String, canned_fallback: bool) -> SocketAddr {
    let mut config = GuardianConfig::default();
    config.gateway.base_url = reasoning_url;
    config.gateway.timeout_ms = 1_000;
    config.gateway.max_retries = 0;
    config.gateway.base_backoff_ms = 5;
    config.gateway.unavailable_backoff_ms = 5;
    config.gateway.canned_fallback = canned_fallback;
    config.sensors.location_timeout_ms = 50;

    let backend = Arc::new(HttpReasoningBackend::new(&config.gateway));
    let gateway = Arc::new(ReasoningGateway::new(backend, &config.gateway));
    let orchestrator = Arc::new(GuardianOrchestrator::new(
        gateway,
        GuardianSinks::headless(),
        &config,
    ));

    let (addr, _handle) = server::spawn(orchestrator, "127.0.0.1:0".parse().expect("addr"))
        .await
        .expect("server spawns");
    addr
}

fn model_reply(text: &str) -> ResponseTemplate {
    ResponseTemplate::new(200).set_body_json(serde_json::json!({ "text": text }))
}

#[tokio::test]
async fn analyze_safety_returns_validated_result() {
    let reasoning = MockServer::start().await;
    Mock::given(method("POST"))
        .and(path("/v1/generate"))
        .respond_with(model_reply(
            r#"{"risk_level": 6, "confidence": 0.82, "spoken_response": "Stay alert.", "recommendations": ["Keep to main roads"], "should_alert_emergency": false}"#,
        ))
        .mount(&reasoning)
        .await;
    let addr = spawn_guardian(reasoning.uri(), false).await;

    let client = reqwest::Client::new();
    let response = client
        .post(format!("http://{addr}/analyze-safety"))
        .json(&serde_json::json!({
            "user_text": "is this alley safe",
            "latitude": 12.97,
            "longitude": 77.59,
        }))
        .send()
        .await
        .expect("request");
    assert_eq!(response.status(), reqwest::StatusCode::OK);

    let result: AnalysisResult = response.json().await.expect("result body");
    assert_eq!(result.risk_level, 6);
    assert_eq!(result.spoken_response, "Stay alert.");
}

#[tokio::test]
async fn analyze_safety_accepts_multi_megabyte_frame() {
    let reasoning = MockServer::start().await;
    Mock::given(method("POST"))
        .and(path("/v1/generate"))
        .respond_with(model_reply(
            r#"{"risk_level": 2, "confidence": 0.9, "spoken_response": "All clear.", "recommendations": [], "should_alert_emergency": false}"#,
        ))
        .mount(&reasoning)
        .await;
    let addr = spawn_guardian(reasoning.uri(), false).await;

    // A base64 JPEG frame of a few megabytes, as the camera routinely sends.
    let frame = "A".repeat(4 * 1024 * 1024);
    let response = reqwest::Client::new()
        .post(format!("http://{addr}/analyze-safety"))
        .json(&serde_json::json!({
            "user_text": "check my surroundings",
            "image_frame_base64": frame,
        }))
        .send()
        .await
        .expect("request");
    assert_eq!(response.status(), reqwest::StatusCode::OK);

    let result: AnalysisResult = response.json().await.expect("result body");
    assert_eq!(result.risk_level, 2);
}

#[tokio::test]
async fn analyze_safety_rejects_empty_query() {
    let reasoning = MockServer::start().await;
    let addr = spawn_guardian(reasoning.uri(), false).await;

    let response = reqwest::Client::new()
        .post(format!("http://{addr}/analyze-safety"))
        .json(&serde_json::json!({ "user_text": "   " }))
        .send()
        .await
        .expect("request");
    assert_eq!(response.status(), reqwest::StatusCode::BAD_REQUEST);

    let body: serde_json::Value = response.json().await.expect("error body");
    assert_eq!(body["error"], true);
    assert_eq!(body["message"], "User query is required for analysis.");
    // No reasoning call was made.
    assert!(reasoning.received_requests().await.expect("requests").is_empty());
}

#[tokio::test]
async fn analyze_safety_maps_malformed_output_to_500() {
    let reasoning = MockServer::start().await;
    Mock::given(method("POST"))
        .and(path("/v1/generate"))
        .respond_with(model_reply("I cannot answer in JSON, sorry."))
        .mount(&reasoning)
        .await;
    let addr = spawn_guardian(reasoning.uri(), false).await;

    let response = reqwest::Client::new()
        .post(format!("http://{addr}/analyze-safety"))
        .json(&serde_json::json!({ "user_text": "check" }))
        .send()
        .await
        .expect("request");
    assert_eq!(response.status(), reqwest::StatusCode::INTERNAL_SERVER_ERROR);

    let body: serde_json::Value = response.json().await.expect("error body");
    assert_eq!(body["message"], "AI response formatting error. Please retry.");
}

#[tokio::test]
async fn manual_alert_drives_lockdown_state() {
    let reasoning = MockServer::start().await;
    let addr = spawn_guardian(reasoning.uri(), false).await;
    let client = reqwest::Client::new();

    let state: serde_json::Value = client
        .get(format!("http://{addr}/guardian-state"))
        .send()
        .await
        .expect("request")
        .json()
        .await
        .expect("state body");
    assert_eq!(state["system_mode"], "IDLE");

    let response = client
        .post(format!("http://{addr}/manual-alert"))
        .json(&serde_json::json!({ "latitude": 12.97, "longitude": 77.59 }))
        .send()
        .await
        .expect("request");
    assert_eq!(response.status(), reqwest::StatusCode::OK);

    // The lockdown side effects run on a background task.
    let mut mode = String::new();
    for _ in 0..50 {
        let state: serde_json::Value = client
            .get(format!("http://{addr}/guardian-state"))
            .send()
            .await
            .expect("request")
            .json()
            .await
            .expect("state body");
        mode = state["system_mode"].as_str().unwrap_or_default().to_owned();
        if mode == "LOCKDOWN" {
            break;
        }
        tokio::time::sleep(Duration::from_millis(20)).await;
    }
    assert_eq!(mode, "LOCKDOWN");

    let response = client
        .post(format!("http://{addr}/reset-emergency"))
        .send()
        .await
        .expect("request");
    assert_eq!(response.status(), reqwest::StatusCode::OK);

    let state: serde_json::Value = client
        .get(format!("http://{addr}/guardian-state"))
        .send()
        .await
        .expect("request")
        .json()
        .await
        .expect("state body");
    assert_eq!(state["system_mode"], "SAFE");
}
