//! Inbound HTTP surface for the guardian engine.
//!
//! Mirrors the collaborating UI contract: sensor payloads arrive already
//! collected in the request body, the engine runs the gateway and validator,
//! and the caller reacts to the returned assessment.
//!
//! ## Endpoints
//!
//! - `POST /analyze-safety` — run one safety analysis
//! - `POST /manual-alert` — trigger the emergency lockdown flow
//! - `POST /reset-emergency` — leave lockdown
//! - `GET /guardian-state` — current system mode

use crate::error::{GuardianError, Result};
use crate::orchestrator::GuardianOrchestrator;
use crate::types::{AnalysisRequest, GeoFix, ImageFrame};
use axum::Router;
use axum::extract::{DefaultBodyLimit, State};
use axum::http::StatusCode;
use axum::response::{IntoResponse, Json, Response};
use axum::routing::{get, post};
use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};
use std::net::SocketAddr;
use std::sync::Arc;
use tokio::net::TcpListener;
use tokio::task::JoinHandle;
use tracing::info;

/// Sentinel value the UI sends when no camera frame was captured.
const NO_IMAGE: &str = "no-image";

/// Request body cap. Base64 camera frames run to several megabytes, well
/// past the framework default.
const MAX_BODY_BYTES: usize = 50 * 1024 * 1024;

// ---------------------------------------------------------------------------
// Request / response types
// ---------------------------------------------------------------------------

/// Request body for `POST /analyze-safety`.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct AnalyzeSafetyRequest {
    /// The user's safety query. Required.
    #[serde(default)]
    pub user_text: String,
    /// Base64 JPEG frame, or `"no-image"` when capture failed.
    #[serde(default = "no_image")]
    pub image_frame_base64: String,
    /// Approximate latitude, if a fix was obtained.
    #[serde(default)]
    pub latitude: Option<f64>,
    /// Approximate longitude, if a fix was obtained.
    #[serde(default)]
    pub longitude: Option<f64>,
    /// Client-side capture timestamp.
    #[serde(default)]
    pub timestamp: Option<DateTime<Utc>>,
}

fn no_image() -> String {
    NO_IMAGE.to_owned()
}

/// Request body for `POST /manual-alert`.
#[derive(Debug, Clone, Default, Serialize, Deserialize)]
#[serde(default)]
pub struct ManualAlertRequest {
    pub latitude: Option<f64>,
    pub longitude: Option<f64>,
}

/// Error body for 4xx/5xx responses.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct ErrorBody {
    pub error: bool,
    pub message: String,
}

/// Response body for `GET /guardian-state`.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct GuardianStateBody {
    pub system_mode: String,
}

/// Acknowledgement body for fire-and-forget endpoints.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct AckBody {
    pub status: String,
}

// ---------------------------------------------------------------------------
// Handlers
// ---------------------------------------------------------------------------

impl AnalyzeSafetyRequest {
    fn into_analysis_request(self) -> AnalysisRequest {
        let image = (self.image_frame_base64 != NO_IMAGE && !self.image_frame_base64.is_empty())
            .then(|| ImageFrame {
                base64_jpeg: self.image_frame_base64,
                brightness: None,
            });
        AnalysisRequest {
            query_text: self.user_text,
            image,
            latitude: self.latitude,
            longitude: self.longitude,
            captured_at: self.timestamp.unwrap_or_else(Utc::now),
        }
    }
}

fn error_response(status: StatusCode, message: impl Into<String>) -> Response {
    (
        status,
        Json(ErrorBody {
            error: true,
            message: message.into(),
        }),
    )
        .into_response()
}

async fn analyze_safety(
    State(orchestrator): State<Arc<GuardianOrchestrator>>,
    Json(body): Json<AnalyzeSafetyRequest>,
) -> Response {
    if body.user_text.trim().is_empty() {
        return error_response(
            StatusCode::BAD_REQUEST,
            "User query is required for analysis.",
        );
    }

    let request = body.into_analysis_request();
    match orchestrator.analyze_remote(&request).await {
        Ok(result) => Json(result).into_response(),
        Err(err) => {
            tracing::error!(error = %err, "remote analysis failed");
            error_response(StatusCode::INTERNAL_SERVER_ERROR, err.user_message())
        }
    }
}

async fn manual_alert(
    State(orchestrator): State<Arc<GuardianOrchestrator>>,
    Json(body): Json<ManualAlertRequest>,
) -> Json<AckBody> {
    let known_fix = match (body.latitude, body.longitude) {
        (Some(latitude), Some(longitude)) => Some(GeoFix {
            latitude,
            longitude,
        }),
        _ => None,
    };
    // Fire-and-forget: the caller gets an ack while the lockdown side
    // effects run.
    tokio::spawn(async move { orchestrator.trigger_emergency_at(known_fix).await });
    Json(AckBody {
        status: "ok".into(),
    })
}

async fn reset_emergency(
    State(orchestrator): State<Arc<GuardianOrchestrator>>,
) -> Json<AckBody> {
    orchestrator.reset_emergency().await;
    Json(AckBody {
        status: "ok".into(),
    })
}

async fn guardian_state(
    State(orchestrator): State<Arc<GuardianOrchestrator>>,
) -> Json<GuardianStateBody> {
    Json(GuardianStateBody {
        system_mode: orchestrator.state().to_string(),
    })
}

// ---------------------------------------------------------------------------
// Server
// ---------------------------------------------------------------------------

/// Build the guardian router.
pub fn router(orchestrator: Arc<GuardianOrchestrator>) -> Router {
    Router::new()
        .route("/analyze-safety", post(analyze_safety))
        .route("/manual-alert", post(manual_alert))
        .route("/reset-emergency", post(reset_emergency))
        .route("/guardian-state", get(guardian_state))
        .layer(DefaultBodyLimit::max(MAX_BODY_BYTES))
        .with_state(orchestrator)
}

/// Bind and serve on a background task. Returns the bound address (useful
/// with port 0) and the server task handle.
pub async fn spawn(
    orchestrator: Arc<GuardianOrchestrator>,
    addr: SocketAddr,
) -> Result<(SocketAddr, JoinHandle<()>)> {
    let listener = TcpListener::bind(addr).await?;
    let local_addr = listener.local_addr()?;
    info!(%local_addr, "guardian server listening");

    let app = router(orchestrator);
    let handle = tokio::spawn(async move {
        if let Err(err) = axum::serve(listener, app).await {
            tracing::error!(error = %err, "guardian server stopped");
        }
    });
    Ok((local_addr, handle))
}

/// Serve until the process exits.
pub async fn serve(orchestrator: Arc<GuardianOrchestrator>, addr: SocketAddr) -> Result<()> {
    let listener = TcpListener::bind(addr).await?;
    info!(%addr, "guardian server listening");
    axum::serve(listener, router(orchestrator))
        .await
        .map_err(GuardianError::Io)
}
