//! Emergency-contact notification.
//!
//! Notification is fire-and-forget: one attempt, no retry, and no canned
//! substitution. Failures are logged and otherwise absorbed — lockdown
//! proceeds whether or not the relay is reachable.

use crate::types::{EmergencyContact, GeoFix};
use async_trait::async_trait;

/// Outbound notification to the emergency contact.
#[async_trait]
pub trait EmergencyNotifier: Send + Sync {
    async fn notify(&self, contact: &EmergencyContact, location: Option<GeoFix>);
}

/// Simulated SMS notifier: logs the notification instead of sending one.
#[derive(Debug, Default)]
pub struct SimulatedSmsNotifier;

#[async_trait]
impl EmergencyNotifier for SimulatedSmsNotifier {
    async fn notify(&self, contact: &EmergencyContact, location: Option<GeoFix>) {
        match location {
            Some(fix) => tracing::warn!(
                contact = contact.name.as_str(),
                phone = contact.phone.as_str(),
                latitude = format!("{:.5}", fix.latitude).as_str(),
                longitude = format!("{:.5}", fix.longitude).as_str(),
                "SMS simulation: live location shared"
            ),
            None => tracing::warn!(
                contact = contact.name.as_str(),
                phone = contact.phone.as_str(),
                "SMS simulation: alert sent without a location fix"
            ),
        }
    }
}

/// Relays the alert to an upstream service with a single POST.
#[derive(Debug)]
pub struct HttpAlertClient {
    client: reqwest::Client,
    url: String,
}

impl HttpAlertClient {
    /// `base_url` is the relay root; the alert goes to `<base>/manual-alert`.
    pub fn new(base_url: &str) -> Self {
        Self {
            client: reqwest::Client::new(),
            url: format!("{}/manual-alert", base_url.trim_end_matches('/')),
        }
    }
}

#[async_trait]
impl EmergencyNotifier for HttpAlertClient {
    async fn notify(&self, contact: &EmergencyContact, location: Option<GeoFix>) {
        let body = match location {
            Some(fix) => serde_json::json!({
                "latitude": fix.latitude,
                "longitude": fix.longitude,
            }),
            None => serde_json::json!({}),
        };

        match self.client.post(&self.url).json(&body).send().await {
            Ok(response) if response.status().is_success() => {
                tracing::info!(contact = contact.name.as_str(), "manual alert relayed");
            }
            Ok(response) => {
                tracing::warn!(
                    status = %response.status(),
                    "alert relay rejected the manual alert"
                );
            }
            Err(err) => {
                tracing::warn!(error = %err, "manual alert relay unreachable");
            }
        }
    }
}
