use crate::models::{RankedRoom, ScoredMatch};
use reqwest::Client;
use serde::{Deserialize, Serialize};
use serde_json::{json, Value};
use std::collections::BTreeMap;
use std::future::Future;
use std::time::Duration;
use thiserror::Error;
use uuid::Uuid;

/// Errors building a notification sink
#[derive(Debug, Error)]
pub enum NotifyError {
    #[error("HTTP client error: {0}")]
    ClientError(#[from] reqwest::Error),

    #[error("Invalid webhook URL: {0}")]
    InvalidUrl(String),
}

/// Per-channel delivery status, keyed by channel name
pub type DispatchReport = BTreeMap<String, Value>;

/// Structured payload announcing new matches to one seeker
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct NotificationPayload {
    pub scope: String,
    pub profile_key: String,
    pub recipient_name: Option<String>,
    pub recipient_email: Option<String>,
    pub matches: Vec<ScoredMatch>,
    pub rooms: Vec<RankedRoom>,
    pub trace_id: Uuid,
    pub subject: String,
    pub summary: String,
}

impl NotificationPayload {
    pub fn new(
        scope: &str,
        profile_key: &str,
        recipient_name: Option<String>,
        recipient_email: Option<String>,
        matches: Vec<ScoredMatch>,
        rooms: Vec<RankedRoom>,
        trace_id: Uuid,
    ) -> Self {
        let subject = format!(
            "Room matches for {}",
            recipient_name.as_deref().unwrap_or("student")
        );
        let summary = render_match_summary(&matches);

        Self {
            scope: scope.to_string(),
            profile_key: profile_key.to_string(),
            recipient_name,
            recipient_email,
            matches,
            rooms,
            trace_id,
            subject,
            summary,
        }
    }
}

/// One line per match: "- <name> (score: <n>, status: <status>)"
pub fn render_match_summary(matches: &[ScoredMatch]) -> String {
    matches
        .iter()
        .map(|m| {
            let name = m
                .other_name
                .as_deref()
                .or(m.other_profile_id.as_deref())
                .unwrap_or("Unknown");
            let status = serde_json::to_value(m.notification_status)
                .ok()
                .and_then(|v| v.as_str().map(str::to_string))
                .unwrap_or_default();
            format!("- {} (score: {}, status: {})", name, m.score, status)
        })
        .collect::<Vec<_>>()
        .join("\n")
}

/// Outbound notification channel
///
/// Delivery failures are reported in the returned map, never raised.
pub trait NotificationSink: Send + Sync {
    fn dispatch(
        &self,
        payload: &NotificationPayload,
        channels: &[String],
    ) -> impl Future<Output = DispatchReport> + Send;
}

/// Writes one structured log line per requested channel
#[derive(Debug, Clone, Copy, Default)]
pub struct LogSink;

impl NotificationSink for LogSink {
    async fn dispatch(&self, payload: &NotificationPayload, channels: &[String]) -> DispatchReport {
        channels
            .iter()
            .filter(|c| c.as_str() != "webhook")
            .map(|channel| {
                tracing::info!(
                    channel = %channel,
                    scope = %payload.scope,
                    profile_key = %payload.profile_key,
                    matches = payload.matches.len(),
                    trace_id = %payload.trace_id,
                    "Match notification: {}",
                    payload.subject
                );
                (channel.clone(), json!({ "status": "logged" }))
            })
            .collect()
    }
}

/// POSTs the payload as JSON to every configured URL
#[derive(Debug, Clone)]
pub struct WebhookSink {
    client: Client,
    urls: Vec<String>,
}

impl WebhookSink {
    pub fn new(urls: Vec<String>) -> Result<Self, NotifyError> {
        if let Some(bad) = urls
            .iter()
            .find(|u| !(u.starts_with("http://") || u.starts_with("https://")))
        {
            return Err(NotifyError::InvalidUrl(bad.clone()));
        }

        let client = Client::builder().timeout(Duration::from_secs(10)).build()?;
        Ok(Self { client, urls })
    }

    pub fn urls(&self) -> &[String] {
        &self.urls
    }

    async fn post(&self, url: &str, payload: &NotificationPayload) -> Value {
        match self.client.post(url).json(payload).send().await {
            Ok(response) if response.status().is_success() => {
                json!({ "status": "sent", "http_status": response.status().as_u16() })
            }
            Ok(response) => {
                tracing::warn!("Webhook {} returned {}", url, response.status());
                json!({ "status": "error", "http_status": response.status().as_u16() })
            }
            Err(e) => {
                tracing::warn!("Webhook {} failed: {}", url, e);
                json!({ "status": "error", "error": e.to_string() })
            }
        }
    }
}

impl NotificationSink for WebhookSink {
    async fn dispatch(&self, payload: &NotificationPayload, _channels: &[String]) -> DispatchReport {
        let mut report = DispatchReport::new();
        if self.urls.is_empty() {
            return report;
        }

        let mut per_url = serde_json::Map::new();
        for url in &self.urls {
            per_url.insert(url.clone(), self.post(url, payload).await);
        }
        report.insert("webhook".to_string(), Value::Object(per_url));
        report
    }
}

/// Fan out to two sinks; reports are merged, the second wins on key clashes
impl<A: NotificationSink, B: NotificationSink> NotificationSink for (A, B) {
    async fn dispatch(&self, payload: &NotificationPayload, channels: &[String]) -> DispatchReport {
        let mut report = self.0.dispatch(payload, channels).await;
        report.extend(self.1.dispatch(payload, channels).await);
        report
    }
}
