// src/dispatch/notifier.rs
//
// Outbound channels. Each notifier picks the categories it cares about;
// a failed delivery is reported to the worker and otherwise ignored.

use super::messages::{notification_text, spoken_text};
use crate::types::{EmittedEvent, EventCategory};
use anyhow::{Context, Result};
use serde::Serialize;
use std::future::Future;
use std::pin::Pin;
use std::time::Duration;
use tracing::{debug, info};

pub type NotifyFuture<'a> = Pin<Box<dyn Future<Output = Result<()>> + Send + 'a>>;

pub trait Notifier: Send + Sync {
    fn name(&self) -> &str;
    fn wants(&self, category: EventCategory) -> bool;
    fn notify<'a>(&'a self, event: &'a EmittedEvent) -> NotifyFuture<'a>;
}

// ============================================================================
// WEBHOOK
// ============================================================================

#[derive(Debug, Serialize)]
struct WebhookPayload<'a> {
    event_id: String,
    event: &'a str,
    timestamp: String,
    patient: &'a str,
    message: String,
}

/// POSTs emergencies to a caregiver webhook
pub struct WebhookNotifier {
    http_client: reqwest::Client,
    url: String,
    patient: String,
}

impl WebhookNotifier {
    pub fn new(url: String, timeout_secs: u64, patient: String) -> Result<Self> {
        let http_client = reqwest::Client::builder()
            .timeout(Duration::from_secs(timeout_secs))
            .build()
            .context("Failed to build HTTP client")?;

        Ok(Self {
            http_client,
            url,
            patient,
        })
    }

    async fn post(&self, event: &EmittedEvent) -> Result<()> {
        let payload = WebhookPayload {
            event_id: event.id.to_string(),
            event: event.category.as_str(),
            timestamp: event.timestamp.format("%Y-%m-%dT%H:%M:%S%.3f").to_string(),
            patient: &self.patient,
            message: notification_text(event, &self.patient),
        };

        debug!("🌐 POST {} for {}", self.url, event.category);
        let response = self
            .http_client
            .post(&self.url)
            .json(&payload)
            .send()
            .await
            .with_context(|| format!("Webhook request to {} failed", self.url))?;

        let status = response.status();
        if !status.is_success() {
            let body = response
                .text()
                .await
                .unwrap_or_else(|_| "<no body>".to_string());
            anyhow::bail!("Webhook returned {}: {}", status, body);
        }

        info!("🌐 Emergency notification sent for {}", event.id);
        Ok(())
    }
}

impl Notifier for WebhookNotifier {
    fn name(&self) -> &str {
        "webhook"
    }

    fn wants(&self, category: EventCategory) -> bool {
        category.is_emergency()
    }

    fn notify<'a>(&'a self, event: &'a EmittedEvent) -> NotifyFuture<'a> {
        Box::pin(self.post(event))
    }
}

// ============================================================================
// VOICE
// ============================================================================

/// Speaks reminders. Rendering is a log line; a speech engine would hook in here.
pub struct VoiceAnnouncer;

impl VoiceAnnouncer {
    async fn speak(&self, event: &EmittedEvent) -> Result<()> {
        if let Some(text) = spoken_text(event) {
            info!("🔊 \"{}\"", text);
        }
        Ok(())
    }
}

impl Notifier for VoiceAnnouncer {
    fn name(&self) -> &str {
        "voice"
    }

    fn wants(&self, category: EventCategory) -> bool {
        category == EventCategory::PillReminder
    }

    fn notify<'a>(&'a self, event: &'a EmittedEvent) -> NotifyFuture<'a> {
        Box::pin(self.speak(event))
    }
}
