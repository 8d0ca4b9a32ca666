// libs/appointment-cell/src/services/notifications.rs
use std::time::Duration;

use anyhow::{anyhow, Result};
use async_trait::async_trait;
use reqwest::Client as HttpClient;
use serde::{Deserialize, Serialize};
use tokio::time::timeout;
use tracing::{debug, info, warn};
use uuid::Uuid;

use crate::models::{Appointment, Client};

#[derive(Debug, Clone, Copy, Serialize, Deserialize, PartialEq, Eq)]
#[serde(rename_all = "snake_case")]
pub enum NotificationKind {
    Created,
    Rescheduled,
    Cancelled,
}

/// Payload handed to the delivery channel (WhatsApp/SMS gateway, etc.).
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct AppointmentNotification {
    pub kind: NotificationKind,
    pub business_id: Uuid,
    pub appointment: Appointment,
    pub client: Option<Client>,
    pub service_name: Option<String>,
    pub professional_name: Option<String>,
}

#[async_trait]
pub trait Notifier: Send + Sync {
    async fn notify(&self, notification: &AppointmentNotification) -> Result<()>;
}

/// POSTs the notification as JSON to a configured endpoint.
pub struct WebhookNotifier {
    client: HttpClient,
    url: String,
}

impl WebhookNotifier {
    pub fn new(url: impl Into<String>) -> Self {
        Self {
            client: HttpClient::new(),
            url: url.into(),
        }
    }
}

#[async_trait]
impl Notifier for WebhookNotifier {
    async fn notify(&self, notification: &AppointmentNotification) -> Result<()> {
        debug!("Sending {:?} notification to {}", notification.kind, self.url);

        let response = self.client.post(&self.url).json(notification).send().await?;
        let status = response.status();
        if !status.is_success() {
            let body = response.text().await.unwrap_or_default();
            return Err(anyhow!("Notification webhook returned {}: {}", status, body));
        }
        Ok(())
    }
}

pub struct LogNotifier;

#[async_trait]
impl Notifier for LogNotifier {
    async fn notify(&self, notification: &AppointmentNotification) -> Result<()> {
        info!(
            "Notification {:?} for appointment {} (business {})",
            notification.kind, notification.appointment.id, notification.business_id
        );
        Ok(())
    }
}

/// Races delivery against `limit`. Timeouts and failures are logged and
/// swallowed so they never affect the committed booking.
pub async fn notify_with_timeout(notifier: &dyn Notifier, notification: &AppointmentNotification, limit: Duration) {
    match timeout(limit, notifier.notify(notification)).await {
        Ok(Ok(())) => debug!("Notification for appointment {} delivered", notification.appointment.id),
        Ok(Err(e)) => warn!("Notification for appointment {} failed: {}", notification.appointment.id, e),
        Err(_) => warn!(
            "Notification for appointment {} timed out after {:?}",
            notification.appointment.id, limit
        ),
    }
}
