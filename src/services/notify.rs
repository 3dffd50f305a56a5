// src/services/notify.rs

//! Notification delivery.

use std::time::Duration;

use async_trait::async_trait;
use reqwest::Client;

use crate::error::{AppError, Result};
use crate::models::{Notification, NotificationConfig};
use crate::utils::http;

/// Outbound notification channel.
#[async_trait]
pub trait Notifier: Send + Sync {
    /// Deliver one notification. `Ok` means the receiver accepted it.
    async fn deliver(&self, notification: &Notification) -> Result<()>;
}

/// Posts `{title, body, category}` JSON to a push endpoint.
pub struct HttpNotifier {
    client: Client,
    endpoint: String,
    api_key: String,
}

impl HttpNotifier {
    pub fn new(config: &NotificationConfig, api_key: String, timeout: Duration) -> Result<Self> {
        Ok(Self {
            client: http::create_async_client("cms-notifier", timeout)?,
            endpoint: config.endpoint.clone(),
            api_key,
        })
    }
}

#[async_trait]
impl Notifier for HttpNotifier {
    async fn deliver(&self, notification: &Notification) -> Result<()> {
        self.client
            .post(&self.endpoint)
            .bearer_auth(&self.api_key)
            .json(notification)
            .send()
            .await
            .and_then(|r| r.error_for_status())
            .map_err(AppError::delivery)?;
        Ok(())
    }
}

/// Used when delivery is disabled: logs the notification and reports success.
#[derive(Debug, Clone, Copy, Default)]
pub struct LogNotifier;

#[async_trait]
impl Notifier for LogNotifier {
    async fn deliver(&self, notification: &Notification) -> Result<()> {
        log::info!("Notifications disabled, would send: {}", notification.title);
        log::debug!("[{}] {}", notification.category, notification.body);
        Ok(())
    }
}
