//! Webhook delivery, one attempt per event.
//!
//! [`WebhookSink`] posts an event's embed payload to the URL configured for
//! its destination channel. There is no retry: a failed POST is reported to
//! the dispatcher, which logs it and moves on.

use std::collections::HashMap;
use std::time::Duration;

use async_trait::async_trait;

use crate::config::NotifyConfig;
use crate::event::NotificationEvent;
use crate::sink::{DeliveryError, NotificationSink};

/// Posts notification embeds to per-channel webhook URLs.
pub struct WebhookSink {
    client: reqwest::Client,
    routes: HashMap<String, String>,
}

impl WebhookSink {
    pub fn new(routes: HashMap<String, String>, timeout: Duration) -> Result<Self, DeliveryError> {
        let client = reqwest::Client::builder().timeout(timeout).build()?;
        Ok(Self { client, routes })
    }

    pub fn from_config(config: &NotifyConfig) -> Result<Self, DeliveryError> {
        Self::new(config.webhooks.clone(), config.timeout)
    }

    /// Whether `destination` has a webhook configured.
    pub fn is_routed(&self, destination: &str) -> bool {
        self.routes.contains_key(destination)
    }

    /// Execute a single POST request and check the response status.
    async fn try_send(&self, url: &str, payload: &serde_json::Value) -> Result<(), DeliveryError> {
        let response = self.client.post(url).json(payload).send().await?;
        if !response.status().is_success() {
            return Err(DeliveryError::HttpStatus(response.status().as_u16()));
        }
        Ok(())
    }
}

#[async_trait]
impl NotificationSink for WebhookSink {
    async fn deliver(&self, event: &NotificationEvent) -> Result<(), DeliveryError> {
        let Some(url) = self.routes.get(&event.destination) else {
            tracing::trace!(
                destination = %event.destination,
                title = %event.title,
                "No webhook configured, dropping notification"
            );
            return Ok(());
        };
        self.try_send(url, &event.to_embed_payload()).await
    }
}

// ---------------------------------------------------------------------------
// Tests
// ---------------------------------------------------------------------------

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn new_does_not_fail() {
        let sink = WebhookSink::new(HashMap::new(), Duration::from_secs(5));
        assert!(sink.is_ok());
    }

    #[test]
    fn routes_from_config() {
        let mut config = NotifyConfig::default();
        config
            .webhooks
            .insert("core".into(), "http://127.0.0.1:9/hook".into());
        let sink = WebhookSink::from_config(&config).unwrap();
        assert!(sink.is_routed("core"));
        assert!(!sink.is_routed("jobs"));
    }

    #[tokio::test]
    async fn unrouted_destination_is_dropped_quietly() {
        let sink = WebhookSink::new(HashMap::new(), Duration::from_secs(1)).unwrap();
        let event = NotificationEvent::new("jobs", "Job Completed");
        assert!(sink.deliver(&event).await.is_ok());
    }

    #[tokio::test]
    async fn unreachable_endpoint_fails_once() {
        // Port 9 (discard) on localhost is closed in test environments.
        let mut routes = HashMap::new();
        routes.insert("core".to_string(), "http://127.0.0.1:9/hook".to_string());
        let sink = WebhookSink::new(routes, Duration::from_millis(500)).unwrap();
        let result = sink.deliver(&NotificationEvent::new("core", "x")).await;
        assert!(matches!(result, Err(DeliveryError::Request(_))));
    }

    #[test]
    fn delivery_error_display_http_status() {
        let err = DeliveryError::HttpStatus(502);
        assert_eq!(err.to_string(), "Webhook returned HTTP 502");
    }
}
