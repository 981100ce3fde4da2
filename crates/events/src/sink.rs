//! Delivery seam between the dispatcher and the outside world.

use std::sync::{Arc, Mutex};

use async_trait::async_trait;

use crate::event::NotificationEvent;

/// Error type for a failed delivery attempt.
#[derive(Debug, thiserror::Error)]
pub enum DeliveryError {
    /// The underlying HTTP request failed (network, DNS, timeout, etc.).
    #[error("HTTP request failed: {0}")]
    Request(#[from] reqwest::Error),

    /// The remote server returned a non-2xx status code.
    #[error("Webhook returned HTTP {0}")]
    HttpStatus(u16),

    /// The sink refused the event.
    #[error("Delivery rejected: {0}")]
    Rejected(String),
}

/// Delivers one event, once. Callers never retry.
#[async_trait]
pub trait NotificationSink: Send + Sync {
    async fn deliver(&self, event: &NotificationEvent) -> Result<(), DeliveryError>;
}

/// Sink that keeps every event in memory, optionally failing on demand.
#[derive(Debug, Clone, Default)]
pub struct RecordingSink {
    events: Arc<Mutex<Vec<NotificationEvent>>>,
    attempts: Arc<Mutex<usize>>,
    fail: Arc<Mutex<bool>>,
}

impl RecordingSink {
    pub fn new() -> Self {
        Self::default()
    }

    /// Reject every subsequent delivery.
    pub fn set_failing(&self, failing: bool) {
        *self.fail.lock().unwrap_or_else(|p| p.into_inner()) = failing;
    }

    /// Successfully delivered events, in delivery order.
    pub fn events(&self) -> Vec<NotificationEvent> {
        self.events.lock().unwrap_or_else(|p| p.into_inner()).clone()
    }

    /// Delivered events with the given title.
    pub fn titled(&self, title: &str) -> Vec<NotificationEvent> {
        self.events()
            .into_iter()
            .filter(|e| e.title == title)
            .collect()
    }

    /// Every delivery attempt, successful or not.
    pub fn attempts(&self) -> usize {
        *self.attempts.lock().unwrap_or_else(|p| p.into_inner())
    }
}

#[async_trait]
impl NotificationSink for RecordingSink {
    async fn deliver(&self, event: &NotificationEvent) -> Result<(), DeliveryError> {
        *self.attempts.lock().unwrap_or_else(|p| p.into_inner()) += 1;
        if *self.fail.lock().unwrap_or_else(|p| p.into_inner()) {
            return Err(DeliveryError::Rejected("sink offline".into()));
        }
        self.events
            .lock()
            .unwrap_or_else(|p| p.into_inner())
            .push(event.clone());
        Ok(())
    }
}
