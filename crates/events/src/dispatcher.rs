//! Single-consumer notification dispatcher.
//!
//! Producers hold a cloneable [`Notifier`] and enqueue with `try_send`: they
//! never wait, and an event that does not fit in the bounded queue is
//! dropped with a warning. One background task drains the queue in order
//! and makes exactly one delivery attempt per event; failures are logged and
//! swallowed.

use std::sync::Arc;

use tokio::sync::mpsc;
use tokio::task::JoinHandle;
use tokio_util::sync::CancellationToken;

use crate::event::NotificationEvent;
use crate::sink::NotificationSink;

/// Producer handle for the dispatcher queue.
#[derive(Clone)]
pub struct Notifier {
    sender: mpsc::Sender<NotificationEvent>,
}

impl Notifier {
    /// A notifier whose events go nowhere.
    pub fn disabled() -> Self {
        let (sender, _receiver) = mpsc::channel(1);
        Self { sender }
    }

    /// Enqueue an event. Never blocks and never fails the caller.
    pub fn notify(&self, event: NotificationEvent) {
        match self.sender.try_send(event) {
            Ok(()) => {}
            Err(mpsc::error::TrySendError::Full(event)) => {
                tracing::warn!(
                    destination = %event.destination,
                    title = %event.title,
                    "Notification queue full, dropping event"
                );
            }
            Err(mpsc::error::TrySendError::Closed(event)) => {
                tracing::debug!(
                    destination = %event.destination,
                    title = %event.title,
                    "Notification dispatcher stopped, dropping event"
                );
            }
        }
    }
}

/// Handle to the running delivery task.
pub struct DispatcherHandle {
    cancel: CancellationToken,
    task: JoinHandle<()>,
}

impl DispatcherHandle {
    /// Stop accepting events, deliver what is already queued, then exit.
    pub async fn shutdown(self) {
        self.cancel.cancel();
        if let Err(e) = self.task.await {
            tracing::error!(error = %e, "Notification dispatcher task failed");
        }
    }
}

/// Spawns the consumer task.
pub struct Dispatcher;

impl Dispatcher {
    /// Start the delivery task over `sink` with a queue of `capacity` events.
    pub fn spawn(sink: Arc<dyn NotificationSink>, capacity: usize) -> (Notifier, DispatcherHandle) {
        let (sender, receiver) = mpsc::channel(capacity.max(1));
        let cancel = CancellationToken::new();
        let task = tokio::spawn(Self::run(sink, receiver, cancel.clone()));
        (Notifier { sender }, DispatcherHandle { cancel, task })
    }

    async fn run(
        sink: Arc<dyn NotificationSink>,
        mut receiver: mpsc::Receiver<NotificationEvent>,
        cancel: CancellationToken,
    ) {
        tracing::info!("Notification dispatcher started");

        loop {
            tokio::select! {
                biased;
                _ = cancel.cancelled() => break,
                next = receiver.recv() => match next {
                    Some(event) => Self::deliver(sink.as_ref(), &event).await,
                    None => {
                        tracing::info!("All notifiers dropped, dispatcher shutting down");
                        return;
                    }
                },
            }
        }

        receiver.close();
        let mut drained = 0usize;
        while let Some(event) = receiver.recv().await {
            Self::deliver(sink.as_ref(), &event).await;
            drained += 1;
        }
        tracing::info!(drained, "Notification dispatcher stopped");
    }

    async fn deliver(sink: &dyn NotificationSink, event: &NotificationEvent) {
        if let Err(e) = sink.deliver(event).await {
            tracing::warn!(
                destination = %event.destination,
                title = %event.title,
                error = %e,
                "Notification delivery failed"
            );
        }
    }
}
