//! Grid notification infrastructure.
//!
//! - [`NotificationEvent`]: the embed-shaped event envelope.
//! - [`Dispatcher`]: single-consumer bounded queue; producers enqueue through
//!   a cloneable [`Notifier`] and never wait on delivery.
//! - [`NotificationSink`]: the delivery seam, implemented by
//!   [`WebhookSink`] and the in-memory [`RecordingSink`].
//! - [`alerts`]: builders for every event the services emit.

pub mod alerts;
pub mod config;
pub mod delivery;
pub mod dispatcher;
pub mod event;
pub mod sink;

pub use config::NotifyConfig;
pub use delivery::webhook::WebhookSink;
pub use dispatcher::{Dispatcher, DispatcherHandle, Notifier};
pub use event::{EmbedField, NotificationEvent};
pub use sink::{DeliveryError, NotificationSink, RecordingSink};
