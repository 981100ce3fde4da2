//! Notification event envelope.

use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};

/// Default embed colour (neutral blue).
pub const DEFAULT_COLOR: u32 = 0x3498DB;

/// One labelled value shown in a notification.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct EmbedField {
    pub name: String,
    pub value: String,
    #[serde(default)]
    pub inline: bool,
}

/// A notification addressed to one destination channel.
///
/// Built with [`NotificationEvent::new`] and the `with_*` methods. Events for
/// the same destination are delivered in enqueue order.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct NotificationEvent {
    /// Channel name, see `grid_core::channels`.
    pub destination: String,
    pub title: String,
    /// Severity colour as `0xRRGGBB`.
    pub color: u32,
    pub description: Option<String>,
    pub fields: Vec<EmbedField>,
    pub footer: Option<String>,
    pub timestamp: DateTime<Utc>,
}

impl NotificationEvent {
    pub fn new(destination: impl Into<String>, title: impl Into<String>) -> Self {
        Self {
            destination: destination.into(),
            title: title.into(),
            color: DEFAULT_COLOR,
            description: None,
            fields: Vec::new(),
            footer: None,
            timestamp: Utc::now(),
        }
    }

    pub fn with_color(mut self, color: u32) -> Self {
        self.color = color;
        self
    }

    pub fn with_description(mut self, description: impl Into<String>) -> Self {
        self.description = Some(description.into());
        self
    }

    pub fn with_field(mut self, name: impl Into<String>, value: impl ToString, inline: bool) -> Self {
        self.fields.push(EmbedField {
            name: name.into(),
            value: value.to_string(),
            inline,
        });
        self
    }

    pub fn with_footer(mut self, footer: impl Into<String>) -> Self {
        self.footer = Some(footer.into());
        self
    }

    /// Value of the first field called `name`.
    pub fn field(&self, name: &str) -> Option<&str> {
        self.fields
            .iter()
            .find(|f| f.name == name)
            .map(|f| f.value.as_str())
    }

    /// Webhook embed body: `{"embeds": [ ... ]}`.
    pub fn to_embed_payload(&self) -> serde_json::Value {
        let mut embed = serde_json::json!({
            "title": self.title,
            "color": self.color,
            "fields": self.fields,
            "timestamp": self.timestamp.to_rfc3339(),
        });
        if let Some(description) = &self.description {
            embed["description"] = serde_json::Value::String(description.clone());
        }
        if let Some(footer) = &self.footer {
            embed["footer"] = serde_json::json!({ "text": footer });
        }
        serde_json::json!({ "embeds": [embed] })
    }
}

// ---------------------------------------------------------------------------
// Tests
// ---------------------------------------------------------------------------
