//! Discord notification module
//!
//! Renders routed finds into size-bounded embeds and posts them to
//! webhooks in batches.

pub mod dispatch;
pub mod format;


use async_trait::async_trait;
use serde::{Deserialize, Serialize};

pub use dispatch::{DispatchConfig, DispatchReport, WebhookDispatcher};
pub use format::{EmbedFormatter, FormatConfig, FormatItem};

/// Discord caps
pub const MAX_FIELDS_PER_EMBED: usize = 25;
pub const MAX_EMBEDS_PER_MESSAGE: usize = 10;
pub const MAX_FIELD_VALUE: usize = 1024;
pub const MAX_EMBED_CHARS: usize = 5500;
pub const MAX_DESCRIPTION: usize = 1024;

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct EmbedField {
    pub name: String,
    pub value: String,
    #[serde(default)]
    pub inline: bool,
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct EmbedFooter {
    pub text: String,
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct Embed {
    pub title: String,
    pub description: String,
    pub color: u32,
    pub fields: Vec<EmbedField>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub footer: Option<EmbedFooter>,
}

impl Embed {
    /// Approximate character weight of title, description and fields
    pub fn size(&self) -> usize {
        let fields: usize = self
            .fields
            .iter()
            .map(|f| f.name.chars().count() + f.value.chars().count())
            .sum();
        self.title.chars().count() + self.description.chars().count() + fields + 50
    }
}

/// Link button
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct Button {
    #[serde(rename = "type")]
    pub kind: u8,
    pub style: u8,
    pub label: String,
    pub url: String,
}

impl Button {
    pub fn link(label: &str, url: &str) -> Self {
        Self {
            kind: 2,
            style: 5,
            label: label.to_string(),
            url: url.to_string(),
        }
    }
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct ActionRow {
    #[serde(rename = "type")]
    pub kind: u8,
    pub components: Vec<Button>,
}

impl ActionRow {
    pub fn new(components: Vec<Button>) -> Self {
        Self { kind: 1, components }
    }
}

/// Body of one webhook POST
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct WebhookPayload {
    pub embeds: Vec<Embed>,
    #[serde(default, skip_serializing_if = "Vec::is_empty")]
    pub components: Vec<ActionRow>,
}

/// Formatter output: an ordered embed sequence plus optional components
#[derive(Debug, Clone, Default, PartialEq)]
pub struct Notification {
    pub embeds: Vec<Embed>,
    pub components: Vec<ActionRow>,
}

impl Notification {
    pub fn is_empty(&self) -> bool {
        self.embeds.is_empty()
    }

    pub fn field_count(&self) -> usize {
        self.embeds.iter().map(|e| e.fields.len()).sum()
    }
}

/// Where formatted notifications go
#[async_trait]
pub trait NotificationSink: Send + Sync {
    /// Deliver to every URL. Failures are reported, never raised.
    async fn deliver(&self, urls: &[String], notification: &Notification) -> DispatchReport;
}
