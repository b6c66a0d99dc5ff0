//! Threshold routing
//!
//! Every occupied podium with a resolvable value is checked against each
//! configured channel's bounds. Rarity splits into two classes for this
//! purpose: `Secret` and everything else.

#[cfg(test)]
mod tests;

use crate::model::{AnimalEntry, Generation, SECRET_RARITY};
use serde::{Deserialize, Serialize};

/// Threshold class of a rarity string
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum RarityClass {
    Secret,
    NonSecret,
}

impl RarityClass {
    pub fn of(rarity: &str) -> Self {
        if rarity == SECRET_RARITY {
            RarityClass::Secret
        } else {
            RarityClass::NonSecret
        }
    }
}

/// Per-class value bounds; a missing bound is unbounded
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
pub struct ThresholdBounds {
    #[serde(default)]
    pub min_secret: Option<f64>,
    #[serde(default)]
    pub max_secret: Option<f64>,
    #[serde(default)]
    pub min_non_secret: Option<f64>,
    #[serde(default)]
    pub max_non_secret: Option<f64>,
}

impl ThresholdBounds {
    pub fn min_for(&self, class: RarityClass) -> Option<f64> {
        match class {
            RarityClass::Secret => self.min_secret,
            RarityClass::NonSecret => self.min_non_secret,
        }
    }

    pub fn max_for(&self, class: RarityClass) -> Option<f64> {
        match class {
            RarityClass::Secret => self.max_secret,
            RarityClass::NonSecret => self.max_non_secret,
        }
    }

    /// Inclusive on both ends
    pub fn admits(&self, value: f64, class: RarityClass) -> bool {
        let above_min = self.min_for(class).map_or(true, |min| value >= min);
        let below_max = self.max_for(class).map_or(true, |max| value <= max);
        above_min && below_max
    }
}

/// A named notification destination
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct ChannelConfig {
    pub name: String,
    /// Key used to look up `DISCORD_WEBHOOK_<KEY>` and `<KEY>_MIN_SECRET`-style overrides
    #[serde(default)]
    pub env_key: Option<String>,
    #[serde(default)]
    pub webhook: Option<String>,
    /// Title used on this channel's embeds, defaults to the name
    #[serde(default)]
    pub badge: Option<String>,
    #[serde(default)]
    pub thresholds: ThresholdBounds,
}

impl ChannelConfig {
    pub fn new(name: &str, thresholds: ThresholdBounds) -> Self {
        Self {
            name: name.to_string(),
            env_key: None,
            webhook: None,
            badge: None,
            thresholds,
        }
    }

    pub fn with_webhook(mut self, url: &str) -> Self {
        self.webhook = Some(url.to_string());
        self
    }

    /// A channel without a webhook URL is disabled, not an error
    pub fn is_enabled(&self) -> bool {
        self.webhook.as_deref().is_some_and(|url| !url.trim().is_empty())
    }

    pub fn label(&self) -> &str {
        self.badge.as_deref().unwrap_or(&self.name)
    }

    pub fn admits(&self, value: f64, rarity: &str) -> bool {
        self.thresholds.admits(value, RarityClass::of(rarity))
    }
}

/// How an entry matching several channels is delivered
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum RoutingMode {
    /// Every matching channel gets its own copy
    #[default]
    Broadcast,
    /// Only the first matching channel in configuration order
    FirstMatch,
}

/// Eligible entries for one enabled channel
#[derive(Debug, Clone)]
pub struct ChannelBatch {
    pub channel: ChannelConfig,
    pub items: Vec<AnimalEntry>,
}

/// Value used for threshold checks; `None` excludes the entry
pub fn resolve_value(generation: &Generation) -> Option<f64> {
    generation.per_second_value()
}

/// Channels whose bounds admit a valued entry
pub fn classify<'a>(
    value: f64,
    rarity: &str,
    channels: &'a [ChannelConfig],
) -> Vec<&'a ChannelConfig> {
    channels
        .iter()
        .filter(|channel| channel.admits(value, rarity))
        .collect()
}

#[derive(Debug, Clone)]
pub struct ThresholdRouter {
    channels: Vec<ChannelConfig>,
    mode: RoutingMode,
}

impl ThresholdRouter {
    pub fn new(channels: Vec<ChannelConfig>, mode: RoutingMode) -> Self {
        Self { channels, mode }
    }

    pub fn channels(&self) -> &[ChannelConfig] {
        &self.channels
    }

    pub fn mode(&self) -> RoutingMode {
        self.mode
    }

    pub fn enabled_channels(&self) -> impl Iterator<Item = &ChannelConfig> {
        self.channels.iter().filter(|c| c.is_enabled())
    }

    pub fn has_enabled_channels(&self) -> bool {
        self.enabled_channels().next().is_some()
    }

    /// Split entries into per-channel batches, in configuration order.
    ///
    /// Disabled channels and channels with nothing eligible are omitted.
    pub fn route(&self, entries: &[AnimalEntry]) -> Vec<ChannelBatch> {
        let enabled: Vec<&ChannelConfig> = self.enabled_channels().collect();
        let mut buckets: Vec<Vec<AnimalEntry>> = vec![Vec::new(); enabled.len()];

        for entry in entries {
            let Some(value) = entry.value else {
                continue;
            };
            for (slot, channel) in enabled.iter().enumerate() {
                if !channel.admits(value, &entry.rarity) {
                    continue;
                }
                buckets[slot].push(entry.clone());
                if self.mode == RoutingMode::FirstMatch {
                    break;
                }
            }
        }

        enabled
            .into_iter()
            .zip(buckets)
            .filter(|(_, items)| !items.is_empty())
            .map(|(channel, items)| ChannelBatch {
                channel: channel.clone(),
                items,
            })
            .collect()
    }
}
