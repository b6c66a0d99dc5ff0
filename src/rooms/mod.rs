//! Real-time room fan-out
//!
//! After each ingest the job id is published to every room whose flag
//! rule matches the job (e.g. "contains a Secret", "contains >= 5M").


use crate::model::AnimalEntry;
use serde::{Deserialize, Serialize};
use tokio::sync::broadcast;

/// Sink for room notifications
#[cfg_attr(test, mockall::automock)]
pub trait RoomBroadcaster: Send + Sync {
    fn publish(&self, room: &str, job_id: &str);
}

#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct RoomEvent {
    pub room: String,
    pub job_id: String,
}

/// Broadcast hub backing the SSE endpoint
#[derive(Clone)]
pub struct RoomHub {
    sender: broadcast::Sender<RoomEvent>,
}

impl RoomHub {
    pub fn new(capacity: usize) -> Self {
        let (sender, _receiver) = broadcast::channel(capacity.max(1));
        Self { sender }
    }

    pub fn subscribe(&self) -> broadcast::Receiver<RoomEvent> {
        self.sender.subscribe()
    }

    pub fn subscriber_count(&self) -> usize {
        self.sender.receiver_count()
    }
}

impl Default for RoomHub {
    fn default() -> Self {
        Self::new(256)
    }
}

impl RoomBroadcaster for RoomHub {
    fn publish(&self, room: &str, job_id: &str) {
        // No subscribers is not an error
        let _ = self.sender.send(RoomEvent {
            room: room.to_string(),
            job_id: job_id.to_string(),
        });
    }
}

/// A room and the condition that flags a job for it
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct FlagRule {
    pub room: String,
    /// Flag jobs containing a Secret-rarity animal
    #[serde(default)]
    pub secret: bool,
    /// Flag jobs containing an animal at or above this value
    #[serde(default)]
    pub min_value: Option<f64>,
}

impl FlagRule {
    pub fn secret(room: &str) -> Self {
        Self {
            room: room.to_string(),
            secret: true,
            min_value: None,
        }
    }

    pub fn min_value(room: &str, value: f64) -> Self {
        Self {
            room: room.to_string(),
            secret: false,
            min_value: Some(value),
        }
    }

    /// Both conditions must hold when both are set
    pub fn matches(&self, entry: &AnimalEntry) -> bool {
        if !self.secret && self.min_value.is_none() {
            return false;
        }
        if self.secret && !entry.is_secret() {
            return false;
        }
        match self.min_value {
            Some(min) => entry.value.is_some_and(|v| v >= min),
            None => true,
        }
    }
}

/// Defaults: `secret`, `2m`, `5m`, `10m`
pub fn default_flag_rules() -> Vec<FlagRule> {
    vec![
        FlagRule::secret("secret"),
        FlagRule::min_value("2m", 2_000_000.0),
        FlagRule::min_value("5m", 5_000_000.0),
        FlagRule::min_value("10m", 10_000_000.0),
    ]
}

/// Rooms flagged by at least one entry, in rule order
pub fn flagged_rooms<'a>(rules: &'a [FlagRule], entries: &[AnimalEntry]) -> Vec<&'a str> {
    rules
        .iter()
        .filter(|rule| entries.iter().any(|e| rule.matches(e)))
        .map(|rule| rule.room.as_str())
        .collect()
}
