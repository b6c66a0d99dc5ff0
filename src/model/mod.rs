//! Snapshot data model
//!
//! Wire shapes for ingested jobs:
//! - `JobPayload`: one scraper snapshot (`jobId`, `generatedAt`, `plots`)
//! - `Plot`: one in-game base with its podium slots
//! - `AnimalPodium`: an empty or occupied slot


use crate::error::{Result, StreamError};
use crate::money::parse_rate_text;
use chrono::{DateTime, NaiveDateTime, Utc};
use serde::{Deserialize, Serialize};
use std::fmt;

/// Rarity string that forms its own threshold class
pub const SECRET_RARITY: &str = "Secret";

/// Validated ingest body
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct JobPayload {
    pub job_id: String,
    /// Scraper clock, echoed back exactly as received
    pub generated_at: String,
    pub plots: Vec<Plot>,
}

impl JobPayload {
    /// Checks that go beyond the JSON shape
    pub fn validate(&self) -> Result<()> {
        if self.job_id.trim().is_empty() {
            return Err(StreamError::Validation("jobId must not be empty".to_string()));
        }
        Ok(())
    }

    /// `generatedAt` as UTC; offset-less timestamps are taken as UTC
    pub fn generated_at_utc(&self) -> Option<DateTime<Utc>> {
        let raw = self.generated_at.trim();
        if let Ok(ts) = DateTime::parse_from_rfc3339(raw) {
            return Some(ts.with_timezone(&Utc));
        }
        NaiveDateTime::parse_from_str(raw, "%Y-%m-%dT%H:%M:%S%.f")
            .ok()
            .map(|naive| naive.and_utc())
    }

    /// Every occupied podium of this job, flattened
    pub fn entries(&self) -> Vec<AnimalEntry> {
        collect_entries(&self.plots)
    }
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct Plot {
    /// Location identifier (owner sign)
    pub plot_sign: String,
    #[serde(default)]
    pub remaining_time: RemainingTime,
    pub animal_podiums: Vec<AnimalPodium>,
    pub meta: PlotMeta,
}

#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
pub struct RemainingTime {
    pub raw: Option<String>,
    pub seconds: Option<f64>,
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct PlotMeta {
    /// ISO timestamp as reported by the scraper
    pub timestamp: String,
}

/// Slot index, sent as either a number or a string
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(untagged)]
pub enum PodiumIndex {
    Number(serde_json::Number),
    Text(String),
}

impl fmt::Display for PodiumIndex {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            PodiumIndex::Number(n) => write!(f, "{}", n),
            PodiumIndex::Text(s) => write!(f, "{}", s),
        }
    }
}

impl From<u64> for PodiumIndex {
    fn from(value: u64) -> Self {
        PodiumIndex::Number(value.into())
    }
}

/// Per-second generation, either pre-parsed or textual (`"$1.5m/s"`)
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(untagged)]
pub enum Rate {
    Number(f64),
    Text(String),
}

#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct Generation {
    #[serde(default)]
    pub raw: String,
    /// `None` while the slot is not generating yet
    #[serde(default)]
    pub per_second: Option<Rate>,
    #[serde(default)]
    pub ready: bool,
}

impl Generation {
    /// Numeric per-second value; `None` means "no value", never zero
    pub fn per_second_value(&self) -> Option<f64> {
        match self.per_second.as_ref()? {
            Rate::Number(n) => n.is_finite().then_some(*n),
            Rate::Text(s) => parse_rate_text(s),
        }
    }
}

#[derive(Debug, Clone, PartialEq)]
pub struct Animal {
    pub index: PodiumIndex,
    pub display_name: String,
    pub mutation: String,
    pub rarity: String,
    pub generation: Generation,
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(try_from = "PodiumWire", into = "PodiumWire")]
pub enum AnimalPodium {
    Empty { index: PodiumIndex },
    Occupied(Animal),
}

impl AnimalPodium {
    pub fn index(&self) -> &PodiumIndex {
        match self {
            AnimalPodium::Empty { index } => index,
            AnimalPodium::Occupied(animal) => &animal.index,
        }
    }

    pub fn animal(&self) -> Option<&Animal> {
        match self {
            AnimalPodium::Empty { .. } => None,
            AnimalPodium::Occupied(animal) => Some(animal),
        }
    }
}

/// Flat JSON form: `{index, empty, displayName?, mutation?, rarity?, generation?}`
#[derive(Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
struct PodiumWire {
    index: PodiumIndex,
    empty: bool,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    display_name: Option<String>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    mutation: Option<String>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    rarity: Option<String>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    generation: Option<Generation>,
}

impl TryFrom<PodiumWire> for AnimalPodium {
    type Error = String;

    fn try_from(wire: PodiumWire) -> std::result::Result<Self, Self::Error> {
        if wire.empty {
            return Ok(AnimalPodium::Empty { index: wire.index });
        }
        Ok(AnimalPodium::Occupied(Animal {
            index: wire.index,
            display_name: wire.display_name.unwrap_or_default(),
            mutation: wire.mutation.unwrap_or_default(),
            rarity: wire.rarity.unwrap_or_default(),
            generation: wire.generation.unwrap_or_default(),
        }))
    }
}

impl From<AnimalPodium> for PodiumWire {
    fn from(podium: AnimalPodium) -> Self {
        match podium {
            AnimalPodium::Empty { index } => PodiumWire {
                index,
                empty: true,
                display_name: None,
                mutation: None,
                rarity: None,
                generation: None,
            },
            AnimalPodium::Occupied(animal) => PodiumWire {
                index: animal.index,
                empty: false,
                display_name: Some(animal.display_name),
                mutation: Some(animal.mutation),
                rarity: Some(animal.rarity),
                generation: Some(animal.generation),
            },
        }
    }
}

/// One occupied podium together with where it was found.
///
/// Shared input shape of the router, the watchlist and the formatter.
#[derive(Debug, Clone, PartialEq)]
pub struct AnimalEntry {
    pub location: String,
    pub index: PodiumIndex,
    pub name: String,
    pub mutation: String,
    pub rarity: String,
    pub value: Option<f64>,
}

impl AnimalEntry {
    pub fn is_secret(&self) -> bool {
        self.rarity == SECRET_RARITY
    }
}

/// Flatten plots into entries, skipping empty slots and nameless animals
pub fn collect_entries(plots: &[Plot]) -> Vec<AnimalEntry> {
    plots
        .iter()
        .flat_map(|plot| {
            plot.animal_podiums
                .iter()
                .filter_map(AnimalPodium::animal)
                .filter(|animal| !animal.display_name.trim().is_empty())
                .map(move |animal| AnimalEntry {
                    location: plot.plot_sign.clone(),
                    index: animal.index.clone(),
                    name: animal.display_name.clone(),
                    mutation: animal.mutation.clone(),
                    rarity: animal.rarity.clone(),
                    value: animal.generation.per_second_value(),
                })
        })
        .collect()
}

/// Row returned by the filter query
#[derive(Debug, Clone, PartialEq, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct MatchedAnimal {
    pub plot_sign: String,
    pub index: PodiumIndex,
    pub display_name: String,
    pub mutation: String,
    pub rarity: String,
    pub generation: MatchedGeneration,
    pub timestamp: String,
}

#[derive(Debug, Clone, PartialEq, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct MatchedGeneration {
    pub raw: String,
    pub per_second: Option<f64>,
}
