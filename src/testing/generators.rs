//! Test Data Generators
//!
//! Utilities for generating snapshot payloads

use crate::model::{
    Animal, AnimalPodium, Generation, JobPayload, Plot, PlotMeta, Rate, RemainingTime,
};
use chrono::Utc;

/// Generator for test data
pub struct TestDataGenerator {
    counter: u32,
}

impl Default for TestDataGenerator {
    fn default() -> Self {
        Self::new()
    }
}

impl TestDataGenerator {
    pub fn new() -> Self {
        Self { counter: 0 }
    }

    /// Occupied podium with a numeric per-second value
    pub fn animal(&mut self, name: &str, rarity: &str, per_second: Option<f64>) -> AnimalPodium {
        self.mutated_animal(name, "", rarity, per_second)
    }

    /// Occupied podium carrying a mutation
    pub fn mutated_animal(
        &mut self,
        name: &str,
        mutation: &str,
        rarity: &str,
        per_second: Option<f64>,
    ) -> AnimalPodium {
        self.counter += 1;
        AnimalPodium::Occupied(Animal {
            index: u64::from(self.counter).into(),
            display_name: name.to_string(),
            mutation: mutation.to_string(),
            rarity: rarity.to_string(),
            generation: Generation {
                raw: per_second
                    .map(|p| format!("${}/s", crate::money::format_human(p)))
                    .unwrap_or_default(),
                per_second: per_second.map(Rate::Number),
                ready: per_second.is_some(),
            },
        })
    }

    /// Empty podium slot
    pub fn empty(&mut self) -> AnimalPodium {
        self.counter += 1;
        AnimalPodium::Empty {
            index: u64::from(self.counter).into(),
        }
    }

    /// Plot holding the given podiums
    pub fn plot(&mut self, sign: &str, podiums: Vec<AnimalPodium>) -> Plot {
        Plot {
            plot_sign: sign.to_string(),
            remaining_time: RemainingTime::default(),
            animal_podiums: podiums,
            meta: PlotMeta {
                timestamp: Utc::now().to_rfc3339(),
            },
        }
    }

    /// Job with a generated id
    pub fn job(&mut self, plots: Vec<Plot>) -> JobPayload {
        self.counter += 1;
        JobPayload {
            job_id: format!("job-{}", self.counter),
            generated_at: Utc::now().to_rfc3339(),
            plots,
        }
    }

    /// Job with a fixed id
    pub fn job_with_id(&mut self, job_id: &str, plots: Vec<Plot>) -> JobPayload {
        JobPayload {
            job_id: job_id.to_string(),
            generated_at: Utc::now().to_rfc3339(),
            plots,
        }
    }
}
