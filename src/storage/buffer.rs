//! Time-windowed in-memory snapshot buffer
//!
//! Expiry is enforced lazily: every push and every read evicts jobs older
//! than the TTL before touching the data. There is no background timer.

use crate::model::{AnimalPodium, JobPayload, MatchedAnimal, MatchedGeneration, Plot};
use chrono::{DateTime, Duration, Utc};
use parking_lot::Mutex;
use serde::Deserialize;
use std::collections::VecDeque;

/// Default retention window
pub const DEFAULT_TTL_SECS: i64 = 60;

/// Snapshot plus the time it was received
#[derive(Debug, Clone)]
struct BufferedJob {
    job: JobPayload,
    received_at: DateTime<Utc>,
}

/// Filter over retained animals
#[derive(Debug, Clone, Default, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct AnimalQuery {
    pub mutation: Option<String>,
    pub rarity: Option<String>,
    pub min_per_second: Option<f64>,
}

/// Snapshot buffer, shared behind an `Arc`
#[derive(Debug)]
pub struct SnapshotBuffer {
    jobs: Mutex<VecDeque<BufferedJob>>,
    ttl: Duration,
}

impl Default for SnapshotBuffer {
    fn default() -> Self {
        Self::new(DEFAULT_TTL_SECS)
    }
}

impl SnapshotBuffer {
    pub fn new(ttl_secs: i64) -> Self {
        Self {
            jobs: Mutex::new(VecDeque::new()),
            ttl: Duration::seconds(ttl_secs),
        }
    }

    pub fn ttl(&self) -> Duration {
        self.ttl
    }

    /// Append a job received now
    pub fn push(&self, job: JobPayload) {
        self.push_at(job, Utc::now());
    }

    /// Append a job with an explicit receive time, then evict
    pub fn push_at(&self, job: JobPayload, now: DateTime<Utc>) {
        let mut jobs = self.jobs.lock();
        jobs.push_back(BufferedJob {
            job,
            received_at: now,
        });
        Self::evict_locked(&mut jobs, now - self.ttl);
    }

    /// Drop every job received before `now - ttl`; returns how many were dropped
    pub fn evict(&self, now: DateTime<Utc>) -> usize {
        let mut jobs = self.jobs.lock();
        Self::evict_locked(&mut jobs, now - self.ttl)
    }

    fn evict_locked(jobs: &mut VecDeque<BufferedJob>, min_ts: DateTime<Utc>) -> usize {
        let before = jobs.len();
        jobs.retain(|entry| entry.received_at >= min_ts);
        before - jobs.len()
    }

    /// All retained plots, oldest job first
    pub fn dump(&self) -> Vec<Plot> {
        self.dump_at(Utc::now())
    }

    pub fn dump_at(&self, now: DateTime<Utc>) -> Vec<Plot> {
        let mut jobs = self.jobs.lock();
        Self::evict_locked(&mut jobs, now - self.ttl);
        jobs.iter()
            .flat_map(|entry| entry.job.plots.iter().cloned())
            .collect()
    }

    /// All retained jobs, oldest first
    pub fn dump_jobs(&self) -> Vec<JobPayload> {
        self.dump_jobs_at(Utc::now())
    }

    pub fn dump_jobs_at(&self, now: DateTime<Utc>) -> Vec<JobPayload> {
        let mut jobs = self.jobs.lock();
        Self::evict_locked(&mut jobs, now - self.ttl);
        jobs.iter().map(|entry| entry.job.clone()).collect()
    }

    /// Occupied podiums matching the query.
    ///
    /// Pending slots (no per-second value) never match, with or without
    /// a minimum.
    pub fn filter_animals(&self, query: &AnimalQuery) -> Vec<MatchedAnimal> {
        self.filter_animals_at(query, Utc::now())
    }

    pub fn filter_animals_at(&self, query: &AnimalQuery, now: DateTime<Utc>) -> Vec<MatchedAnimal> {
        let mut jobs = self.jobs.lock();
        Self::evict_locked(&mut jobs, now - self.ttl);

        let mut out = Vec::new();
        for plot in jobs.iter().flat_map(|entry| entry.job.plots.iter()) {
            for podium in &plot.animal_podiums {
                let AnimalPodium::Occupied(animal) = podium else {
                    continue;
                };
                if let Some(mutation) = query.mutation.as_deref() {
                    if animal.mutation != mutation {
                        continue;
                    }
                }
                if let Some(rarity) = query.rarity.as_deref() {
                    if animal.rarity != rarity {
                        continue;
                    }
                }
                let Some(per_second) = animal.generation.per_second_value() else {
                    continue;
                };
                if query.min_per_second.is_some_and(|min| per_second < min) {
                    continue;
                }
                out.push(MatchedAnimal {
                    plot_sign: plot.plot_sign.clone(),
                    index: animal.index.clone(),
                    display_name: animal.display_name.clone(),
                    mutation: animal.mutation.clone(),
                    rarity: animal.rarity.clone(),
                    generation: MatchedGeneration {
                        raw: animal.generation.raw.clone(),
                        per_second: Some(per_second),
                    },
                    timestamp: plot.meta.timestamp.clone(),
                });
            }
        }
        out
    }

    /// Number of retained jobs (without evicting)
    pub fn len(&self) -> usize {
        self.jobs.lock().len()
    }

    pub fn is_empty(&self) -> bool {
        self.len() == 0
    }
}
