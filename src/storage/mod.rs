//! In-memory snapshot storage

pub mod buffer;

#[cfg(test)]
mod tests;

pub use buffer::{AnimalQuery, SnapshotBuffer, DEFAULT_TTL_SECS};
