//! Test helpers
//!
//! Provides:
//! - Snapshot payload generators
//! - A recording notification sink

pub mod generators;
pub mod recording;

pub use generators::TestDataGenerator;
pub use recording::RecordingSink;
