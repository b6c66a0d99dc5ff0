//! PlotStream
//!
//! Ingests plot snapshots from scraping clients, keeps a short in-memory
//! window of them, and routes valuable finds to Discord webhooks.

pub mod api;
pub mod app;
pub mod config;
pub mod error;
pub mod model;
pub mod money;
pub mod notify;
pub mod rooms;
pub mod router;
pub mod storage;
pub mod stream;
pub mod testing;
pub mod watchlist;

#[cfg(test)]
mod error_tests;

pub use app::{build_state, build_state_with_sink, AppState};
pub use error::{Result, StreamError};
pub use stream::{IngestReceipt, PlotStream};
