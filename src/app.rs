//! Process-wide service state

use crate::config::Config;
use crate::notify::{EmbedFormatter, NotificationSink, WebhookDispatcher};
use crate::rooms::{RoomBroadcaster, RoomHub};
use crate::router::ThresholdRouter;
use crate::storage::SnapshotBuffer;
use crate::stream::PlotStream;
use crate::watchlist::Watchlist;
use std::sync::Arc;
use std::time::Duration;

/// Shared by every HTTP handler
pub struct AppState {
    pub stream: Arc<PlotStream>,
    pub hub: RoomHub,
    /// Client for the server-list proxy
    pub http: reqwest::Client,
    pub server_sources: Vec<String>,
    pub place_id: Option<u64>,
}

/// Wire the pipeline with the production webhook dispatcher
pub fn build_state(config: &Config) -> anyhow::Result<Arc<AppState>> {
    let dispatcher = WebhookDispatcher::new(config.dispatch.clone())?;
    build_state_with_sink(config, Arc::new(dispatcher))
}

/// Wire the pipeline around an arbitrary notification sink
pub fn build_state_with_sink(
    config: &Config,
    sink: Arc<dyn NotificationSink>,
) -> anyhow::Result<Arc<AppState>> {
    let hub = RoomHub::new(config.rooms.capacity);
    let rooms: Arc<dyn RoomBroadcaster> = Arc::new(hub.clone());

    let stream = PlotStream::new(
        Arc::new(SnapshotBuffer::new(config.buffer.ttl_secs)),
        ThresholdRouter::new(config.routing.channels.clone(), config.routing.mode),
        Arc::new(Watchlist::new()),
        EmbedFormatter::new(config.format.clone()),
        sink,
        rooms,
        config.rooms.rules.clone(),
        config.routing.finds_webhook.clone(),
    );

    let http = reqwest::Client::builder()
        .timeout(Duration::from_millis(config.dispatch.timeout_ms))
        .build()?;

    Ok(Arc::new(AppState {
        stream: Arc::new(stream),
        hub,
        http,
        server_sources: config.servers.sources.clone(),
        place_id: config.servers.place_id.or(config.format.place_id),
    }))
}
