//! Ingest orchestration
//!
//! One `ingest` call runs: validate, buffer, route + dispatch per channel,
//! watchlist scan + dispatch, room flags. Delivery problems in one step
//! never stop the next one.


use crate::error::Result;
use crate::model::{AnimalEntry, JobPayload, MatchedAnimal, Plot};
use crate::notify::{DispatchReport, EmbedFormatter, FormatItem, NotificationSink};
use crate::rooms::{flagged_rooms, FlagRule, RoomBroadcaster};
use crate::router::ThresholdRouter;
use crate::storage::{AnimalQuery, SnapshotBuffer};
use crate::watchlist::Watchlist;
use serde::Serialize;
use std::sync::Arc;

/// Label of watchlist notifications
pub const WATCHLIST_LABEL: &str = "Watchlist";

/// Ingest acknowledgement returned to the caller
#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct IngestReceipt {
    pub job_id: String,
    /// Number of plots in the job
    pub received: usize,
    #[serde(skip)]
    pub summary: IngestSummary,
}

/// What each step of an ingest produced
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct IngestSummary {
    /// Channels that received a notification
    pub channels_notified: usize,
    /// Entries routed across all channels
    pub routed_items: usize,
    pub channel_report: DispatchReport,
    pub watch_matches: usize,
    pub watch_report: DispatchReport,
    pub rooms: Vec<String>,
}

/// The ingest pipeline and its collaborators
pub struct PlotStream {
    buffer: Arc<SnapshotBuffer>,
    router: ThresholdRouter,
    watchlist: Arc<Watchlist>,
    formatter: EmbedFormatter,
    sink: Arc<dyn NotificationSink>,
    rooms: Arc<dyn RoomBroadcaster>,
    flag_rules: Vec<FlagRule>,
    finds_webhook: Option<String>,
}

impl PlotStream {
    #[allow(clippy::too_many_arguments)]
    pub fn new(
        buffer: Arc<SnapshotBuffer>,
        router: ThresholdRouter,
        watchlist: Arc<Watchlist>,
        formatter: EmbedFormatter,
        sink: Arc<dyn NotificationSink>,
        rooms: Arc<dyn RoomBroadcaster>,
        flag_rules: Vec<FlagRule>,
        finds_webhook: Option<String>,
    ) -> Self {
        Self {
            buffer,
            router,
            watchlist,
            formatter,
            sink,
            rooms,
            flag_rules,
            finds_webhook: finds_webhook.filter(|url| !url.trim().is_empty()),
        }
    }

    pub fn buffer(&self) -> &SnapshotBuffer {
        &self.buffer
    }

    pub fn watchlist(&self) -> &Watchlist {
        &self.watchlist
    }

    pub fn router(&self) -> &ThresholdRouter {
        &self.router
    }

    pub fn filter(&self, query: &AnimalQuery) -> Vec<MatchedAnimal> {
        self.buffer.filter_animals(query)
    }

    pub fn latest(&self) -> Vec<Plot> {
        self.buffer.dump()
    }

    pub fn jobs(&self) -> Vec<JobPayload> {
        self.buffer.dump_jobs()
    }

    /// Run the full pipeline for one job.
    ///
    /// Only validation can fail; nothing is buffered or sent in that case.
    pub async fn ingest(&self, payload: JobPayload) -> Result<IngestReceipt> {
        payload.validate()?;

        let job_id = payload.job_id.clone();
        let received = payload.plots.len();
        let entries = payload.entries();
        let lag_ms = payload
            .generated_at_utc()
            .map(|ts| (chrono::Utc::now() - ts).num_milliseconds());
        self.buffer.push(payload);

        let mut summary = IngestSummary::default();
        self.route_step(&job_id, &entries, &mut summary).await;
        self.watch_step(&job_id, &entries, &mut summary).await;
        self.room_step(&job_id, &entries, &mut summary);

        tracing::info!(
            job_id = %job_id,
            plots = received,
            entries = entries.len(),
            channels = summary.channels_notified,
            watch_matches = summary.watch_matches,
            rooms = summary.rooms.len(),
            lag_ms = ?lag_ms,
            "Ingested job"
        );

        Ok(IngestReceipt {
            job_id,
            received,
            summary,
        })
    }

    async fn route_step(&self, job_id: &str, entries: &[AnimalEntry], summary: &mut IngestSummary) {
        if !self.router.has_enabled_channels() {
            tracing::debug!("No enabled channels; skipping routing");
            return;
        }

        for batch in self.router.route(entries) {
            let Some(url) = batch.channel.webhook.clone() else {
                continue;
            };
            let items: Vec<FormatItem> = batch.items.iter().map(FormatItem::from).collect();
            let notification = self.formatter.build(job_id, batch.channel.label(), &items);

            let report = self.sink.deliver(&[url], &notification).await;
            if !report.is_clean() {
                tracing::warn!(
                    job_id,
                    channel = %batch.channel.name,
                    failed = report.failed,
                    rate_limited = report.rate_limited,
                    "Channel delivery incomplete"
                );
            }
            summary.channels_notified += 1;
            summary.routed_items += items.len();
            summary.channel_report.merge(report);
        }
    }

    async fn watch_step(&self, job_id: &str, entries: &[AnimalEntry], summary: &mut IngestSummary) {
        let matches = self.watchlist.scan(entries);
        summary.watch_matches = matches.len();
        if matches.is_empty() {
            return;
        }

        let Some(url) = self.finds_webhook.clone() else {
            tracing::debug!(job_id, matches = matches.len(), "Watch matches but no finds webhook");
            return;
        };
        let items: Vec<FormatItem> = matches.iter().map(FormatItem::with_mutation).collect();
        let notification = self.formatter.build(job_id, WATCHLIST_LABEL, &items);
        summary.watch_report = self.sink.deliver(&[url], &notification).await;
    }

    fn room_step(&self, job_id: &str, entries: &[AnimalEntry], summary: &mut IngestSummary) {
        for room in flagged_rooms(&self.flag_rules, entries) {
            self.rooms.publish(room, job_id);
            summary.rooms.push(room.to_string());
        }
    }
}
