//! HTTP surface
//!
//! Ingest, buffer queries, watchlist management, the server-list proxy and
//! the per-room SSE feed.

pub mod error;

use crate::app::AppState;
use crate::config::Config;
use crate::model::JobPayload;
use crate::money::parse_magnitude_str;
use crate::storage::AnimalQuery;
use crate::watchlist::WatchEntry;
use axum::{
    extract::{
        rejection::{JsonRejection, QueryRejection},
        Path, Query, State,
    },
    http::HeaderValue,
    response::sse::{Event as SseEvent, KeepAlive, Sse},
    routing::{delete, get, post},
    Json, Router,
};
use futures_util::{future::join_all, Stream};
use serde::Deserialize;
use serde_json::{json, Value};
use std::{convert::Infallible, sync::Arc, time::Duration};
use tokio_stream::wrappers::{errors::BroadcastStreamRecvError, BroadcastStream};
use tower_http::{
    cors::{Any, CorsLayer},
    trace::TraceLayer,
};

pub use error::{ApiError, ApiResult};

async fn banner() -> &'static str {
    "PlotStream is running"
}

async fn health() -> Json<Value> {
    Json(json!({ "ok": true }))
}

async fn ingest(
    State(state): State<Arc<AppState>>,
    payload: Result<Json<JobPayload>, JsonRejection>,
) -> ApiResult<Json<Value>> {
    let Json(payload) = payload.inspect_err(|e| tracing::debug!("Rejected ingest body: {}", e))?;
    let receipt = state.stream.ingest(payload).await?;
    Ok(Json(json!({
        "success": true,
        "jobId": receipt.job_id,
        "received": receipt.received,
    })))
}

#[derive(Debug, Default, Deserialize)]
struct FilterParams {
    mutation: Option<String>,
    rarity: Option<String>,
    min: Option<String>,
    #[serde(rename = "minPerSecond")]
    min_per_second: Option<String>,
}

impl FilterParams {
    fn into_query(self) -> AnimalQuery {
        let non_empty = |s: Option<String>| s.filter(|v| !v.trim().is_empty());
        AnimalQuery {
            mutation: non_empty(self.mutation),
            rarity: non_empty(self.rarity),
            min_per_second: self
                .min
                .or(self.min_per_second)
                .and_then(|raw| parse_magnitude_str(&raw)),
        }
    }
}

async fn filter(
    State(state): State<Arc<AppState>>,
    params: Result<Query<FilterParams>, QueryRejection>,
) -> ApiResult<Json<Value>> {
    let Query(params) = params?;
    let data = state.stream.filter(&params.into_query());
    Ok(Json(json!({ "success": true, "count": data.len(), "data": data })))
}

async fn latest(State(state): State<Arc<AppState>>) -> Json<Value> {
    Json(json!({ "success": true, "data": state.stream.latest() }))
}

async fn jobs(State(state): State<Arc<AppState>>) -> Json<Value> {
    Json(json!({ "success": true, "data": state.stream.jobs() }))
}

#[derive(Debug, Deserialize)]
struct WatchItem {
    #[serde(alias = "q", alias = "name")]
    term: Option<String>,
    mutation: Option<String>,
}

/// Single `{q|term|name, mutation?}` or bulk `{items: [...]}`
#[derive(Debug, Deserialize)]
struct WatchBody {
    #[serde(alias = "q", alias = "name")]
    term: Option<String>,
    mutation: Option<String>,
    items: Option<Vec<WatchItem>>,
}

impl WatchBody {
    fn pairs(&self) -> Vec<(&str, Option<&str>)> {
        match &self.items {
            Some(items) => items
                .iter()
                .map(|i| (i.term.as_deref().unwrap_or_default(), i.mutation.as_deref()))
                .collect(),
            None => vec![(
                self.term.as_deref().unwrap_or_default(),
                self.mutation.as_deref(),
            )],
        }
    }

    fn is_single_blank(&self) -> bool {
        self.items.is_none() && !self.term.as_deref().is_some_and(|t| !t.trim().is_empty())
    }
}

fn watch_response(list: Vec<WatchEntry>, key: &str, count: usize) -> Json<Value> {
    let mut body = json!({ "success": true, "data": list });
    body[key] = json!(count);
    Json(body)
}

async fn list_watch(State(state): State<Arc<AppState>>) -> Json<Value> {
    Json(json!({ "success": true, "data": state.stream.watchlist().list() }))
}

async fn add_watch(
    State(state): State<Arc<AppState>>,
    body: Result<Json<WatchBody>, JsonRejection>,
) -> ApiResult<Json<Value>> {
    let Json(body) = body?;
    if body.is_single_blank() {
        return Err(ApiError::bad_request("term is required"));
    }
    let watchlist = state.stream.watchlist();
    let added = watchlist.add_many(body.pairs()).len();
    tracing::info!(added, total = watchlist.len(), "Watchlist updated");
    Ok(watch_response(watchlist.list(), "added", added))
}

async fn remove_watch(
    State(state): State<Arc<AppState>>,
    body: Result<Json<WatchBody>, JsonRejection>,
) -> ApiResult<Json<Value>> {
    let Json(body) = body?;
    if body.is_single_blank() {
        return Err(ApiError::bad_request("term is required"));
    }
    let watchlist = state.stream.watchlist();
    let removed = watchlist.remove_many(body.pairs());
    tracing::info!(removed, total = watchlist.len(), "Watchlist updated");
    Ok(watch_response(watchlist.list(), "removed", removed))
}

async fn clear_watch(State(state): State<Arc<AppState>>) -> Json<Value> {
    let watchlist = state.stream.watchlist();
    let removed = watchlist.len();
    watchlist.clear();
    tracing::info!(removed, "Watchlist cleared");
    watch_response(Vec::new(), "removed", removed)
}

/// `servers` array of one upstream, or nothing if the upstream is unusable
async fn fetch_servers(client: &reqwest::Client, url: &str) -> Vec<Value> {
    let response = match client
        .get(url)
        .header(reqwest::header::ACCEPT, "application/json")
        .send()
        .await
    {
        Ok(r) if r.status().is_success() => r,
        Ok(r) => {
            tracing::warn!(url, status = r.status().as_u16(), "Server list fetch failed");
            return Vec::new();
        }
        Err(e) => {
            tracing::warn!(url, "Server list fetch failed: {}", e);
            return Vec::new();
        }
    };

    match response.json::<Value>().await {
        Ok(Value::Object(mut body)) => match body.remove("servers") {
            Some(Value::Array(servers)) => servers,
            _ => Vec::new(),
        },
        Ok(_) => Vec::new(),
        Err(e) => {
            tracing::warn!(url, "Server list is not JSON: {}", e);
            Vec::new()
        }
    }
}

async fn servers(State(state): State<Arc<AppState>>) -> Json<Value> {
    let results = join_all(
        state
            .server_sources
            .iter()
            .map(|url| fetch_servers(&state.http, url)),
    )
    .await;
    let servers: Vec<Value> = results.into_iter().flatten().collect();

    Json(json!({
        "ok": true,
        "placeId": state.place_id,
        "totalFetched": servers.len(),
        "servers": servers,
    }))
}

async fn room_events(
    State(state): State<Arc<AppState>>,
    Path(room): Path<String>,
) -> Sse<impl Stream<Item = Result<SseEvent, Infallible>>> {
    tracing::debug!(room = %room, "Room subscriber joined");
    let receiver = BroadcastStream::new(state.hub.subscribe());
    let stream = tokio_stream::StreamExt::filter_map(receiver, move |event| match event {
        Ok(evt) if evt.room == room => Some(Ok(SseEvent::default().event("job").data(evt.job_id))),
        Ok(_) => None,
        Err(BroadcastStreamRecvError::Lagged(_)) => None,
    });

    Sse::new(stream).keep_alive(
        KeepAlive::new()
            .interval(Duration::from_secs(15))
            .text("keep-alive"),
    )
}

fn cors_layer(origins: &[String]) -> CorsLayer {
    if origins.is_empty() || origins.iter().any(|o| o == "*") {
        return CorsLayer::new().allow_origin(Any).allow_methods(Any).allow_headers(Any);
    }
    let origins: Vec<HeaderValue> = origins
        .iter()
        .filter_map(|o| match o.parse() {
            Ok(value) => Some(value),
            Err(_) => {
                tracing::warn!("Ignoring invalid CORS origin {}", o);
                None
            }
        })
        .collect();
    CorsLayer::new()
        .allow_origin(origins)
        .allow_methods(Any)
        .allow_headers(Any)
}

pub fn app_router(state: Arc<AppState>, config: &Config) -> Router {
    let plots = Router::new()
        .route("/ingest", post(ingest))
        .route("/filter", get(filter))
        .route("/latest", get(latest))
        .route("/jobs", get(jobs))
        .route("/watch", get(list_watch).post(add_watch).delete(remove_watch))
        .route("/watch/all", delete(clear_watch))
        .route("/servers", get(servers));

    Router::new()
        .route("/", get(banner))
        .route("/health", get(health))
        .nest("/plots", plots)
        .route("/rooms/{room}/events", get(room_events))
        .with_state(state)
        .layer(cors_layer(&config.server.cors_origins))
        .layer(TraceLayer::new_for_http())
}
