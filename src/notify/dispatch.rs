//! Webhook delivery
//!
//! Best-effort, at-most-once: each batch is posted once. A 429 only delays
//! the next batch; the rate-limited batch is not resent.

use super::{Notification, NotificationSink, WebhookPayload, MAX_EMBEDS_PER_MESSAGE};
use crate::error::{Result, StreamError};
use async_trait::async_trait;
use reqwest::header::RETRY_AFTER;
use reqwest::{Client, StatusCode};
use serde::Deserialize;
use std::time::{Duration, Instant};

#[derive(Debug, Clone, Deserialize)]
#[serde(default)]
pub struct DispatchConfig {
    /// Embeds per POST
    pub batch_size: usize,
    /// Per-call timeout
    pub timeout_ms: u64,
    /// Upper bound on the courtesy wait after a 429
    pub rate_limit_cap_ms: u64,
}

impl Default for DispatchConfig {
    fn default() -> Self {
        Self {
            batch_size: MAX_EMBEDS_PER_MESSAGE,
            timeout_ms: 5_000,
            rate_limit_cap_ms: 10_000,
        }
    }
}

/// Outcome counters for one `send`
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq)]
pub struct DispatchReport {
    /// Calls answered with 2xx
    pub sent: usize,
    /// Calls that failed for any reason (including 429)
    pub failed: usize,
    /// Subset of `failed` answered with 429
    pub rate_limited: usize,
}

impl DispatchReport {
    pub fn merge(&mut self, other: DispatchReport) {
        self.sent += other.sent;
        self.failed += other.failed;
        self.rate_limited += other.rate_limited;
    }

    pub fn attempts(&self) -> usize {
        self.sent + self.failed
    }

    pub fn is_clean(&self) -> bool {
        self.failed == 0
    }
}

/// Posts embeds to Discord-compatible webhooks
#[derive(Clone)]
pub struct WebhookDispatcher {
    http: Client,
    config: DispatchConfig,
}

impl WebhookDispatcher {
    pub fn new(config: DispatchConfig) -> Result<Self> {
        let http = Client::builder()
            .timeout(Duration::from_millis(config.timeout_ms))
            .build()?;
        Ok(Self { http, config })
    }

    pub fn config(&self) -> &DispatchConfig {
        &self.config
    }

    /// Post every batch to every URL, in order. Never fails.
    pub async fn send(&self, urls: &[String], notification: &Notification) -> DispatchReport {
        let mut report = DispatchReport::default();
        if urls.is_empty() || notification.is_empty() {
            return report;
        }

        let batch_size = self.config.batch_size.clamp(1, MAX_EMBEDS_PER_MESSAGE);
        for url in urls {
            for (batch, embeds) in notification.embeds.chunks(batch_size).enumerate() {
                let payload = WebhookPayload {
                    embeds: embeds.to_vec(),
                    components: notification.components.clone(),
                };

                let started = Instant::now();
                let outcome = self.post(url, &payload).await;
                let latency_ms = started.elapsed().as_millis() as u64;

                match outcome {
                    Ok(()) => {
                        report.sent += 1;
                        tracing::info!(
                            url = %redact(url),
                            batch,
                            embeds = embeds.len(),
                            latency_ms,
                            "Webhook POST ok"
                        );
                    }
                    Err(StreamError::RateLimited { retry_after_ms }) => {
                        report.failed += 1;
                        report.rate_limited += 1;
                        let wait = retry_after_ms.min(self.config.rate_limit_cap_ms);
                        tracing::warn!(
                            url = %redact(url),
                            batch,
                            latency_ms,
                            retry_after_ms,
                            wait_ms = wait,
                            "Webhook rate limited; batch dropped"
                        );
                        if wait > 0 {
                            tokio::time::sleep(Duration::from_millis(wait)).await;
                        }
                    }
                    Err(e) => {
                        report.failed += 1;
                        tracing::error!(
                            url = %redact(url),
                            batch,
                            latency_ms,
                            "Webhook POST failed: {}",
                            e
                        );
                    }
                }
            }
        }
        report
    }

    async fn post(&self, url: &str, payload: &WebhookPayload) -> Result<()> {
        let response = self.http.post(url).json(payload).send().await?;
        let status = response.status();
        if status.is_success() {
            return Ok(());
        }

        if status == StatusCode::TOO_MANY_REQUESTS {
            let header_hint = response
                .headers()
                .get(RETRY_AFTER)
                .and_then(|v| v.to_str().ok())
                .and_then(|s| s.trim().parse::<f64>().ok());
            let body = response.text().await.unwrap_or_default();
            let hint = header_hint.or_else(|| body_retry_after(&body));
            return Err(StreamError::RateLimited {
                retry_after_ms: seconds_to_ms(hint),
            });
        }

        let body = response.text().await.unwrap_or_default();
        Err(StreamError::Delivery {
            status: status.as_u16(),
            body: body.chars().take(200).collect(),
        })
    }
}

#[async_trait]
impl NotificationSink for WebhookDispatcher {
    async fn deliver(&self, urls: &[String], notification: &Notification) -> DispatchReport {
        self.send(urls, notification).await
    }
}

#[derive(Deserialize)]
struct RateLimitBody {
    retry_after: f64,
}

/// Discord also reports the hint in the JSON body, in seconds
fn body_retry_after(body: &str) -> Option<f64> {
    serde_json::from_str::<RateLimitBody>(body)
        .ok()
        .map(|b| b.retry_after)
}

fn seconds_to_ms(hint: Option<f64>) -> u64 {
    hint.filter(|s| s.is_finite() && *s > 0.0)
        .map(|s| (s * 1000.0).round() as u64)
        .unwrap_or(0)
}

/// Hide the webhook token (last path segment) in logs
pub(crate) fn redact(url: &str) -> String {
    match url.rsplit_once('/') {
        Some((head, tail)) if !tail.is_empty() && head.contains("/webhooks/") => {
            format!("{}/***", head)
        }
        _ => url.to_string(),
    }
}
