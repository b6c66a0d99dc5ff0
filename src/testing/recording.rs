//! Recording notification sink
//!
//! Captures every delivery instead of posting it.

use crate::notify::{DispatchReport, Notification, NotificationSink, MAX_EMBEDS_PER_MESSAGE};
use async_trait::async_trait;
use parking_lot::Mutex;

/// One captured `deliver` call
#[derive(Debug, Clone)]
pub struct Delivery {
    pub urls: Vec<String>,
    pub notification: Notification,
}

/// Sink that records deliveries and reports them as sent
#[derive(Debug, Default)]
pub struct RecordingSink {
    calls: Mutex<Vec<Delivery>>,
}

impl RecordingSink {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn calls(&self) -> Vec<Delivery> {
        self.calls.lock().clone()
    }

    pub fn len(&self) -> usize {
        self.calls.lock().len()
    }

    pub fn is_empty(&self) -> bool {
        self.calls.lock().is_empty()
    }

    /// Deliveries addressed to `url`
    pub fn to_url(&self, url: &str) -> Vec<Delivery> {
        self.calls
            .lock()
            .iter()
            .filter(|d| d.urls.iter().any(|u| u == url))
            .cloned()
            .collect()
    }
}

#[async_trait]
impl NotificationSink for RecordingSink {
    async fn deliver(&self, urls: &[String], notification: &Notification) -> DispatchReport {
        self.calls.lock().push(Delivery {
            urls: urls.to_vec(),
            notification: notification.clone(),
        });
        let batches = notification.embeds.len().div_ceil(MAX_EMBEDS_PER_MESSAGE);
        DispatchReport {
            sent: batches * urls.len(),
            failed: 0,
            rate_limited: 0,
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::notify::Embed;

    fn embeds(count: usize) -> Notification {
        Notification {
            embeds: (0..count)
                .map(|i| Embed {
                    title: format!("Embed {}", i),
                    description: String::new(),
                    color: 0,
                    fields: vec![],
                    footer: None,
                })
                .collect(),
            components: vec![],
        }
    }

    #[test]
    fn test_records_and_counts_batches() {
        let sink = RecordingSink::new();
        let urls = vec!["https://a.test/hook".to_string(), "https://b.test/hook".to_string()];

        let report = tokio_test::block_on(sink.deliver(&urls, &embeds(12)));
        assert_eq!(report.sent, 4);
        assert_eq!(sink.len(), 1);
        assert_eq!(sink.to_url("https://b.test/hook").len(), 1);
        assert!(sink.to_url("https://c.test/hook").is_empty());
    }
}
