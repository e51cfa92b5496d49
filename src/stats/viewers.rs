//! Per-stream viewer counts

use std::collections::HashMap;

use serde::Serialize;
use tokio::sync::{broadcast, RwLock};

/// Viewer count change for one stream key
#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
pub struct ViewerCount {
    pub key: String,
    pub count: u32,
}

/// Tracks how many viewers have joined each stream page
///
/// Counts live only in memory and start at 0 for unknown keys.
pub struct ViewerCounter {
    counts: RwLock<HashMap<String, u32>>,
    changes: broadcast::Sender<ViewerCount>,
}

impl ViewerCounter {
    pub fn new(capacity: usize) -> Self {
        let (changes, _) = broadcast::channel(capacity.max(1));

        Self {
            counts: RwLock::new(HashMap::new()),
            changes,
        }
    }

    /// Subscribe to count changes for all keys
    pub fn subscribe(&self) -> broadcast::Receiver<ViewerCount> {
        self.changes.subscribe()
    }

    /// Add a viewer, returning the new count
    pub async fn join(&self, key: &str) -> u32 {
        let mut counts = self.counts.write().await;
        let count = counts.entry(key.to_string()).or_insert(0);
        *count = count.saturating_add(1);
        let count = *count;

        tracing::debug!(stream = %key, viewers = count, "Viewer joined");
        self.notify(key, count);
        count
    }

    /// Remove a viewer, returning the new count
    ///
    /// A key whose count drops to 0 is forgotten.
    pub async fn leave(&self, key: &str) -> u32 {
        let mut counts = self.counts.write().await;
        let count = match counts.get_mut(key) {
            Some(count) => {
                *count = count.saturating_sub(1);
                *count
            }
            None => 0,
        };
        if count == 0 {
            counts.remove(key);
        }

        tracing::debug!(stream = %key, viewers = count, "Viewer left");
        self.notify(key, count);
        count
    }

    pub async fn count(&self, key: &str) -> u32 {
        self.counts.read().await.get(key).copied().unwrap_or(0)
    }

    /// Forget a key, e.g. after its stream was removed
    pub async fn reset(&self, key: &str) {
        let removed = self.counts.write().await.remove(key);

        if removed.is_some() {
            tracing::debug!(stream = %key, "Viewer count reset");
            self.notify(key, 0);
        }
    }

    fn notify(&self, key: &str, count: u32) {
        // Err only means nobody is listening
        let receivers = self
            .changes
            .send(ViewerCount {
                key: key.to_string(),
                count,
            })
            .unwrap_or(0);

        tracing::trace!(stream = %key, viewers = count, receivers = receivers, "Viewer count sent");
    }
}

impl Default for ViewerCounter {
    fn default() -> Self {
        Self::new(64)
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[tokio::test]
    async fn test_join_leave() {
        let viewers = ViewerCounter::default();

        assert_eq!(viewers.join("cam").await, 1);
        assert_eq!(viewers.join("cam").await, 2);
        assert_eq!(viewers.leave("cam").await, 1);
        assert_eq!(viewers.count("cam").await, 1);
        assert_eq!(viewers.count("other").await, 0);
    }

    #[tokio::test]
    async fn test_leave_never_goes_negative() {
        let viewers = ViewerCounter::default();

        assert_eq!(viewers.leave("cam").await, 0);
        viewers.join("cam").await;
        viewers.leave("cam").await;
        assert_eq!(viewers.leave("cam").await, 0);
    }

    #[tokio::test]
    async fn test_idle_keys_are_forgotten() {
        let viewers = ViewerCounter::default();

        for i in 0..1000 {
            let key = format!("page-{}", i);
            viewers.join(&key).await;
            viewers.leave(&key).await;
        }
        viewers.join("cam").await;
        viewers.join("cam").await;
        viewers.leave("cam").await;

        let counts = viewers.counts.read().await;
        assert_eq!(counts.len(), 1);
        assert_eq!(counts.get("cam"), Some(&1));
    }

    #[tokio::test]
    async fn test_reset() {
        let viewers = ViewerCounter::default();
        viewers.join("cam").await;
        viewers.join("cam").await;

        let mut changes = viewers.subscribe();
        viewers.reset("cam").await;

        assert_eq!(viewers.count("cam").await, 0);
        assert_eq!(
            changes.recv().await.unwrap(),
            ViewerCount {
                key: "cam".into(),
                count: 0
            }
        );

        // Unknown keys stay silent
        viewers.reset("ghost").await;
        assert!(changes.try_recv().is_err());
    }

    #[tokio::test]
    async fn test_changes_are_broadcast() {
        let viewers = ViewerCounter::default();
        let mut changes = viewers.subscribe();

        viewers.join("a").await;
        viewers.join("b").await;

        assert_eq!(changes.recv().await.unwrap().key, "a");
        let b = changes.recv().await.unwrap();
        assert_eq!((b.key.as_str(), b.count), ("b", 1));
    }
}
