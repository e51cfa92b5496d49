//! Stream registry implementation
//!
//! The authoritative table of stream keys. Owns admission, replacement,
//! deactivation and removal, and tells subscribers about every change.

use tokio::sync::{broadcast, RwLock};

use super::config::RegistryConfig;
use super::entry::{StreamEntry, StreamOptions};
use super::error::RegistryError;
use super::event::{EventKind, RegistryEvent, StreamSummary};

/// Outcome of [`StreamRegistry::unregister`]
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Unregistered {
    /// The entry was dropped from the registry
    Removed,
    /// The entry was kept as a dormant, reclaimable slot
    Deactivated,
    /// No entry for this key
    NotFound,
}

/// Central registry for all stream keys
///
/// A single `RwLock` guards the entries, so an admission check and the
/// mutation it gates happen atomically. Entries keep insertion order, which
/// is also the listing order.
pub struct StreamRegistry {
    /// Entries in insertion order, key unique
    streams: RwLock<Vec<StreamEntry>>,

    /// Change notifications
    events: broadcast::Sender<RegistryEvent>,

    /// Configuration
    config: RegistryConfig,
}

impl StreamRegistry {
    /// Create a new stream registry with default configuration
    pub fn new() -> Self {
        Self::with_config(RegistryConfig::default())
    }

    /// Create a new stream registry with custom configuration
    pub fn with_config(config: RegistryConfig) -> Self {
        let (events, _) = broadcast::channel(config.event_capacity.max(1));

        Self {
            streams: RwLock::new(Vec::new()),
            events,
            config,
        }
    }

    /// Get the registry configuration
    pub fn config(&self) -> &RegistryConfig {
        &self.config
    }

    /// Subscribe to change notifications
    pub fn subscribe(&self) -> broadcast::Receiver<RegistryEvent> {
        self.events.subscribe()
    }

    /// Reserve a key at boot as a protected, dormant slot
    pub async fn seed(
        &self,
        key: impl Into<String>,
        options: StreamOptions,
    ) -> Result<(), RegistryError> {
        self.register(StreamEntry::reserved(key, options)).await
    }

    /// Admit a publisher
    ///
    /// Rejections are returned as [`RegistryError`] and leave the registry
    /// untouched. An existing key is only taken over when the password
    /// matches, or when an unprotected slot's grace period has run out.
    pub async fn register(&self, candidate: StreamEntry) -> Result<(), RegistryError> {
        let mut streams = self.streams.write().await;

        let active = streams.iter().filter(|s| s.is_active()).count() as i64;
        let reserved = streams
            .iter()
            .filter(|s| s.is_protected() && !s.is_active())
            .count() as i64;

        if active - reserved >= self.config.max_streams as i64 {
            tracing::warn!(
                stream = %candidate.key(),
                active = active,
                reserved = reserved,
                max_streams = self.config.max_streams,
                "Stream rejected: capacity reached"
            );
            return Err(RegistryError::CapacityReached);
        }

        // Boot-time seeding of reserved slots
        if candidate.is_protected() && !candidate.is_active() {
            if streams.iter().any(|s| s.key() == candidate.key()) {
                tracing::warn!(stream = %candidate.key(), "Reserved slot already has an entry");
                return Err(RegistryError::AlreadyRegistered(candidate.key().to_string()));
            }
            tracing::info!(stream = %candidate.key(), "Reserved stream slot");
            streams.push(candidate);
            return Ok(());
        }

        let key = candidate.key().to_string();

        if let Some(existing) = streams.iter_mut().find(|s| s.key() == key) {
            self.replace(existing, candidate)?;
        } else if !self.config.free_choice {
            tracing::warn!(stream = %key, "Stream rejected: key not configured");
            return Err(RegistryError::NotPreconfigured(key));
        } else {
            streams.push(candidate);
            tracing::info!(
                stream = %key,
                streams = streams.len(),
                "Stream registered (new key)"
            );
        }

        self.notify(EventKind::Added, &key, &streams);
        Ok(())
    }

    /// Take over an existing slot with `candidate`
    fn replace(
        &self,
        existing: &mut StreamEntry,
        mut candidate: StreamEntry,
    ) -> Result<(), RegistryError> {
        let accepted = if existing.password_matches(candidate.password()) {
            true
        } else if existing.is_protected() {
            // A password on a protected slot never expires
            false
        } else {
            !existing.has_grace_period(self.config.password_protection_period)
        };

        if !accepted {
            tracing::warn!(
                stream = %existing.key(),
                active = existing.is_active(),
                protected = existing.is_protected(),
                "Stream rejected: password mismatch"
            );
            return Err(RegistryError::PasswordMismatch(existing.key().to_string()));
        }

        // Protection belongs to the slot, not to the publisher
        candidate.set_protected(existing.is_protected());

        tracing::info!(
            stream = %existing.key(),
            was_active = existing.is_active(),
            protected = existing.is_protected(),
            "Stream registered (existing key)"
        );

        *existing = candidate;
        Ok(())
    }

    /// Handle a publisher going away
    ///
    /// Protected entries and password-protected entries still inside their
    /// grace period are deactivated. Everything else is removed.
    pub async fn unregister(&self, key: &str) -> Unregistered {
        let mut streams = self.streams.write().await;

        let Some(index) = streams.iter().position(|s| s.key() == key) else {
            tracing::debug!(stream = %key, "Unregister for unknown stream");
            return Unregistered::NotFound;
        };

        let entry = &mut streams[index];
        let keep = entry.is_protected()
            || (entry.has_password()
                && entry.has_grace_period(self.config.password_protection_period));

        let outcome = if keep {
            entry.deactivate();
            tracing::info!(
                stream = %key,
                protected = entry.is_protected(),
                grace_period_secs = self.config.password_protection_period.as_secs(),
                "Stream deactivated, key reserved"
            );
            Unregistered::Deactivated
        } else {
            streams.remove(index);
            tracing::info!(stream = %key, streams = streams.len(), "Stream removed");
            Unregistered::Removed
        };

        self.notify(EventKind::Removed, key, &streams);
        outcome
    }

    /// Look up a key, active or not
    pub async fn get(&self, key: &str) -> Option<StreamEntry> {
        let streams = self.streams.read().await;
        streams.iter().find(|s| s.key() == key).cloned()
    }

    /// Entries that appear in the public directory, in insertion order
    pub async fn listed(&self) -> Vec<StreamEntry> {
        let streams = self.streams.read().await;
        streams.iter().filter(|s| is_listed(s)).cloned().collect()
    }

    /// Serializable view of [`listed`](Self::listed)
    pub async fn snapshot(&self) -> Vec<StreamSummary> {
        let streams = self.streams.read().await;
        summarize(&streams)
    }

    /// Get total number of entries, dormant ones included
    pub async fn stream_count(&self) -> usize {
        self.streams.read().await.len()
    }

    /// Get number of currently publishing entries
    pub async fn active_count(&self) -> usize {
        let streams = self.streams.read().await;
        streams.iter().filter(|s| s.is_active()).count()
    }

    fn notify(&self, kind: EventKind, key: &str, streams: &[StreamEntry]) {
        let event = RegistryEvent {
            kind,
            key: key.to_string(),
            list: summarize(streams),
        };

        // Err only means nobody is listening
        let receivers = self.events.send(event).unwrap_or(0);
        tracing::debug!(stream = %key, ?kind, receivers = receivers, "Registry event sent");
    }
}

impl Default for StreamRegistry {
    fn default() -> Self {
        Self::new()
    }
}

fn is_listed(entry: &StreamEntry) -> bool {
    entry.is_active() && !entry.is_unlisted()
}

fn summarize(streams: &[StreamEntry]) -> Vec<StreamSummary> {
    streams
        .iter()
        .filter(|s| is_listed(s))
        .map(StreamSummary::from)
        .collect()
}

#[cfg(test)]
mod tests {
    use std::sync::Arc;
    use std::time::Duration;

    use tokio_test::{assert_err, assert_ok};

    use super::*;

    fn open(key: &str) -> StreamEntry {
        StreamEntry::new(key, StreamOptions::default())
    }

    fn locked(key: &str, password: &str) -> StreamEntry {
        StreamEntry::new(key, StreamOptions::default().password(password))
    }

    #[tokio::test]
    async fn test_register_then_get() {
        let registry = StreamRegistry::new();

        assert_ok!(registry.register(open("cam")).await);

        let entry = registry.get("cam").await.unwrap();
        assert_eq!(entry.key(), "cam");
        assert!(entry.is_active());
        assert!(registry.get("other").await.is_none());
    }

    #[tokio::test]
    async fn test_capacity_scenario() {
        let registry = StreamRegistry::with_config(RegistryConfig::default().max_streams(1));

        assert_ok!(registry.register(open("a")).await);
        assert_eq!(
            registry.register(open("b")).await,
            Err(RegistryError::CapacityReached)
        );

        assert_eq!(registry.unregister("a").await, Unregistered::Removed);
        assert!(registry.get("a").await.is_none());

        assert_ok!(registry.register(open("b")).await);
    }

    #[tokio::test]
    async fn test_capacity_counts_reserved_slack() {
        let registry = StreamRegistry::with_config(RegistryConfig::default().max_streams(1));
        assert_ok!(registry.seed("r", StreamOptions::default()).await);

        // active(0) - reserved(1) < 1
        assert_ok!(registry.register(open("other")).await);
        // active(1) - reserved(1) < 1
        assert_ok!(registry.register(open("third")).await);
        // active(2) - reserved(1) >= 1
        assert_err!(registry.register(open("fourth")).await);
    }

    #[tokio::test]
    async fn test_active_never_exceeds_capacity_without_reserved() {
        let registry = StreamRegistry::with_config(RegistryConfig::default().max_streams(3));

        for i in 0..10 {
            let _ = registry.register(open(&format!("s{i}"))).await;
        }

        assert_eq!(registry.active_count().await, 3);
    }

    #[tokio::test]
    async fn test_zero_capacity_rejects_everything() {
        let registry = StreamRegistry::with_config(RegistryConfig::default().max_streams(0));

        assert_eq!(
            registry.register(open("a")).await,
            Err(RegistryError::CapacityReached)
        );
    }

    #[tokio::test]
    async fn test_free_choice_disabled() {
        let registry = StreamRegistry::with_config(RegistryConfig::default().free_choice(false));
        assert_ok!(registry.seed("studio", StreamOptions::default()).await);

        assert_eq!(
            registry.register(open("random")).await,
            Err(RegistryError::NotPreconfigured("random".into()))
        );
        assert_ok!(registry.register(open("studio")).await);
    }

    #[tokio::test]
    async fn test_seed_never_duplicates_a_key() {
        let registry = StreamRegistry::new();
        assert_ok!(registry.register(open("a")).await);

        assert_eq!(
            registry.seed("a", StreamOptions::default()).await,
            Err(RegistryError::AlreadyRegistered("a".into()))
        );
        assert_err!(registry.seed("a", StreamOptions::default()).await);

        assert_ok!(registry.seed("b", StreamOptions::default()).await);
        assert_eq!(
            registry.seed("b", StreamOptions::default()).await,
            Err(RegistryError::AlreadyRegistered("b".into()))
        );

        assert_eq!(registry.stream_count().await, 2);
        // The live entry was left alone
        let entry = registry.get("a").await.unwrap();
        assert!(entry.is_active());
        assert!(!entry.is_protected());
    }

    #[tokio::test]
    async fn test_protected_entry_is_never_removed() {
        let registry = StreamRegistry::new();
        assert_ok!(registry.seed("studio", StreamOptions::default()).await);

        for _ in 0..3 {
            assert_ok!(registry.register(open("studio")).await);
            let entry = registry.get("studio").await.unwrap();
            assert!(entry.is_active());
            assert!(entry.is_protected());

            assert_eq!(registry.unregister("studio").await, Unregistered::Deactivated);
            let entry = registry.get("studio").await.unwrap();
            assert!(!entry.is_active());
            assert!(entry.is_protected());
        }

        assert_eq!(registry.stream_count().await, 1);
    }

    #[tokio::test(start_paused = true)]
    async fn test_protected_password_never_expires() {
        let registry = StreamRegistry::new();
        assert_ok!(registry.seed("studio", StreamOptions::default().password("x")).await);

        tokio::time::advance(Duration::from_secs(3600)).await;

        assert_eq!(
            registry.register(locked("studio", "y")).await,
            Err(RegistryError::PasswordMismatch("studio".into()))
        );
        assert_ok!(registry.register(locked("studio", "x")).await);
    }

    #[tokio::test(start_paused = true)]
    async fn test_grace_period_scenario() {
        let config = RegistryConfig::default().password_protection_period(Duration::from_secs(60));
        let registry = StreamRegistry::with_config(config);

        assert_ok!(registry.register(locked("a", "x")).await);
        assert_eq!(registry.unregister("a").await, Unregistered::Deactivated);
        assert!(registry.get("a").await.is_some());

        assert_err!(registry.register(locked("a", "y")).await);

        tokio::time::advance(Duration::from_secs(61)).await;

        assert_ok!(registry.register(locked("a", "y")).await);
        let entry = registry.get("a").await.unwrap();
        assert!(entry.is_active());
        assert!(entry.password_matches(Some("y")));
    }

    #[tokio::test(start_paused = true)]
    async fn test_correct_password_reclaims_within_grace() {
        let registry = StreamRegistry::new();

        assert_ok!(registry.register(locked("a", "x")).await);
        registry.unregister("a").await;

        tokio::time::advance(Duration::from_secs(10)).await;

        assert_ok!(registry.register(locked("a", "x")).await);
        assert!(registry.get("a").await.unwrap().is_active());
    }

    #[tokio::test]
    async fn test_active_password_stream_cannot_be_hijacked() {
        let registry = StreamRegistry::new();

        assert_ok!(registry.register(locked("a", "x")).await);

        assert_err!(registry.register(open("a")).await);
        assert_err!(registry.register(locked("a", "y")).await);
    }

    #[tokio::test(start_paused = true)]
    async fn test_unregister_after_grace_removes() {
        let config = RegistryConfig::default().password_protection_period(Duration::from_secs(5));
        let registry = StreamRegistry::with_config(config);

        assert_ok!(registry.register(locked("a", "x")).await);
        assert_eq!(registry.unregister("a").await, Unregistered::Deactivated);

        tokio::time::advance(Duration::from_secs(5)).await;

        assert_eq!(registry.unregister("a").await, Unregistered::Removed);
        assert!(registry.get("a").await.is_none());
    }

    #[tokio::test]
    async fn test_unregister_unknown_is_noop() {
        let registry = StreamRegistry::new();
        let mut events = registry.subscribe();

        assert_eq!(registry.unregister("ghost").await, Unregistered::NotFound);
        assert!(events.try_recv().is_err());
    }

    #[tokio::test]
    async fn test_replacement_keeps_slot_protection() {
        let registry = StreamRegistry::new();
        assert_ok!(registry.seed("studio", StreamOptions::default().description("old")).await);

        let candidate = StreamEntry::new("studio", StreamOptions::default().description("new"));
        assert_ok!(registry.register(candidate).await);

        let entry = registry.get("studio").await.unwrap();
        assert!(entry.is_protected());
        assert_eq!(entry.description(), Some("new"));
    }

    #[tokio::test]
    async fn test_listed_excludes_unlisted_and_inactive() {
        let registry = StreamRegistry::new();
        assert_ok!(registry.seed("dormant", StreamOptions::default()).await);
        assert_ok!(registry.register(open("public")).await);
        assert_ok!(
            registry
                .register(StreamEntry::new("hidden", StreamOptions::default().unlisted(true)))
                .await
        );
        assert_ok!(registry.register(open("second")).await);

        let keys: Vec<String> = registry
            .listed()
            .await
            .iter()
            .map(|s| s.key().to_string())
            .collect();
        assert_eq!(keys, vec!["public", "second"]);

        // Unlisted streams stay reachable by key
        assert!(registry.get("hidden").await.unwrap().is_active());

        let snapshot = registry.snapshot().await;
        assert_eq!(snapshot.len(), 2);
        assert_eq!(snapshot[0].key, "public");
    }

    #[tokio::test]
    async fn test_events_follow_mutations() {
        let registry = StreamRegistry::new();
        let mut events = registry.subscribe();

        assert_ok!(registry.seed("studio", StreamOptions::default()).await);
        assert_ok!(registry.register(open("cam")).await);
        registry.unregister("cam").await;

        let added = events.recv().await.unwrap();
        assert_eq!(added.kind, EventKind::Added);
        assert_eq!(added.key, "cam");
        assert_eq!(added.list.len(), 1);

        let removed = events.recv().await.unwrap();
        assert_eq!(removed.kind, EventKind::Removed);
        assert!(removed.list.is_empty());

        // Seeding is silent and rejections send nothing
        assert!(events.try_recv().is_err());
    }

    #[tokio::test]
    async fn test_concurrent_register_same_key() {
        let registry = Arc::new(StreamRegistry::with_config(
            RegistryConfig::default().max_streams(100),
        ));

        let handles: Vec<_> = (0..16)
            .map(|i| {
                let registry = Arc::clone(&registry);
                tokio::spawn(async move {
                    registry
                        .register(locked("shared", &format!("pw{i}")))
                        .await
                        .is_ok()
                })
            })
            .collect();

        let mut admitted = 0;
        for handle in handles {
            if handle.await.unwrap() {
                admitted += 1;
            }
        }

        assert_eq!(admitted, 1);
        assert_eq!(registry.stream_count().await, 1);
    }
}
