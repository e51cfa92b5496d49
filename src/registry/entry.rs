//! Stream entry types
//!
//! This module defines the per-key record stored in the registry: one
//! publishing slot, either live or dormant.

use std::time::Duration;

use tokio::time::Instant;

/// Optional attributes of a stream, everything except the key
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct StreamOptions {
    /// Password required to reclaim the key (None = anyone may use it)
    pub password: Option<String>,
    /// Free-form description shown on the stream page
    pub description: Option<String>,
    /// Hidden from listings but reachable by direct key
    pub unlisted: bool,
    /// Permanently reserved slot, never removed from the registry
    pub protected: bool,
}

impl StreamOptions {
    /// Set the password
    pub fn password(mut self, password: impl Into<String>) -> Self {
        self.password = Some(password.into());
        self
    }

    /// Set the description
    pub fn description(mut self, description: impl Into<String>) -> Self {
        self.description = Some(description.into());
        self
    }

    /// Mark as unlisted
    pub fn unlisted(mut self, unlisted: bool) -> Self {
        self.unlisted = unlisted;
        self
    }

    /// Mark as protected
    pub fn protected(mut self, protected: bool) -> Self {
        self.protected = protected;
        self
    }
}

/// Entry for a single stream key in the registry
///
/// `deactivated_at` is `Some` exactly when the entry is inactive.
#[derive(Debug, Clone)]
pub struct StreamEntry {
    key: String,
    password: Option<String>,
    description: Option<String>,
    unlisted: bool,
    protected: bool,
    active: bool,
    created_at: Instant,
    deactivated_at: Option<Instant>,
}

impl StreamEntry {
    /// Create a new, active stream entry
    pub fn new(key: impl Into<String>, options: StreamOptions) -> Self {
        Self {
            key: key.into(),
            password: options.password,
            description: options.description,
            unlisted: options.unlisted,
            protected: options.protected,
            active: true,
            created_at: Instant::now(),
            deactivated_at: None,
        }
    }

    /// Create a protected, dormant entry for a key reserved at boot
    pub fn reserved(key: impl Into<String>, options: StreamOptions) -> Self {
        let mut entry = Self::new(key, options.protected(true));
        entry.deactivate();
        entry
    }

    pub fn key(&self) -> &str {
        &self.key
    }

    pub fn description(&self) -> Option<&str> {
        self.description.as_deref()
    }

    pub fn is_unlisted(&self) -> bool {
        self.unlisted
    }

    pub fn is_protected(&self) -> bool {
        self.protected
    }

    pub fn is_active(&self) -> bool {
        self.active
    }

    /// Whether a password is set on this entry
    pub fn has_password(&self) -> bool {
        self.password.is_some()
    }

    /// Check a candidate password
    ///
    /// Always true when the entry has no password.
    pub fn password_matches(&self, candidate: Option<&str>) -> bool {
        match self.password.as_deref() {
            None => true,
            Some(password) => candidate == Some(password),
        }
    }

    /// Mark the stream as no longer publishing
    ///
    /// Calling this on an inactive entry restarts the inactivity clock.
    pub fn deactivate(&mut self) {
        self.active = false;
        self.deactivated_at = Some(Instant::now());
    }

    /// Time since deactivation, `None` while active
    pub fn time_inactive(&self) -> Option<Duration> {
        if self.active {
            return None;
        }
        self.deactivated_at.map(|at| at.elapsed())
    }

    /// Time since the entry was created, `None` while inactive
    pub fn time_active(&self) -> Option<Duration> {
        if self.active {
            Some(self.created_at.elapsed())
        } else {
            None
        }
    }

    /// Whether the key is still held by this entry
    ///
    /// Active entries always are. Inactive ones are until `period` has
    /// elapsed since deactivation.
    pub fn has_grace_period(&self, period: Duration) -> bool {
        match self.time_inactive() {
            None => true,
            Some(inactive) => inactive < period,
        }
    }

    pub(super) fn password(&self) -> Option<&str> {
        self.password.as_deref()
    }

    pub(super) fn set_protected(&mut self, protected: bool) {
        self.protected = protected;
    }
}
