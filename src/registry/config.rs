//! Registry configuration

use std::time::Duration;

/// Admission policy for the stream registry
///
/// Fixed at construction. The registry never changes these values at runtime.
#[derive(Debug, Clone)]
pub struct RegistryConfig {
    /// Capacity used by the admission check
    pub max_streams: usize,

    /// How long a disconnected, password-protected key stays reserved
    pub password_protection_period: Duration,

    /// Whether keys without a configured slot may be claimed ad hoc
    pub free_choice: bool,

    /// Buffered events per subscriber before lagging receivers drop events
    pub event_capacity: usize,
}

impl Default for RegistryConfig {
    fn default() -> Self {
        Self {
            max_streams: 10,
            password_protection_period: Duration::from_secs(60),
            free_choice: true,
            event_capacity: 64,
        }
    }
}

impl RegistryConfig {
    /// Set the stream capacity
    pub fn max_streams(mut self, max: usize) -> Self {
        self.max_streams = max;
        self
    }

    /// Set the grace window for disconnected password-protected streams
    pub fn password_protection_period(mut self, period: Duration) -> Self {
        self.password_protection_period = period;
        self
    }

    /// Allow or forbid unconfigured stream keys
    pub fn free_choice(mut self, enabled: bool) -> Self {
        self.free_choice = enabled;
        self
    }

    /// Set the event channel capacity (minimum 1)
    pub fn event_capacity(mut self, capacity: usize) -> Self {
        self.event_capacity = capacity.max(1);
        self
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_default_config() {
        let config = RegistryConfig::default();

        assert_eq!(config.max_streams, 10);
        assert_eq!(config.password_protection_period, Duration::from_secs(60));
        assert!(config.free_choice);
        assert_eq!(config.event_capacity, 64);
    }

    #[test]
    fn test_builder_chaining() {
        let config = RegistryConfig::default()
            .max_streams(2)
            .password_protection_period(Duration::from_secs(5))
            .free_choice(false);

        assert_eq!(config.max_streams, 2);
        assert_eq!(config.password_protection_period, Duration::from_secs(5));
        assert!(!config.free_choice);
    }

    #[test]
    fn test_event_capacity_floor() {
        // broadcast::channel panics on zero capacity
        let config = RegistryConfig::default().event_capacity(0);

        assert_eq!(config.event_capacity, 1);
    }
}
