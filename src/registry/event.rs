//! Broadcast types for registry changes
//!
//! Viewers never see registry entries directly. They receive a
//! [`StreamSummary`] per listed stream, which omits the password and the
//! timestamps.

use serde::Serialize;

use super::entry::StreamEntry;

/// Public view of a listed stream
#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
pub struct StreamSummary {
    pub key: String,
    pub description: Option<String>,
    pub unlisted: bool,
    pub protected: bool,
}

impl From<&StreamEntry> for StreamSummary {
    fn from(entry: &StreamEntry) -> Self {
        Self {
            key: entry.key().to_string(),
            description: entry.description().map(str::to_string),
            unlisted: entry.is_unlisted(),
            protected: entry.is_protected(),
        }
    }
}

/// What happened to a stream key
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize)]
#[serde(rename_all = "snake_case")]
pub enum EventKind {
    /// A publisher was admitted
    Added,
    /// A publisher stopped (entry removed or deactivated)
    Removed,
}

/// Change notification sent to every subscriber of the registry
#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
pub struct RegistryEvent {
    pub kind: EventKind,
    pub key: String,
    /// Snapshot of listed streams taken right after the change
    pub list: Vec<StreamSummary>,
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::registry::entry::StreamOptions;

    #[tokio::test]
    async fn test_summary_hides_password() {
        let entry = StreamEntry::new(
            "cam",
            StreamOptions::default().password("hunter2").description("desk"),
        );

        let json = serde_json::to_value(StreamSummary::from(&entry)).unwrap();

        assert_eq!(
            json,
            serde_json::json!({
                "key": "cam",
                "description": "desk",
                "unlisted": false,
                "protected": false,
            })
        );
    }

    #[test]
    fn test_event_kind_serializes_snake_case() {
        assert_eq!(
            serde_json::to_string(&EventKind::Removed).unwrap(),
            "\"removed\""
        );
    }
}
