use async_trait::async_trait;
use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};

use crate::error::GatewayError;

/// Saved playback position for one piece of content
///
/// Built fresh for every save attempt and never mutated afterwards.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct ProgressRecord {
    pub content_id: String,
    pub position_seconds: f64,
    pub duration_seconds: f64,
    pub device_label: String,
    pub platform_label: String,
    pub recorded_at: DateTime<Utc>,
}

impl ProgressRecord {
    pub fn new(
        content_id: impl Into<String>,
        position_seconds: f64,
        duration_seconds: f64,
        device_label: impl Into<String>,
        platform_label: impl Into<String>,
    ) -> Self {
        Self {
            content_id: content_id.into(),
            position_seconds,
            duration_seconds,
            device_label: device_label.into(),
            platform_label: platform_label.into(),
            recorded_at: Utc::now(),
        }
    }
}

/// Remote store for playback progress
#[async_trait]
pub trait ProgressGateway: Send + Sync {
    fn name(&self) -> &'static str;

    /// Persist a record. Repeated saves of the same or a later position are safe.
    async fn save(&self, record: &ProgressRecord) -> Result<(), GatewayError>;

    /// Look up the last saved record; `Ok(None)` when nothing was saved.
    async fn fetch(&self, content_id: &str) -> Result<Option<ProgressRecord>, GatewayError>;

    /// Fire-and-forget save used while the host is unloading. Never waits for
    /// a response and never reports failure.
    fn send_beacon(&self, record: ProgressRecord);
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_record_serializes_camel_case() {
        let record = ProgressRecord::new("movie-1", 125.5, 1000.0, "desktop", "linux");
        let json = serde_json::to_value(&record).unwrap();
        assert_eq!(json["contentId"], "movie-1");
        assert_eq!(json["positionSeconds"], 125.5);
        assert_eq!(json["durationSeconds"], 1000.0);
        assert_eq!(json["deviceLabel"], "desktop");
        assert_eq!(json["platformLabel"], "linux");
        assert!(json["recordedAt"].is_string());
    }
}
