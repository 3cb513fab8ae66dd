//! Cached entity types.

use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};
use sqlx::FromRow;

/// A story as cached locally.
///
/// Immutable value type. Identity is the `id` (unique in the cache via
/// replace-on-conflict upserts); equality compares every field, so a
/// re-fetched story with changed content is "same identity, different
/// content".
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize, FromRow)]
pub struct StoryRecord {
    /// Unique story identifier.
    pub id: String,
    /// Display name of the author.
    pub name: String,
    /// Story text.
    pub description: String,
    /// URL of the uploaded photo, when present.
    pub photo_url: Option<String>,
    /// RFC 3339 creation timestamp as sent by the service.
    pub created_at: String,
    /// Latitude, when the story was geo-tagged.
    pub lat: Option<f64>,
    /// Longitude, when the story was geo-tagged.
    pub lon: Option<f64>,
}

impl StoryRecord {
    /// Parsed creation time, when the service sent a well-formed timestamp.
    pub fn created_at_utc(&self) -> Option<DateTime<Utc>> {
        DateTime::parse_from_rfc3339(&self.created_at)
            .ok()
            .map(|dt| dt.with_timezone(&Utc))
    }

    /// Whether the story carries usable coordinates.
    pub fn has_location(&self) -> bool {
        self.lat.is_some() && self.lon.is_some()
    }
}

/// Paging continuation metadata for one cached story.
///
/// Records which neighbouring pages exist around the page this story
/// arrived on. `None` means "no further page in that direction".
#[derive(Debug, Clone, PartialEq, Eq, FromRow)]
pub struct RemoteKey {
    /// Story this key belongs to.
    pub story_id: String,
    /// Previous page index, `None` at the start of the feed.
    pub prev_key: Option<u32>,
    /// Next page index, `None` once the end of the feed was observed.
    pub next_key: Option<u32>,
}

#[cfg(test)]
mod tests {
    use super::*;

    fn record(id: &str) -> StoryRecord {
        StoryRecord {
            id: id.to_string(),
            name: "Alex".to_string(),
            description: "pier at dusk".to_string(),
            photo_url: None,
            created_at: "2024-11-20T10:00:00Z".to_string(),
            lat: None,
            lon: None,
        }
    }

    #[test]
    fn test_equality_is_full_field() {
        let a = record("s1");
        let mut b = record("s1");
        assert_eq!(a, b);

        b.description = "changed".to_string();
        assert_ne!(a, b, "Same identity, different content");
    }

    #[test]
    fn test_created_at_parsing() {
        let story = record("s1");
        let parsed = story.created_at_utc().unwrap();
        assert_eq!(parsed.timestamp(), 1732096800);

        let mut garbled = record("s2");
        garbled.created_at = "yesterday-ish".to_string();
        assert!(garbled.created_at_utc().is_none());
    }

    #[test]
    fn test_has_location_requires_both_coordinates() {
        let mut story = record("s1");
        assert!(!story.has_location());

        story.lat = Some(-6.2);
        assert!(!story.has_location());

        story.lon = Some(106.8);
        assert!(story.has_location());
    }
}
