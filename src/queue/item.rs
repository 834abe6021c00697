// Announcement items
use serde::{Deserialize, Serialize};

use crate::error::UnrecognizedItemError;
use crate::spatial::GeoPoint;

/// One announcement waiting to be played.
///
/// Items without a location play at the listener (no panning).
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(tag = "kind", rename_all = "snake_case")]
pub enum QueueItem {
    SpatialSound {
        sound_url: String,
        #[serde(default)]
        location: Option<GeoPoint>,
    },
    SpatialSpeech {
        text: String,
        #[serde(default)]
        location: Option<GeoPoint>,
        #[serde(default)]
        include_distance: bool,
    },
}

impl QueueItem {
    /// A non-spatialized sound effect
    pub fn sound(url: impl Into<String>) -> Self {
        QueueItem::SpatialSound {
            sound_url: url.into(),
            location: None,
        }
    }

    pub fn sound_at(url: impl Into<String>, location: GeoPoint) -> Self {
        QueueItem::SpatialSound {
            sound_url: url.into(),
            location: Some(location),
        }
    }

    /// Plain speech at the listener
    pub fn speech(text: impl Into<String>) -> Self {
        QueueItem::SpatialSpeech {
            text: text.into(),
            location: None,
            include_distance: false,
        }
    }

    /// A callout for a place, optionally followed by its distance
    pub fn callout(text: impl Into<String>, location: GeoPoint, include_distance: bool) -> Self {
        QueueItem::SpatialSpeech {
            text: text.into(),
            location: Some(location),
            include_distance,
        }
    }

    pub fn location(&self) -> Option<GeoPoint> {
        match self {
            QueueItem::SpatialSound { location, .. } | QueueItem::SpatialSpeech { location, .. } => *location,
        }
    }

    /// Reject items that carry nothing to play
    pub fn validate(&self) -> Result<(), UnrecognizedItemError> {
        match self {
            QueueItem::SpatialSound { sound_url, .. } if sound_url.trim().is_empty() => {
                Err(UnrecognizedItemError(format!("{:?}", self)))
            }
            QueueItem::SpatialSpeech { text, .. } if text.trim().is_empty() => {
                Err(UnrecognizedItemError(format!("{:?}", self)))
            }
            _ => Ok(()),
        }
    }
}
