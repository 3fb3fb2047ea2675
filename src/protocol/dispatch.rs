//! Typed dispatch events.
//!
//! A dispatch payload is an object tagged by `type` with the event body
//! inlined next to the tag:
//!
//! ```json
//! {
//!     "type": "IDENTIFIED",
//!     "track": {
//!         "title": "Song",
//!         "author": "Artist",
//!         "artwork_url": "https://...",
//!         "uri": "https://...",
//!         "length": 200000
//!     },
//!     "position": 12000,
//!     "paused": false,
//!     "connected": true
//! }
//! ```
//!
//! Positions and lengths are milliseconds. Event types added by newer
//! servers decode as [`Dispatch::Unknown`].

use std::time::Duration;

use serde::{Deserialize, Deserializer};
use serde_with::{formats::Flexible, serde_as, As, DurationMilliSeconds};

use crate::error::Result;

type Millis = DurationMilliSeconds<u64, Flexible>;

#[derive(Clone, Debug, PartialEq, Eq, Deserialize)]
#[serde(tag = "type")]
pub enum Dispatch {
    /// Full snapshot, sent once after a successful identify.
    #[serde(rename = "IDENTIFIED")]
    Identified(PlayerUpdate),

    /// The player changed track or state.
    #[serde(rename = "PLAYER_UPDATE")]
    PlayerUpdate(PlayerUpdate),

    /// Periodic position of the current track.
    #[serde(rename = "POSITION_UPDATE")]
    PositionUpdate(PositionUpdate),

    /// The current track finished.
    #[serde(rename = "TRACK_END")]
    TrackEnd,

    /// The player left its voice channel.
    #[serde(rename = "PLAYER_DISCONNECT")]
    PlayerDisconnect,

    #[serde(other)]
    Unknown,
}

impl Dispatch {
    /// Decodes a dispatch payload.
    pub fn from_value(value: serde_json::Value) -> Result<Self> {
        serde_json::from_value(value).map_err(Into::into)
    }

    #[must_use]
    pub fn name(&self) -> &'static str {
        match self {
            Self::Identified(_) => "IDENTIFIED",
            Self::PlayerUpdate(_) => "PLAYER_UPDATE",
            Self::PositionUpdate(_) => "POSITION_UPDATE",
            Self::TrackEnd => "TRACK_END",
            Self::PlayerDisconnect => "PLAYER_DISCONNECT",
            Self::Unknown => "UNKNOWN",
        }
    }
}

/// Body of `IDENTIFIED` and `PLAYER_UPDATE`.
#[derive(Clone, Debug, Default, PartialEq, Eq, Deserialize)]
pub struct PlayerUpdate {
    #[serde(default)]
    pub track: Option<Track>,

    /// `None` when the field is absent, `Some(None)` when it is `null`.
    #[serde(default, deserialize_with = "present_millis")]
    pub position: Option<Option<Duration>>,

    #[serde(default)]
    pub paused: Option<bool>,

    #[serde(default)]
    pub connected: Option<bool>,
}

/// Body of `POSITION_UPDATE`.
///
/// Servers include a partial `track` with only its length. It is not
/// decoded: the stored track stays authoritative.
#[derive(Clone, Debug, Default, PartialEq, Eq, Deserialize)]
pub struct PositionUpdate {
    #[serde(default, deserialize_with = "optional_millis")]
    pub position: Option<Duration>,
}

/// Track metadata as sent by the server.
#[serde_as]
#[derive(Clone, Debug, Default, PartialEq, Eq, Hash, Deserialize)]
pub struct Track {
    pub title: String,

    #[serde(default)]
    pub author: Option<String>,

    #[serde(default)]
    pub artwork_url: Option<String>,

    #[serde(default)]
    pub uri: Option<String>,

    #[serde(rename = "length")]
    #[serde_as(as = "Millis")]
    pub duration: Duration,

    /// Source-specific track identifier.
    #[serde(default)]
    pub identifier: Option<String>,

    /// Name of the source the track was loaded from.
    #[serde(default)]
    pub source: Option<String>,

    /// Display name of the user who queued the track.
    #[serde(default)]
    pub requester: Option<String>,
}

fn optional_millis<'de, D>(deserializer: D) -> std::result::Result<Option<Duration>, D::Error>
where
    D: Deserializer<'de>,
{
    As::<Option<Millis>>::deserialize(deserializer)
}

/// Only runs for a present field; `#[serde(default)]` covers an absent one.
fn present_millis<'de, D>(
    deserializer: D,
) -> std::result::Result<Option<Option<Duration>>, D::Error>
where
    D: Deserializer<'de>,
{
    optional_millis(deserializer).map(Some)
}

#[cfg(test)]
mod tests {
    use super::*;
    use serde_json::json;

    fn track() -> serde_json::Value {
        json!({
            "title": "Never Gonna Give You Up",
            "author": "Rick Astley",
            "uri": "https://www.youtube.com/watch?v=dQw4w9WgXcQ",
            "identifier": "dQw4w9WgXcQ",
            "length": 212000,
            "source": "YOUTUBE",
            "artwork_url": "https://i.ytimg.com/vi/dQw4w9WgXcQ/mqdefault.jpg",
            "requester": "someone"
        })
    }

    #[test]
    fn identified_with_full_track() {
        let event = Dispatch::from_value(json!({
            "type": "IDENTIFIED",
            "track": track(),
            "position": 12000,
            "paused": false,
            "connected": true
        }))
        .unwrap();

        let Dispatch::Identified(body) = event else {
            panic!("expected IDENTIFIED, got {event:?}");
        };
        let track = body.track.unwrap();
        assert_eq!(track.title, "Never Gonna Give You Up");
        assert_eq!(track.author.as_deref(), Some("Rick Astley"));
        assert_eq!(track.duration, Duration::from_millis(212_000));
        assert_eq!(track.requester.as_deref(), Some("someone"));
        assert_eq!(body.position, Some(Some(Duration::from_millis(12_000))));
        assert_eq!(body.paused, Some(false));
        assert_eq!(body.connected, Some(true));
    }

    #[test]
    fn player_update_distinguishes_absent_and_null_position() {
        let absent = Dispatch::from_value(json!({"type": "PLAYER_UPDATE", "track": null})).unwrap();
        assert_eq!(absent, Dispatch::PlayerUpdate(PlayerUpdate::default()));

        let null = Dispatch::from_value(json!({
            "type": "PLAYER_UPDATE",
            "track": null,
            "position": null
        }))
        .unwrap();
        let Dispatch::PlayerUpdate(body) = null else {
            panic!("expected PLAYER_UPDATE, got {null:?}");
        };
        assert_eq!(body.position, Some(None));

        let set = Dispatch::from_value(json!({"type": "PLAYER_UPDATE", "position": 3000})).unwrap();
        let Dispatch::PlayerUpdate(body) = set else {
            panic!("expected PLAYER_UPDATE, got {set:?}");
        };
        assert_eq!(body.position, Some(Some(Duration::from_millis(3000))));
    }

    #[test]
    fn position_update_ignores_partial_track() {
        let event = Dispatch::from_value(json!({
            "type": "POSITION_UPDATE",
            "position": 6000,
            "track": {"length": 212000}
        }))
        .unwrap();
        assert_eq!(
            event,
            Dispatch::PositionUpdate(PositionUpdate {
                position: Some(Duration::from_millis(6000))
            })
        );
    }

    #[test]
    fn fractional_positions_are_accepted() {
        let event =
            Dispatch::from_value(json!({"type": "POSITION_UPDATE", "position": 1500.0})).unwrap();
        assert_eq!(
            event,
            Dispatch::PositionUpdate(PositionUpdate {
                position: Some(Duration::from_millis(1500))
            })
        );
    }

    #[test]
    fn bodiless_events() {
        assert_eq!(
            Dispatch::from_value(json!({"type": "TRACK_END"})).unwrap(),
            Dispatch::TrackEnd
        );
        assert_eq!(
            Dispatch::from_value(json!({"type": "PLAYER_DISCONNECT"})).unwrap(),
            Dispatch::PlayerDisconnect
        );
    }

    #[test]
    fn unknown_types_are_tolerated() {
        let event = Dispatch::from_value(json!({"type": "QUEUE_UPDATE", "queue": []})).unwrap();
        assert_eq!(event, Dispatch::Unknown);
    }

    #[test]
    fn track_without_title_is_malformed() {
        let result = Dispatch::from_value(json!({
            "type": "PLAYER_UPDATE",
            "track": {"length": 1000}
        }));
        assert!(result.is_err());
    }
}
