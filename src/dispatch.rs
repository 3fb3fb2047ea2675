//! Routing of dispatch events to the playback state reducer.

use crate::{events::Event, player::Player, protocol::Dispatch};

/// Applies a dispatch event to `player`.
///
/// Each known event type maps to exactly one reducer operation. Unknown
/// types are dropped so that servers can add events without breaking older
/// clients.
///
/// Returns the notification to emit, if any.
pub fn dispatch(player: &mut Player, event: Dispatch) -> Option<Event> {
    trace!("dispatching {}", event.name());

    match event {
        Dispatch::Identified(body) => {
            player.on_identified(body);
            Some(Event::Identified)
        }
        Dispatch::PlayerUpdate(body) => {
            player.on_player_update(body);
            Some(Event::TrackChanged)
        }
        Dispatch::PositionUpdate(body) => {
            player.on_position_update(body);
            Some(Event::PositionChanged)
        }
        Dispatch::TrackEnd => {
            player.on_track_end();
            Some(Event::TrackEnded)
        }
        Dispatch::PlayerDisconnect => {
            player.on_player_disconnect();
            Some(Event::PlayerDisconnected)
        }
        Dispatch::Unknown => {
            trace!("ignoring unknown dispatch type");
            None
        }
    }
}
