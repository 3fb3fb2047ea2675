//! Notifications emitted by the dashboard client.
//!
//! The snapshot itself is published on a `watch` channel. These events let
//! callers react to what happened without diffing snapshots:
//! * Connection lifecycle changes
//! * Playback changes reported by the server
//!
//! # Example
//!
//! ```rust
//! use livedash::events::Event;
//!
//! fn handle_event(event: Event) {
//!     match event {
//!         Event::Identified => println!("receiving live updates"),
//!         Event::TrackChanged => println!("new track"),
//!         Event::Reconnecting => println!("connection lost, retrying"),
//!         _ => {}
//!     }
//! }
//! ```

/// Events that can be emitted by [`Client`](crate::remote::Client).
///
/// Connection events:
/// * [`Connected`](Self::Connected) - Transport open
/// * [`Identified`](Self::Identified) - Identify accepted
/// * [`Disconnected`](Self::Disconnected) - Transport closed
/// * [`Reconnecting`](Self::Reconnecting) - Waiting to reconnect
///
/// Playback events:
/// * [`TrackChanged`](Self::TrackChanged) - Track replaced
/// * [`PositionChanged`](Self::PositionChanged) - Position updated
/// * [`TrackEnded`](Self::TrackEnded) - Track finished
/// * [`PlayerDisconnected`](Self::PlayerDisconnected) - Bot left voice
#[derive(Copy, Clone, Debug, PartialEq, Eq, Hash)]
pub enum Event {
    /// The WebSocket is open and waiting for Hello.
    Connected,

    /// The server accepted the identify and sent the initial snapshot.
    Identified,

    /// The server reported a track change.
    TrackChanged,

    /// The server reported a new position of the current track.
    PositionChanged,

    /// The current track finished playing.
    TrackEnded,

    /// The player left its voice channel.
    PlayerDisconnected,

    /// The WebSocket closed.
    Disconnected,

    /// The client is backing off before reconnecting.
    Reconnecting,
}
