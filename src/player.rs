//! Playback state folded from dispatch events.
//!
//! [`Player`] is the single writer of the current [`Snapshot`]. Every
//! operation computes a complete new snapshot and swaps it in, so readers
//! never observe a half-applied update. Events are applied in arrival order
//! with last-write-wins semantics; nothing is reordered or coalesced.

use std::time::Duration;

use crate::protocol::{PlayerUpdate, PositionUpdate, Track};

/// Current playback state as rendered by the dashboard.
#[derive(Clone, Debug, Default, PartialEq, Eq)]
pub struct Snapshot {
    /// Track loaded in the player, if any.
    pub track: Option<Track>,

    /// Position within the track while playing.
    ///
    /// `None` means not playing or unknown and hides the progress bar.
    pub position: Option<Duration>,

    /// Whether the player is paused, as last reported.
    pub paused: Option<bool>,

    /// Whether the player is connected to voice, as last reported.
    pub connected: Option<bool>,
}

impl Snapshot {
    /// Returns the position as milliseconds.
    #[must_use]
    pub fn position_millis(&self) -> Option<u64> {
        self.position
            .map(|position| u64::try_from(position.as_millis()).unwrap_or(u64::MAX))
    }

    /// Returns whether the progress indicator should be shown.
    #[must_use]
    pub fn is_progressing(&self) -> bool {
        self.track.is_some() && self.position.is_some()
    }
}

#[derive(Clone, Debug, Default)]
pub struct Player {
    snapshot: Snapshot,
}

impl Player {
    #[must_use]
    pub fn new() -> Self {
        Self::default()
    }

    #[must_use]
    pub fn snapshot(&self) -> &Snapshot {
        &self.snapshot
    }

    /// Establishes the initial snapshot after identifying.
    ///
    /// Joining mid-playback is covered: the body carries both the track and
    /// its position. A missing position counts as `null`.
    pub fn on_identified(&mut self, body: PlayerUpdate) {
        debug!(
            "identified with track {:?} at {:?}",
            body.track.as_ref().map(|track| &track.title),
            body.position
        );

        self.replace(Snapshot {
            track: body.track,
            position: body.position.flatten(),
            paused: body.paused,
            connected: body.connected,
        });
    }

    /// Replaces the track.
    ///
    /// The position changes only when the update carries a `position`
    /// field; `null` clears it.
    pub fn on_player_update(&mut self, body: PlayerUpdate) {
        debug!(
            "setting track to {:?}",
            body.track.as_ref().map(|track| &track.title)
        );

        let position = match body.position {
            Some(position) => position,
            None => self.snapshot.position,
        };

        self.replace(Snapshot {
            track: body.track,
            position,
            paused: body.paused.or(self.snapshot.paused),
            connected: body.connected.or(self.snapshot.connected),
        });
    }

    /// Sets the position and leaves the track untouched.
    pub fn on_position_update(&mut self, body: PositionUpdate) {
        trace!("setting track position to {:?}", body.position);

        self.replace(Snapshot {
            position: body.position,
            ..self.snapshot.clone()
        });
    }

    pub fn on_track_end(&mut self) {
        debug!("track ended");

        self.replace(Snapshot {
            track: None,
            position: None,
            ..self.snapshot.clone()
        });
    }

    pub fn on_player_disconnect(&mut self) {
        debug!("player disconnected");

        self.replace(Snapshot {
            track: None,
            position: None,
            paused: None,
            connected: Some(false),
        });
    }

    /// Forgets the position when the live feed drops; the track stays.
    pub fn on_connection_lost(&mut self) {
        debug!("connection lost, position unknown");

        self.replace(Snapshot {
            position: None,
            ..self.snapshot.clone()
        });
    }

    fn replace(&mut self, snapshot: Snapshot) {
        self.snapshot = snapshot;
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn track(title: &str, length_ms: u64) -> Track {
        Track {
            title: title.to_owned(),
            author: Some("Artist".to_owned()),
            duration: Duration::from_millis(length_ms),
            ..Track::default()
        }
    }

    fn millis(ms: u64) -> Option<Duration> {
        Some(Duration::from_millis(ms))
    }

    #[test]
    fn track_persists_across_position_updates() {
        let mut player = Player::new();
        player.on_identified(PlayerUpdate {
            track: Some(track("T", 200_000)),
            position: Some(millis(5000)),
            ..PlayerUpdate::default()
        });
        player.on_position_update(PositionUpdate {
            position: millis(6000),
        });

        let snapshot = player.snapshot();
        assert_eq!(snapshot.track, Some(track("T", 200_000)));
        assert_eq!(snapshot.position_millis(), Some(6000));
    }

    #[test]
    fn player_update_without_position_keeps_position() {
        let mut player = Player::new();
        player.on_identified(PlayerUpdate {
            track: Some(track("T", 200_000)),
            position: Some(millis(5000)),
            ..PlayerUpdate::default()
        });

        player.on_player_update(PlayerUpdate::default());
        assert_eq!(player.snapshot().track, None);
        assert_eq!(player.snapshot().position, millis(5000));

        player.on_player_update(PlayerUpdate {
            track: Some(track("U", 100_000)),
            ..PlayerUpdate::default()
        });
        assert_eq!(player.snapshot().track, Some(track("U", 100_000)));
        assert_eq!(player.snapshot().position, millis(5000));
    }

    #[test]
    fn player_update_with_null_position_clears_it() {
        let mut player = Player::new();
        player.on_identified(PlayerUpdate {
            track: Some(track("T", 200_000)),
            position: Some(millis(5000)),
            ..PlayerUpdate::default()
        });

        player.on_player_update(PlayerUpdate {
            track: Some(track("U", 100_000)),
            position: Some(None),
            ..PlayerUpdate::default()
        });
        assert_eq!(player.snapshot().position, None);
        assert!(!player.snapshot().is_progressing());
    }

    #[test]
    fn null_position_update_clears_position() {
        let mut player = Player::new();
        player.on_identified(PlayerUpdate {
            track: Some(track("T", 200_000)),
            position: Some(millis(5000)),
            ..PlayerUpdate::default()
        });

        player.on_position_update(PositionUpdate { position: None });
        assert_eq!(player.snapshot().track, Some(track("T", 200_000)));
        assert_eq!(player.snapshot().position, None);
    }

    #[test]
    fn player_update_with_position_applies_it() {
        let mut player = Player::new();
        player.on_identified(PlayerUpdate {
            track: Some(track("A", 100_000)),
            position: Some(millis(90_000)),
            ..PlayerUpdate::default()
        });

        player.on_player_update(PlayerUpdate {
            track: Some(track("B", 300_000)),
            position: Some(millis(0)),
            ..PlayerUpdate::default()
        });
        assert_eq!(player.snapshot().track, Some(track("B", 300_000)));
        assert_eq!(player.snapshot().position, millis(0));
    }

    #[test]
    fn identified_without_position_clears_it() {
        let mut player = Player::new();
        player.on_position_update(PositionUpdate {
            position: millis(1000),
        });
        player.on_identified(PlayerUpdate {
            track: Some(track("T", 1000)),
            ..PlayerUpdate::default()
        });
        assert_eq!(player.snapshot().position, None);
    }

    #[test]
    fn player_flags_are_sticky_until_reported() {
        let mut player = Player::new();
        player.on_identified(PlayerUpdate {
            paused: Some(true),
            connected: Some(true),
            ..PlayerUpdate::default()
        });
        player.on_player_update(PlayerUpdate {
            track: Some(track("T", 1000)),
            ..PlayerUpdate::default()
        });
        assert_eq!(player.snapshot().paused, Some(true));
        assert_eq!(player.snapshot().connected, Some(true));
    }

    #[test]
    fn track_end_clears_track_and_position() {
        let mut player = Player::new();
        player.on_identified(PlayerUpdate {
            track: Some(track("T", 1000)),
            position: Some(millis(500)),
            paused: Some(false),
            connected: Some(true),
        });
        player.on_track_end();

        let snapshot = player.snapshot();
        assert_eq!(snapshot.track, None);
        assert_eq!(snapshot.position, None);
        assert_eq!(snapshot.connected, Some(true));
        assert!(!snapshot.is_progressing());
    }

    #[test]
    fn disconnect_resets_everything() {
        let mut player = Player::new();
        player.on_identified(PlayerUpdate {
            track: Some(track("T", 1000)),
            position: Some(millis(500)),
            paused: Some(true),
            connected: Some(true),
        });
        player.on_player_disconnect();

        assert_eq!(
            player.snapshot(),
            &Snapshot {
                connected: Some(false),
                ..Snapshot::default()
            }
        );
    }

    #[test]
    fn connection_loss_hides_progress_but_keeps_track() {
        let mut player = Player::new();
        player.on_identified(PlayerUpdate {
            track: Some(track("T", 1000)),
            position: Some(millis(500)),
            paused: Some(false),
            connected: Some(true),
        });
        player.on_connection_lost();

        let snapshot = player.snapshot();
        assert_eq!(snapshot.track, Some(track("T", 1000)));
        assert_eq!(snapshot.position, None);
        assert!(!snapshot.is_progressing());
    }

    #[test]
    fn events_apply_in_arrival_order() {
        let mut player = Player::new();
        for ms in [3000, 1000, 2000] {
            player.on_position_update(PositionUpdate {
                position: millis(ms),
            });
        }
        assert_eq!(player.snapshot().position_millis(), Some(2000));
    }
}
