//! Projection of a playback snapshot onto display fields.
//!
//! The view carries exactly what the dashboard shows: artwork, title, link,
//! author line and a progress indicator. Fallbacks apply field by field, so a
//! track without artwork still shows its title.

use std::fmt;

use crate::{
    format::{format_duration, format_millis},
    player::Snapshot,
};

/// Renderable fields of the player card.
#[derive(Clone, Debug, PartialEq)]
pub struct View {
    pub artwork: String,
    pub title: String,
    pub link: String,
    /// `"by {author}"`, or empty.
    pub author: String,
    /// Formatted position, or empty while the progress bar is hidden.
    pub position: String,
    /// Formatted track length, or empty without a track.
    pub length: String,
    /// Progress bar fill in percent.
    pub fill: f64,
    pub progress_visible: bool,
    pub status: &'static str,
}

impl View {
    /// Image shown when no artwork is available.
    pub const PLACEHOLDER_ARTWORK: &'static str = "/static/images/placeholder.png";

    /// Title shown when no track is loaded.
    pub const NO_TRACK: &'static str = "no track";

    /// Link target that does not navigate.
    pub const NO_LINK: &'static str = "#";

    /// Binds a snapshot with the default placeholder artwork.
    #[must_use]
    pub fn new(snapshot: &Snapshot) -> Self {
        Self::with_placeholder(snapshot, Self::PLACEHOLDER_ARTWORK)
    }

    #[must_use]
    pub fn with_placeholder(snapshot: &Snapshot, placeholder_artwork: &str) -> Self {
        let track = snapshot.track.as_ref();

        let artwork = track
            .and_then(|track| track.artwork_url.clone())
            .unwrap_or_else(|| placeholder_artwork.to_owned());
        let title = track.map_or_else(|| Self::NO_TRACK.to_owned(), |track| track.title.clone());
        let link = track
            .and_then(|track| track.uri.clone())
            .unwrap_or_else(|| Self::NO_LINK.to_owned());
        let author = track
            .and_then(|track| track.author.as_ref())
            .map(|author| format!("by {author}"))
            .unwrap_or_default();
        let length = track
            .map(|track| format_duration(track.duration))
            .unwrap_or_default();

        let (position, fill, progress_visible) =
            match (track, snapshot.position_millis()) {
                (Some(track), Some(position)) => {
                    let length = track.duration.as_secs_f64() * 1000.0;
                    #[expect(clippy::cast_precision_loss)]
                    let fill = if length > 0.0 {
                        (100.0 * position as f64 / length).clamp(0.0, 100.0)
                    } else {
                        0.0
                    };
                    (format_millis(position), fill, true)
                }
                _ => (String::new(), 0.0, false),
            };

        let status = match (snapshot.connected, snapshot.paused) {
            (Some(false), _) => "disconnected",
            (_, Some(true)) => "paused",
            (_, Some(false)) if track.is_some() => "playing",
            _ => "",
        };

        Self {
            artwork,
            title,
            link,
            author,
            position,
            length,
            fill,
            progress_visible,
            status,
        }
    }
}

/// Renders the player card as terminal lines.
impl fmt::Display for View {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{}", self.title)?;
        if !self.author.is_empty() {
            write!(f, " {}", self.author)?;
        }
        if !self.status.is_empty() {
            write!(f, " [{}]", self.status)?;
        }
        writeln!(f)?;

        if self.progress_visible {
            const WIDTH: usize = 30;
            #[expect(clippy::cast_possible_truncation, clippy::cast_sign_loss)]
            let filled = ((self.fill / 100.0) * WIDTH as f64).round() as usize;
            writeln!(
                f,
                "{} [{}{}] {} ({:.0}%)",
                self.position,
                "#".repeat(filled.min(WIDTH)),
                "-".repeat(WIDTH - filled.min(WIDTH)),
                self.length,
                self.fill
            )?;
        }

        writeln!(f, "artwork: {}", self.artwork)?;
        write!(f, "link: {}", self.link)
    }
}
