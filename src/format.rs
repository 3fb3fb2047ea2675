//! Human-readable formatting of playback durations.
//!
//! Positions and track lengths arrive as milliseconds. They are shown as
//! `[[DD:]HH:]MM:SS`, where the day field only appears for durations of a
//! day or more and the hour field only when hours or days are non-zero.
//!
//! ```rust
//! use livedash::format::{format_friendly, format_millis};
//!
//! assert_eq!(format_millis(3_661_000), "01:01:01");
//! assert_eq!(format_friendly(90_061_000), "1d 1h 1m 1s");
//! ```

use std::time::Duration;

const MILLIS_PER_SECOND: u64 = 1_000;
const SECONDS_PER_MINUTE: u64 = 60;
const MINUTES_PER_HOUR: u64 = 60;
const HOURS_PER_DAY: u64 = 24;

/// Duration decomposed into clock fields. Sub-second remainders are
/// truncated.
#[derive(Copy, Clone, Debug, Default, PartialEq, Eq, PartialOrd, Ord, Hash)]
struct Fields {
    days: u64,
    hours: u64,
    minutes: u64,
    seconds: u64,
}

impl Fields {
    fn from_millis(millis: u64) -> Self {
        let total_seconds = millis / MILLIS_PER_SECOND;
        let total_minutes = total_seconds / SECONDS_PER_MINUTE;
        let total_hours = total_minutes / MINUTES_PER_HOUR;

        Self {
            days: total_hours / HOURS_PER_DAY,
            hours: total_hours % HOURS_PER_DAY,
            minutes: total_minutes % MINUTES_PER_HOUR,
            seconds: total_seconds % SECONDS_PER_MINUTE,
        }
    }

    fn show_days(&self) -> bool {
        self.days != 0
    }

    fn show_hours(&self) -> bool {
        self.hours != 0 || self.days != 0
    }
}

/// Formats a millisecond count as `[[DD:]HH:]MM:SS`.
///
/// Every field is zero-padded to a width of two. There is no upper bound:
/// durations of a day or more roll into the day field.
#[must_use]
pub fn format_millis(millis: u64) -> String {
    let fields = Fields::from_millis(millis);

    let mut output = String::with_capacity(11);
    if fields.show_days() {
        output.push_str(&format!("{:02}:", fields.days));
    }
    if fields.show_hours() {
        output.push_str(&format!("{:02}:", fields.hours));
    }
    output.push_str(&format!("{:02}:{:02}", fields.minutes, fields.seconds));
    output
}

/// Formats a [`Duration`] like [`format_millis`].
///
/// Durations beyond `u64::MAX` milliseconds saturate.
#[must_use]
pub fn format_duration(duration: Duration) -> String {
    format_millis(u64::try_from(duration.as_millis()).unwrap_or(u64::MAX))
}

/// Formats a millisecond count as `1d 1h 1m 1s`, omitting days and hours
/// under the same rules as [`format_millis`].
#[must_use]
pub fn format_friendly(millis: u64) -> String {
    let fields = Fields::from_millis(millis);

    let mut output = String::new();
    if fields.show_days() {
        output.push_str(&format!("{}d ", fields.days));
    }
    if fields.show_hours() {
        output.push_str(&format!("{}h ", fields.hours));
    }
    output.push_str(&format!("{}m {}s", fields.minutes, fields.seconds));
    output
}
