// SPDX-FileCopyrightText: 2025 2025 Contributors to the superficial project.
// SPDX-License-Identifier: Apache-2.0

//! Conversion between host-facing positions and engine clock times.
//!
//! Hosts speak seconds (or milliseconds on request) as floating point numbers;
//! GStreamer speaks nanoseconds in a `ClockTime`. An unknown position is
//! `None` on both sides and is never folded into zero.

use gstreamer as gst;

/// Unit of a host-facing position or duration.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq)]
pub enum TimeUnit {
    /// Seconds (default).
    #[default]
    Seconds,
    /// Milliseconds.
    Millis,
}

impl TimeUnit {
    /// Picks the unit from a "use milliseconds" switch.
    pub fn from_millis_flag(use_millis: bool) -> TimeUnit {
        if use_millis {
            TimeUnit::Millis
        } else {
            TimeUnit::Seconds
        }
    }

    fn nanos_per_unit(self) -> f64 {
        match self {
            TimeUnit::Seconds => 1_000_000_000.0,
            TimeUnit::Millis => 1_000_000.0,
        }
    }
}

/// Converts a host position into an engine clock time.
///
/// Returns `None` for negative, NaN or infinite input, or when the value does
/// not fit the engine's range.
pub fn to_clock_time(position: f64, unit: TimeUnit) -> Option<gst::ClockTime> {
    if !position.is_finite() || position < 0.0 {
        return None;
    }
    let nanos = (position * unit.nanos_per_unit()).round();
    // ClockTime::NONE is u64::MAX, so the largest valid value is one below.
    if nanos >= u64::MAX as f64 {
        return None;
    }
    Some(gst::ClockTime::from_nseconds(nanos as u64))
}

/// Converts an engine clock time into a host position.
pub fn from_clock_time(time: gst::ClockTime, unit: TimeUnit) -> f64 {
    time.nseconds() as f64 / unit.nanos_per_unit()
}

/// Joins launch stages with the `!` connector.
///
/// ```
/// let launch = superficial::launch_from_stages(&[
///     "videotestsrc pattern=ball",
///     "video/x-raw,width=320,height=240",
///     "appsink max-buffers=1 name=sink",
/// ]);
/// assert_eq!(
///     launch,
///     "videotestsrc pattern=ball ! video/x-raw,width=320,height=240 ! appsink max-buffers=1 name=sink"
/// );
/// ```
pub fn launch_from_stages<S: AsRef<str>>(stages: &[S]) -> String {
    stages
        .iter()
        .map(|stage| stage.as_ref().trim())
        .filter(|stage| !stage.is_empty())
        .collect::<Vec<_>>()
        .join(" ! ")
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn seconds_and_millis_map_to_nanoseconds() {
        assert_eq!(
            to_clock_time(1.5, TimeUnit::Seconds),
            Some(gst::ClockTime::from_mseconds(1500))
        );
        assert_eq!(
            to_clock_time(250.0, TimeUnit::Millis),
            Some(gst::ClockTime::from_mseconds(250))
        );
        assert_eq!(to_clock_time(0.0, TimeUnit::Seconds), Some(gst::ClockTime::ZERO));
    }

    #[test]
    fn invalid_positions_are_rejected() {
        assert_eq!(to_clock_time(-0.5, TimeUnit::Seconds), None);
        assert_eq!(to_clock_time(f64::NAN, TimeUnit::Seconds), None);
        assert_eq!(to_clock_time(f64::INFINITY, TimeUnit::Millis), None);
        assert_eq!(to_clock_time(1e30, TimeUnit::Seconds), None);
    }

    #[test]
    fn clock_time_back_to_host_units() {
        let time = gst::ClockTime::from_mseconds(2500);
        assert_eq!(from_clock_time(time, TimeUnit::Seconds), 2.5);
        assert_eq!(from_clock_time(time, TimeUnit::Millis), 2500.0);
        assert_eq!(TimeUnit::from_millis_flag(true), TimeUnit::Millis);
        assert_eq!(TimeUnit::default(), TimeUnit::Seconds);
    }

    #[test]
    fn stages_are_trimmed_and_joined() {
        assert_eq!(
            launch_from_stages(&[" videotestsrc ", "", "fakesink"]),
            "videotestsrc ! fakesink"
        );
        assert_eq!(launch_from_stages::<&str>(&[]), "");
    }
}
