// SPDX-FileCopyrightText: 2025 2025 Contributors to the superficial project.
// SPDX-License-Identifier: Apache-2.0

//! Seek flag bitset.
//!
//! The bit values match `GstSeekFlags`, so a host can pass the raw integer it
//! already has. Flags are never validated against each other here: mutually
//! exclusive combinations (e.g. `ACCURATE | KEY_UNIT`) are resolved by the
//! engine.

use std::ops::{BitAnd, BitOr, BitOrAssign};

use gstreamer as gst;
use serde::Serialize;

/// Modifiers for seek and rate requests.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, Hash, Serialize)]
#[serde(transparent)]
pub struct SeekFlags(u32);

impl SeekFlags {
    /// No flag.
    pub const NONE: SeekFlags = SeekFlags(0);
    /// Flush queued data; triggers a fresh preroll.
    pub const FLUSH: SeekFlags = SeekFlags(1 << 0);
    /// Accurate position requested, possibly slower.
    pub const ACCURATE: SeekFlags = SeekFlags(1 << 1);
    /// Snap to the nearest key unit.
    pub const KEY_UNIT: SeekFlags = SeekFlags(1 << 2);
    /// Segment seek: post `segment-done` instead of EOS.
    pub const SEGMENT: SeekFlags = SeekFlags(1 << 3);
    /// Allow frame skipping during trick modes.
    pub const TRICKMODE: SeekFlags = SeekFlags(1 << 4);
    /// Snap to a location before the requested position.
    pub const SNAP_BEFORE: SeekFlags = SeekFlags(1 << 5);
    /// Snap to a location after the requested position.
    pub const SNAP_AFTER: SeekFlags = SeekFlags(1 << 6);
    /// Only decode key units during trick modes.
    pub const TRICKMODE_KEY_UNITS: SeekFlags = SeekFlags(1 << 7);
    /// Skip audio decoding during trick modes.
    pub const TRICKMODE_NO_AUDIO: SeekFlags = SeekFlags(1 << 8);
    /// Only decode key units and forward-predicted frames during trick modes.
    pub const TRICKMODE_FORWARD_PREDICTED: SeekFlags = SeekFlags(1 << 9);
    /// Apply a rate change immediately without flushing.
    pub const INSTANT_RATE_CHANGE: SeekFlags = SeekFlags(1 << 10);

    const NAMED: [(SeekFlags, &'static str); 11] = [
        (SeekFlags::FLUSH, "FLUSH"),
        (SeekFlags::ACCURATE, "ACCURATE"),
        (SeekFlags::KEY_UNIT, "KEY_UNIT"),
        (SeekFlags::SEGMENT, "SEGMENT"),
        (SeekFlags::TRICKMODE, "TRICKMODE"),
        (SeekFlags::SNAP_BEFORE, "SNAP_BEFORE"),
        (SeekFlags::SNAP_AFTER, "SNAP_AFTER"),
        (SeekFlags::TRICKMODE_KEY_UNITS, "TRICKMODE_KEY_UNITS"),
        (SeekFlags::TRICKMODE_NO_AUDIO, "TRICKMODE_NO_AUDIO"),
        (
            SeekFlags::TRICKMODE_FORWARD_PREDICTED,
            "TRICKMODE_FORWARD_PREDICTED",
        ),
        (SeekFlags::INSTANT_RATE_CHANGE, "INSTANT_RATE_CHANGE"),
    ];

    /// Wraps raw bits as-is, including bits without a name here.
    pub const fn from_bits(bits: u32) -> SeekFlags {
        SeekFlags(bits)
    }

    /// Returns the raw bits.
    pub const fn bits(self) -> u32 {
        self.0
    }

    /// True when every bit of `other` is set in `self`.
    pub const fn contains(self, other: SeekFlags) -> bool {
        self.0 & other.0 == other.0
    }

    /// True when no bit is set.
    pub const fn is_empty(self) -> bool {
        self.0 == 0
    }

    /// Returns `self` with the bits of `other` cleared.
    pub const fn without(self, other: SeekFlags) -> SeekFlags {
        SeekFlags(self.0 & !other.0)
    }

    /// Names of the set flags, in bit order. Unnamed bits are skipped.
    pub fn names(self) -> Vec<&'static str> {
        Self::NAMED
            .iter()
            .filter(|(flag, _)| self.contains(*flag))
            .map(|(_, name)| *name)
            .collect()
    }

    /// Parses a `|`-separated list of flag names (`"FLUSH|KEY_UNIT"`).
    ///
    /// Names are case-insensitive; `NONE` and empty items are accepted.
    /// Returns `None` on the first unknown name.
    pub fn parse(list: &str) -> Option<SeekFlags> {
        list.split('|')
            .map(str::trim)
            .filter(|item| !item.is_empty())
            .try_fold(SeekFlags::NONE, |acc, item| {
                if item.eq_ignore_ascii_case("NONE") {
                    return Some(acc);
                }
                Self::NAMED
                    .iter()
                    .find(|(_, name)| name.eq_ignore_ascii_case(item))
                    .map(|(flag, _)| acc | *flag)
            })
    }
}

impl BitOr for SeekFlags {
    type Output = SeekFlags;

    fn bitor(self, rhs: SeekFlags) -> SeekFlags {
        SeekFlags(self.0 | rhs.0)
    }
}

impl BitOrAssign for SeekFlags {
    fn bitor_assign(&mut self, rhs: SeekFlags) {
        self.0 |= rhs.0;
    }
}

impl BitAnd for SeekFlags {
    type Output = SeekFlags;

    fn bitand(self, rhs: SeekFlags) -> SeekFlags {
        SeekFlags(self.0 & rhs.0)
    }
}

impl From<u32> for SeekFlags {
    fn from(bits: u32) -> Self {
        SeekFlags(bits)
    }
}

impl From<SeekFlags> for u32 {
    fn from(flags: SeekFlags) -> Self {
        flags.0
    }
}

impl From<SeekFlags> for gst::SeekFlags {
    /// Passes every bit through, named or not.
    fn from(flags: SeekFlags) -> Self {
        gst::SeekFlags::from_bits_retain(flags.0)
    }
}

impl From<gst::SeekFlags> for SeekFlags {
    fn from(flags: gst::SeekFlags) -> Self {
        SeekFlags(flags.bits())
    }
}
