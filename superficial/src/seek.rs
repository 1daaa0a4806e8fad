// SPDX-FileCopyrightText: 2025 2025 Contributors to the superficial project.
// SPDX-License-Identifier: Apache-2.0

//! Seeking, rate changes, position queries and forced key units.
//!
//! A refused request is not an error: the engine may decline a seek for many
//! ordinary reasons (not yet prerolled, unseekable live source, ...), so those
//! operations answer `Ok(false)` and leave the pipeline untouched.
//!
//! Overlapping requests are not serialized here. Issuing a second seek before
//! the first one's `async-done` leaves the outcome to the engine; the last
//! request is not guaranteed to win.

use gst::prelude::*;
use gstreamer as gst;
use gstreamer_video as gst_video;
use tracing::{debug, info};

use crate::Result;
use crate::flags::SeekFlags;
use crate::pipeline::{CAT, Pipeline};
use crate::registry::ElementHandle;
use crate::time::{TimeUnit, from_clock_time, to_clock_time};

impl Pipeline {
    /// Moves the playback position.
    ///
    /// # Arguments
    /// * `position` - Target position in `unit`
    /// * `flags` - Seek modifiers, e.g. [`SeekFlags::FLUSH`]
    /// * `unit` - Unit of `position`
    ///
    /// # Returns
    /// * `Ok(true)` if the engine accepted the seek
    /// * `Ok(false)` if it refused, or `position` is negative or not finite
    ///
    /// A flushing seek is followed by an `async-done` event once the pipeline
    /// has prerolled at the new position. Playback rate returns to 1.0.
    pub fn seek(&mut self, position: f64, flags: SeekFlags, unit: TimeUnit) -> Result<bool> {
        let pipeline = self.live()?.clone();
        let Some(target) = to_clock_time(position, unit) else {
            debug!("Refusing seek to invalid position {}", position);
            return Ok(false);
        };

        match pipeline.seek_simple(gst::SeekFlags::from(flags), target) {
            Ok(()) => {
                debug!("Seek to {} accepted (flags {:?})", target, flags.names());
                self.tracker.set_rate(1.0);
                if flags.contains(SeekFlags::FLUSH) {
                    self.tracker.clear_eos();
                }
                Ok(true)
            }
            Err(err) => {
                gst::debug!(CAT, obj = pipeline, "Seek to {} refused: {}", target, err);
                Ok(false)
            }
        }
    }

    /// Current playback position, or `None` until the pipeline has prerolled.
    pub fn query_position(&self, unit: TimeUnit) -> Result<Option<f64>> {
        let pipeline = self.live()?;
        Ok(pipeline
            .query_position::<gst::ClockTime>()
            .map(|t| from_clock_time(t, unit)))
    }

    /// Stream duration, or `None` when not (yet) known.
    ///
    /// Live sources never report one. After a `duration-changed` event the
    /// value may differ from an earlier answer.
    pub fn query_duration(&self, unit: TimeUnit) -> Result<Option<f64>> {
        let pipeline = self.live()?;
        Ok(pipeline
            .query_duration::<gst::ClockTime>()
            .map(|t| from_clock_time(t, unit)))
    }

    /// Changes the playback rate.
    ///
    /// Negative rates play in reverse. With
    /// [`SeekFlags::INSTANT_RATE_CHANGE`] the segment is left alone and the
    /// change applies without a flush; such a request may not reverse the
    /// direction and may not carry [`SeekFlags::FLUSH`]. Otherwise the segment
    /// is rebuilt around the current position: forward plays from the position
    /// to the end, reverse plays from the position back to zero.
    ///
    /// # Returns
    /// * `Ok(true)` if the engine accepted the change
    /// * `Ok(false)` if it refused, if `speed` is zero or not finite, if an
    ///   instant change is malformed, or if the position is not yet known
    pub fn rate(&mut self, speed: f64, flags: SeekFlags) -> Result<bool> {
        let pipeline = self.live()?.clone();
        if speed == 0.0 || !speed.is_finite() {
            debug!("Refusing rate {}", speed);
            return Ok(false);
        }

        let accepted = if flags.contains(SeekFlags::INSTANT_RATE_CHANGE) {
            let reverses = (speed < 0.0) != (self.tracker.rate() < 0.0);
            if reverses || flags.contains(SeekFlags::FLUSH) {
                debug!(
                    "Refusing instant rate change to {} (flags {:?})",
                    speed,
                    flags.names()
                );
                return Ok(false);
            }
            pipeline.seek(
                speed,
                gst::SeekFlags::from(flags),
                gst::SeekType::None,
                gst::ClockTime::NONE,
                gst::SeekType::None,
                gst::ClockTime::NONE,
            )
        } else {
            let Some(position) = pipeline.query_position::<gst::ClockTime>() else {
                debug!("Refusing rate {}: position unknown", speed);
                return Ok(false);
            };
            if speed > 0.0 {
                pipeline.seek(
                    speed,
                    gst::SeekFlags::from(flags),
                    gst::SeekType::Set,
                    Some(position),
                    gst::SeekType::End,
                    Some(gst::ClockTime::ZERO),
                )
            } else {
                pipeline.seek(
                    speed,
                    gst::SeekFlags::from(flags),
                    gst::SeekType::Set,
                    Some(gst::ClockTime::ZERO),
                    gst::SeekType::Set,
                    Some(position),
                )
            }
        };

        match accepted {
            Ok(()) => {
                info!("Playback rate of {} set to {}", pipeline.name(), speed);
                self.tracker.set_rate(speed);
                Ok(true)
            }
            Err(err) => {
                gst::debug!(CAT, obj = pipeline, "Rate {} refused: {}", speed, err);
                Ok(false)
            }
        }
    }

    /// Asks an encoder to produce a key unit as soon as possible.
    ///
    /// Sends an upstream force-key-unit event with the running time left
    /// unset, so the encoder picks the next opportunity. `count` is passed
    /// through for the encoder's bookkeeping. Codec headers are requested
    /// unless disabled in [`crate::PipelineOptions`]. Whether the encoder
    /// honors the request shows up only in the produced stream.
    ///
    /// # Errors
    /// * [`crate::Error::StaleHandle`] / [`crate::Error::ForeignHandle`] for a
    ///   handle that does not belong to this live graph
    pub fn force_key_unit(&mut self, element: &ElementHandle, count: u32) -> Result<()> {
        self.live()?;
        let element = self.registry.element(element)?;

        let event = gst_video::UpstreamForceKeyUnitEvent::builder()
            .all_headers(self.options.force_key_unit_all_headers)
            .count(count)
            .build();
        let handled = element.send_event(event);
        gst::debug!(
            CAT,
            obj = element,
            "Force key unit #{} sent (handled: {})",
            count,
            handled
        );
        Ok(())
    }
}
