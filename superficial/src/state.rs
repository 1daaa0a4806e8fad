// SPDX-FileCopyrightText: 2025 2025 Contributors to the superficial project.
// SPDX-License-Identifier: Apache-2.0

//! Pipeline states and the controller-side state tracker.
//!
//! State changes in GStreamer are asynchronous: `set_state(Playing)` only sets a
//! *target*. The engine later reports, on the bus, which state each element has
//! actually reached and which one is still pending. [`StateTracker`] keeps the
//! controller's view of that exchange:
//!
//! ```text
//!   request(target) ──► in flight ──► state-changed(new == target, pending == VOID)
//!                           │                      or async-done at target
//!                           └──► superseded by the next request
//! ```

use std::fmt;

use gstreamer as gst;
use serde::Serialize;
use tracing::{debug, trace};

use crate::message::{BusEvent, EventKind};

/// Engine state of a pipeline or element.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize)]
#[serde(rename_all = "kebab-case")]
pub enum PipelineState {
    /// No pending state (used in the `pending` slot of state-changed).
    VoidPending,
    /// Initial state; all resources released.
    Null,
    /// Resources allocated, no data flowing.
    Ready,
    /// Prerolled: sinks hold one buffer and block.
    Paused,
    /// Data flowing and clock running.
    Playing,
}

impl PipelineState {
    /// Name as GStreamer prints it (`"PLAYING"`, `"VOID_PENDING"`, ...).
    pub fn as_str(self) -> &'static str {
        match self {
            PipelineState::VoidPending => "VOID_PENDING",
            PipelineState::Null => "NULL",
            PipelineState::Ready => "READY",
            PipelineState::Paused => "PAUSED",
            PipelineState::Playing => "PLAYING",
        }
    }
}

impl fmt::Display for PipelineState {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

impl From<gst::State> for PipelineState {
    /// Unknown future enumerants collapse to `VoidPending`.
    fn from(state: gst::State) -> Self {
        match state {
            gst::State::Null => PipelineState::Null,
            gst::State::Ready => PipelineState::Ready,
            gst::State::Paused => PipelineState::Paused,
            gst::State::Playing => PipelineState::Playing,
            _ => PipelineState::VoidPending,
        }
    }
}

impl From<PipelineState> for gst::State {
    fn from(state: PipelineState) -> Self {
        match state {
            PipelineState::VoidPending => gst::State::VoidPending,
            PipelineState::Null => gst::State::Null,
            PipelineState::Ready => gst::State::Ready,
            PipelineState::Paused => gst::State::Paused,
            PipelineState::Playing => gst::State::Playing,
        }
    }
}

/// Controller-side lifecycle of a [`crate::Pipeline`].
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize)]
#[serde(rename_all = "kebab-case")]
pub enum Lifecycle {
    /// Graph exists and accepts control requests.
    Active,
    /// Torn down by `stop()` or by a fatal error; only polling and `quit()` remain.
    Stopped,
    /// Released by `quit()`.
    Quit,
}

/// Snapshot of what the controller knows about a pipeline's state.
#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct StateSnapshot {
    /// Controller lifecycle.
    pub lifecycle: Lifecycle,
    /// Target of the most recent request, if any was made.
    pub target: Option<PipelineState>,
    /// Last state the pipeline reported reaching.
    pub current: PipelineState,
    /// State the pipeline last reported as still pending.
    pub pending: PipelineState,
    /// True while a requested transition has not been confirmed.
    pub in_flight: bool,
    /// Last accepted playback rate.
    pub rate: f64,
    /// True once an `eos` event from the pipeline was observed.
    pub eos: bool,
}

/// Correlates state-change requests with their bus confirmations.
#[derive(Debug, Clone)]
pub(crate) struct StateTracker {
    lifecycle: Lifecycle,
    target: Option<PipelineState>,
    current: PipelineState,
    pending: PipelineState,
    in_flight: bool,
    rate: f64,
    eos: bool,
    last_error: Option<BusEvent>,
}

impl Default for StateTracker {
    fn default() -> Self {
        StateTracker {
            lifecycle: Lifecycle::Active,
            target: None,
            current: PipelineState::Null,
            pending: PipelineState::VoidPending,
            in_flight: false,
            rate: 1.0,
            eos: false,
            last_error: None,
        }
    }
}

impl StateTracker {
    /// Records a new transition request, superseding any unconfirmed one.
    pub(crate) fn request(&mut self, target: PipelineState) {
        if self.in_flight {
            debug!(
                "Request for {} supersedes unconfirmed request for {:?}",
                target, self.target
            );
        }
        self.target = Some(target);
        self.in_flight = target != self.current || self.pending != PipelineState::VoidPending;
        if matches!(target, PipelineState::Null | PipelineState::Ready) {
            self.eos = false;
        }
    }

    /// Folds one decoded bus event into the tracker.
    ///
    /// `from_pipeline` is true when the message source is the pipeline element
    /// itself; state reports from children are ignored.
    pub(crate) fn observe(&mut self, event: &BusEvent, from_pipeline: bool) {
        match &event.kind {
            EventKind::StateChanged { old, new, pending } if from_pipeline => {
                trace!("Pipeline state {} -> {} (pending {})", old, new, pending);
                self.current = *new;
                self.pending = *pending;
                if Some(*new) == self.target && *pending == PipelineState::VoidPending {
                    self.in_flight = false;
                }
            }
            EventKind::AsyncDone if from_pipeline => {
                if Some(self.current) == self.target {
                    self.in_flight = false;
                }
            }
            EventKind::Eos if from_pipeline => {
                self.eos = true;
            }
            EventKind::Error => {
                self.last_error = Some(event.clone());
            }
            _ => {}
        }
    }

    /// A flushing seek restarts data flow, so a previous EOS no longer holds.
    pub(crate) fn clear_eos(&mut self) {
        self.eos = false;
    }

    pub(crate) fn set_rate(&mut self, rate: f64) {
        self.rate = rate;
    }

    pub(crate) fn rate(&self) -> f64 {
        self.rate
    }

    pub(crate) fn lifecycle(&self) -> Lifecycle {
        self.lifecycle
    }

    pub(crate) fn set_lifecycle(&mut self, lifecycle: Lifecycle) {
        self.lifecycle = lifecycle;
        if lifecycle != Lifecycle::Active {
            self.in_flight = false;
            self.current = PipelineState::Null;
            self.pending = PipelineState::VoidPending;
        }
    }

    pub(crate) fn last_error(&self) -> Option<&BusEvent> {
        self.last_error.as_ref()
    }

    pub(crate) fn snapshot(&self) -> StateSnapshot {
        StateSnapshot {
            lifecycle: self.lifecycle,
            target: self.target,
            current: self.current,
            pending: self.pending,
            in_flight: self.in_flight,
            rate: self.rate,
            eos: self.eos,
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::message::Fields;

    fn state_changed(old: PipelineState, new: PipelineState, pending: PipelineState) -> BusEvent {
        BusEvent {
            kind: EventKind::StateChanged { old, new, pending },
            source: Some("pipeline0".into()),
            seqnum: 1,
            fields: Fields::new(),
        }
    }

    fn bare(kind: EventKind) -> BusEvent {
        BusEvent {
            kind,
            source: Some("pipeline0".into()),
            seqnum: 2,
            fields: Fields::new(),
        }
    }

    #[test]
    fn gst_state_conversion_is_lossless_for_known_states() {
        for state in [
            PipelineState::VoidPending,
            PipelineState::Null,
            PipelineState::Ready,
            PipelineState::Paused,
            PipelineState::Playing,
        ] {
            let gst_state: gst::State = state.into();
            assert_eq!(PipelineState::from(gst_state), state);
        }
    }

    #[test]
    fn request_is_confirmed_by_final_state_change() {
        let mut tracker = StateTracker::default();
        tracker.request(PipelineState::Playing);
        assert!(tracker.snapshot().in_flight);

        tracker.observe(
            &state_changed(
                PipelineState::Null,
                PipelineState::Ready,
                PipelineState::Playing,
            ),
            true,
        );
        assert!(tracker.snapshot().in_flight);

        tracker.observe(
            &state_changed(
                PipelineState::Paused,
                PipelineState::Playing,
                PipelineState::VoidPending,
            ),
            true,
        );
        let snapshot = tracker.snapshot();
        assert!(!snapshot.in_flight);
        assert_eq!(snapshot.current, PipelineState::Playing);
    }

    #[test]
    fn child_state_changes_are_ignored() {
        let mut tracker = StateTracker::default();
        tracker.request(PipelineState::Paused);
        tracker.observe(
            &state_changed(
                PipelineState::Ready,
                PipelineState::Paused,
                PipelineState::VoidPending,
            ),
            false,
        );
        assert!(tracker.snapshot().in_flight);
        assert_eq!(tracker.snapshot().current, PipelineState::Null);
    }

    #[test]
    #[tracing_test::traced_test]
    fn newer_request_supersedes_older_one() {
        let mut tracker = StateTracker::default();
        tracker.request(PipelineState::Playing);
        tracker.request(PipelineState::Paused);
        tracker.observe(
            &state_changed(
                PipelineState::Ready,
                PipelineState::Paused,
                PipelineState::VoidPending,
            ),
            true,
        );
        let snapshot = tracker.snapshot();
        assert_eq!(snapshot.target, Some(PipelineState::Paused));
        assert!(!snapshot.in_flight);
        assert!(logs_contain("supersedes unconfirmed request"));
    }

    #[test]
    fn async_done_confirms_when_target_already_reached() {
        let mut tracker = StateTracker::default();
        tracker.request(PipelineState::Paused);
        tracker.observe(
            &state_changed(
                PipelineState::Ready,
                PipelineState::Paused,
                PipelineState::Playing,
            ),
            true,
        );
        assert!(tracker.snapshot().in_flight);
        tracker.observe(&bare(EventKind::AsyncDone), true);
        assert!(!tracker.snapshot().in_flight);
    }

    #[test]
    fn errors_and_eos_are_recorded() {
        let mut tracker = StateTracker::default();
        tracker.observe(&bare(EventKind::Eos), true);
        tracker.observe(&bare(EventKind::Error), false);
        assert!(tracker.snapshot().eos);
        assert!(tracker.last_error().is_some());
    }

    #[test]
    fn teardown_resets_engine_view() {
        let mut tracker = StateTracker::default();
        tracker.request(PipelineState::Playing);
        tracker.set_lifecycle(Lifecycle::Stopped);
        let snapshot = tracker.snapshot();
        assert_eq!(snapshot.lifecycle, Lifecycle::Stopped);
        assert_eq!(snapshot.current, PipelineState::Null);
        assert!(!snapshot.in_flight);
    }
}
