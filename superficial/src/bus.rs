// SPDX-FileCopyrightText: 2025 2025 Contributors to the superficial project.
// SPDX-License-Identifier: Apache-2.0

//! Non-blocking bus draining.
//!
//! The pipeline's bus is never watched from a GLib main loop or a sync
//! handler. Instead the host calls [`Pipeline::poll_bus`] from its own loop;
//! each call pops whatever is queued, in post order, and returns without
//! waiting for more.

use futures::channel::mpsc::{self, UnboundedReceiver};
use gst::prelude::*;
use gstreamer as gst;
use tracing::{debug, error, trace, warn};

use crate::error::{HandlerError, HandlerFailure};
use crate::message::{BusEvent, EventKind};
use crate::pipeline::{CAT, Pipeline};
use crate::state::Lifecycle;
use crate::{Error, Result};

impl Pipeline {
    /// Drains pending bus messages and dispatches them to `handler`.
    ///
    /// Every popped message is decoded into a [`BusEvent`], fed to the state
    /// tracker, passed to `handler` and copied to each live subscriber, in
    /// that order. An empty queue returns `Ok(0)` immediately. With a
    /// `poll_budget` configured, at most that many messages are dispatched;
    /// the remainder is left for the next call.
    ///
    /// Polling stays available after [`Pipeline::stop`] so that trailing
    /// messages can still be observed.
    ///
    /// # Returns
    /// The number of events dispatched.
    ///
    /// # Errors
    /// * [`Error::Handler`] if one or more handler calls failed. The drain is
    ///   never cut short by a failing handler; all failures are reported
    ///   together, in dispatch order.
    /// * [`Error::Quit`] after [`Pipeline::quit`]
    pub fn poll_bus<F>(&mut self, mut handler: F) -> Result<usize>
    where
        F: FnMut(&BusEvent) -> std::result::Result<(), HandlerError>,
    {
        if self.tracker.lifecycle() == Lifecycle::Quit {
            return Err(Error::Quit);
        }
        let (Some(pipeline), Some(bus)) = (self.inner.clone(), self.bus.clone()) else {
            return Err(Error::Quit);
        };
        let budget = self.options.poll_budget.map_or(usize::MAX, |b| b.get());

        let mut dispatched = 0;
        let mut failures = Vec::new();
        let mut saw_error = false;

        while dispatched < budget {
            let Some(msg) = bus.pop() else {
                break;
            };
            let from_pipeline = msg
                .src()
                .is_some_and(|src| src == pipeline.upcast_ref::<gst::Object>());
            let event = BusEvent::from_message(&msg);
            trace!("Bus event {} from {:?}", event.type_name(), event.source);

            self.tracker.observe(&event, from_pipeline);
            if matches!(event.kind, EventKind::Error) {
                saw_error = true;
                error!(
                    "Error from {}: {}",
                    event.source.as_deref().unwrap_or("<unknown>"),
                    event
                        .field("message")
                        .and_then(|m| m.as_str())
                        .unwrap_or("<no message>")
                );
            }

            if let Err(err) = handler(&event) {
                debug!("Handler failed on {} #{}: {}", event.type_name(), event.seqnum, err);
                failures.push(HandlerFailure {
                    seqnum: event.seqnum,
                    kind: event.type_name().to_owned(),
                    error: err,
                });
            }

            self.subscribers
                .retain(|tx| tx.unbounded_send(event.clone()).is_ok());
            dispatched += 1;
        }

        if dispatched > 0 {
            gst::trace!(CAT, obj = pipeline, "Dispatched {} bus events", dispatched);
        }

        if saw_error && self.options.stop_on_error && self.tracker.lifecycle() == Lifecycle::Active
        {
            warn!("Stopping pipeline {} after error event", pipeline.name());
            if let Err(err) = self.stop() {
                warn!("Stop after error did not complete cleanly: {}", err);
            }
        }

        if failures.is_empty() {
            Ok(dispatched)
        } else {
            Err(Error::Handler {
                dispatched,
                failures,
            })
        }
    }

    /// Opens a channel that receives a copy of every event dispatched by
    /// [`Pipeline::poll_bus`] from now on.
    ///
    /// Dropping the receiver unsubscribes; the channel closes on
    /// [`Pipeline::quit`].
    pub fn subscribe(&mut self) -> Result<UnboundedReceiver<BusEvent>> {
        if self.tracker.lifecycle() == Lifecycle::Quit {
            return Err(Error::Quit);
        }
        let (tx, rx) = mpsc::unbounded();
        self.subscribers.push(tx);
        Ok(rx)
    }
}
