// SPDX-FileCopyrightText: 2025 2025 Contributors to the superficial project.
// SPDX-License-Identifier: Apache-2.0

//! The [`Pipeline`] controller and its lifecycle state machine.
//!
//! ## Lifecycle
//! ```text
//!   new() ──► Active ──play/pause──► Active ──stop()/fatal error──► Stopped ──quit()──► Quit
//!               └───────────────────────quit()──────────────────────────────────────────┘
//! ```
//!
//! Every state request is fire-and-forget: `play()` returns as soon as the
//! engine has accepted the target, and the host learns that PLAYING was
//! actually reached from a `state-changed` event delivered by
//! [`Pipeline::poll_bus`]. Nothing in this module waits on the engine.
//!
//! Seeking lives in [`crate::seek`], bus draining in [`crate::bus`], element
//! lookup in [`crate::registry`] and the appsink/appsrc data plane in
//! [`crate::appdata`]; they all extend this type.

use std::sync::LazyLock;

use futures::channel::mpsc::UnboundedSender;
use gst::prelude::*;
use gstreamer as gst;
use tracing::{debug, info, warn};

use crate::config::PipelineOptions;
use crate::message::BusEvent;
use crate::registry::Registry;
use crate::state::{Lifecycle, PipelineState, StateSnapshot, StateTracker};
use crate::{Error, Result};

/// GStreamer debug category for control-layer messages.
///
/// Set `GST_DEBUG=superficial:5` to see them next to the engine's own logs.
pub(crate) static CAT: LazyLock<gst::DebugCategory> = LazyLock::new(|| {
    gst::DebugCategory::new(
        "superficial",
        gst::DebugColorFlags::empty(),
        Some("Pipeline control layer"),
    )
});

/// One instantiated processing graph under control.
///
/// Built from a launch description, e.g. `"videotestsrc ! fakesink"`. The
/// `Pipeline` owns the graph; element and pad handles it gives out are
/// non-owning and become stale once the graph is torn down.
///
/// # Examples
///
/// ```no_run
/// use superficial::{EventKind, Pipeline, PipelineState};
///
/// # fn main() -> Result<(), superficial::Error> {
/// let mut pipeline = Pipeline::new("videotestsrc num-buffers=100 ! fakesink")?;
/// pipeline.play()?;
///
/// // Called from the host's own loop, e.g. on a timer.
/// pipeline.poll_bus(|event| {
///     if let EventKind::StateChanged { new: PipelineState::Playing, .. } = event.kind {
///         println!("now playing");
///     }
///     Ok(())
/// })?;
///
/// pipeline.quit();
/// # Ok(())
/// # }
/// ```
pub struct Pipeline {
    pub(crate) description: String,
    pub(crate) options: PipelineOptions,
    /// `None` once released by `quit()`.
    pub(crate) inner: Option<gst::Pipeline>,
    pub(crate) bus: Option<gst::Bus>,
    pub(crate) tracker: StateTracker,
    pub(crate) registry: Registry,
    pub(crate) subscribers: Vec<UnboundedSender<BusEvent>>,
}

impl Pipeline {
    /// Builds a pipeline from a launch description with default options.
    ///
    /// # Errors
    /// * [`Error::Init`] if GStreamer cannot be initialized
    /// * [`Error::Launch`] if the description is malformed or names an
    ///   element that does not exist
    pub fn new(description: &str) -> Result<Self> {
        Self::with_options(description, PipelineOptions::default())
    }

    /// Builds a pipeline from a launch description.
    ///
    /// A description that yields a single element rather than a pipeline
    /// (e.g. `"fakesrc"`) is wrapped in a fresh pipeline. The graph is left in
    /// the NULL state; nothing runs until [`Pipeline::play`] or
    /// [`Pipeline::pause`].
    pub fn with_options(description: &str, options: PipelineOptions) -> Result<Self> {
        crate::init()?;

        let element = gst::parse::launch(description)?;
        let inner = match element.downcast::<gst::Pipeline>() {
            Ok(pipeline) => pipeline,
            Err(element) => {
                let pipeline = gst::Pipeline::new();
                pipeline.add(&element)?;
                pipeline
            }
        };
        if let Some(name) = &options.name {
            inner.set_property("name", name.as_str());
        }
        let bus = inner
            .bus()
            .ok_or_else(|| glib::bool_error!("Pipeline has no bus"))?;

        info!("Created pipeline {} from '{}'", inner.name(), description);
        gst::debug!(CAT, obj = inner, "Launch description: {}", description);

        Ok(Pipeline {
            description: description.to_owned(),
            options,
            inner: Some(inner),
            bus: Some(bus),
            tracker: StateTracker::default(),
            registry: Registry::new(),
            subscribers: Vec::new(),
        })
    }

    /// The launch description this pipeline was built from.
    pub fn description(&self) -> &str {
        &self.description
    }

    /// Options the pipeline was built with.
    pub fn options(&self) -> &PipelineOptions {
        &self.options
    }

    /// Name of the pipeline element (source name of its own bus events).
    pub fn name(&self) -> Option<String> {
        self.inner.as_ref().map(|p| p.name().to_string())
    }

    /// What the controller currently knows about the pipeline's state.
    pub fn state(&self) -> StateSnapshot {
        self.tracker.snapshot()
    }

    /// The last `error` event seen on the bus, if any.
    pub fn last_error(&self) -> Option<&BusEvent> {
        self.tracker.last_error()
    }

    /// Requests the PLAYING state.
    ///
    /// Returns once the request is issued. Completion shows up later as a
    /// `state-changed` event from the pipeline with new state PLAYING.
    ///
    /// # Errors
    /// * [`Error::StateChange`] if the engine refuses the change outright
    /// * [`Error::Stopped`] / [`Error::Quit`] after teardown
    pub fn play(&mut self) -> Result<()> {
        self.request_state(PipelineState::Playing)
    }

    /// Requests the PAUSED state.
    ///
    /// Valid from any active state. Sinks preroll one buffer and block.
    pub fn pause(&mut self) -> Result<()> {
        self.request_state(PipelineState::Paused)
    }

    /// Sets the graph to NULL and tears down its negotiated state.
    ///
    /// The pipeline does not come back from this: element and pad handles turn
    /// stale, and every control operation afterwards fails with
    /// [`Error::Stopped`]. Polling and [`Pipeline::quit`] remain available.
    pub fn stop(&mut self) -> Result<()> {
        let pipeline = self.live()?.clone();
        self.tracker.request(PipelineState::Null);
        let result = pipeline.set_state(gst::State::Null);
        self.teardown(Lifecycle::Stopped);
        info!("Stopped pipeline {}", pipeline.name());

        result.map(|_| ()).map_err(|_| Error::StateChange {
            target: PipelineState::Null,
        })
    }

    /// Injects an end-of-stream event into the graph.
    ///
    /// Sources stop producing; once every sink has drained, one `eos` event
    /// appears on the bus. The pipeline state is not changed.
    ///
    /// # Returns
    /// * `Ok(true)` if the event was handled by at least one element
    /// * `Ok(false)` if no element took it
    pub fn send_eos(&mut self) -> Result<bool> {
        let pipeline = self.live()?;
        let handled = pipeline.send_event(gst::event::Eos::new());
        debug!("EOS injected into {} (handled: {})", pipeline.name(), handled);
        Ok(handled)
    }

    /// Releases the graph, the bus and every subscriber channel.
    ///
    /// Idempotent. Any other operation afterwards fails with [`Error::Quit`].
    pub fn quit(&mut self) {
        if self.tracker.lifecycle() == Lifecycle::Quit {
            return;
        }
        if let Some(pipeline) = self.inner.take() {
            if pipeline.set_state(gst::State::Null).is_err() {
                warn!("Pipeline {} refused to shut down cleanly", pipeline.name());
            }
            gst::debug!(CAT, obj = pipeline, "Released");
        }
        self.bus = None;
        self.subscribers.clear();
        self.teardown(Lifecycle::Quit);
    }

    /// Borrows the underlying GStreamer pipeline while it is active.
    pub fn gst_pipeline(&self) -> Result<&gst::Pipeline> {
        self.live()
    }

    /// The graph, if control operations are still allowed on it.
    pub(crate) fn live(&self) -> Result<&gst::Pipeline> {
        match self.tracker.lifecycle() {
            Lifecycle::Active => self.inner.as_ref().ok_or(Error::Quit),
            Lifecycle::Stopped => Err(Error::Stopped),
            Lifecycle::Quit => Err(Error::Quit),
        }
    }

    fn request_state(&mut self, target: PipelineState) -> Result<()> {
        let pipeline = self.live()?.clone();
        self.tracker.request(target);

        match pipeline.set_state(target.into()) {
            Ok(success) => {
                debug!("{} -> {} requested: {:?}", pipeline.name(), target, success);
                Ok(())
            }
            Err(_) => {
                warn!("{} refused transition to {}", pipeline.name(), target);
                gst::warning!(CAT, obj = pipeline, "State change to {} failed", target);
                Err(Error::StateChange { target })
            }
        }
    }

    pub(crate) fn teardown(&mut self, lifecycle: Lifecycle) {
        self.registry.invalidate();
        self.tracker.set_lifecycle(lifecycle);
    }
}

impl Drop for Pipeline {
    fn drop(&mut self) {
        self.quit();
    }
}

impl std::fmt::Debug for Pipeline {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("Pipeline")
            .field("description", &self.description)
            .field("name", &self.name())
            .field("state", &self.tracker.snapshot())
            .finish()
    }
}
