// SPDX-FileCopyrightText: 2025 2025 Contributors to the superficial project.
// SPDX-License-Identifier: Apache-2.0

//! Error types for pipeline control operations.
//!
//! Runtime failures of the media graph itself are not errors here: they arrive
//! as `error` bus events. This enum covers what the control layer can report
//! synchronously: construction failures, refused state changes, use after
//! teardown, bad handles and aggregated handler failures from a bus drain.

use gstreamer as gst;

use crate::state::PipelineState;

/// Convenience result type using [`Error`] as the error variant.
pub type Result<T> = core::result::Result<T, Error>;

/// Boxed error returned by a bus handler.
pub type HandlerError = Box<dyn std::error::Error + Send + Sync + 'static>;

/// Errors that can occur when controlling a pipeline.
#[derive(Debug, thiserror::Error)]
pub enum Error {
    /// GStreamer itself could not be initialized.
    #[error("Failed to initialize GStreamer: {0}")]
    Init(glib::Error),

    /// The launch description could not be parsed or instantiated.
    #[error("Invalid launch description: {0}")]
    Launch(#[from] glib::Error),

    /// The engine refused a state change outright.
    #[error("State change to {target} failed")]
    StateChange {
        /// State that was requested.
        target: PipelineState,
    },

    /// The pipeline was stopped; its graph has been torn down.
    #[error("Pipeline has been stopped")]
    Stopped,

    /// The pipeline was released with `quit()`.
    #[error("Pipeline has been released")]
    Quit,

    /// A handle was created by a different pipeline.
    #[error("Handle belongs to another pipeline")]
    ForeignHandle,

    /// A handle outlived the graph it was looked up in.
    #[error("Handle refers to a torn-down graph")]
    StaleHandle,

    /// The element has no static pad with this name.
    #[error("Element '{element}' has no pad named '{pad}'")]
    PadNotFound {
        /// Element name.
        element: String,
        /// Requested pad name.
        pad: String,
    },

    /// The element has no property with this name.
    #[error("Element '{element}' has no property named '{property}'")]
    PropertyNotFound {
        /// Element name.
        element: String,
        /// Requested property name.
        property: String,
    },

    /// The property exists but cannot hold the supplied value.
    #[error("Property '{property}' of '{element}' does not accept {expected}")]
    PropertyType {
        /// Element name.
        element: String,
        /// Property name.
        property: String,
        /// What the caller tried to store.
        expected: String,
    },

    /// The element is not of the requested type (e.g. not an appsink).
    #[error("Element '{element}' is not an {expected}")]
    WrongElementType {
        /// Element name.
        element: String,
        /// Expected element type name.
        expected: &'static str,
    },

    /// Pushing data into an appsrc failed.
    #[error("Data flow error: {0:?}")]
    Flow(gst::FlowError),

    /// One or more bus handlers failed during a drain.
    ///
    /// All queued messages were still dispatched; this carries every failure
    /// in dispatch order.
    #[error("{} bus handler call(s) failed", .failures.len())]
    Handler {
        /// Number of events dispatched by the drain, failed ones included.
        dispatched: usize,
        /// Failures in dispatch order.
        failures: Vec<HandlerFailure>,
    },

    /// A GLib-level boolean failure that has no better mapping.
    #[error("Engine call failed: {0}")]
    Bool(#[from] glib::BoolError),
}

/// A single failed handler invocation inside a bus drain.
#[derive(Debug)]
pub struct HandlerFailure {
    /// Sequence number of the message that was being handled.
    pub seqnum: u32,
    /// Kind name of that message (e.g. `"state-changed"`).
    pub kind: String,
    /// The error the handler returned.
    pub error: HandlerError,
}

impl std::fmt::Display for HandlerFailure {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        write!(f, "{} (seqnum {}): {}", self.kind, self.seqnum, self.error)
    }
}

impl From<gst::FlowError> for Error {
    fn from(err: gst::FlowError) -> Self {
        Error::Flow(err)
    }
}
