// SPDX-FileCopyrightText: 2025 2025 Contributors to the superficial project.
// SPDX-License-Identifier: Apache-2.0

//! Per-pipeline configuration.
//!
//! Options are fixed at construction time and passed to
//! [`crate::Pipeline::with_options`]. The defaults match the behavior of
//! [`crate::Pipeline::new`].

use std::num::NonZeroUsize;

/// Construction-time options for a [`crate::Pipeline`].
///
/// # Examples
///
/// ```no_run
/// use std::num::NonZeroUsize;
/// use superficial::{Pipeline, PipelineOptions};
///
/// # fn main() -> Result<(), superficial::Error> {
/// let options = PipelineOptions::default()
///     .name("preview")
///     .poll_budget(NonZeroUsize::new(32))
///     .stop_on_error(false);
/// let pipeline = Pipeline::with_options("videotestsrc ! fakesink", options)?;
/// # Ok(())
/// # }
/// ```
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct PipelineOptions {
    /// Name given to the pipeline element (shows up as `src` of its events).
    pub name: Option<String>,

    /// Maximum number of messages dispatched by one `poll_bus` call.
    ///
    /// `None` drains everything that is pending. A budget keeps a very chatty
    /// pipeline from monopolizing one turn of the host's event loop; the rest
    /// stays queued for the next call.
    pub poll_budget: Option<NonZeroUsize>,

    /// Stop the pipeline once an `error` event has been dispatched.
    pub stop_on_error: bool,

    /// Ask encoders for codec headers along with forced key units.
    pub force_key_unit_all_headers: bool,
}

impl Default for PipelineOptions {
    fn default() -> Self {
        PipelineOptions {
            name: None,
            poll_budget: None,
            stop_on_error: true,
            force_key_unit_all_headers: true,
        }
    }
}

impl PipelineOptions {
    /// Sets the pipeline element name.
    pub fn name(mut self, name: impl Into<String>) -> Self {
        self.name = Some(name.into());
        self
    }

    /// Sets the per-poll dispatch budget.
    pub fn poll_budget(mut self, budget: Option<NonZeroUsize>) -> Self {
        self.poll_budget = budget;
        self
    }

    /// Enables or disables stopping on `error` events.
    pub fn stop_on_error(mut self, stop: bool) -> Self {
        self.stop_on_error = stop;
        self
    }

    /// Enables or disables all-headers on forced key units.
    pub fn force_key_unit_all_headers(mut self, all_headers: bool) -> Self {
        self.force_key_unit_all_headers = all_headers;
        self
    }
}
