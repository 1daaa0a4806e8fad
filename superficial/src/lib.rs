// SPDX-FileCopyrightText: 2025 2025 Contributors to the superficial project.
// SPDX-License-Identifier: Apache-2.0

//! # superficial - pipeline control over GStreamer
//!
//! A small control layer that lets a host application build a GStreamer
//! pipeline from a launch description, drive it through its states, seek in
//! it, and observe it through typed bus events, all from the host's own event
//! loop and without blocking on the engine.
//!
//! ## Overview
//!
//! - **Pipeline**: one instantiated processing graph ([`Pipeline`])
//! - **Bus event**: an immutable snapshot of one engine message ([`BusEvent`]),
//!   obtained by polling ([`Pipeline::poll_bus`]) or from a subscriber channel
//!   ([`Pipeline::subscribe`])
//! - **Handle**: an opaque, generation-checked reference to an element or pad
//!   of the graph ([`ElementHandle`], [`PadHandle`])
//!
//! ## Architecture
//!
//! ```text
//! ┌──────────┐ play/pause/stop/seek/rate ┌────────────────┐
//! │   host   │ ─────────────────────────► │    Pipeline    │──► gst::Pipeline
//! │   loop   │ ◄───────── BusEvent ────── │ (state tracker)│◄── gst::Bus (pop)
//! └──────────┘        poll_bus()          └────────────────┘
//!                                            │  find_child / get_pad
//!                                            └─► ElementHandle ──► AppSink / AppSrc
//! ```
//!
//! ## Example
//!
//! ```no_run
//! use superficial::{EventKind, Pipeline, SeekFlags, TimeUnit};
//!
//! # fn main() -> Result<(), superficial::Error> {
//! let mut pipeline = Pipeline::new("videotestsrc ! videoconvert ! autovideosink")?;
//! pipeline.pause()?;
//!
//! loop {
//!     let mut prerolled = false;
//!     pipeline.poll_bus(|event| {
//!         prerolled |= event.kind == EventKind::AsyncDone;
//!         Ok(())
//!     })?;
//!     if prerolled {
//!         break;
//!     }
//!     std::thread::sleep(std::time::Duration::from_millis(10));
//! }
//!
//! pipeline.seek(5.0, SeekFlags::FLUSH | SeekFlags::KEY_UNIT, TimeUnit::Seconds)?;
//! pipeline.play()?;
//! # Ok(())
//! # }
//! ```
//!
//! ## Threading
//!
//! A [`Pipeline`] is meant to be driven from one thread. GStreamer runs its
//! streaming threads underneath; none of the control calls wait for them.
//!
//! ## Feature Flags
//!
//! - `log-subscriber`: install a compact `tracing` subscriber on first use

mod appdata;
mod bus;
mod error;
mod flags;
mod message;
mod pipeline;
mod registry;
mod seek;
mod state;
mod time;

pub mod config;

pub use appdata::{AppSink, AppSrc, PulledSample};
pub use config::PipelineOptions;
pub use error::{Error, HandlerError, HandlerFailure, Result};
pub use flags::SeekFlags;
pub use message::{BusEvent, EventKind, FieldValue, Fields};
pub use pipeline::Pipeline;
pub use registry::{ElementHandle, PadHandle};
pub use state::{Lifecycle, PipelineState, StateSnapshot};
pub use time::{TimeUnit, from_clock_time, launch_from_stages, to_clock_time};

/// Initializes GStreamer.
///
/// Called by [`Pipeline::new`]; calling it again is cheap. Hosts only need it
/// directly to use the engine before building a pipeline.
///
/// # Errors
/// * [`Error::Init`] if the engine cannot be initialized
pub fn init() -> Result<()> {
    gstreamer::init().map_err(Error::Init)?;

    #[cfg(feature = "log-subscriber")]
    {
        use tracing_subscriber::filter::LevelFilter;
        use tracing_subscriber::util::SubscriberInitExt;
        // Fails harmlessly if the host already installed a subscriber.
        let _ = tracing_subscriber::fmt()
            .compact()
            .with_file(true)
            .with_line_number(true)
            .with_thread_ids(true)
            .with_target(false)
            .with_max_level(LevelFilter::DEBUG)
            .with_ansi(true)
            .finish()
            .try_init();
    }

    Ok(())
}
