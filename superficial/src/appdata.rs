// SPDX-FileCopyrightText: 2025 2025 Contributors to the superficial project.
// SPDX-License-Identifier: Apache-2.0

//! Application data plane: pulling from `appsink`, pushing into `appsrc`.
//!
//! Both are thin borrowed views over an element found with
//! [`Pipeline::find_child`]. Buffer contents are opaque to this layer; callers
//! get the raw [`gst::Buffer`] together with the caps that describe it.

use std::str::FromStr;
use std::time::Duration;

use gst::prelude::*;
use gstreamer as gst;
use gstreamer_app as gst_app;
use tracing::trace;

use crate::pipeline::{CAT, Pipeline};
use crate::registry::ElementHandle;
use crate::{Error, Result};

/// One sample taken from an appsink.
#[derive(Debug, Clone)]
pub struct PulledSample {
    /// The media payload.
    pub buffer: gst::Buffer,
    /// Format of the payload, if negotiated.
    pub caps: Option<gst::Caps>,
}

impl PulledSample {
    fn from_sample(sample: gst::Sample) -> Option<PulledSample> {
        Some(PulledSample {
            buffer: sample.buffer_owned()?,
            caps: sample.caps_owned(),
        })
    }
}

/// Borrowed view of an `appsink` element.
#[derive(Debug, Clone, Copy)]
pub struct AppSink<'p> {
    sink: &'p gst_app::AppSink,
}

/// Borrowed view of an `appsrc` element.
#[derive(Debug, Clone, Copy)]
pub struct AppSrc<'p> {
    src: &'p gst_app::AppSrc,
}

impl Pipeline {
    /// Views an element as an appsink.
    ///
    /// # Errors
    /// * [`Error::WrongElementType`] if the element is not an appsink
    pub fn app_sink(&self, element: &ElementHandle) -> Result<AppSink<'_>> {
        let element = self.element(element)?;
        let sink = element
            .downcast_ref::<gst_app::AppSink>()
            .ok_or_else(|| Error::WrongElementType {
                element: element.name().to_string(),
                expected: "appsink",
            })?;
        Ok(AppSink { sink })
    }

    /// Views an element as an appsrc.
    ///
    /// # Errors
    /// * [`Error::WrongElementType`] if the element is not an appsrc
    pub fn app_src(&self, element: &ElementHandle) -> Result<AppSrc<'_>> {
        let element = self.element(element)?;
        let src = element
            .downcast_ref::<gst_app::AppSrc>()
            .ok_or_else(|| Error::WrongElementType {
                element: element.name().to_string(),
                expected: "appsrc",
            })?;
        Ok(AppSrc { src })
    }
}

impl AppSink<'_> {
    /// Waits up to `timeout` for the next sample.
    ///
    /// Returns `None` on timeout, at end of stream, or when the sink is not
    /// in PAUSED or PLAYING. A zero timeout never blocks.
    pub fn try_pull(&self, timeout: Duration) -> Option<PulledSample> {
        let timeout = u64::try_from(timeout.as_nanos())
            .map_or(gst::ClockTime::MAX, gst::ClockTime::from_nseconds);
        self.sink
            .try_pull_sample(timeout)
            .and_then(PulledSample::from_sample)
    }

    /// Hands every sample that is already queued to `callback`, without
    /// blocking.
    ///
    /// Stops after `max` samples so a fast producer cannot starve the caller.
    /// Returns the number of samples delivered.
    pub fn pull_ready<F>(&self, max: usize, mut callback: F) -> usize
    where
        F: FnMut(PulledSample),
    {
        let mut delivered = 0;
        while delivered < max {
            let Some(sample) = self
                .sink
                .try_pull_sample(gst::ClockTime::ZERO)
                .and_then(PulledSample::from_sample)
            else {
                break;
            };
            callback(sample);
            delivered += 1;
        }
        if delivered > 0 {
            gst::trace!(CAT, obj = self.sink, "Delivered {} ready samples", delivered);
        }
        delivered
    }

    /// True once the sink has received end-of-stream and has no samples left.
    pub fn is_eos(&self) -> bool {
        self.sink.is_eos()
    }

    /// The underlying element.
    pub fn as_gst(&self) -> &gst_app::AppSink {
        self.sink
    }
}

impl AppSrc<'_> {
    /// Pushes one buffer built from `data` downstream.
    ///
    /// # Errors
    /// * [`Error::Flow`] if the source refuses the buffer, e.g. because it is
    ///   flushing or has already signalled end of stream
    pub fn push<T>(&self, data: T) -> Result<()>
    where
        T: AsRef<[u8]> + Send + 'static,
    {
        let buffer = gst::Buffer::from_slice(data);
        trace!("Pushing {} bytes into {}", buffer.size(), self.src.name());
        self.src.push_buffer(buffer)?;
        Ok(())
    }

    /// Declares the format of the buffers that follow, from a caps string
    /// such as `"video/x-raw,format=RGB,width=4,height=4,framerate=30/1"`.
    pub fn set_caps(&self, caps: &str) -> Result<()> {
        let caps = gst::Caps::from_str(caps)?;
        self.src.set_caps(Some(&caps));
        Ok(())
    }

    /// Signals that no more buffers will be pushed.
    pub fn end_of_stream(&self) -> Result<()> {
        self.src.end_of_stream()?;
        Ok(())
    }

    /// The underlying element.
    pub fn as_gst(&self) -> &gst_app::AppSrc {
        self.src
    }
}
