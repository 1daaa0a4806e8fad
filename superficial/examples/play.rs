// SPDX-FileCopyrightText: 2025 2025 Contributors to the superficial project.
// SPDX-License-Identifier: Apache-2.0

//! Plays a pipeline and prints every bus event as one JSON line.
//!
//! ```text
//! cargo run --example play -- videotestsrc num-buffers=300 "video/x-raw,width=320" autovideosink
//! cargo run --example play -- --seek 2.5 --rate 2 filesrc location=clip.mp4 decodebin autovideosink
//! ```
//!
//! Each positional argument is one launch stage; they are joined with `!`.

mod common;

use std::time::{Duration, Instant};

use clap::Parser;
use superficial::{EventKind, Pipeline, PipelineState, SeekFlags, TimeUnit, launch_from_stages};
use tracing::{info, warn};

#[derive(Debug, Parser)]
#[command(version, about = "Play a GStreamer pipeline and dump its bus events")]
struct Opts {
    /// Launch stages, joined with `!`.
    #[arg(required = true)]
    stages: Vec<String>,

    /// Seek to this position once prerolled.
    #[arg(long)]
    seek: Option<f64>,

    /// Interpret `--seek` in milliseconds instead of seconds.
    #[arg(long)]
    millis: bool,

    /// Seek flags, e.g. `FLUSH|KEY_UNIT`.
    #[arg(long, default_value = "FLUSH|KEY_UNIT")]
    flags: String,

    /// Playback rate to apply once playing.
    #[arg(long)]
    rate: Option<f64>,

    /// Give up after this many seconds.
    #[arg(long, default_value_t = 30)]
    timeout: u64,
}

fn main() -> Result<(), Box<dyn std::error::Error>> {
    common::setup_logging();
    let mut opts = Opts::parse();

    let flags = SeekFlags::parse(&opts.flags).ok_or("unknown seek flag")?;
    let unit = TimeUnit::from_millis_flag(opts.millis);
    let launch = launch_from_stages(&opts.stages);
    info!("Launching '{}'", launch);

    let mut pipeline = Pipeline::new(&launch)?;
    let name = pipeline.name().unwrap_or_default();
    pipeline.pause()?;

    let deadline = Instant::now() + Duration::from_secs(opts.timeout);
    let mut prerolled = false;
    let mut playing = false;
    let mut done = false;

    while !done && Instant::now() < deadline {
        pipeline.poll_bus(|event| {
            println!("{}", event.to_json());
            let own = event.source.as_deref() == Some(name.as_str());
            match &event.kind {
                EventKind::AsyncDone if own => prerolled = true,
                EventKind::StateChanged {
                    new: PipelineState::Playing,
                    ..
                } if own => playing = true,
                EventKind::Eos | EventKind::Error => done = true,
                _ => {}
            }
            Ok(())
        })?;

        if prerolled {
            prerolled = false;
            if let Some(position) = opts.seek.take() {
                if !pipeline.seek(position, flags, unit)? {
                    warn!("Seek to {} refused", position);
                }
            }
            pipeline.play()?;
        }
        if playing {
            playing = false;
            if let Some(rate) = opts.rate.take() {
                if !pipeline.rate(rate, flags)? {
                    warn!("Rate {} refused", rate);
                }
            }
        }
        std::thread::sleep(Duration::from_millis(20));
    }

    if let Some(position) = pipeline.query_position(unit).ok().flatten() {
        info!("Final position: {:.3}", position);
    }
    pipeline.quit();
    Ok(())
}
