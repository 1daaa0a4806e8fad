// SPDX-FileCopyrightText: 2025 2025 Contributors to the superficial project.
// SPDX-License-Identifier: Apache-2.0

//! Logging setup shared by the demos.

use tracing::level_filters::LevelFilter;
use tracing_subscriber::EnvFilter;

/// Installs a `tracing` subscriber for the control layer.
///
/// `RUST_LOG` selects the control-layer level (INFO by default). Engine-side
/// logs are separate and follow `GST_DEBUG`; the control layer's own debug
/// category is `superficial`.
pub fn setup_logging() {
    tracing_subscriber::fmt()
        .with_env_filter(
            EnvFilter::builder()
                .with_default_directive(LevelFilter::INFO.into())
                .from_env_lossy(),
        )
        .with_target(false)
        .init();

    if std::env::var_os("GST_DEBUG").is_none() {
        tracing::debug!("GST_DEBUG unset; use GST_DEBUG=superficial:5 for engine-side traces");
    }
}
