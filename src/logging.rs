// SPDX-License-Identifier: AGPL-3.0-or-later
// Copyright (C) 2012-2025 Andrei Maltsev

//! A much smaller stand-in for the teacher's `cfg::logger` JSON formatter
//! stack, sized for a one-shot synchronous batch CLI rather than a
//! long-running async session client. See SPEC_FULL.md's CLI/driver
//! section for why the rolling-file/fastrace machinery was dropped.

use tracing_subscriber::EnvFilter;

/// Initializes a compact text subscriber on stderr, honoring `RUST_LOG`
/// and defaulting to `info`. Diagnostic tracing only; the CLI's stdout
/// progress lines (`main.rs`) are plain `println!` and go through this
/// subscriber's `EnvFilter` not at all.
pub fn init() {
    let filter = EnvFilter::try_from_default_env().unwrap_or_else(|_| EnvFilter::new("info"));
    tracing_subscriber::fmt()
        .with_env_filter(filter)
        .with_writer(std::io::stderr)
        .init();
}
