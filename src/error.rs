// SPDX-License-Identifier: AGPL-3.0-or-later
// Copyright (C) 2012-2025 Andrei Maltsev

//! Error types for the two decoder stages.
//!
//! Mirrors the split the rest of the crate uses: `thiserror` enums at the
//! point of definition, converted to `anyhow::Error` once they cross into
//! the CLI driver.

use thiserror::Error;

/// Errors raised while walking the capture container (global header,
/// per-record Ethernet/IPv4/UDP stack).
#[derive(Debug, Error)]
pub enum CaptureError {
    #[error("i/o error reading capture: {0}")]
    Io(#[from] std::io::Error),

    #[error("truncated {what}: need {need} bytes, source ended early")]
    TruncatedHeader { what: &'static str, need: usize },

    #[error("malformed IPv4 header: IHL={ihl} (must be >= 5)")]
    MalformedIPv4 { ihl: u8 },

    #[error(
        "malformed record: incl_len={incl_len} implies negative or \
         out-of-bounds UDP payload length (headers={headers_len})"
    )]
    MalformedRecord { incl_len: u32, headers_len: usize },

    #[error("unsupported pcap magic: 0x{0:08x}")]
    UnsupportedMagic(u32),
}

/// Errors raised while decoding a single UDP payload as a SIMBA/SBE message
/// stream. Unknown template ids are *not* an error — they are skipped per
/// `spec.md` §4.2 and never reach this type.
#[derive(Debug, Error)]
pub enum SimbaError {
    #[error(
        "truncated payload: cursor at {offset}, need {need} more bytes, \
         payload has {len}"
    )]
    Truncated {
        offset: usize,
        need: usize,
        len: usize,
    },

    #[error(
        "SBE header at offset {offset} declares block_length={block_length}, \
         too short for template {template_id} (needs >= {min_required})"
    )]
    ShortBlockLength {
        offset: usize,
        template_id: u16,
        block_length: u16,
        min_required: usize,
    },
}
