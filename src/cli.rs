// SPDX-License-Identifier: AGPL-3.0-or-later
// Copyright (C) 2012-2025 Andrei Maltsev

//! Argument handling for the `simba-pcap-decode` binary.

use anyhow::bail;

/// Resolved positional arguments: input capture path, output JSON path.
#[derive(Debug, Clone)]
pub struct Args {
    pub input_path: String,
    pub output_path: String,
}

/// Parses `argv[1..]` into [`Args`], failing with a usage message if the
/// arity is wrong (mirrors the original's `argc < 3` check in `main.cpp`).
pub fn parse_args<I: IntoIterator<Item = String>>(argv: I) -> anyhow::Result<Args> {
    let args: Vec<String> = argv.into_iter().collect();
    if args.len() != 2 {
        bail!("usage: simba-pcap-decode <input-capture-path> <output-json-path>");
    }
    Ok(Args {
        input_path: args[0].clone(),
        output_path: args[1].clone(),
    })
}
