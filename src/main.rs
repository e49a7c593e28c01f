// SPDX-License-Identifier: AGPL-3.0-or-later
// Copyright (C) 2012-2025 Andrei Maltsev

use std::{
    fs::File,
    io::{BufReader, BufWriter},
};

use anyhow::{Context, Result};
use simba_pcap_decode::{capture::Walker, cli, render};

fn run() -> Result<()> {
    let args = cli::parse_args(std::env::args().skip(1))?;

    // Progress lines are the spec's stdout-facing UI (spec.md §6); they are
    // deliberately plain `println!`, not `tracing`, since the one configured
    // subscriber writes to stderr and stdout must carry these regardless of
    // `RUST_LOG`.
    println!("Decoding...");

    let input = File::open(&args.input_path)
        .with_context(|| format!("failed to open capture file {}", args.input_path))?;
    let walker = Walker::open(BufReader::new(input))
        .with_context(|| format!("failed to read capture header from {}", args.input_path))?;

    let output = File::create(&args.output_path)
        .with_context(|| format!("failed to create output file {}", args.output_path))?;
    let writer = BufWriter::new(output);

    let packets_written = render::run_sequential(walker, writer)
        .context("failed while decoding capture")?;

    println!("done: {packets_written} packet(s) written");
    Ok(())
}

fn main() {
    simba_pcap_decode::logging::init();
    if let Err(err) = run() {
        eprintln!("error: {err:#}");
        std::process::exit(1);
    }
}
