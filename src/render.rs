// SPDX-License-Identifier: AGPL-3.0-or-later
// Copyright (C) 2012-2025 Andrei Maltsev

//! Ties the capture walker and SIMBA decoder together: one JSON document
//! per captured packet, written as its own line to the output file.

use std::io::Write;

use crate::{capture::Walker, simba};

/// Reads every record from `walker`, decodes its payload, and writes one
/// JSON document per packet to `out`.
///
/// A payload that fails to decode (`SimbaError`) is logged at `warn` and
/// skipped; the capture walk itself continues. A failure to read the
/// capture container (`CaptureError`) aborts the run, since no further
/// record boundaries can be trusted once that happens.
pub fn run_sequential<R: std::io::Read, W: Write>(
    mut walker: Walker<R>,
    mut out: W,
) -> anyhow::Result<usize> {
    let mut packets_written = 0usize;

    while let Some(record) = walker.next()? {
        match simba::decode(&record.payload) {
            Ok(decoded) => {
                serde_json::to_writer(&mut out, &decoded)?;
                out.write_all(b"\n")?;
                packets_written += 1;
            }
            Err(err) => {
                tracing::warn!(
                    ts_sec = record.ts_sec,
                    ts_usec = record.ts_usec,
                    error = %err,
                    "skipping packet: SIMBA decode failed"
                );
            }
        }
    }

    out.flush()?;
    Ok(packets_written)
}

#[cfg(test)]
mod tests {
    use super::*;

    fn global_header() -> Vec<u8> {
        let mut buf = Vec::new();
        buf.extend_from_slice(&0xa1b2_c3d4u32.to_le_bytes());
        buf.extend_from_slice(&2u16.to_le_bytes());
        buf.extend_from_slice(&4u16.to_le_bytes());
        buf.extend_from_slice(&0u32.to_le_bytes());
        buf.extend_from_slice(&0u32.to_le_bytes());
        buf.extend_from_slice(&65535u32.to_le_bytes());
        buf.extend_from_slice(&1u32.to_le_bytes());
        buf
    }

    fn eth_ipv4_udp_frame(udp_payload: &[u8]) -> Vec<u8> {
        let mut frame = Vec::new();
        frame.extend_from_slice(&[0xaa; 6]);
        frame.extend_from_slice(&[0xbb; 6]);
        frame.extend_from_slice(&0x0800u16.to_be_bytes());

        let total_len = 20 + 8 + udp_payload.len();
        frame.push(0x45);
        frame.push(0);
        frame.extend_from_slice(&(total_len as u16).to_be_bytes());
        frame.extend_from_slice(&0u16.to_be_bytes());
        frame.extend_from_slice(&0u16.to_be_bytes());
        frame.push(64);
        frame.push(17);
        frame.extend_from_slice(&0u16.to_be_bytes());
        frame.extend_from_slice(&[10, 0, 0, 1]);
        frame.extend_from_slice(&[10, 0, 0, 2]);

        frame.extend_from_slice(&1234u16.to_be_bytes());
        frame.extend_from_slice(&5678u16.to_be_bytes());
        frame.extend_from_slice(&((8 + udp_payload.len()) as u16).to_be_bytes());
        frame.extend_from_slice(&0u16.to_be_bytes());
        frame.extend_from_slice(udp_payload);
        frame
    }

    fn market_data_only_header() -> Vec<u8> {
        let mut buf = Vec::new();
        buf.extend_from_slice(&1u32.to_le_bytes());
        buf.extend_from_slice(&0u16.to_le_bytes());
        buf.extend_from_slice(&0u16.to_le_bytes());
        buf.extend_from_slice(&0u64.to_le_bytes());
        buf
    }

    #[test]
    fn writes_one_json_line_per_packet() {
        let mut udp_payload = market_data_only_header();
        // SBEHeader with an unrecognized template id: decodes to an
        // (empty) DecodedPacket rather than erroring.
        udp_payload.extend_from_slice(&0u16.to_le_bytes());
        udp_payload.extend_from_slice(&9999u16.to_le_bytes());
        udp_payload.extend_from_slice(&0u16.to_le_bytes());
        udp_payload.extend_from_slice(&0u16.to_le_bytes());

        let frame = eth_ipv4_udp_frame(&udp_payload);
        let mut capture = global_header();
        let mut record = Vec::new();
        record.extend_from_slice(&0u32.to_le_bytes());
        record.extend_from_slice(&0u32.to_le_bytes());
        record.extend_from_slice(&(frame.len() as u32).to_le_bytes());
        record.extend_from_slice(&(frame.len() as u32).to_le_bytes());
        record.extend_from_slice(&frame);
        capture.extend_from_slice(&record);

        let walker =
            Walker::open(std::io::Cursor::new(capture)).expect("global header is well-formed");
        let mut out = Vec::new();
        let count = run_sequential(walker, &mut out).expect("sequential run succeeds");
        assert_eq!(count, 1);

        let text = String::from_utf8(out).expect("output is valid utf-8");
        assert_eq!(text.lines().count(), 1);
        let line = text.lines().next().expect("one line was written");
        let value: serde_json::Value =
            serde_json::from_str(line).expect("output line is valid JSON");
        assert!(value.get("orderUpdates").is_some());
        assert!(value.get("orderExecutions").is_some());
        assert!(value.get("orderBookSnapshots").is_some());
    }
}
