// SPDX-License-Identifier: AGPL-3.0-or-later
// Copyright (C) 2012-2025 Andrei Maltsev

//! Walks a libpcap capture, yielding the UDP payload of each record.
//!
//! Layering mirrors `spec.md` §4.1: global header once, then per record
//! capture-record header → Ethernet → IPv4 (variable IHL) → UDP → payload.
//! Every wire layout is a packed, little-endian `zerocopy` struct, the same
//! technique the teacher uses for its (big-endian) iSCSI PDUs.

use std::io::Read;

use zerocopy::{
    FromBytes, Immutable, KnownLayout,
    byteorder::{LittleEndian, U16, U32},
};

use crate::error::CaptureError;

const MAGIC_LE: u32 = 0xa1b2_c3d4;
const MAGIC_SWAPPED: u32 = 0xd4c3_b2a1;

const ETHERNET_HEADER_LEN: usize = 14;
const IPV4_BASE_HEADER_LEN: usize = 20;
const UDP_HEADER_LEN: usize = 8;
const ETHERTYPE_IPV4: u16 = 0x0800;
const LINKTYPE_ETHERNET: u32 = 1;

#[repr(C)]
#[derive(Debug, Clone, Copy, FromBytes, KnownLayout, Immutable)]
struct GlobalHeaderRaw {
    magic_number: U32<LittleEndian>,
    version_major: U16<LittleEndian>,
    version_minor: U16<LittleEndian>,
    thiszone: U32<LittleEndian>,
    sigfigs: U32<LittleEndian>,
    snaplen: U32<LittleEndian>,
    linktype: U32<LittleEndian>,
}

const GLOBAL_HEADER_LEN: usize = 24;

#[repr(C)]
#[derive(Debug, Clone, Copy, FromBytes, KnownLayout, Immutable)]
struct RecordHeaderRaw {
    ts_sec: U32<LittleEndian>,
    ts_usec: U32<LittleEndian>,
    incl_len: U32<LittleEndian>,
    orig_len: U32<LittleEndian>,
}

const RECORD_HEADER_LEN: usize = 16;

#[repr(C)]
#[derive(Debug, Clone, Copy, FromBytes, KnownLayout, Immutable)]
struct EthernetHeaderRaw {
    dst_mac: [u8; 6],
    src_mac: [u8; 6],
    ether_type: U16<zerocopy::byteorder::BigEndian>,
}

#[repr(C)]
#[derive(Debug, Clone, Copy, FromBytes, KnownLayout, Immutable)]
struct Ipv4BaseHeaderRaw {
    version_ihl: u8,
    dscp_ecn: u8,
    total_length: U16<zerocopy::byteorder::BigEndian>,
    identification: U16<zerocopy::byteorder::BigEndian>,
    flags_fragment_offset: U16<zerocopy::byteorder::BigEndian>,
    ttl: u8,
    protocol: u8,
    header_checksum: U16<zerocopy::byteorder::BigEndian>,
    src_addr: [u8; 4],
    dst_addr: [u8; 4],
}

#[repr(C)]
#[derive(Debug, Clone, Copy, FromBytes, KnownLayout, Immutable)]
struct UdpHeaderRaw {
    src_port: U16<zerocopy::byteorder::BigEndian>,
    dst_port: U16<zerocopy::byteorder::BigEndian>,
    length: U16<zerocopy::byteorder::BigEndian>,
    checksum: U16<zerocopy::byteorder::BigEndian>,
}

/// One captured record's timestamp plus its extracted UDP payload.
#[derive(Debug, Clone)]
pub struct PacketView {
    pub ts_sec: u32,
    pub ts_usec: u32,
    pub payload: Vec<u8>,
}

/// Sequential reader over a libpcap byte stream.
pub struct Walker<R: Read> {
    reader: R,
    record_index: u64,
}

impl<R: Read> Walker<R> {
    /// Reads and validates the 24-byte global header.
    pub fn open(mut reader: R) -> Result<Self, CaptureError> {
        let mut buf = [0u8; GLOBAL_HEADER_LEN];
        read_exact_or_truncated(&mut reader, &mut buf, "global header")?;
        let (header, _) = GlobalHeaderRaw::read_from_prefix(&buf[..])
            .map_err(|_| CaptureError::TruncatedHeader {
                what: "global header",
                need: GLOBAL_HEADER_LEN,
            })?;

        let magic = header.magic_number.get();
        if magic == MAGIC_SWAPPED {
            return Err(CaptureError::UnsupportedMagic(magic));
        }
        if magic != MAGIC_LE {
            return Err(CaptureError::UnsupportedMagic(magic));
        }

        let linktype = header.linktype.get();
        if linktype != LINKTYPE_ETHERNET {
            tracing::warn!(linktype, "capture linktype is not Ethernet (1)");
        }

        Ok(Walker {
            reader,
            record_index: 0,
        })
    }

    /// Reads the next record and extracts its UDP payload, or `None` at a
    /// clean end of stream.
    pub fn next(&mut self) -> Result<Option<PacketView>, CaptureError> {
        let mut record_buf = [0u8; RECORD_HEADER_LEN];
        let read = read_to_end_or_filled(&mut self.reader, &mut record_buf)?;
        if read == 0 {
            return Ok(None);
        }
        if read != RECORD_HEADER_LEN {
            tracing::warn!(
                record_index = self.record_index,
                bytes_read = read,
                "truncated capture record header at tail of file"
            );
            return Err(CaptureError::TruncatedHeader {
                what: "record header",
                need: RECORD_HEADER_LEN,
            });
        }
        let (record, _) = RecordHeaderRaw::read_from_prefix(&record_buf[..])
            .map_err(|_| CaptureError::TruncatedHeader {
                what: "record header",
                need: RECORD_HEADER_LEN,
            })?;

        let incl_len = record.incl_len.get();
        let mut frame = vec![0u8; incl_len as usize];
        read_exact_or_truncated(&mut self.reader, &mut frame, "capture record body")?;

        let payload = extract_udp_payload(&frame)?;

        tracing::debug!(
            record_index = self.record_index,
            incl_len,
            payload_len = payload.len(),
            "walked capture record"
        );
        self.record_index += 1;

        Ok(Some(PacketView {
            ts_sec: record.ts_sec.get(),
            ts_usec: record.ts_usec.get(),
            payload,
        }))
    }
}

/// `frame` has already been read in full (exactly `incl_len` bytes, by
/// `Walker::next`), so every short-header check below means `incl_len`
/// itself was too small to hold the headers it claims to wrap — that is
/// `spec.md` §7's `MalformedRecord`, not a truncated read from the
/// underlying source (`TruncatedHeader` is reserved for genuine short
/// reads, handled in `Walker::open`/`next`).
fn extract_udp_payload(frame: &[u8]) -> Result<Vec<u8>, CaptureError> {
    if frame.len() < ETHERNET_HEADER_LEN {
        return Err(CaptureError::MalformedRecord {
            incl_len: frame.len() as u32,
            headers_len: ETHERNET_HEADER_LEN,
        });
    }
    let (eth, rest) = EthernetHeaderRaw::read_from_prefix(frame)
        .map_err(|_| CaptureError::MalformedRecord {
            incl_len: frame.len() as u32,
            headers_len: ETHERNET_HEADER_LEN,
        })?;
    if eth.ether_type.get() != ETHERTYPE_IPV4 {
        tracing::warn!(
            ether_type = format!("{:#06x}", eth.ether_type.get()),
            "non-IPv4 EtherType, attempting to parse as IPv4 regardless"
        );
    }

    if rest.len() < IPV4_BASE_HEADER_LEN {
        return Err(CaptureError::MalformedRecord {
            incl_len: frame.len() as u32,
            headers_len: ETHERNET_HEADER_LEN + IPV4_BASE_HEADER_LEN,
        });
    }
    let (ip_base, _) = Ipv4BaseHeaderRaw::read_from_prefix(rest)
        .map_err(|_| CaptureError::MalformedRecord {
            incl_len: frame.len() as u32,
            headers_len: ETHERNET_HEADER_LEN + IPV4_BASE_HEADER_LEN,
        })?;

    let ihl = ip_base.version_ihl & 0x0F;
    if ihl < 5 {
        return Err(CaptureError::MalformedIPv4 { ihl });
    }
    let ip_header_len = ihl as usize * 4;
    if rest.len() < ip_header_len {
        return Err(CaptureError::MalformedRecord {
            incl_len: frame.len() as u32,
            headers_len: ETHERNET_HEADER_LEN + ip_header_len,
        });
    }
    let after_ip = &rest[ip_header_len..];

    if after_ip.len() < UDP_HEADER_LEN {
        return Err(CaptureError::MalformedRecord {
            incl_len: frame.len() as u32,
            headers_len: ETHERNET_HEADER_LEN + ip_header_len + UDP_HEADER_LEN,
        });
    }
    let (_udp, payload) = UdpHeaderRaw::read_from_prefix(after_ip)
        .map_err(|_| CaptureError::MalformedRecord {
            incl_len: frame.len() as u32,
            headers_len: ETHERNET_HEADER_LEN + ip_header_len + UDP_HEADER_LEN,
        })?;

    Ok(payload.to_vec())
}

/// Reads exactly `buf.len()` bytes, mapping a short read to
/// `TruncatedHeader { what, .. }`.
fn read_exact_or_truncated<R: Read>(
    reader: &mut R,
    buf: &mut [u8],
    what: &'static str,
) -> Result<(), CaptureError> {
    let need = buf.len();
    reader
        .read_exact(buf)
        .map_err(|err| match err.kind() {
            std::io::ErrorKind::UnexpectedEof => CaptureError::TruncatedHeader { what, need },
            _ => CaptureError::Io(err),
        })
}

/// Reads up to `buf.len()` bytes, returning the number actually read. Used
/// at record-header boundaries, where 0 bytes read means a clean EOF and a
/// partial read means a truncated tail.
fn read_to_end_or_filled<R: Read>(reader: &mut R, buf: &mut [u8]) -> Result<usize, CaptureError> {
    let mut total = 0;
    while total < buf.len() {
        match reader.read(&mut buf[total..]) {
            Ok(0) => break,
            Ok(n) => total += n,
            Err(err) if err.kind() == std::io::ErrorKind::Interrupted => continue,
            Err(err) => return Err(CaptureError::Io(err)),
        }
    }
    Ok(total)
}

#[cfg(test)]
mod tests {
    use super::*;

    fn global_header_bytes() -> Vec<u8> {
        let mut buf = Vec::new();
        buf.extend_from_slice(&MAGIC_LE.to_le_bytes());
        buf.extend_from_slice(&2u16.to_le_bytes());
        buf.extend_from_slice(&4u16.to_le_bytes());
        buf.extend_from_slice(&0u32.to_le_bytes());
        buf.extend_from_slice(&0u32.to_le_bytes());
        buf.extend_from_slice(&65535u32.to_le_bytes());
        buf.extend_from_slice(&(LINKTYPE_ETHERNET).to_le_bytes());
        buf
    }

    fn udp_frame(ihl_words: u8, options_len: usize, udp_payload: &[u8]) -> Vec<u8> {
        let mut frame = Vec::new();
        frame.extend_from_slice(&[0xaa; 6]); // dst mac
        frame.extend_from_slice(&[0xbb; 6]); // src mac
        frame.extend_from_slice(&ETHERTYPE_IPV4.to_be_bytes());

        let ip_header_len = ihl_words as usize * 4;
        let total_len = ip_header_len + UDP_HEADER_LEN + udp_payload.len();
        frame.push((4 << 4) | ihl_words);
        frame.push(0); // dscp/ecn
        frame.extend_from_slice(&(total_len as u16).to_be_bytes());
        frame.extend_from_slice(&0u16.to_be_bytes()); // identification
        frame.extend_from_slice(&0u16.to_be_bytes()); // flags/frag offset
        frame.push(64); // ttl
        frame.push(17); // protocol = UDP
        frame.extend_from_slice(&0u16.to_be_bytes()); // checksum
        frame.extend_from_slice(&[10, 0, 0, 1]);
        frame.extend_from_slice(&[10, 0, 0, 2]);
        frame.extend_from_slice(&vec![0u8; options_len]);

        frame.extend_from_slice(&1234u16.to_be_bytes());
        frame.extend_from_slice(&5678u16.to_be_bytes());
        frame.extend_from_slice(&((UDP_HEADER_LEN + udp_payload.len()) as u16).to_be_bytes());
        frame.extend_from_slice(&0u16.to_be_bytes());
        frame.extend_from_slice(udp_payload);
        frame
    }

    fn record_bytes(frame: &[u8]) -> Vec<u8> {
        let mut buf = Vec::new();
        buf.extend_from_slice(&0u32.to_le_bytes());
        buf.extend_from_slice(&0u32.to_le_bytes());
        buf.extend_from_slice(&(frame.len() as u32).to_le_bytes());
        buf.extend_from_slice(&(frame.len() as u32).to_le_bytes());
        buf.extend_from_slice(frame);
        buf
    }

    #[test]
    fn rejects_byte_swapped_magic() {
        let mut buf = Vec::new();
        buf.extend_from_slice(&MAGIC_SWAPPED.to_le_bytes());
        buf.extend_from_slice(&[0u8; 20]);
        let err = Walker::open(std::io::Cursor::new(buf))
            .expect_err("byte-swapped magic must be rejected");
        assert!(matches!(err, CaptureError::UnsupportedMagic(_)));
    }

    #[test]
    fn extracts_payload_with_no_ip_options() {
        let payload = b"hello simba";
        let frame = udp_frame(5, 0, payload);
        let mut capture = global_header_bytes();
        capture.extend_from_slice(&record_bytes(&frame));

        let mut walker =
            Walker::open(std::io::Cursor::new(capture)).expect("global header is well-formed");
        let record = walker
            .next()
            .expect("record reads without error")
            .expect("one record is present");
        assert_eq!(record.payload, payload);
        assert!(
            walker
                .next()
                .expect("clean end of stream reads without error")
                .is_none()
        );
    }

    #[test]
    fn extracts_payload_with_ip_options() {
        let payload = b"with-options";
        let frame = udp_frame(8, 12, payload);
        let mut capture = global_header_bytes();
        capture.extend_from_slice(&record_bytes(&frame));

        let mut walker =
            Walker::open(std::io::Cursor::new(capture)).expect("global header is well-formed");
        let record = walker
            .next()
            .expect("record reads without error")
            .expect("one record is present");
        assert_eq!(record.payload, payload);
    }

    #[test]
    fn rejects_ihl_below_five() {
        let mut frame = udp_frame(5, 0, b"x");
        frame[14] = (4 << 4) | 4; // IHL = 4, below minimum
        let mut capture = global_header_bytes();
        capture.extend_from_slice(&record_bytes(&frame));

        let mut walker =
            Walker::open(std::io::Cursor::new(capture)).expect("global header is well-formed");
        let err = walker.next().expect_err("IHL below 5 must be rejected");
        assert!(matches!(err, CaptureError::MalformedIPv4 { ihl: 4 }));
    }

    #[test]
    fn truncated_record_tail_is_an_error() {
        let mut capture = global_header_bytes();
        capture.extend_from_slice(&[0u8; 10]); // short record header
        let mut walker =
            Walker::open(std::io::Cursor::new(capture)).expect("global header is well-formed");
        let err = walker
            .next()
            .expect_err("short record header tail must be rejected");
        assert!(matches!(err, CaptureError::TruncatedHeader { .. }));
    }
}
