// SPDX-License-Identifier: AGPL-3.0-or-later
// Copyright (C) 2012-2025 Andrei Maltsev

//! Wire layouts and cooked record types for the SIMBA/SBE message stream.
//!
//! Every `*Raw` type below is a packed, little-endian, zero-copy view of
//! the exact bytes on the wire (`zerocopy`-derived, mirroring the teacher's
//! own `#[derive(FromBytes, KnownLayout, Immutable)]` wire structs in
//! `control_block/read_capacity.rs` and `models/nop/request.rs`, but over
//! `LittleEndian` field wrappers instead of `BigEndian` ones). The
//! corresponding "cooked" type (no `Raw` suffix) is the `serde`-serializable
//! domain value the rest of the crate works with.

use serde::{Serialize, Serializer};
use zerocopy::{
    FromBytes, Immutable, KnownLayout,
    byteorder::{I32, I64, LittleEndian, U16, U32, U64},
};

pub const SBE_HEADER_LEN: usize = 8;
pub const MARKET_DATA_PACKET_HEADER_LEN: usize = 16;
pub const INCREMENTAL_PACKET_HEADER_LEN: usize = 12;
pub const ORDER_UPDATE_LEN: usize = 50;
pub const ORDER_EXECUTION_LEN: usize = 74;
pub const ORDER_BOOK_SNAPSHOT_FIXED_LEN: usize = 19;
/// Size of one `OrderBookSnapshot.Entry`: the sum of its eight named,
/// explicitly-typed fields in `spec.md` §4.2 (8+8+8+8+8+8+8+1 = 57 bytes).
/// `spec.md` §3's summary table and §8 Scenario E instead state 37 bytes —
/// an internal inconsistency in that document (37 is not reachable from any
/// subset of the eight named fields, seven of which are 8-byte integers).
/// The field-level type contract in §4.2 is the more specific and load
/// bearing of the two, and is what this decoder honors; see DESIGN.md for
/// the full writeup of this resolution.
pub const ORDER_BOOK_SNAPSHOT_ENTRY_LEN: usize = 57;

pub const TEMPLATE_ID_ORDER_UPDATE: u16 = 15;
pub const TEMPLATE_ID_ORDER_EXECUTION: u16 = 16;
pub const TEMPLATE_ID_ORDER_BOOK_SNAPSHOT: u16 = 17;

/// Sentinel mantissa for a null `Decimal5NULL`.
pub const DECIMAL5_NULL_SENTINEL: i64 = 0x7FFF_FFFF_FFFF_FFFF;
/// One less than the null sentinel — the largest representable value.
pub const DECIMAL5_MAX_VALUE: i64 = DECIMAL5_NULL_SENTINEL - 1;

const DECIMAL5_EXPONENT: f64 = 1e-5;

// ---------------------------------------------------------------------
// Raw wire layouts
// ---------------------------------------------------------------------

#[repr(C)]
#[derive(Debug, Clone, Copy, FromBytes, KnownLayout, Immutable)]
pub struct MarketDataPacketHeaderRaw {
    pub msg_seq_num: U32<LittleEndian>,
    pub msg_size: U16<LittleEndian>,
    pub msg_flags: U16<LittleEndian>,
    pub sending_time: U64<LittleEndian>,
}

impl MarketDataPacketHeaderRaw {
    /// `spec.md` §3: incremental iff bit 0x8 of `msg_flags` is set.
    pub fn is_incremental(&self) -> bool {
        self.msg_flags.get() & 0x8 != 0
    }
}

#[repr(C)]
#[derive(Debug, Clone, Copy, FromBytes, KnownLayout, Immutable)]
pub struct IncrementalPacketHeaderRaw {
    pub transact_time: U64<LittleEndian>,
    pub exchange_trading_session_id: U32<LittleEndian>,
}

impl IncrementalPacketHeaderRaw {
    pub const EXCHANGE_TRADING_SESSION_ID_NULL: u32 = 0xFFFF_FFFF;
}

#[repr(C)]
#[derive(Debug, Clone, Copy, FromBytes, KnownLayout, Immutable)]
pub struct SbeHeaderRaw {
    pub block_length: U16<LittleEndian>,
    pub template_id: U16<LittleEndian>,
    pub schema_id: U16<LittleEndian>,
    pub version: U16<LittleEndian>,
}

#[repr(C)]
#[derive(Debug, Clone, Copy, FromBytes, KnownLayout, Immutable)]
pub struct GroupSizeRaw {
    pub block_length: U16<LittleEndian>,
    pub num_in_group: u8,
}

#[repr(C)]
#[derive(Debug, Clone, Copy, FromBytes, KnownLayout, Immutable)]
pub struct OrderUpdateRaw {
    pub md_entry_id: I64<LittleEndian>,
    pub md_entry_px: I64<LittleEndian>,
    pub md_entry_size: I64<LittleEndian>,
    pub md_flags: U64<LittleEndian>,
    pub md_flags2: U64<LittleEndian>,
    pub security_id: I32<LittleEndian>,
    pub rpt_seq: U32<LittleEndian>,
    pub md_update_action: u8,
    pub md_entry_type: u8,
}

#[repr(C)]
#[derive(Debug, Clone, Copy, FromBytes, KnownLayout, Immutable)]
pub struct OrderExecutionRaw {
    pub md_entry_id: I64<LittleEndian>,
    pub md_entry_px: I64<LittleEndian>,
    pub md_entry_size: I64<LittleEndian>,
    pub last_px: I64<LittleEndian>,
    pub last_qty: I64<LittleEndian>,
    pub trade_id: I64<LittleEndian>,
    pub md_flags: U64<LittleEndian>,
    pub md_flags2: U64<LittleEndian>,
    pub security_id: I32<LittleEndian>,
    pub rpt_seq: U32<LittleEndian>,
    pub md_update_action: u8,
    pub md_entry_type: u8,
}

#[repr(C)]
#[derive(Debug, Clone, Copy, FromBytes, KnownLayout, Immutable)]
pub struct OrderBookSnapshotFixedRaw {
    pub security_id: I32<LittleEndian>,
    pub last_msg_seq_num_processed: U32<LittleEndian>,
    pub rpt_seq: U32<LittleEndian>,
    pub exchange_trading_session_id: U32<LittleEndian>,
    pub no_md_entries: GroupSizeRaw,
}

#[repr(C)]
#[derive(Debug, Clone, Copy, FromBytes, KnownLayout, Immutable)]
pub struct OrderBookSnapshotEntryRaw {
    pub md_entry_id: I64<LittleEndian>,
    pub transact_time: U64<LittleEndian>,
    pub md_entry_px: I64<LittleEndian>,
    pub md_entry_size: I64<LittleEndian>,
    pub trade_id: I64<LittleEndian>,
    pub md_flags: U64<LittleEndian>,
    pub md_flags2: U64<LittleEndian>,
    pub md_entry_type: u8,
}

// ---------------------------------------------------------------------
// Decimal types
// ---------------------------------------------------------------------

/// A non-nullable fixed-point value, mantissa scaled by 10⁻⁵.
#[derive(Debug, Clone, Copy, PartialEq)]
pub struct Decimal5(pub i64);

impl Decimal5 {
    pub fn as_f64(self) -> f64 {
        self.0 as f64 * DECIMAL5_EXPONENT
    }
}

impl Serialize for Decimal5 {
    fn serialize<S: Serializer>(&self, serializer: S) -> Result<S::Ok, S::Error> {
        serializer.serialize_f64(self.as_f64())
    }
}

/// A fixed-point value that models nullability explicitly as `Option<i64>`
/// rather than as a sentinel the caller must remember to check (Design
/// Note in `spec.md` §9).
#[derive(Debug, Clone, Copy, PartialEq)]
pub struct Decimal5Null(pub Option<i64>);

impl Decimal5Null {
    pub fn from_mantissa(raw: i64) -> Self {
        if raw == DECIMAL5_NULL_SENTINEL {
            Decimal5Null(None)
        } else {
            Decimal5Null(Some(raw))
        }
    }
}

impl Serialize for Decimal5Null {
    fn serialize<S: Serializer>(&self, serializer: S) -> Result<S::Ok, S::Error> {
        match self.0 {
            Some(mantissa) => serializer.serialize_f64(mantissa as f64 * DECIMAL5_EXPONENT),
            None => serializer.serialize_i32(0),
        }
    }
}

// ---------------------------------------------------------------------
// Enumerations
// ---------------------------------------------------------------------

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum MdUpdateAction {
    New,
    Change,
    Delete,
    /// Not one of {New, Change, Delete}; the core surfaces it unchanged
    /// rather than rejecting the message, same spirit as
    /// `login::status::StatusClass::Unknown`.
    Unknown(u8),
}

impl From<u8> for MdUpdateAction {
    fn from(raw: u8) -> Self {
        match raw {
            0 => MdUpdateAction::New,
            1 => MdUpdateAction::Change,
            2 => MdUpdateAction::Delete,
            other => MdUpdateAction::Unknown(other),
        }
    }
}

impl MdUpdateAction {
    fn as_u8(self) -> u8 {
        match self {
            MdUpdateAction::New => 0,
            MdUpdateAction::Change => 1,
            MdUpdateAction::Delete => 2,
            MdUpdateAction::Unknown(raw) => raw,
        }
    }
}

impl Serialize for MdUpdateAction {
    fn serialize<S: Serializer>(&self, serializer: S) -> Result<S::Ok, S::Error> {
        serializer.serialize_u8(self.as_u8())
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum MdEntryType {
    Bid,
    Offer,
    EmptyBook,
    Unknown(u8),
}

impl From<u8> for MdEntryType {
    fn from(raw: u8) -> Self {
        match raw {
            b'0' => MdEntryType::Bid,
            b'1' => MdEntryType::Offer,
            b'J' => MdEntryType::EmptyBook,
            other => MdEntryType::Unknown(other),
        }
    }
}

impl MdEntryType {
    fn as_byte(self) -> u8 {
        match self {
            MdEntryType::Bid => b'0',
            MdEntryType::Offer => b'1',
            MdEntryType::EmptyBook => b'J',
            MdEntryType::Unknown(raw) => raw,
        }
    }
}

impl Serialize for MdEntryType {
    /// Renders as a length-one ASCII string in every message type,
    /// resolving the character-vs-numeric inconsistency the original
    /// source has between root messages and snapshot entries (`spec.md`
    /// §4.3, §9 Open Question 2) in favor of the character form
    /// throughout.
    fn serialize<S: Serializer>(&self, serializer: S) -> Result<S::Ok, S::Error> {
        let mut buf = [0u8; 1];
        buf[0] = self.as_byte();
        serializer.serialize_str(std::str::from_utf8(&buf).unwrap_or("?"))
    }
}

bitflags::bitflags! {
    /// `MDFlagsSet`, a u64 bitfield (`spec.md` §3). The core does not
    /// interpret these beyond surfacing the raw integer in the rendered
    /// JSON; this type exists to give decoded packets a readable `Debug`
    /// form when traced, the same role `LoginFlags` plays for the teacher.
    #[derive(Clone, Copy, PartialEq, Eq)]
    pub struct MdFlagsSet: u64 {
        const DAY                 = 0x1;
        const IOC                 = 0x2;
        const NON_QUOTE           = 0x4;
        const END_OF_TRANSACTION  = 0x1000;
        const SECOND_LEG          = 0x4000;
        const FOK                 = 0x80000;
        const REPLACE             = 0x100000;
        const CANCEL              = 0x200000;
        const MASS_CANCEL         = 0x400000;
        const NEGOTIATED          = 0x4000000;
        const MULTI_LEG           = 0x8000000;
        const CROSS_TRADE         = 0x20000000;
        const COD                 = 0x1_0000_0000;
        const ACTIVE_SIDE         = 0x200_0000_0000;
        const PASSIVE_SIDE        = 0x400_0000_0000;
        const SYNTHETIC           = 0x2000_0000_0000;
        const RFS                 = 0x4000_0000_0000;
        const SYNTHETIC_PASSIVE   = 0x0200_0000_0000_0000;
    }
}

impl std::fmt::Debug for MdFlagsSet {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        let mut parts = Vec::new();
        for (name, bit) in [
            ("DAY", Self::DAY),
            ("IOC", Self::IOC),
            ("NON_QUOTE", Self::NON_QUOTE),
            ("END_OF_TRANSACTION", Self::END_OF_TRANSACTION),
            ("SECOND_LEG", Self::SECOND_LEG),
            ("FOK", Self::FOK),
            ("REPLACE", Self::REPLACE),
            ("CANCEL", Self::CANCEL),
            ("MASS_CANCEL", Self::MASS_CANCEL),
            ("NEGOTIATED", Self::NEGOTIATED),
            ("MULTI_LEG", Self::MULTI_LEG),
            ("CROSS_TRADE", Self::CROSS_TRADE),
            ("COD", Self::COD),
            ("ACTIVE_SIDE", Self::ACTIVE_SIDE),
            ("PASSIVE_SIDE", Self::PASSIVE_SIDE),
            ("SYNTHETIC", Self::SYNTHETIC),
            ("RFS", Self::RFS),
            ("SYNTHETIC_PASSIVE", Self::SYNTHETIC_PASSIVE),
        ] {
            if self.contains(bit) {
                parts.push(name);
            }
        }
        write!(f, "MdFlagsSet({:#x} [{}])", self.bits(), parts.join("|"))
    }
}

// ---------------------------------------------------------------------
// Cooked, serializable record types
// ---------------------------------------------------------------------

#[derive(Debug, Clone, Serialize)]
pub struct OrderUpdate {
    pub md_entry_id: i64,
    pub md_entry_px: Decimal5,
    pub md_entry_size: i64,
    pub md_flags: u64,
    pub md_flags2: u64,
    pub security_id: i32,
    pub rpt_seq: u32,
    pub md_update_action: MdUpdateAction,
    pub md_entry_type: MdEntryType,
}

impl OrderUpdate {
    pub fn from_raw(raw: &OrderUpdateRaw) -> Self {
        Self {
            md_entry_id: raw.md_entry_id.get(),
            md_entry_px: Decimal5(raw.md_entry_px.get()),
            md_entry_size: raw.md_entry_size.get(),
            md_flags: raw.md_flags.get(),
            md_flags2: raw.md_flags2.get(),
            security_id: raw.security_id.get(),
            rpt_seq: raw.rpt_seq.get(),
            md_update_action: raw.md_update_action.into(),
            md_entry_type: raw.md_entry_type.into(),
        }
    }
}

#[derive(Debug, Clone, Serialize)]
pub struct OrderExecution {
    pub md_entry_id: i64,
    pub md_entry_px: Decimal5Null,
    pub md_entry_size: i64,
    pub last_px: Decimal5,
    pub last_qty: i64,
    pub trade_id: i64,
    pub md_flags: u64,
    pub md_flags2: u64,
    pub security_id: i32,
    pub rpt_seq: u32,
    pub md_update_action: MdUpdateAction,
    pub md_entry_type: MdEntryType,
}

impl OrderExecution {
    pub fn from_raw(raw: &OrderExecutionRaw) -> Self {
        Self {
            md_entry_id: raw.md_entry_id.get(),
            md_entry_px: Decimal5Null::from_mantissa(raw.md_entry_px.get()),
            md_entry_size: raw.md_entry_size.get(),
            last_px: Decimal5(raw.last_px.get()),
            last_qty: raw.last_qty.get(),
            trade_id: raw.trade_id.get(),
            md_flags: raw.md_flags.get(),
            md_flags2: raw.md_flags2.get(),
            security_id: raw.security_id.get(),
            rpt_seq: raw.rpt_seq.get(),
            md_update_action: raw.md_update_action.into(),
            md_entry_type: raw.md_entry_type.into(),
        }
    }
}

#[derive(Debug, Clone, Serialize)]
pub struct GroupSizeInfo {
    pub block_length: u16,
    pub num_in_group: u8,
}

#[derive(Debug, Clone, Serialize)]
pub struct OrderBookSnapshotEntry {
    pub md_entry_id: i64,
    pub transact_time: u64,
    pub md_entry_px: Decimal5Null,
    pub md_entry_size: i64,
    pub trade_id: i64,
    pub md_flags: u64,
    pub md_flags2: u64,
    pub md_entry_type: MdEntryType,
}

impl OrderBookSnapshotEntry {
    pub fn from_raw(raw: &OrderBookSnapshotEntryRaw) -> Self {
        Self {
            md_entry_id: raw.md_entry_id.get(),
            transact_time: raw.transact_time.get(),
            md_entry_px: Decimal5Null::from_mantissa(raw.md_entry_px.get()),
            md_entry_size: raw.md_entry_size.get(),
            trade_id: raw.trade_id.get(),
            md_flags: raw.md_flags.get(),
            md_flags2: raw.md_flags2.get(),
            md_entry_type: raw.md_entry_type.into(),
        }
    }
}

#[derive(Debug, Clone, Serialize)]
pub struct OrderBookSnapshot {
    pub security_id: i32,
    pub last_msg_seq_num_processed: u32,
    pub rpt_seq: u32,
    pub exchange_trading_session_id: u32,
    pub no_md_entries: GroupSizeInfo,
    pub entries: Vec<OrderBookSnapshotEntry>,
}

impl OrderBookSnapshot {
    pub fn from_raw(raw: &OrderBookSnapshotFixedRaw, entries: Vec<OrderBookSnapshotEntry>) -> Self {
        Self {
            security_id: raw.security_id.get(),
            last_msg_seq_num_processed: raw.last_msg_seq_num_processed.get(),
            rpt_seq: raw.rpt_seq.get(),
            exchange_trading_session_id: raw.exchange_trading_session_id.get(),
            no_md_entries: GroupSizeInfo {
                block_length: raw.no_md_entries.block_length.get(),
                num_in_group: raw.no_md_entries.num_in_group,
            },
            entries,
        }
    }
}

/// The three accumulators a single UDP payload decodes into (`spec.md`
/// §4.2). Serializes to the exact JSON document shape required by §4.3.
#[derive(Debug, Clone, Default, Serialize)]
pub struct DecodedPacket {
    #[serde(rename = "orderUpdates")]
    pub order_updates: Vec<OrderUpdate>,
    #[serde(rename = "orderExecutions")]
    pub order_executions: Vec<OrderExecution>,
    #[serde(rename = "orderBookSnapshots")]
    pub order_book_snapshots: Vec<OrderBookSnapshot>,
}
