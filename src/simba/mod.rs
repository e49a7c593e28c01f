// SPDX-License-Identifier: AGPL-3.0-or-later
// Copyright (C) 2012-2025 Andrei Maltsev

//! Decodes a single UDP payload as a SIMBA/SBE market data message stream.

pub mod messages;

use zerocopy::{FromBytes, Immutable, KnownLayout};

use crate::error::SimbaError;
use self::messages::{
    DecodedPacket, IncrementalPacketHeaderRaw, MarketDataPacketHeaderRaw, OrderBookSnapshot,
    OrderBookSnapshotEntry, OrderBookSnapshotEntryRaw, OrderBookSnapshotFixedRaw, OrderExecution,
    OrderExecutionRaw, OrderUpdate, OrderUpdateRaw, SbeHeaderRaw, ORDER_BOOK_SNAPSHOT_ENTRY_LEN,
    ORDER_BOOK_SNAPSHOT_FIXED_LEN, ORDER_EXECUTION_LEN, ORDER_UPDATE_LEN, SBE_HEADER_LEN,
    TEMPLATE_ID_ORDER_BOOK_SNAPSHOT, TEMPLATE_ID_ORDER_EXECUTION, TEMPLATE_ID_ORDER_UPDATE,
};

/// Decodes `payload` into the three per-template accumulators.
///
/// Root SBE blocks advance by `SBEHeader.block_length` (not a hardcoded
/// struct size) per the redesign adopted over the original's memcpy-offset
/// walk; the hardcoded sizes below are lower bounds used only to validate
/// that `block_length` is large enough for this decoder to read the fields
/// it knows about.
pub fn decode(payload: &[u8]) -> Result<DecodedPacket, SimbaError> {
    let mut cursor = 0usize;
    let md_header: MarketDataPacketHeaderRaw = read_struct(payload, &mut cursor, "MarketDataPacketHeader")?;

    if md_header.is_incremental() {
        let _inc: IncrementalPacketHeaderRaw =
            read_struct(payload, &mut cursor, "IncrementalPacketHeader")?;
    }

    let mut out = DecodedPacket::default();

    while cursor < payload.len() {
        let sbe_offset = cursor;
        let sbe: SbeHeaderRaw = read_struct(payload, &mut cursor, "SBEHeader")?;
        let template_id = sbe.template_id.get();
        let block_length = sbe.block_length.get();
        let root_block_end = sbe_offset + SBE_HEADER_LEN + block_length as usize;

        if root_block_end > payload.len() {
            return Err(SimbaError::Truncated {
                offset: cursor,
                need: root_block_end - payload.len(),
                len: payload.len(),
            });
        }

        match template_id {
            TEMPLATE_ID_ORDER_UPDATE => {
                ensure_block_length(sbe_offset, template_id, block_length, ORDER_UPDATE_LEN)?;
                let raw: OrderUpdateRaw = read_struct(payload, &mut cursor, "OrderUpdate")?;
                out.order_updates.push(OrderUpdate::from_raw(&raw));
                cursor = root_block_end;
            }
            TEMPLATE_ID_ORDER_EXECUTION => {
                ensure_block_length(sbe_offset, template_id, block_length, ORDER_EXECUTION_LEN)?;
                let raw: OrderExecutionRaw = read_struct(payload, &mut cursor, "OrderExecution")?;
                out.order_executions.push(OrderExecution::from_raw(&raw));
                cursor = root_block_end;
            }
            TEMPLATE_ID_ORDER_BOOK_SNAPSHOT => {
                ensure_block_length(
                    sbe_offset,
                    template_id,
                    block_length,
                    ORDER_BOOK_SNAPSHOT_FIXED_LEN,
                )?;
                let raw: OrderBookSnapshotFixedRaw =
                    read_struct(payload, &mut cursor, "OrderBookSnapshot")?;
                // Skip any root-block extension bytes beyond what this
                // decoder knows about; the repeating group begins after the
                // full declared root block, not after our 19 known bytes.
                cursor = root_block_end;

                let num_in_group = raw.no_md_entries.num_in_group;
                let entry_stride = raw.no_md_entries.block_length.get() as usize;
                if entry_stride < ORDER_BOOK_SNAPSHOT_ENTRY_LEN {
                    return Err(SimbaError::ShortBlockLength {
                        offset: sbe_offset,
                        template_id,
                        block_length: raw.no_md_entries.block_length.get(),
                        min_required: ORDER_BOOK_SNAPSHOT_ENTRY_LEN,
                    });
                }

                let mut entries = Vec::with_capacity(num_in_group as usize);
                for _ in 0..num_in_group {
                    let entry_offset = cursor;
                    if entry_offset + entry_stride > payload.len() {
                        return Err(SimbaError::Truncated {
                            offset: entry_offset,
                            need: entry_offset + entry_stride - payload.len(),
                            len: payload.len(),
                        });
                    }
                    let entry_raw: OrderBookSnapshotEntryRaw =
                        read_struct(payload, &mut cursor, "OrderBookSnapshot.Entry")?;
                    entries.push(OrderBookSnapshotEntry::from_raw(&entry_raw));
                    cursor = entry_offset + entry_stride;
                }

                out.order_book_snapshots
                    .push(OrderBookSnapshot::from_raw(&raw, entries));
            }
            other => {
                tracing::debug!(template_id = other, block_length, "skipping unknown SBE template");
                cursor = root_block_end;
            }
        }
    }

    Ok(out)
}

fn ensure_block_length(
    offset: usize,
    template_id: u16,
    block_length: u16,
    min_required: usize,
) -> Result<(), SimbaError> {
    if (block_length as usize) < min_required {
        return Err(SimbaError::ShortBlockLength {
            offset,
            template_id,
            block_length,
            min_required,
        });
    }
    Ok(())
}

fn read_struct<T>(payload: &[u8], cursor: &mut usize, what: &'static str) -> Result<T, SimbaError>
where
    T: FromBytes + KnownLayout + Immutable,
{
    let need = core::mem::size_of::<T>();
    if cursor.saturating_add(need) > payload.len() {
        return Err(SimbaError::Truncated {
            offset: *cursor,
            need,
            len: payload.len(),
        });
    }
    let (value, _) = T::read_from_prefix(&payload[*cursor..]).map_err(|_| SimbaError::Truncated {
        offset: *cursor,
        need,
        len: payload.len(),
    })?;
    let _ = what;
    *cursor += need;
    Ok(value)
}
