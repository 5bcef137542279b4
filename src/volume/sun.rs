// This Source Code Form is subject to the terms of the Mozilla Public
// License, v. 2.0. If a copy of the MPL was not distributed with this
// file, You can obtain one at https://mozilla.org/MPL/2.0/.

//! Sun VTOC (SMI disklabel) opener.
//!
//! Like [`super::bsd`], this models a simplified, self-consistent VTOC
//! layout rather than reproducing the real on-disk format exactly.

use super::{Partition, PartitionFlags, TryOpen, VolumeSystem, VsType};
use crate::image::Image;
use bytes::Buf;

const MAGIC_OFFSET: u64 = 0;
const MAGIC: u16 = 0xDABE;
const HEADER_LEN: usize = 8;
const ENTRY_LEN: usize = 12;
const NUM_SLICES: usize = 8;

pub(super) fn try_open(image: &dyn Image, offset: u64) -> TryOpen {
    let header_off = offset + MAGIC_OFFSET;
    if image.size() < header_off + HEADER_LEN as u64 {
        return Ok(None);
    }
    let header = image.read_exact_at(header_off, HEADER_LEN)?;
    let magic = (&header[0..2]).get_u16();
    if magic != MAGIC {
        return Ok(None);
    }
    let sector_size = (&header[4..8]).get_u32();
    if sector_size == 0 {
        return Ok(None);
    }

    let table_off = header_off + HEADER_LEN as u64;
    let table_len = NUM_SLICES * ENTRY_LEN;
    if image.size() < table_off + table_len as u64 {
        return Ok(None);
    }
    let table = image.read_exact_at(table_off, table_len)?;

    let mut partitions = Vec::new();
    for i in 0..NUM_SLICES {
        let base = i * ENTRY_LEN;
        let entry = &table[base..base + ENTRY_LEN];
        let num_blocks = (&entry[4..8]).get_u32();
        if num_blocks == 0 {
            continue;
        }
        let start_block = (&entry[8..12]).get_u32();
        partitions.push(Partition {
            start: start_block as u64,
            len: num_blocks as u64,
            desc: format!("Slice {i}"),
            flags: PartitionFlags::ALLOC,
        });
    }

    if partitions.is_empty() {
        return Ok(None);
    }

    Ok(Some(VolumeSystem {
        vs_type: VsType::Sun,
        block_size: sector_size,
        offset,
        partitions,
    }))
}
