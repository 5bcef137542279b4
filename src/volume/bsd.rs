// This Source Code Form is subject to the terms of the Mozilla Public
// License, v. 2.0. If a copy of the MPL was not distributed with this
// file, You can obtain one at https://mozilla.org/MPL/2.0/.

//! BSD disklabel opener.
//!
//! The on-disk layout modeled here is a simplified, self-consistent
//! disklabel: a magic number followed by a sector size and a partition
//! count and table. It demonstrates the dispatch behavior this module
//! exists to exercise rather than reproducing a real disklabel byte for
//! byte.

use super::{Partition, PartitionFlags, TryOpen, VolumeSystem, VsType};
use crate::image::Image;
use bytes::Buf;

const LABEL_OFFSET: u64 = 512;
const MAGIC: u32 = 0x8290_0396;
const HEADER_LEN: usize = 12;
const ENTRY_LEN: usize = 16;
const MAX_PARTITIONS: u16 = 16;

pub(super) fn try_open(image: &dyn Image, offset: u64) -> TryOpen {
    let label_off = offset + LABEL_OFFSET;
    if image.size() < label_off + HEADER_LEN as u64 {
        return Ok(None);
    }
    let header = image.read_exact_at(label_off, HEADER_LEN)?;
    let magic = (&header[0..4]).get_u32_le();
    if magic != MAGIC {
        return Ok(None);
    }
    let sector_size = (&header[4..8]).get_u32_le();
    let num_partitions = (&header[8..10]).get_u16_le();
    if sector_size == 0 || num_partitions == 0 || num_partitions > MAX_PARTITIONS {
        return Ok(None);
    }

    let table_off = label_off + HEADER_LEN as u64;
    let table_len = num_partitions as usize * ENTRY_LEN;
    if image.size() < table_off + table_len as u64 {
        return Ok(None);
    }
    let table = image.read_exact_at(table_off, table_len)?;

    let mut partitions = Vec::new();
    for i in 0..num_partitions as usize {
        let base = i * ENTRY_LEN;
        let entry = &table[base..base + ENTRY_LEN];
        let num_blocks = (&entry[0..4]).get_u32_le();
        if num_blocks == 0 {
            continue;
        }
        let start_block = (&entry[4..8]).get_u32_le();
        let fs_type = entry[8];
        partitions.push(Partition {
            start: start_block as u64,
            len: num_blocks as u64,
            desc: format!("BSD partition {} (fstype {fs_type})", (b'a' + i as u8) as char),
            flags: PartitionFlags::ALLOC,
        });
    }

    if partitions.is_empty() {
        return Ok(None);
    }

    Ok(Some(VolumeSystem {
        vs_type: VsType::Bsd,
        block_size: sector_size,
        offset,
        partitions,
    }))
}
