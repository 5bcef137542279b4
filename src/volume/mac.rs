// This Source Code Form is subject to the terms of the Mozilla Public
// License, v. 2.0. If a copy of the MPL was not distributed with this
// file, You can obtain one at https://mozilla.org/MPL/2.0/.

//! Apple Partition Map (APM) opener.

use super::{Partition, PartitionFlags, TryOpen, VolumeSystem, VsType};
use crate::image::Image;
use bytes::Buf;

const BLOCK: u64 = 512;
const SIGNATURE: u16 = 0x504D; // 'PM'
const ENTRY_LEN: usize = 136;

pub(super) fn try_open(image: &dyn Image, offset: u64) -> TryOpen {
    let first_off = offset + BLOCK;
    if image.size() < first_off + ENTRY_LEN as u64 {
        return Ok(None);
    }
    let first = image.read_exact_at(first_off, ENTRY_LEN)?;
    if (&first[0..2]).get_u16() != SIGNATURE {
        return Ok(None);
    }
    let map_entries = (&first[4..8]).get_u32();
    if map_entries == 0 || map_entries > 256 {
        return Ok(None);
    }

    let mut partitions = Vec::new();
    for i in 0..map_entries {
        let entry_off = offset + BLOCK * (1 + i as u64);
        if image.size() < entry_off + ENTRY_LEN as u64 {
            break;
        }
        let entry = image.read_exact_at(entry_off, ENTRY_LEN)?;
        if (&entry[0..2]).get_u16() != SIGNATURE {
            continue;
        }
        let start_block = (&entry[8..12]).get_u32();
        let block_count = (&entry[12..16]).get_u32();
        if block_count == 0 {
            continue;
        }
        let name = String::from_utf8_lossy(&entry[16..48])
            .trim_end_matches('\0')
            .to_string();
        partitions.push(Partition {
            start: start_block as u64,
            len: block_count as u64,
            desc: if name.is_empty() { format!("APM partition {i}") } else { name },
            flags: PartitionFlags::ALLOC,
        });
    }

    if partitions.is_empty() {
        return Ok(None);
    }

    Ok(Some(VolumeSystem {
        vs_type: VsType::Mac,
        block_size: BLOCK as u32,
        offset,
        partitions,
    }))
}
