// This Source Code Form is subject to the terms of the Mozilla Public
// License, v. 2.0. If a copy of the MPL was not distributed with this
// file, You can obtain one at https://mozilla.org/MPL/2.0/.

//! DOS (MBR) partition table opener.

use super::{Partition, PartitionFlags, TryOpen, VolumeSystem, VsType};
use crate::image::Image;
use bytes::Buf;

const SECTOR: u64 = 512;
const SIG_OFFSET: usize = 510;
const TABLE_OFFSET: usize = 446;
const ENTRY_LEN: usize = 16;
const NUM_ENTRIES: usize = 4;

/// Attempts to read an MBR partition table at `offset`.
///
/// `tolerant` mirrors the original's behavior of allowing a DOS-looking
/// sector through even when it might also be a BSD boot block; the caller
/// resolves that ambiguity (§4.2 rule 2).
pub(super) fn try_open(image: &dyn Image, offset: u64, tolerant: bool) -> TryOpen {
    let _ = tolerant;
    if image.size() < offset + SECTOR {
        return Ok(None);
    }
    let sector = image.read_exact_at(offset, SECTOR as usize)?;
    if sector[SIG_OFFSET] != 0x55 || sector[SIG_OFFSET + 1] != 0xAA {
        return Ok(None);
    }

    let mut partitions = Vec::new();
    for i in 0..NUM_ENTRIES {
        let base = TABLE_OFFSET + i * ENTRY_LEN;
        let entry = &sector[base..base + ENTRY_LEN];
        let part_type = entry[4];
        if part_type == 0 {
            continue;
        }
        let start_lba = (&entry[8..12]).get_u32_le();
        let num_sectors = (&entry[12..16]).get_u32_le();
        if num_sectors == 0 {
            continue;
        }
        partitions.push(Partition {
            start: start_lba as u64,
            len: num_sectors as u64,
            desc: format!("Partition (type 0x{part_type:02x})"),
            flags: PartitionFlags::ALLOC,
        });
    }

    if partitions.is_empty() {
        return Ok(None);
    }

    Ok(Some(VolumeSystem {
        vs_type: VsType::Dos,
        block_size: SECTOR as u32,
        offset,
        partitions,
    }))
}
