// This Source Code Form is subject to the terms of the Mozilla Public
// License, v. 2.0. If a copy of the MPL was not distributed with this
// file, You can obtain one at https://mozilla.org/MPL/2.0/.

//! GUID Partition Table opener.

use super::{crc32, Partition, PartitionFlags, TryOpen, VolumeSystem, VsType};
use crate::image::Image;
use bytes::Buf;

const SECTOR: u64 = 512;
const SIGNATURE: &[u8; 8] = b"EFI PART";
const HEADER_LEN: usize = 92;
const ENTRY_LEN: u32 = 128;

pub(super) fn try_open(image: &dyn Image, offset: u64) -> TryOpen {
    let header_off = offset + SECTOR;
    if image.size() < header_off + HEADER_LEN as u64 {
        return Ok(None);
    }
    let mut header = image.read_exact_at(header_off, HEADER_LEN)?;
    if &header[0..8] != SIGNATURE {
        return Ok(None);
    }

    let stored_crc = (&header[16..20]).get_u32_le();
    header[16..20].copy_from_slice(&[0, 0, 0, 0]);
    if crc32(&header) != stored_crc {
        return Ok(None);
    }

    let entries_lba = (&header[72..80]).get_u64_le();
    let num_entries = (&header[80..84]).get_u32_le();
    let entry_size = (&header[84..88]).get_u32_le();
    if entry_size != ENTRY_LEN || num_entries == 0 {
        return Ok(None);
    }

    let table_off = entries_lba.saturating_mul(SECTOR);
    let table_len = num_entries as u64 * entry_size as u64;
    if image.size() < table_off + table_len {
        return Ok(None);
    }
    let table = image.read_exact_at(table_off, table_len as usize)?;

    let mut partitions = Vec::new();
    for i in 0..num_entries as usize {
        let base = i * entry_size as usize;
        let entry = &table[base..base + entry_size as usize];
        if entry[0..16].iter().all(|&b| b == 0) {
            continue;
        }
        let first_lba = (&entry[32..40]).get_u64_le();
        let last_lba = (&entry[40..48]).get_u64_le();
        if last_lba < first_lba {
            continue;
        }
        let name_utf16: Vec<u16> = entry[56..128]
            .chunks_exact(2)
            .map(|c| u16::from_le_bytes([c[0], c[1]]))
            .take_while(|&u| u != 0)
            .collect();
        let name = String::from_utf16_lossy(&name_utf16);
        partitions.push(Partition {
            start: first_lba,
            len: last_lba - first_lba + 1,
            desc: if name.is_empty() { format!("GPT partition {i}") } else { name },
            flags: PartitionFlags::ALLOC,
        });
    }

    if partitions.is_empty() {
        return Ok(None);
    }

    Ok(Some(VolumeSystem {
        vs_type: VsType::Gpt,
        block_size: SECTOR as u32,
        offset,
        partitions,
    }))
}
