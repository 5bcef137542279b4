// This Source Code Form is subject to the terms of the Mozilla Public
// License, v. 2.0. If a copy of the MPL was not distributed with this
// file, You can obtain one at https://mozilla.org/MPL/2.0/.

//! The ISO9660 filesystem driver (§4.5): the one production filesystem
//! driver this crate ships, as an illustration of [`super::FsDriver`].

mod record;

use crate::error::{Error, Lookup, Result, WalkControl};
use crate::flags::{BlockFlags, MetaFlags, WalkFlags};
use crate::fs::{AllocState, Attribute, Directory, FsDriver, MetaAddr, MetaType, NameComparison, ParentNameRecord};
use crate::image::Image;
use bytes::Buf;
use std::collections::HashMap;
use std::sync::Arc;

const SYSTEM_AREA_LEN: u64 = 32768;
const PVD_TYPE: u8 = 1;
const VOLUME_DESC_LEN: usize = 2048;
const STANDARD_ID: &[u8; 5] = b"CD001";

#[derive(Clone, Debug)]
struct IndexEntry {
    extent: u32,
    data_len: u32,
    meta_type: MetaType,
}

/// An opened ISO9660 volume.
pub struct Iso9660 {
    image: Arc<dyn Image>,
    block_size: u32,
    volume_blocks: u64,
    root_addr: MetaAddr,
    /// Extent address to structural metadata, built once at open time by
    /// walking the directory tree so repeated lookups are O(1) rather
    /// than re-scanning directories from the root each time.
    index: HashMap<MetaAddr, IndexEntry>,
}

/// Reads the Primary Volume Descriptor and indexes the whole directory
/// tree rooted at it.
pub fn open(image: Arc<dyn Image>) -> Result<Iso9660> {
    let pvd_off = SYSTEM_AREA_LEN;
    let pvd = image.read_exact_at(pvd_off, VOLUME_DESC_LEN)?;
    if pvd[0] != PVD_TYPE || &pvd[1..6] != STANDARD_ID {
        return Err(Error::Corrupted("no primary volume descriptor at sector 16"));
    }

    let block_size = (&pvd[128..130]).get_u16_le() as u32;
    let volume_blocks = (&pvd[80..84]).get_u32_le() as u64;
    if block_size == 0 || volume_blocks == 0 {
        return Err(Error::Corrupted("zero block size or volume space size in primary volume descriptor"));
    }

    let root_record = record::parse_one(&pvd[156..190])
        .ok_or(Error::Corrupted("unparseable root directory record"))?;
    let root_addr = root_record.extent as MetaAddr;

    let mut index = HashMap::new();
    index_directory(image.as_ref(), block_size, root_addr, root_record.extent, root_record.data_len, &mut index)?;

    Ok(Iso9660 { image, block_size, volume_blocks, root_addr, index })
}

/// Discovers every extent a directory (transitively) references and
/// populates `index` with it.
///
/// This does not go through [`record::proc_dir`]: that function validates
/// each entry it encounters against the very index being built here, so
/// using it would make every directory's first discovery fail on its own
/// not-yet-indexed children. [`record::scan_all`] performs the same
/// tolerant, pad-skipping scan without that validation, which is exactly
/// what building the master list from scratch requires; once built, the
/// index is the stable source `proc_dir` validates future lookups
/// against (§4.5).
fn index_directory(
    image: &dyn Image,
    block_size: u32,
    self_addr: MetaAddr,
    extent: u32,
    data_len: u32,
    index: &mut HashMap<MetaAddr, IndexEntry>,
) -> Result<()> {
    index.insert(self_addr, IndexEntry { extent, data_len, meta_type: MetaType::Directory });

    let bytes = image.read_exact_at(extent as u64 * block_size as u64, data_len as usize)?;
    let records = record::scan_all(&bytes, block_size as usize);

    // The first two records are always "." and "..": skip them here, they
    // carry no independent extent worth indexing beyond this directory
    // and its parent, both already accounted for.
    for raw in records.iter().skip(2) {
        let addr = raw.extent as u64;
        if record::is_directory(raw.flags) {
            index_directory(image, block_size, addr, raw.extent, raw.data_len, index)?;
        } else {
            index.insert(addr, IndexEntry { extent: raw.extent, data_len: raw.data_len, meta_type: MetaType::Regular });
        }
    }
    Ok(())
}

impl FsDriver for Iso9660 {
    fn block_size(&self) -> u32 {
        self.block_size
    }

    fn meta_range(&self) -> (MetaAddr, MetaAddr) {
        (0, self.volume_blocks.saturating_sub(1))
    }

    fn block_range(&self) -> (u64, u64) {
        (0, self.volume_blocks.saturating_sub(1))
    }

    fn root_addr(&self) -> MetaAddr {
        self.root_addr
    }

    fn name_comparison(&self) -> NameComparison {
        NameComparison::ExactSensitive
    }

    fn supports_streams(&self) -> bool {
        false
    }

    fn supports_short_names(&self) -> bool {
        false
    }

    fn meta_type(&self, addr: MetaAddr) -> Result<Lookup<(MetaType, AllocState)>> {
        Ok(match self.index.get(&addr) {
            Some(e) => Lookup::Found((e.meta_type, AllocState::Allocated)),
            None => Lookup::NotFound,
        })
    }

    fn inode_walk(
        &self,
        flags: MetaFlags,
        cb: &mut dyn FnMut(MetaAddr, AllocState) -> WalkControl,
    ) -> Result<()> {
        if !flags.contains(MetaFlags::ALLOC) {
            // This driver never reports unallocated entries as distinct
            // metadata addresses; they disappear from the tree entirely.
            return Ok(());
        }
        for (&addr, _) in self.index.iter() {
            if cb(addr, AllocState::Allocated) == WalkControl::Stop {
                break;
            }
        }
        Ok(())
    }

    fn block_walk(
        &self,
        flags: BlockFlags,
        cb: &mut dyn FnMut(u64, BlockFlags) -> WalkControl,
    ) -> Result<()> {
        if !flags.contains(BlockFlags::ALLOC) {
            return Ok(());
        }
        for entry in self.index.values() {
            let blocks = entry.data_len.div_ceil(self.block_size).max(1);
            for i in 0..blocks {
                let category = if entry.meta_type == MetaType::Directory {
                    BlockFlags::METADATA
                } else {
                    BlockFlags::CONTENT
                };
                if !flags.contains(category) {
                    continue;
                }
                if cb(entry.extent as u64 + i as u64, BlockFlags::ALLOC | category) == WalkControl::Stop {
                    return Ok(());
                }
            }
        }
        Ok(())
    }

    fn dir_open_meta(&self, addr: MetaAddr) -> Result<Lookup<Directory>> {
        let entry = match self.index.get(&addr) {
            Some(e) if e.meta_type == MetaType::Directory => e,
            Some(_) => return Ok(Lookup::NotFound),
            None => return Ok(Lookup::NotFound),
        };
        let bytes = self
            .image
            .read_exact_at(entry.extent as u64 * self.block_size as u64, entry.data_len as usize)?;
        let entries = record::proc_dir(&bytes, self.block_size as usize, addr, &|e| self.index.contains_key(&e))?;
        Ok(Lookup::Found(Directory { entries }))
    }

    fn file_open_meta(&self, addr: MetaAddr) -> Result<Lookup<Vec<Attribute>>> {
        let entry = match self.index.get(&addr) {
            Some(e) => e,
            None => return Ok(Lookup::NotFound),
        };
        Ok(Lookup::Found(vec![Attribute {
            attr_type: 0,
            attr_id: 0,
            name: None,
            size: entry.data_len as u64,
        }]))
    }

    fn file_walk(
        &self,
        addr: MetaAddr,
        _attr: &Attribute,
        flags: WalkFlags,
        cb: &mut dyn FnMut(u64, bool) -> WalkControl,
    ) -> Result<()> {
        let entry = self.index.get(&addr).ok_or(Error::InodeNum(addr))?;
        let blocks = entry.data_len.div_ceil(self.block_size).max(1);
        let extra = if flags.contains(WalkFlags::SLACK) { 1 } else { 0 };
        for i in 0..blocks + extra {
            if cb(entry.extent as u64 + i as u64, false) == WalkControl::Stop {
                break;
            }
        }
        Ok(())
    }

    fn parent_name_records(&self, _addr: MetaAddr) -> Result<Vec<ParentNameRecord>> {
        // ISO9660 has no unallocated-entry recovery mechanism analogous
        // to NTFS's parent-name attribute: deleted directory entries
        // leave no trace once overwritten.
        Ok(Vec::new())
    }
}
