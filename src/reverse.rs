// This Source Code Form is subject to the terms of the Mozilla Public
// License, v. 2.0. If a copy of the MPL was not distributed with this
// file, You can obtain one at https://mozilla.org/MPL/2.0/.

//! Reverse lookups: block-to-owner (§4.4.1) and parent-to-unallocated-child
//! (§4.4.2).

use crate::error::{Error, Result, WalkControl};
use crate::flags::{BlockFlags, IfindFlags, MetaFlags, WalkFlags};
use crate::fs::{FsDriver, MetaAddr, ParentNameRecord};

/// The result of a block-to-owner lookup (§4.4.1).
#[derive(Clone, Debug, Eq, PartialEq)]
pub enum BlockOwner {
    /// `block` belongs to a metadata entry's attribute.
    Entry { addr: MetaAddr, attr_type: Option<u32>, attr_id: Option<u32> },
    /// No entry claims `block`, but the block-allocation map flags it as
    /// filesystem metadata (a superblock, inode table, or similar).
    MetaData,
    /// No entry claims `block`, and the block-allocation map does not
    /// flag it as metadata either.
    NotFound,
}

/// Finds the metadata entries that own `block`.
///
/// Drivers that support multiple named attributes per entry (NTFS-style)
/// are matched by exact address against each attribute independently, so
/// the result identifies the owning attribute as well as the entry
/// (§4.4.1). Drivers with a single implicit stream per entry (FAT- and
/// Unix-style) are matched by a contiguous range covering the whole file,
/// and only those drivers ever consider the slack space past the
/// logical end of the last block, controlled by `flags`.
///
/// Block address 0 is conventionally sparse/reserved and never matches an
/// entry, even if some attribute nominally covers it, but it still falls
/// through to the metadata-block check below. Unless `ifind` requests
/// [`IfindFlags::ALL`], the walk stops as soon as one owner is found
/// instead of visiting every remaining entry. An error while walking one
/// entry is logged and the walk continues; it does not cancel the whole
/// lookup (§7, mirroring how on-disk corruption in one record should not
/// hide results from the rest of the filesystem).
///
/// If no entry owns the block, the block-allocation map is consulted: a
/// block flagged as metadata is reported as [`BlockOwner::MetaData`];
/// otherwise the block is [`BlockOwner::NotFound`] (§4.4.1).
pub fn block_to_meta(driver: &dyn FsDriver, block: u64, flags: WalkFlags, ifind: IfindFlags) -> Result<Vec<BlockOwner>> {
    let (first, last) = driver.block_range();
    if block < first || block > last {
        return Err(Error::WalkRange { addr: block, first, last });
    }

    let mut owners = Vec::new();
    let supports_streams = driver.supports_streams();

    if block != 0 {
        driver.inode_walk(MetaFlags::ALL, &mut |addr, _alloc| {
            match search_entry(driver, addr, block, flags, supports_streams) {
                Ok(found) => owners.extend(found),
                Err(e) => log::debug!("block_to_meta: skipping entry {addr}: {e}"),
            }
            if !ifind.contains(IfindFlags::ALL) && !owners.is_empty() {
                WalkControl::Stop
            } else {
                WalkControl::Continue
            }
        })?;
    }

    if owners.is_empty() {
        return Ok(vec![if block_is_metadata(driver, block)? { BlockOwner::MetaData } else { BlockOwner::NotFound }]);
    }

    Ok(owners)
}

fn block_is_metadata(driver: &dyn FsDriver, block: u64) -> Result<bool> {
    let mut is_meta = false;
    driver.block_walk(BlockFlags::METADATA, &mut |addr, found_flags| {
        if addr == block {
            is_meta = found_flags.contains(BlockFlags::METADATA);
            WalkControl::Stop
        } else {
            WalkControl::Continue
        }
    })?;
    Ok(is_meta)
}

fn search_entry(
    driver: &dyn FsDriver,
    addr: MetaAddr,
    block: u64,
    flags: WalkFlags,
    supports_streams: bool,
) -> Result<Vec<BlockOwner>> {
    let attrs = match driver.file_open_meta(addr)? {
        crate::error::Lookup::Found(attrs) => attrs,
        crate::error::Lookup::NotFound => return Ok(Vec::new()),
    };

    let mut hits = Vec::new();
    // Slack (reading past logical EOF into the block's unused tail) only
    // makes sense for the single-stream family; NTFS-style attribute
    // matching is already exact-address, so slack would be meaningless.
    let walk_flags = if supports_streams { WalkFlags::empty() } else { flags };

    for attr in &attrs {
        let mut matched = false;
        driver.file_walk(addr, attr, walk_flags, &mut |candidate, is_hole| {
            if !is_hole && candidate == block {
                matched = true;
                WalkControl::Stop
            } else {
                WalkControl::Continue
            }
        })?;
        if matched {
            hits.push(BlockOwner::Entry {
                addr,
                attr_type: supports_streams.then_some(attr.attr_type),
                attr_id: supports_streams.then_some(attr.attr_id),
            });
        }
    }
    Ok(hits)
}

/// Finds every unallocated directory entry that claims `parent` as its
/// parent, via each entry's own recorded parent-name (§4.4.2).
///
/// This is meaningful only for drivers that keep parent-name records
/// independent of the live directory tree (NTFS-style `$FILE_NAME`
/// attributes); drivers that return no records from
/// [`FsDriver::parent_name_records`] simply contribute nothing, since an
/// unallocated entry's directory listing is usually gone by the time its
/// metadata entry is examined.
pub fn parent_to_unalloc_children(driver: &dyn FsDriver, parent: MetaAddr, flags: IfindFlags) -> Result<Vec<ParentNameRecord>> {
    let mut matches = Vec::new();
    let want_all = flags.contains(IfindFlags::ALL);

    driver.inode_walk(MetaFlags::UNALLOC, &mut |addr, _alloc| {
        match driver.parent_name_records(addr) {
            Ok(records) => {
                for record in records {
                    if record.parent_addr == parent {
                        matches.push(record);
                        if !want_all {
                            return WalkControl::Stop;
                        }
                    }
                }
            }
            Err(e) => log::debug!("parent_to_unalloc_children: skipping entry {addr}: {e}"),
        }
        WalkControl::Continue
    })?;

    Ok(matches)
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::error::{Lookup, Result as CrateResult};
    use crate::flags::BlockFlags;
    use crate::fs::{AllocState, Attribute, Directory, MetaType, NameComparison};
    use std::collections::HashMap;

    struct FixtureDriver {
        streams: bool,
        slack_block: Option<u64>,
        files: HashMap<MetaAddr, (Vec<Attribute>, Vec<u64>)>,
        parent_records: HashMap<MetaAddr, Vec<ParentNameRecord>>,
        unalloc: Vec<MetaAddr>,
        meta_blocks: Vec<u64>,
    }

    impl FsDriver for FixtureDriver {
        fn block_size(&self) -> u32 {
            512
        }
        fn meta_range(&self) -> (MetaAddr, MetaAddr) {
            (0, 100)
        }
        fn block_range(&self) -> (u64, u64) {
            (0, 100)
        }
        fn root_addr(&self) -> MetaAddr {
            1
        }
        fn name_comparison(&self) -> NameComparison {
            NameComparison::ExactSensitive
        }
        fn supports_streams(&self) -> bool {
            self.streams
        }
        fn supports_short_names(&self) -> bool {
            false
        }
        fn meta_type(&self, _addr: MetaAddr) -> CrateResult<Lookup<(MetaType, AllocState)>> {
            Ok(Lookup::NotFound)
        }
        fn inode_walk(&self, flags: MetaFlags, cb: &mut dyn FnMut(MetaAddr, AllocState) -> WalkControl) -> CrateResult<()> {
            if flags.contains(MetaFlags::ALLOC) {
                for &addr in self.files.keys() {
                    if cb(addr, AllocState::Allocated) == WalkControl::Stop {
                        return Ok(());
                    }
                }
            }
            if flags.contains(MetaFlags::UNALLOC) {
                for &addr in &self.unalloc {
                    if cb(addr, AllocState::Unallocated) == WalkControl::Stop {
                        return Ok(());
                    }
                }
            }
            Ok(())
        }
        fn block_walk(&self, _flags: BlockFlags, cb: &mut dyn FnMut(u64, BlockFlags) -> WalkControl) -> CrateResult<()> {
            for &b in &self.meta_blocks {
                if cb(b, BlockFlags::METADATA) == WalkControl::Stop {
                    return Ok(());
                }
            }
            Ok(())
        }
        fn dir_open_meta(&self, _addr: MetaAddr) -> CrateResult<Lookup<Directory>> {
            Ok(Lookup::NotFound)
        }
        fn file_open_meta(&self, addr: MetaAddr) -> CrateResult<Lookup<Vec<Attribute>>> {
            Ok(match self.files.get(&addr) {
                Some((attrs, _)) => Lookup::Found(attrs.clone()),
                None => Lookup::NotFound,
            })
        }
        fn file_walk(&self, addr: MetaAddr, attr: &Attribute, flags: WalkFlags, cb: &mut dyn FnMut(u64, bool) -> WalkControl) -> CrateResult<()> {
            let (_attrs, blocks) = self.files.get(&addr).unwrap();
            for &b in blocks {
                if cb(b, false) == WalkControl::Stop {
                    return Ok(());
                }
            }
            if flags.contains(WalkFlags::SLACK) {
                if let Some(slack) = self.slack_block {
                    let _ = attr;
                    cb(slack, false);
                }
            }
            Ok(())
        }
        fn parent_name_records(&self, addr: MetaAddr) -> CrateResult<Vec<ParentNameRecord>> {
            Ok(self.parent_records.get(&addr).cloned().unwrap_or_default())
        }
    }

    fn unix_like() -> FixtureDriver {
        let mut files = HashMap::new();
        files.insert(10, (vec![Attribute { attr_type: 0, attr_id: 0, name: None, size: 4096 }], vec![50, 51]));
        FixtureDriver { streams: false, slack_block: Some(52), files, parent_records: HashMap::new(), unalloc: Vec::new(), meta_blocks: Vec::new() }
    }

    fn ntfs_like() -> FixtureDriver {
        let mut files = HashMap::new();
        files.insert(
            9,
            (
                vec![
                    Attribute { attr_type: 128, attr_id: 3, name: None, size: 512 },
                    Attribute { attr_type: 128, attr_id: 4, name: Some("alt".into()), size: 512 },
                ],
                vec![200],
            ),
        );
        FixtureDriver { streams: true, slack_block: None, files, parent_records: HashMap::new(), unalloc: Vec::new(), meta_blocks: Vec::new() }
    }

    #[test]
    fn block_zero_falls_through_to_metadata_check() {
        let mut fs = unix_like();
        fs.meta_blocks = vec![0];
        assert_eq!(block_to_meta(&fs, 0, WalkFlags::empty(), IfindFlags::empty()).unwrap(), vec![BlockOwner::MetaData]);
    }

    #[test]
    fn block_zero_not_found_when_not_flagged_metadata() {
        let fs = unix_like();
        assert_eq!(block_to_meta(&fs, 0, WalkFlags::empty(), IfindFlags::empty()).unwrap(), vec![BlockOwner::NotFound]);
    }

    #[test]
    fn out_of_range_block_is_an_error() {
        let fs = unix_like();
        assert!(block_to_meta(&fs, 9999, WalkFlags::empty(), IfindFlags::empty()).is_err());
    }

    #[test]
    fn unix_fragment_match_without_slack() {
        let fs = unix_like();
        let owners = block_to_meta(&fs, 51, WalkFlags::empty(), IfindFlags::empty()).unwrap();
        assert_eq!(owners, vec![BlockOwner::Entry { addr: 10, attr_type: None, attr_id: None }]);
    }

    #[test]
    fn unix_slack_block_requires_flag() {
        let fs = unix_like();
        assert_eq!(block_to_meta(&fs, 52, WalkFlags::empty(), IfindFlags::empty()).unwrap(), vec![BlockOwner::NotFound]);
        assert_eq!(block_to_meta(&fs, 52, WalkFlags::SLACK, IfindFlags::empty()).unwrap().len(), 1);
    }

    #[test]
    fn ntfs_exact_attribute_match() {
        let fs = ntfs_like();
        let owners = block_to_meta(&fs, 200, WalkFlags::empty(), IfindFlags::ALL).unwrap();
        assert_eq!(owners.len(), 2);
        assert!(owners.contains(&BlockOwner::Entry { addr: 9, attr_type: Some(128), attr_id: Some(3) }));
        assert!(owners.contains(&BlockOwner::Entry { addr: 9, attr_type: Some(128), attr_id: Some(4) }));
    }

    #[test]
    fn without_all_flag_stops_after_first_owner() {
        let mut fs = unix_like();
        fs.files.insert(11, (vec![Attribute { attr_type: 0, attr_id: 0, name: None, size: 4096 }], vec![51]));
        let owners = block_to_meta(&fs, 51, WalkFlags::empty(), IfindFlags::empty()).unwrap();
        assert_eq!(owners.len(), 1);
        let owners = block_to_meta(&fs, 51, WalkFlags::empty(), IfindFlags::ALL).unwrap();
        assert_eq!(owners.len(), 2);
    }

    #[test]
    fn block_with_no_owner_and_no_metadata_flag_is_not_found() {
        let fs = unix_like();
        assert_eq!(block_to_meta(&fs, 60, WalkFlags::empty(), IfindFlags::empty()).unwrap(), vec![BlockOwner::NotFound]);
    }

    #[test]
    fn block_with_no_owner_but_metadata_flag_is_reported() {
        let mut fs = unix_like();
        fs.meta_blocks = vec![60];
        assert_eq!(block_to_meta(&fs, 60, WalkFlags::empty(), IfindFlags::empty()).unwrap(), vec![BlockOwner::MetaData]);
    }

    #[test]
    fn parent_to_unalloc_children_matches_parent_addr() {
        let mut fs = unix_like();
        fs.unalloc = vec![20, 21];
        fs.parent_records.insert(20, vec![ParentNameRecord { name: "deleted.txt".into(), parent_addr: 1, attr: None }]);
        fs.parent_records.insert(21, vec![ParentNameRecord { name: "other.txt".into(), parent_addr: 2, attr: None }]);

        let matches = parent_to_unalloc_children(&fs, 1, IfindFlags::empty()).unwrap();
        assert_eq!(matches.len(), 1);
        assert_eq!(matches[0].name, "deleted.txt");
    }
}
