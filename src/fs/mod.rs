// This Source Code Form is subject to the terms of the Mozilla Public
// License, v. 2.0. If a copy of the MPL was not distributed with this
// file, You can obtain one at https://mozilla.org/MPL/2.0/.

//! The filesystem driver interface (§4.1) and shared data model (§3).

pub mod iso9660;

use crate::error::{Lookup, Result, WalkControl};
use crate::flags::{BlockFlags, MetaFlags, WalkFlags};

/// A metadata address: the driver-specific identifier of an inode,
/// MFT record, or equivalent. Opaque outside the driver that issued it.
pub type MetaAddr = u64;

/// The kind of thing a metadata entry describes.
#[derive(Clone, Copy, Debug, Eq, PartialEq)]
pub enum MetaType {
    Regular,
    Directory,
    Symlink,
    Special,
    Unknown,
}

/// Whether a metadata entry or directory entry is currently in use.
#[derive(Clone, Copy, Debug, Eq, PartialEq)]
pub enum AllocState {
    Allocated,
    Unallocated,
}

/// How two filenames should be compared when resolving a path component
/// (§4.3, §9 redesign: a capability the driver reports, not a type tag
/// the caller switches on).
#[derive(Clone, Copy, Debug, Eq, PartialEq)]
pub enum NameComparison {
    /// Byte-exact, case-sensitive (typical Unix-style filesystems).
    ExactSensitive,
    /// Case-insensitive, and a long name may also be matched by its
    /// short-name alias (typical FAT-style filesystems).
    LongOrShortInsensitive,
    /// Case-insensitive on the primary name only, no short-name alias
    /// (typical NTFS-style filesystems, case-insensitive mode).
    PrimaryInsensitive,
}

/// A named data stream or attribute attached to a metadata entry.
///
/// Most drivers expose exactly one, unnamed, implicit attribute; drivers
/// that support multiple named streams (per [`FsDriver::supports_streams`])
/// may expose more than one.
#[derive(Clone, Debug, Eq, PartialEq)]
pub struct Attribute {
    pub attr_type: u32,
    pub attr_id: u32,
    pub name: Option<String>,
    pub size: u64,
}

/// One directory entry: a name bound to a metadata address.
#[derive(Clone, Debug, Eq, PartialEq)]
pub struct DirEntry {
    pub name: String,
    pub short_name: Option<String>,
    pub addr: MetaAddr,
    pub meta_type: MetaType,
    pub alloc: AllocState,
}

/// The contents of a directory, already materialized (§4.5: parsers that
/// stream produce this incrementally via `dir_open_meta`'s walk callback).
#[derive(Clone, Debug, Default, Eq, PartialEq)]
pub struct Directory {
    pub entries: Vec<DirEntry>,
}

/// A parent-name record: the reverse-direction sibling of a [`DirEntry`],
/// used by unallocated-entry recovery (§4.4.2) where only the child
/// remembers its parent, not the other way around.
#[derive(Clone, Debug, Eq, PartialEq)]
pub struct ParentNameRecord {
    pub name: String,
    pub parent_addr: MetaAddr,
    /// The attribute the name record was found in, if the driver
    /// distinguishes per-attribute parent pointers (NTFS-style).
    pub attr: Option<Attribute>,
}

/// A pluggable filesystem driver (§4.1).
///
/// Implementations parse one on-disk format and answer structural
/// questions about it; they never interpret paths (that is [`crate::path`]'s
/// job) and never compute reverse mappings themselves (that is
/// [`crate::reverse`]'s job). Capability methods let generic callers adapt
/// their behavior without downcasting or matching on a type tag.
pub trait FsDriver: Send + Sync {
    /// Block size of this filesystem, in bytes.
    fn block_size(&self) -> u32;

    /// The range of valid metadata addresses, inclusive.
    fn meta_range(&self) -> (MetaAddr, MetaAddr);

    /// The range of valid block addresses, inclusive.
    fn block_range(&self) -> (u64, u64);

    /// The metadata address of the root directory.
    fn root_addr(&self) -> MetaAddr;

    /// How this driver compares filenames during path resolution.
    fn name_comparison(&self) -> NameComparison;

    /// Whether a metadata entry may expose more than one named attribute.
    fn supports_streams(&self) -> bool;

    /// Whether directory entries may carry a short-name alias in addition
    /// to their primary name.
    fn supports_short_names(&self) -> bool;

    /// Looks up the type and allocation state of `addr`.
    fn meta_type(&self, addr: MetaAddr) -> Result<Lookup<(MetaType, AllocState)>>;

    /// Visits every metadata entry whose allocation state matches `flags`,
    /// calling `cb` for each. Stops early if `cb` returns [`WalkControl::Stop`].
    fn inode_walk(
        &self,
        flags: MetaFlags,
        cb: &mut dyn FnMut(MetaAddr, AllocState) -> WalkControl,
    ) -> Result<()>;

    /// Visits every block whose allocation/category matches `flags`.
    fn block_walk(
        &self,
        flags: BlockFlags,
        cb: &mut dyn FnMut(u64, BlockFlags) -> WalkControl,
    ) -> Result<()>;

    /// Reads and parses the directory contents of `addr`.
    fn dir_open_meta(&self, addr: MetaAddr) -> Result<Lookup<Directory>>;

    /// Opens `addr` as a file, returning its attributes.
    fn file_open_meta(&self, addr: MetaAddr) -> Result<Lookup<Vec<Attribute>>>;

    /// Walks the block addresses backing one attribute of `addr`, in
    /// logical order, calling `cb` with each block's address and whether
    /// it is a sparse hole.
    fn file_walk(
        &self,
        addr: MetaAddr,
        attr: &Attribute,
        flags: WalkFlags,
        cb: &mut dyn FnMut(u64, bool) -> WalkControl,
    ) -> Result<()>;

    /// Returns every parent-name record referencing unallocated children,
    /// used by unallocated-entry recovery (§4.4.2). Drivers that do not
    /// track parent-name records (most non-NTFS-style filesystems) return
    /// an empty vector.
    fn parent_name_records(&self, addr: MetaAddr) -> Result<Vec<ParentNameRecord>>;
}
