// This Source Code Form is subject to the terms of the Mozilla Public
// License, v. 2.0. If a copy of the MPL was not distributed with this
// file, You can obtain one at https://mozilla.org/MPL/2.0/.

//! Flag types controlling walks and reverse lookups (§6).

use bitflags::bitflags;

bitflags! {
    /// Allocation-state filter for `inode_walk` and `block_walk`.
    #[derive(Clone, Copy, Debug, Eq, PartialEq)]
    pub struct MetaFlags: u8 {
        const ALLOC   = 0b01;
        const UNALLOC = 0b10;
    }
}

impl MetaFlags {
    pub const ALL: MetaFlags = MetaFlags::ALLOC.union(MetaFlags::UNALLOC);
}

bitflags! {
    /// Allocation/category filter for `block_walk`.
    #[derive(Clone, Copy, Debug, Eq, PartialEq)]
    pub struct BlockFlags: u8 {
        const ALLOC    = 0b0001;
        const UNALLOC  = 0b0010;
        const METADATA = 0b0100;
        const CONTENT  = 0b1000;
    }
}

bitflags! {
    /// Controls how `file_walk`/`file_walk_type` materializes data.
    #[derive(Clone, Copy, Debug, Eq, PartialEq)]
    pub struct WalkFlags: u8 {
        /// Address-only: do not read block contents into a buffer.
        const AONLY = 0b01;
        /// Include the slack region past logical EOF in the last block.
        const SLACK = 0b10;
    }
}

bitflags! {
    /// Flags for the reverse-lookup ("ifind"-style) queries.
    #[derive(Clone, Copy, Debug, Eq, PartialEq)]
    pub struct IfindFlags: u8 {
        /// Report every owner, not just the first.
        const ALL = 0b01;
        /// Request the long-form record for parent-based search.
        const PAR_LONG = 0b10;
    }
}
