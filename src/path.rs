// This Source Code Form is subject to the terms of the Mozilla Public
// License, v. 2.0. If a copy of the MPL was not distributed with this
// file, You can obtain one at https://mozilla.org/MPL/2.0/.

//! Generic path resolution over any [`FsDriver`] (§4.3).

use crate::error::{Lookup, Result};
use crate::fs::{Attribute, DirEntry, FsDriver, MetaAddr, MetaType, NameComparison};

/// The result of resolving a path: the metadata entry it names, and, for
/// drivers that support named streams, the stream that was requested.
#[derive(Clone, Debug, Eq, PartialEq)]
pub struct Resolved {
    pub addr: MetaAddr,
    pub meta_type: MetaType,
    pub stream: Option<String>,
}

fn names_match(driver: &dyn FsDriver, entry: &DirEntry, target: &str) -> bool {
    match driver.name_comparison() {
        NameComparison::ExactSensitive => entry.name == target,
        NameComparison::PrimaryInsensitive => entry.name.eq_ignore_ascii_case(target),
        NameComparison::LongOrShortInsensitive => {
            entry.name.eq_ignore_ascii_case(target)
                || entry.short_name.as_deref().is_some_and(|s| s.eq_ignore_ascii_case(target))
        }
    }
}

/// Splits off a trailing `:stream` suffix, the way NTFS-style drivers
/// name alternate data streams. Drivers that don't support streams never
/// see this split attempted against their segments.
fn split_stream(segment: &str) -> (&str, Option<&str>) {
    match segment.split_once(':') {
        Some((name, stream)) if !stream.is_empty() => (name, Some(stream)),
        _ => (segment, None),
    }
}

/// Resolves `path` (an absolute, `/`-separated path) against `driver`,
/// starting from its root directory.
///
/// A path that names a directory as a non-final segment but finds
/// something else there is [`Lookup::NotFound`], not an error: the path
/// simply doesn't exist. An entry whose name matches but whose requested
/// stream does not is likewise `NotFound` immediately, without searching
/// for another entry of the same name (there never is one): §9.
pub fn resolve(driver: &dyn FsDriver, path: &str) -> Result<Lookup<Resolved>> {
    let trimmed = path.trim_start_matches('/');
    let mut addr = driver.root_addr();

    if trimmed.is_empty() {
        return Ok(Lookup::Found(Resolved { addr, meta_type: MetaType::Directory, stream: None }));
    }

    let segments: Vec<&str> = trimmed.split('/').filter(|s| !s.is_empty()).collect();
    let last = segments.len() - 1;

    for (i, raw_segment) in segments.iter().enumerate() {
        let (segment, stream) = if driver.supports_streams() {
            split_stream(raw_segment)
        } else {
            (*raw_segment, None)
        };

        let dir = match driver.dir_open_meta(addr)? {
            Lookup::Found(dir) => dir,
            Lookup::NotFound => return Ok(Lookup::NotFound),
        };

        let found = dir.entries.iter().find(|e| names_match(driver, e, segment));
        let entry = match found {
            Some(e) => e,
            None => return Ok(Lookup::NotFound),
        };

        if i != last {
            if entry.meta_type != MetaType::Directory {
                return Ok(Lookup::NotFound);
            }
            addr = entry.addr;
            continue;
        }

        if let Some(stream_name) = stream {
            let attrs = match driver.file_open_meta(entry.addr)? {
                Lookup::Found(attrs) => attrs,
                Lookup::NotFound => return Ok(Lookup::NotFound),
            };
            if find_attribute(&attrs, Some(stream_name)).is_none() {
                // The entry exists but the requested stream does not:
                // this is NotFound, and there is no sibling entry of the
                // same name to fall back to.
                return Ok(Lookup::NotFound);
            }
        }

        return Ok(Lookup::Found(Resolved {
            addr: entry.addr,
            meta_type: entry.meta_type,
            stream: stream.map(str::to_string),
        }));
    }

    unreachable!("segments is non-empty, so the loop always returns")
}

/// Returns the attribute named `stream`, or the first (implicit) attribute
/// when no stream name is given. Shared by `resolve` and [`crate::reverse`]
/// so both use the same attribute-matching rule.
pub(crate) fn find_attribute<'a>(attrs: &'a [Attribute], stream: Option<&str>) -> Option<&'a Attribute> {
    match stream {
        Some(name) => attrs.iter().find(|a| a.name.as_deref() == Some(name)),
        None => attrs.first(),
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::error::{Result as CrateResult, WalkControl};
    use crate::flags::{BlockFlags, MetaFlags, WalkFlags};
    use crate::fs::{AllocState, Directory, ParentNameRecord};
    use std::collections::HashMap;

    struct FixtureDriver {
        comparison: NameComparison,
        streams: bool,
        short_names: bool,
        root: MetaAddr,
        dirs: HashMap<MetaAddr, Directory>,
        files: HashMap<MetaAddr, Vec<Attribute>>,
    }

    impl FsDriver for FixtureDriver {
        fn block_size(&self) -> u32 {
            512
        }
        fn meta_range(&self) -> (MetaAddr, MetaAddr) {
            (0, 1024)
        }
        fn block_range(&self) -> (u64, u64) {
            (0, 1024)
        }
        fn root_addr(&self) -> MetaAddr {
            self.root
        }
        fn name_comparison(&self) -> NameComparison {
            self.comparison
        }
        fn supports_streams(&self) -> bool {
            self.streams
        }
        fn supports_short_names(&self) -> bool {
            self.short_names
        }
        fn meta_type(&self, addr: MetaAddr) -> CrateResult<Lookup<(MetaType, AllocState)>> {
            if self.dirs.contains_key(&addr) {
                return Ok(Lookup::Found((MetaType::Directory, AllocState::Allocated)));
            }
            if self.files.contains_key(&addr) {
                return Ok(Lookup::Found((MetaType::Regular, AllocState::Allocated)));
            }
            Ok(Lookup::NotFound)
        }
        fn inode_walk(&self, _flags: MetaFlags, _cb: &mut dyn FnMut(MetaAddr, AllocState) -> WalkControl) -> CrateResult<()> {
            Ok(())
        }
        fn block_walk(&self, _flags: BlockFlags, _cb: &mut dyn FnMut(u64, BlockFlags) -> WalkControl) -> CrateResult<()> {
            Ok(())
        }
        fn dir_open_meta(&self, addr: MetaAddr) -> CrateResult<Lookup<Directory>> {
            Ok(match self.dirs.get(&addr) {
                Some(d) => Lookup::Found(d.clone()),
                None => Lookup::NotFound,
            })
        }
        fn file_open_meta(&self, addr: MetaAddr) -> CrateResult<Lookup<Vec<Attribute>>> {
            Ok(match self.files.get(&addr) {
                Some(a) => Lookup::Found(a.clone()),
                None => Lookup::NotFound,
            })
        }
        fn file_walk(&self, _addr: MetaAddr, _attr: &Attribute, _flags: WalkFlags, _cb: &mut dyn FnMut(u64, bool) -> WalkControl) -> CrateResult<()> {
            Ok(())
        }
        fn parent_name_records(&self, _addr: MetaAddr) -> CrateResult<Vec<ParentNameRecord>> {
            Ok(Vec::new())
        }
    }

    fn entry(name: &str, short: Option<&str>, addr: MetaAddr, meta_type: MetaType) -> DirEntry {
        DirEntry { name: name.to_string(), short_name: short.map(str::to_string), addr, meta_type, alloc: AllocState::Allocated }
    }

    fn fat_like() -> FixtureDriver {
        let mut dirs = HashMap::new();
        dirs.insert(
            1,
            Directory {
                entries: vec![
                    entry("LONGFILENAME.TXT", Some("LONGFI~1.TXT"), 2, MetaType::Regular),
                    entry("SUBDIR", None, 3, MetaType::Directory),
                ],
            },
        );
        dirs.insert(3, Directory { entries: vec![entry("INNER.TXT", None, 4, MetaType::Regular)] });
        let mut files = HashMap::new();
        files.insert(2, vec![Attribute { attr_type: 0, attr_id: 0, name: None, size: 10 }]);
        files.insert(4, vec![Attribute { attr_type: 0, attr_id: 0, name: None, size: 4 }]);
        FixtureDriver {
            comparison: NameComparison::LongOrShortInsensitive,
            streams: false,
            short_names: true,
            root: 1,
            dirs,
            files,
        }
    }

    fn ntfs_like() -> FixtureDriver {
        let mut dirs = HashMap::new();
        dirs.insert(5, Directory { entries: vec![entry("report.doc", None, 6, MetaType::Regular)] });
        let mut files = HashMap::new();
        files.insert(
            6,
            vec![
                Attribute { attr_type: 128, attr_id: 3, name: None, size: 100 },
                Attribute { attr_type: 128, attr_id: 4, name: Some("notes".to_string()), size: 20 },
            ],
        );
        FixtureDriver { comparison: NameComparison::PrimaryInsensitive, streams: true, short_names: false, root: 5, dirs, files }
    }

    #[test]
    fn fat_short_name_is_case_insensitive() {
        let fs = fat_like();
        let hit = resolve(&fs, "/longfi~1.txt").unwrap().found().unwrap();
        assert_eq!(hit.addr, 2);
    }

    #[test]
    fn fat_long_name_is_case_insensitive() {
        let fs = fat_like();
        let hit = resolve(&fs, "/LONGFILENAME.txt").unwrap().found().unwrap();
        assert_eq!(hit.addr, 2);
    }

    #[test]
    fn nested_directory_resolves() {
        let fs = fat_like();
        let hit = resolve(&fs, "/SUBDIR/INNER.TXT").unwrap().found().unwrap();
        assert_eq!(hit.addr, 4);
    }

    #[test]
    fn trailing_slash_on_root_is_idempotent() {
        let fs = fat_like();
        let hit = resolve(&fs, "/").unwrap().found().unwrap();
        assert_eq!(hit.addr, fs.root_addr());
    }

    #[test]
    fn intermediate_segment_not_a_directory_is_not_found() {
        let fs = fat_like();
        let result = resolve(&fs, "/LONGFILENAME.TXT/extra").unwrap();
        assert_eq!(result, Lookup::NotFound);
    }

    #[test]
    fn ntfs_named_stream_resolves() {
        let fs = ntfs_like();
        let hit = resolve(&fs, "/report.doc:notes").unwrap().found().unwrap();
        assert_eq!(hit.stream.as_deref(), Some("notes"));
    }

    #[test]
    fn ntfs_missing_stream_is_not_found_without_fallback() {
        let fs = ntfs_like();
        let result = resolve(&fs, "/report.doc:missing").unwrap();
        assert_eq!(result, Lookup::NotFound);
    }
}
