// This Source Code Form is subject to the terms of the Mozilla Public
// License, v. 2.0. If a copy of the MPL was not distributed with this
// file, You can obtain one at https://mozilla.org/MPL/2.0/.

//! On-disk directory record layout and the directory-extent parser state
//! machine (§4.5).

use crate::error::{Error, Result};
use crate::fs::{AllocState, DirEntry, MetaType};
use bytes::Buf;
use static_assertions::const_assert;

/// Minimum length of a directory record with an empty file identifier:
/// the fixed 33-byte header plus nothing else.
pub(super) const MIN_RECORD_LEN: usize = 34;
const_assert!(MIN_RECORD_LEN >= 33);

const FLAG_DIRECTORY: u8 = 0x02;

/// One parsed directory record, with the both-endian fields already
/// reduced to native values.
#[derive(Clone, Debug)]
pub(super) struct RawRecord {
    pub len: u8,
    pub extent: u32,
    pub data_len: u32,
    pub flags: u8,
    pub file_id: Vec<u8>,
}

/// Parses one directory record starting at `buf[0]`. Returns `None` if
/// `buf` does not hold a complete record (short buffer) or the record's
/// declared length is zero, which in ISO9660 marks the unused remainder
/// of a sector rather than a real entry.
pub(super) fn parse_one(buf: &[u8]) -> Option<RawRecord> {
    if buf.is_empty() {
        return None;
    }
    let len = buf[0];
    if len == 0 {
        return None;
    }
    if buf.len() < len as usize || (len as usize) < 33 {
        return None;
    }

    let extent = (&buf[2..6]).get_u32_le();
    let data_len = (&buf[10..14]).get_u32_le();
    let flags = buf[25];
    let id_len = buf[32] as usize;
    if 33 + id_len > len as usize {
        return None;
    }
    let file_id = buf[33..33 + id_len].to_vec();

    Some(RawRecord { len, extent, data_len, flags, file_id })
}

/// Advances past one zero-length padding gap, the way real media pads a
/// record out to the next logical-block boundary rather than letting a
/// record straddle it. Returns the position to resume scanning at, or
/// `None` once the extent is exhausted.
fn skip_pad(pos: usize, extent_len: usize, sector_size: usize) -> Option<usize> {
    if sector_size == 0 {
        return None;
    }
    let next_sector = (pos / sector_size + 1) * sector_size;
    if next_sector <= pos || next_sector >= extent_len {
        None
    } else {
        Some(next_sector)
    }
}

/// Tolerantly scans every record in a directory extent, in on-disk order
/// (including the leading `.`/`..` records), skipping zero-length padding
/// gaps between sectors. Performs no validation against the master
/// inode list; used only to discover the extents a directory references
/// so that list can be built in the first place.
pub(super) fn scan_all(extent: &[u8], sector_size: usize) -> Vec<RawRecord> {
    let mut records = Vec::new();
    let mut pos = 0usize;
    loop {
        if pos >= extent.len() {
            break;
        }
        match parse_one(&extent[pos..]) {
            Some(raw) => {
                pos += raw.len as usize;
                records.push(raw);
            }
            None => match skip_pad(pos, extent.len(), sector_size) {
                Some(next) => pos = next,
                None => break,
            },
        }
    }
    records
}

fn display_name(raw: &[u8]) -> String {
    // Versioned names carry a trailing ";1"; strip it for the name a
    // caller would actually type.
    let s = String::from_utf8_lossy(raw);
    match s.rfind(';') {
        Some(idx) => s[..idx].to_string(),
        None => s.into_owned(),
    }
}

pub(super) fn is_directory(flags: u8) -> bool {
    flags & FLAG_DIRECTORY != 0
}

fn record_to_entry(raw: &RawRecord) -> DirEntry {
    DirEntry {
        name: display_name(&raw.file_id),
        short_name: None,
        addr: raw.extent as u64,
        meta_type: if raw.flags & FLAG_DIRECTORY != 0 {
            MetaType::Directory
        } else {
            MetaType::Regular
        },
        alloc: AllocState::Allocated,
    }
}

/// The states of the tolerant directory-extent scanner (§4.5).
///
/// `.` and `..` are synthesized explicitly rather than taken verbatim
/// from the first two on-disk records: their raw file identifiers are
/// single NUL/0x01 bytes, not printable names, so the state machine
/// emits the conventional names and then resumes scanning from the
/// record that follows them.
#[derive(Clone, Copy, Debug, Eq, PartialEq)]
enum State {
    EmitDot,
    EmitDotDot,
    Scan,
    SkipPad,
    Done,
}

/// Walks one directory extent's raw bytes and returns the entries found.
///
/// `is_known` answers whether an extent location is already present in
/// the driver's master inode list, built once at open time. `..` is
/// synthesized from the second on-disk record's own extent field rather
/// than from `self_addr`'s caller-known parent, and is simply omitted
/// (not an error) when that extent is not in the master list — mirroring
/// how the original silently drops an unresolvable `..`. Every other
/// entry's extent is required to resolve: a record pointing at an extent
/// absent from the master list is `Corrupted`, since no file backs it
/// (§4.5 transition 3).
///
/// Zero-length padding between records (used to keep every record inside
/// a single sector) is tolerated by skipping forward to the next sector
/// boundary rather than treating it as corruption, matching how real
/// media is actually written.
pub(super) fn proc_dir(
    extent: &[u8],
    sector_size: usize,
    self_addr: u64,
    is_known: &dyn Fn(u64) -> bool,
) -> Result<Vec<DirEntry>> {
    let mut entries = Vec::new();
    let mut pos = 0usize;
    let mut state = State::EmitDot;

    loop {
        match state {
            State::EmitDot => {
                entries.push(DirEntry {
                    name: ".".to_string(),
                    short_name: None,
                    addr: self_addr,
                    meta_type: MetaType::Directory,
                    alloc: AllocState::Allocated,
                });
                // Advance past the on-disk "." record if one is present.
                if let Some(raw) = parse_one(&extent[pos..]) {
                    pos += raw.len as usize;
                }
                state = State::EmitDotDot;
            }
            State::EmitDotDot => {
                if let Some(raw) = parse_one(&extent[pos..]) {
                    if is_known(raw.extent as u64) {
                        entries.push(DirEntry {
                            name: "..".to_string(),
                            short_name: None,
                            addr: raw.extent as u64,
                            meta_type: MetaType::Directory,
                            alloc: AllocState::Allocated,
                        });
                    }
                    pos += raw.len as usize;
                }
                state = State::Scan;
            }
            State::Scan => {
                if pos >= extent.len() {
                    state = State::Done;
                    continue;
                }
                match parse_one(&extent[pos..]) {
                    Some(raw) => {
                        if !is_known(raw.extent as u64) {
                            return Err(Error::Corrupted("directory entry references an unknown extent"));
                        }
                        entries.push(record_to_entry(&raw));
                        pos += raw.len as usize;
                    }
                    None => state = State::SkipPad,
                }
            }
            State::SkipPad => match skip_pad(pos, extent.len(), sector_size) {
                Some(next) => {
                    pos = next;
                    state = State::Scan;
                }
                None => state = State::Done,
            },
            State::Done => break,
        }
    }

    Ok(entries)
}
