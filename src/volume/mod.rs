// This Source Code Form is subject to the terms of the Mozilla Public
// License, v. 2.0. If a copy of the MPL was not distributed with this
// file, You can obtain one at https://mozilla.org/MPL/2.0/.

//! Volume-system (partition table) autodetection and opening (§4.2).

mod bsd;
mod dos;
mod gpt;
mod mac;
mod sun;

use crate::error::{Error, Result};
use crate::image::Image;
use bitflags::bitflags;
use log::debug;

/// Which volume-system family a disk image uses.
#[derive(Clone, Copy, Debug, Eq, PartialEq)]
pub enum VsType {
    Detect,
    Dos,
    Bsd,
    Gpt,
    Sun,
    Mac,
}

bitflags! {
    #[derive(Clone, Copy, Debug, Eq, PartialEq)]
    pub struct PartitionFlags: u8 {
        const ALLOC  = 0b01;
        const UNALLOC = 0b10;
        const META   = 0b100;
    }
}

/// One entry in a volume system's partition table.
#[derive(Clone, Debug, Eq, PartialEq)]
pub struct Partition {
    /// Start of the partition, in blocks relative to the volume system.
    pub start: u64,
    /// Length of the partition, in blocks.
    pub len: u64,
    pub desc: String,
    pub flags: PartitionFlags,
}

/// An opened volume system: immutable once constructed (§3).
#[derive(Clone, Debug)]
pub struct VolumeSystem {
    pub vs_type: VsType,
    pub block_size: u32,
    pub offset: u64,
    pub partitions: Vec<Partition>,
}

/// Options controlling how a volume system is opened.
#[derive(Clone, Copy, Debug)]
pub struct VolumeSystemOptions {
    /// Byte offset in the image to start analyzing from.
    pub offset: u64,
    /// Explicit type, or `Detect` to run autodetection (§4.2).
    pub vs_type: VsType,
}

impl Default for VolumeSystemOptions {
    fn default() -> Self {
        VolumeSystemOptions { offset: 0, vs_type: VsType::Detect }
    }
}

/// The result of a single opener's attempt: `None` means "this image is
/// not this type," not an error. Genuine I/O failures are `Err`.
type TryOpen = Result<Option<VolumeSystem>>;

/// Opens the volume system described by `opts` against `image`.
///
/// See §4.2 for the autodetection algorithm and the BSD/DOS asymmetry.
pub fn open(image: &dyn Image, opts: VolumeSystemOptions) -> Result<VolumeSystem> {
    match opts.vs_type {
        VsType::Dos => {
            dos::try_open(image, opts.offset, false)?.ok_or(Error::UnsupportedType(VsType::Dos))
        }
        VsType::Bsd => {
            bsd::try_open(image, opts.offset)?.ok_or(Error::UnsupportedType(VsType::Bsd))
        }
        VsType::Gpt => {
            gpt::try_open(image, opts.offset)?.ok_or(Error::UnsupportedType(VsType::Gpt))
        }
        VsType::Sun => {
            sun::try_open(image, opts.offset)?.ok_or(Error::UnsupportedType(VsType::Sun))
        }
        VsType::Mac => {
            mac::try_open(image, opts.offset)?.ok_or(Error::UnsupportedType(VsType::Mac))
        }
        VsType::Detect => detect(image, opts.offset),
    }
}

/// Reset-and-continue helper: genuine errors from one opener must not
/// abort the attempt at the next one (§4.2, §7).
fn attempt(label: &'static str, r: TryOpen) -> Option<VolumeSystem> {
    match r {
        Ok(found) => found,
        Err(e) => {
            debug!("volume system autodetect: {label} opener failed: {e}");
            None
        }
    }
}

fn detect(image: &dyn Image, offset: u64) -> Result<VolumeSystem> {
    // DOS is tried in "tolerant" mode: it is allowed to succeed even when
    // the same sector also carries a BSD boot block, because rule 2 below
    // lets BSD win that case rather than rejecting both outright.
    let dos_hit = attempt("DOS", dos::try_open(image, offset, true));

    // BSD disk labels carry a DOS-compatible magic number in the boot
    // sector (historical accident of how BSD boot blocks were laid out),
    // so a BSD disk will also look like a valid (tolerant) DOS disk. If
    // both succeed, BSD is authoritative: this is the one deliberate
    // asymmetry in autodetection (§4.2 rule 2).
    let bsd_hit = attempt("BSD", bsd::try_open(image, offset));

    let mut set: Option<(&'static str, VolumeSystem)> = None;
    if let Some(bsd_vs) = bsd_hit {
        set = Some(("BSD", bsd_vs));
    } else if let Some(dos_vs) = dos_hit {
        set = Some(("DOS", dos_vs));
    }

    // GPT, Sun, and Mac are mutually exclusive with whatever has been
    // found so far (including each other): two genuine hits among this
    // trio (or against DOS/BSD) is an unresolvable ambiguity.
    for (label, hit) in [
        ("GPT", attempt("GPT", gpt::try_open(image, offset))),
        ("Sun", attempt("Sun", sun::try_open(image, offset))),
        ("Mac", attempt("Mac", mac::try_open(image, offset))),
    ] {
        if let Some(vs) = hit {
            match set.take() {
                None => set = Some((label, vs)),
                Some((prior_label, _prior_vs)) => {
                    // Both `vs` and the prior volume system are dropped
                    // here; neither is authoritative.
                    return Err(Error::UnknownType(format!(
                        "{label} or {prior_label} at offset {offset}"
                    )));
                }
            }
        }
    }

    set.map(|(_, vs)| vs).ok_or_else(|| Error::UnknownType(String::new()))
}

/// Minimal CRC-32 (IEEE 802.3 polynomial), used to validate the GPT
/// header checksum. No external crate is pulled in for a single, tiny,
/// well-known algorithm used in exactly one place.
pub(crate) fn crc32(bytes: &[u8]) -> u32 {
    let mut crc = 0xFFFF_FFFFu32;
    for &b in bytes {
        crc ^= b as u32;
        for _ in 0..8 {
            let mask = (crc & 1).wrapping_neg();
            crc = (crc >> 1) ^ (0xEDB8_8320 & mask);
        }
    }
    !crc
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::image::SliceImage;

    #[test]
    fn unknown_when_nothing_matches() {
        let img = SliceImage::new(vec![0u8; 4096]);
        let err = open(&img, VolumeSystemOptions::default()).unwrap_err();
        assert!(matches!(err, Error::UnknownType(ref s) if s.is_empty()));
    }

    #[test]
    fn crc32_known_vector() {
        assert_eq!(crc32(b"123456789"), 0xCBF4_3926);
    }
}
