// This Source Code Form is subject to the terms of the Mozilla Public
// License, v. 2.0. If a copy of the MPL was not distributed with this
// file, You can obtain one at https://mozilla.org/MPL/2.0/.

//! The image reader collaborator interface (§1, §3).
//!
//! This core never opens a file or a device itself; callers hand it
//! something that implements [`Image`]. What's here is only the trait and
//! a simple in-memory implementation, useful for tests and for embeddings
//! that have already mapped the whole image into memory.

use crate::error::{Error, Result};

/// Byte order of multi-byte fields in the structures a driver parses.
#[derive(Clone, Copy, Debug, Eq, PartialEq)]
pub enum Endian {
    Little,
    Big,
}

/// An opaque, byte-addressable source with a known size.
///
/// Implementations are expected to be cheap to clone/share (an `Arc` over
/// a memory map, a `File` behind a mutex, ...); this crate only ever reads.
pub trait Image: Send + Sync {
    /// Total size of the image, in bytes.
    fn size(&self) -> u64;

    /// Reads `dst.len()` bytes starting at byte offset `off`, or as many
    /// as are available before the image ends. Returns the number of
    /// bytes actually read.
    fn read_at(&self, off: u64, dst: &mut [u8]) -> Result<usize>;

    /// Reads exactly `len` bytes at `off`, failing if the image is
    /// shorter than that.
    fn read_exact_at(&self, off: u64, len: usize) -> Result<Vec<u8>> {
        let mut buf = vec![0u8; len];
        let n = self.read_at(off, &mut buf)?;
        if n != len {
            return Err(Error::Read(std::io::Error::new(
                std::io::ErrorKind::UnexpectedEof,
                "short read from image",
            )));
        }
        Ok(buf)
    }
}

/// An image backed by an in-memory buffer, such as a fully loaded file or
/// a test fixture.
#[derive(Clone)]
pub struct SliceImage {
    bytes: std::sync::Arc<Vec<u8>>,
}

impl SliceImage {
    pub fn new(bytes: Vec<u8>) -> SliceImage {
        SliceImage { bytes: std::sync::Arc::new(bytes) }
    }
}

impl Image for SliceImage {
    fn size(&self) -> u64 {
        self.bytes.len() as u64
    }

    fn read_at(&self, off: u64, dst: &mut [u8]) -> Result<usize> {
        let off = usize::try_from(off).map_err(|_| Error::InvalidArg("offset overflow"))?;
        if off >= self.bytes.len() {
            return Ok(0);
        }
        let avail = &self.bytes[off..];
        let n = usize::min(avail.len(), dst.len());
        dst[..n].copy_from_slice(&avail[..n]);
        Ok(n)
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn reads_within_bounds() {
        let img = SliceImage::new((0u8..32).collect());
        let mut buf = [0u8; 8];
        let n = img.read_at(4, &mut buf).unwrap();
        assert_eq!(n, 8);
        assert_eq!(buf, [4, 5, 6, 7, 8, 9, 10, 11]);
    }

    #[test]
    fn reads_past_end_are_short() {
        let img = SliceImage::new(vec![1, 2, 3]);
        let mut buf = [0u8; 8];
        let n = img.read_at(1, &mut buf).unwrap();
        assert_eq!(n, 2);
    }

    #[test]
    fn read_exact_past_end_errors() {
        let img = SliceImage::new(vec![1, 2, 3]);
        assert!(img.read_exact_at(0, 10).is_err());
    }
}
