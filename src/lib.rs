// This Source Code Form is subject to the terms of the Mozilla Public
// License, v. 2.0. If a copy of the MPL was not distributed with this
// file, You can obtain one at https://mozilla.org/MPL/2.0/.

//! A read-only forensic query layer over disk images.
//!
//! Three collaborators compose to answer structural questions about a
//! disk image without mutating it: a [`volume`] system that locates
//! partitions, an [`fs::FsDriver`] that interprets one filesystem inside
//! a partition, and the generic [`path`]/[`reverse`] layers that answer
//! path-resolution and reverse-lookup queries against any driver.
//!
//! Callers supply the bytes through [`image::Image`]; this crate never
//! opens a file or a block device itself.

pub mod error;
pub mod flags;
pub mod fs;
pub mod image;
pub mod path;
pub mod reverse;
pub mod volume;

pub use error::{Error, Lookup, Result, WalkControl};
pub use image::Image;
