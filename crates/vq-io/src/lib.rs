#![deny(unsafe_code)]
//! vq-io: the binary view format.
//!
//! A saved file is a run of data blocks (packed column vectors, string
//! data) followed by the structure of the root view and a 16-byte tail.
//! Loading never copies column data: every column reads straight out of
//! the mapped (or owned) bytes.
//!
//! Diff saves record only what changed in a mutable view relative to its
//! parent; `apply_diff` replays them on top of a copy of that parent.

pub mod digest;
pub mod emit;
pub mod error;
pub mod file;
pub mod load;
pub mod pack;
pub mod varint;

pub use digest::{digest_bytes, digest_view, Digest};
pub use emit::{save, save_diff, save_file, save_with, write_to};
pub use error::{Error, Result};
pub use file::{open, open_diff};
pub use load::{apply_diff, load_bytes, load_region};
