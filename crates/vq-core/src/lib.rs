#![forbid(unsafe_code)]
//! vq-core: items, sequences, columns and views.
//!
//! Everything here is single-threaded and reference counted. Views are
//! immutable values; the mutable and settable overlays give them copy-on-
//! write update semantics. No IO lives in this crate; saving and loading
//! are in `vq-io`, hashing-based operators in `vq-ops`.

pub mod bits;
pub mod buffer;
pub mod column;
pub mod config;
pub mod context;
pub mod desc;
pub mod error;
pub mod fingerprint;
pub mod item;
pub mod mutable;
pub mod prelude;
pub mod region;
pub mod seq;
pub mod settable;
pub mod vector;
pub mod view;
pub mod virt;

pub use bits::Bitmap;
pub use column::Column;
pub use config::EngineConfig;
pub use error::{Error, ErrorCode, Result};
pub use item::{Item, ItemType, ToItem};
pub use region::Region;
pub use seq::{SeqKind, Sequence, SubviewSource};
pub use view::View;
