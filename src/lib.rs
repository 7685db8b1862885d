#![forbid(unsafe_code)]
//! vq: an embeddable columnar view engine.
//!
//! Views are immutable, reference-counted tables whose columns may be
//! stored, computed or mapped from a saved file. This crate bundles the
//! three layers:
//!
//! * [`vq_core`]: items, columns, views, virtual views and mutation overlays
//! * [`vq_ops`]: hashing, grouping, joins, set operations and sorting
//! * [`vq_io`]: the binary save format, diff saves and memory-mapped loading

pub use vq_core;
pub use vq_io;
pub use vq_ops;

pub use vq_core::{Column, EngineConfig, Item, ItemType, View};

/// Everything needed for typical use in one import.
pub mod prelude {
    pub use vq_core::prelude::*;
    pub use vq_core::virt::{grouped, ungroup};
    pub use vq_io::{apply_diff, digest_view, load_bytes, open, save, save_diff, save_file};
    pub use vq_ops::{
        except, group_by, ijoin, intersect, join, sort, sort_map, union, uniq_map, unique,
    };
}
