#![forbid(unsafe_code)]
//! vq-ops: hash-based grouping, joins and set operations, merge sort and
//! simple aggregates over `vq_core` views.
//!
//! Every operation here is a pure function of its input views. Results are
//! virtual views (remaps, groupings) sharing the input columns wherever
//! possible; only index vectors are materialized.

pub mod aggregate;
pub mod error;
pub mod group;
pub mod hash;
pub mod set;
pub mod sort;

pub use aggregate::{max, min, sum};
pub use error::{Error, Result};
pub use group::{group_col, group_by, ijoin, join};
pub use hash::{get_hash_info, GroupInfo, HashInfo, HashKind};
pub use set::{except, except_map, intersect, intersect_map, union, union_map, uniq_map, unique};
pub use sort::{sort, sort_map};
