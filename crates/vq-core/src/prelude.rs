//! Convenient re-exports for downstream crates.

pub use crate::bits::Bitmap;
pub use crate::column::{coerce_column, coerce_items, Column};
pub use crate::config::EngineConfig;
pub use crate::desc::{describe, parse_desc};
pub use crate::error::{Error, ErrorCode, Result};
pub use crate::item::{Item, ItemType, ToItem};
pub use crate::mutable::{prepare, MutInfo};
pub use crate::view::{compat, row_compare, row_equal, view_compare, View};
pub use crate::virt::{concat, remap, step};
