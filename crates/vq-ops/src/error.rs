use thiserror::Error;

use vq_core::{ErrorCode, ItemType};

/// Result type for view operations.
pub type Result<T> = std::result::Result<T, Error>;

#[derive(Debug, Error)]
pub enum Error {
    #[error(transparent)]
    Core(#[from] vq_core::Error),

    #[error("incompatible views: {left} vs {right}")]
    Incompatible { left: String, right: String },

    #[error("cannot sum a column of type {0}")]
    NotNumeric(ItemType),
}

impl From<ErrorCode> for Error {
    fn from(code: ErrorCode) -> Self {
        Error::Core(vq_core::Error::Code(code))
    }
}
