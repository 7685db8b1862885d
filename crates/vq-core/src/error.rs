use thiserror::Error;

use crate::item::ItemType;

/// Canonical result for core.
pub type Result<T> = std::result::Result<T, Error>;

/// The fixed set of structural error codes.
///
/// These travel inside `Item::Error` for per-access failures (a bad row
/// index never aborts a bulk operation) and inside `Error::Code` when an
/// operation as a whole is rejected.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Error)]
pub enum ErrorCode {
    #[error("column index out of range")]
    ColumnOutOfRange,

    #[error("row index out of range")]
    RowOutOfRange,

    #[error("cannot insert in zero-width view")]
    ZeroWidthInsert,

    #[error("item count not a multiple of column width")]
    NotMultipleOfWidth,

    #[error("rename arg count must be even")]
    RenameArgCount,

    #[error("need at least one row")]
    NoRows,

    #[error("wrong number of arguments")]
    WrongArgCount,

    #[error("nested view cannot be mapped")]
    BadSubview,
}

impl ErrorCode {
    /// Short mnemonic, stable across releases.
    pub fn tag(self) -> &'static str {
        match self {
            ErrorCode::ColumnOutOfRange => "cioor",
            ErrorCode::RowOutOfRange => "rioor",
            ErrorCode::ZeroWidthInsert => "cizwv",
            ErrorCode::NotMultipleOfWidth => "nmcw",
            ErrorCode::RenameArgCount => "rambe",
            ErrorCode::NoRows => "nalor",
            ErrorCode::WrongArgCount => "wnoa",
            ErrorCode::BadSubview => "nvcbm",
        }
    }
}

#[derive(Debug, Error)]
pub enum Error {
    #[error("{0}")]
    Code(#[from] ErrorCode),

    #[error("incompatible views: {0}")]
    Incompatible(String),

    #[error("bad description {desc:?} at offset {pos}")]
    Desc { desc: String, pos: usize },

    #[error("cannot convert row {row} to type {ty}")]
    Coerce { row: usize, ty: ItemType },

    #[error("type mismatch: expected {expected}, got {got}")]
    Type { expected: ItemType, got: ItemType },

    #[error("no column named {0:?}")]
    NoSuchColumn(String),

    #[error("view has no mutable overlay")]
    NotMutable,

    #[error("Invalid configuration: {0}")]
    Config(String),
}

impl From<serde_json::Error> for Error {
    fn from(e: serde_json::Error) -> Self {
        Error::Config(e.to_string())
    }
}
