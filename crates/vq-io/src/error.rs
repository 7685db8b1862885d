use thiserror::Error;

/// Result type for saving and loading.
pub type Result<T> = std::result::Result<T, Error>;

#[derive(Debug, Error)]
pub enum Error {
    #[error("I/O error: {0}")]
    Io(#[from] std::io::Error),

    #[error("bad view data: {0}")]
    Format(String),

    #[error("output of {0} bytes exceeds the addressable file size")]
    TooLarge(u64),

    #[error(transparent)]
    Core(#[from] vq_core::Error),
}

impl Error {
    pub(crate) fn format(msg: impl Into<String>) -> Self {
        Error::Format(msg.into())
    }
}
