use thiserror::Error;

pub type Result<T> = std::result::Result<T, Error>;

#[derive(Debug, Error)]
pub enum Error {
    /// The magic or signature check failed. Callers probing several codecs
    /// should move on to the next one.
    #[error("not a {0} file")]
    FormatMismatch(&'static str),
    #[error("truncated or corrupt data: {0}")]
    TruncatedOrCorrupt(String),
    #[error("unsupported variant: {0}")]
    UnsupportedVariant(String),
    #[error(transparent)]
    Io(#[from] std::io::Error),
}

impl Error {
    pub fn is_format_mismatch(&self) -> bool {
        matches!(self, Error::FormatMismatch(_))
    }

    pub(crate) fn truncated(what: impl std::fmt::Display) -> Self {
        Error::TruncatedOrCorrupt(what.to_string())
    }
}
