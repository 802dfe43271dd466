use std::path::PathBuf;

use thiserror::Error;

use crate::SaveFormat;

#[derive(Debug, Error)]
pub enum Error {
    #[error(transparent)]
    Format(#[from] ps2_filetypes::Error),

    #[error(transparent)]
    Card(#[from] memcard::Error),

    #[error(transparent)]
    IOError(#[from] std::io::Error),

    #[error("{0}")]
    ConfigError(String),

    #[error("{0}: save has no icon.sys")]
    MissingIconSys(String),

    #[error("{}: not a recognised save file", .0.display())]
    UnknownFormat(PathBuf),

    #[error("{0} files cannot be written")]
    ExportUnsupported(SaveFormat),

    #[error("{0}: wrong kind of memory card for this save")]
    WrongCard(String),
}

impl Error {
    pub fn is_format_mismatch(&self) -> bool {
        matches!(self, Error::Format(err) if err.is_format_mismatch())
    }
}

pub type Result<T> = std::result::Result<T, Error>;
