use std::path::PathBuf;

use thiserror::Error;

#[derive(Debug, Error)]
pub enum Error {
    #[error("{0}: no such file or directory")]
    NotFound(String),

    #[error("{0}: invalid card path")]
    InvalidPath(String),

    #[error("{0}: is a directory")]
    IsDirectory(String),

    #[error("{0}: is a file")]
    NotDirectory(String),

    #[error("sidecar {path}: {source}")]
    Sidecar {
        path: PathBuf,
        #[source]
        source: serde_json::Error,
    },

    #[error(transparent)]
    Io(#[from] std::io::Error),
}

pub type Result<T> = std::result::Result<T, Error>;
