//! The memory card as seen by the save converters.
//!
//! Converters never touch a card directly. They go through [`MemcardIo`],
//! a handful of primitives modelled on the console's card library:
//! enumerate saves, stat, read and write whole files, create a directory
//! and stamp an entry's attributes. Two backends are provided:
//! [`MemoryCard`] keeps everything in memory, [`HostCard`] maps a card onto
//! a host directory.

mod error;
mod host;
mod memory;
mod path;

pub use error::{Error, Result};
pub use host::{FsTimes, HostCard, HostTimes, SIDECAR_FILE};
pub use memory::MemoryCard;
pub use path::CardPath;

use ps2_filetypes::DirectoryEntry;

/// Which console the card belongs to. PS1 saves live as root files on a PS1
/// card, PS2 saves are root directories.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum CardKind {
    Ps1,
    Ps2,
}

pub trait MemcardIo {
    fn kind(&self) -> CardKind;

    /// Root entries in card order. Directory lengths are child counts
    /// including "." and "..".
    fn list_saves(&self) -> Result<Vec<DirectoryEntry>>;

    /// Files of a save directory in card order, dot entries excluded.
    fn read_dir(&self, dir: &str) -> Result<Vec<DirectoryEntry>>;

    fn stat(&self, path: &str) -> Result<DirectoryEntry>;

    fn read_file(&self, path: &str) -> Result<Vec<u8>>;

    /// Creates or replaces a file. The parent directory must exist.
    fn write_file(&mut self, path: &str, data: &[u8]) -> Result<()>;

    /// Succeeds when the directory already exists.
    fn create_dir(&mut self, dir: &str) -> Result<()>;

    /// Copies mode, timestamps and the opaque fields of `info` onto an
    /// existing entry. Name and length are left alone.
    fn set_entry_info(&mut self, path: &str, info: &DirectoryEntry) -> Result<()>;

    fn exists(&self, path: &str) -> bool {
        self.stat(path).is_ok()
    }
}

/// Applies the metadata half of `info` to `entry`.
pub(crate) fn copy_entry_info(entry: &mut DirectoryEntry, info: &DirectoryEntry) {
    entry.mode = info.mode;
    entry.unused = info.unused;
    entry.created = info.created;
    entry.cluster = info.cluster;
    entry.dir_entry = info.dir_entry;
    entry.modified = info.modified;
    entry.attr = info.attr;
    entry.reserved = info.reserved;
}
