use std::borrow::Cow;
use std::fmt;

use chrono::{Datelike, Local, NaiveDate, NaiveDateTime, Timelike};
use serde::{Deserialize, Serialize};

use crate::{append_le_u16, append_le_u32, ByteReader, Result};

pub const DIR_ID: u16 = 0x8427;
pub const FILE_ID: u16 = 0x8497;
/// Mode the PS2 browser expects on the folder wrapping a PS1 save.
pub const PS1_DIR_ID: u16 = 0x9027;
pub const PARENT_DIR_ID: u16 = 0xA426;

/// Memory card attribute bits.
pub mod mode {
    pub const READ: u16 = 0x0001;
    pub const WRITE: u16 = 0x0002;
    pub const EXECUTE: u16 = 0x0004;
    pub const PROTECTED: u16 = 0x0008;
    pub const FILE: u16 = 0x0010;
    pub const SUBDIR: u16 = 0x0020;
    pub const CLOSED: u16 = 0x0080;
    pub const PDA_EXEC: u16 = 0x0800;
    pub const PS1: u16 = 0x1000;
    pub const HIDDEN: u16 = 0x2000;
    pub const EXISTS: u16 = 0x8000;
}

pub const ENTRY_SIZE: usize = 0x200;
pub const NAME_SIZE: usize = 32;
pub const DATETIME_SIZE: usize = 8;

/// Packed memory card timestamp. No timezone, stored exactly as on the card.
#[derive(Debug, Default, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
pub struct McDateTime {
    pub reserved: u8,
    pub sec: u8,
    pub min: u8,
    pub hour: u8,
    pub day: u8,
    pub month: u8,
    pub year: u16,
}

impl McDateTime {
    pub fn from_bytes(bytes: &[u8; DATETIME_SIZE]) -> Self {
        Self {
            reserved: bytes[0],
            sec: bytes[1],
            min: bytes[2],
            hour: bytes[3],
            day: bytes[4],
            month: bytes[5],
            year: u16::from_le_bytes([bytes[6], bytes[7]]),
        }
    }

    pub fn to_bytes(&self) -> [u8; DATETIME_SIZE] {
        let year = self.year.to_le_bytes();
        [
            self.reserved,
            self.sec,
            self.min,
            self.hour,
            self.day,
            self.month,
            year[0],
            year[1],
        ]
    }

    pub(crate) fn read(reader: &mut ByteReader) -> Result<Self> {
        Ok(Self::from_bytes(&reader.array()?))
    }

    pub(crate) fn append(&self, out: &mut Vec<u8>) {
        out.extend_from_slice(&self.to_bytes());
    }

    pub fn now() -> Self {
        Local::now().naive_local().into()
    }

    /// `None` when the stored fields do not form a valid calendar date.
    pub fn to_naive(&self) -> Option<NaiveDateTime> {
        NaiveDate::from_ymd_opt(self.year.into(), self.month.into(), self.day.into())?.and_hms_opt(
            self.hour.into(),
            self.min.into(),
            self.sec.into(),
        )
    }
}

impl From<NaiveDateTime> for McDateTime {
    fn from(value: NaiveDateTime) -> Self {
        Self {
            reserved: 0,
            sec: value.second() as u8,
            min: value.minute() as u8,
            hour: value.hour() as u8,
            day: value.day() as u8,
            month: value.month() as u8,
            year: value.year().clamp(0, u16::MAX as i32) as u16,
        }
    }
}

/// Fixed-width, NUL-padded entry name. All 32 bytes are kept, including any
/// junk after the terminator.
#[derive(Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
pub struct EntryName(pub [u8; NAME_SIZE]);

impl EntryName {
    pub fn new(name: &str) -> Self {
        let mut raw = [0u8; NAME_SIZE];
        let bytes = name.as_bytes();
        let len = bytes.len().min(NAME_SIZE - 1);
        raw[..len].copy_from_slice(&bytes[..len]);
        Self(raw)
    }

    pub fn from_field(field: &[u8]) -> Self {
        let mut raw = [0u8; NAME_SIZE];
        let len = field.len().min(NAME_SIZE);
        raw[..len].copy_from_slice(&field[..len]);
        Self(raw)
    }

    /// Bytes up to the first NUL.
    pub fn trimmed(&self) -> &[u8] {
        let end = self.0.iter().position(|&b| b == 0).unwrap_or(NAME_SIZE);
        &self.0[..end]
    }

    pub fn as_str(&self) -> Cow<'_, str> {
        String::from_utf8_lossy(self.trimmed())
    }

    pub fn is_empty(&self) -> bool {
        self.0[0] == 0
    }
}

impl Default for EntryName {
    fn default() -> Self {
        Self([0; NAME_SIZE])
    }
}

impl From<&str> for EntryName {
    fn from(value: &str) -> Self {
        Self::new(value)
    }
}

impl fmt::Display for EntryName {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(&self.as_str())
    }
}

impl fmt::Debug for EntryName {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{:?}", self.as_str())
    }
}

/// One memory card directory record, the unit every container converges on.
///
/// Mirrors the 512-byte on-card layout: `length` is the byte size for files
/// and the child count (including "." and "..") for directories. `unused`,
/// `cluster`, `dir_entry`, `attr` and `reserved` are kept verbatim.
#[derive(Debug, Default, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct DirectoryEntry {
    pub mode: u16,
    pub unused: u16,
    pub length: u32,
    pub created: McDateTime,
    pub cluster: u32,
    pub dir_entry: u32,
    pub modified: McDateTime,
    pub attr: u32,
    pub reserved: [u8; 28],
    pub name: EntryName,
}

impl DirectoryEntry {
    pub fn directory(name: &str, timestamp: McDateTime) -> Self {
        Self {
            mode: DIR_ID,
            length: 2,
            created: timestamp,
            modified: timestamp,
            name: EntryName::new(name),
            ..Default::default()
        }
    }

    pub fn file(name: &str, length: u32, timestamp: McDateTime) -> Self {
        Self {
            mode: FILE_ID,
            length,
            created: timestamp,
            modified: timestamp,
            name: EntryName::new(name),
            ..Default::default()
        }
    }

    /// The "." and ".." records a card lists first in `dir`.
    pub fn dot_entries(dir: &DirectoryEntry) -> [DirectoryEntry; 2] {
        let dot = DirectoryEntry {
            mode: dir.mode,
            length: 0,
            created: dir.created,
            modified: dir.modified,
            name: EntryName::new("."),
            ..Default::default()
        };
        let dotdot = DirectoryEntry {
            mode: PARENT_DIR_ID,
            length: 0,
            created: dir.created,
            modified: dir.modified,
            name: EntryName::new(".."),
            ..Default::default()
        };
        [dot, dotdot]
    }

    pub fn is_file(&self) -> bool {
        self.mode & mode::FILE != 0
    }

    pub fn is_dir(&self) -> bool {
        self.mode & mode::SUBDIR != 0
    }

    pub fn is_dot(&self) -> bool {
        matches!(self.name.trimmed(), b"." | b"..")
    }

    pub fn parse(data: &[u8]) -> Result<Self> {
        let mut reader = ByteReader::new(data);
        Self::read(&mut reader)
    }

    pub(crate) fn read(reader: &mut ByteReader) -> Result<Self> {
        let start = reader.position();
        let entry = Self {
            mode: reader.u16()?,
            unused: reader.u16()?,
            length: reader.u32()?,
            created: McDateTime::read(reader)?,
            cluster: reader.u32()?,
            dir_entry: reader.u32()?,
            modified: McDateTime::read(reader)?,
            attr: reader.u32()?,
            reserved: reader.array()?,
            name: EntryName(reader.array()?),
        };
        reader.seek(start)?;
        reader.skip(ENTRY_SIZE)?;
        Ok(entry)
    }

    pub fn to_bytes(&self) -> Vec<u8> {
        let mut out = Vec::with_capacity(ENTRY_SIZE);
        self.append(&mut out);
        out
    }

    pub(crate) fn append(&self, out: &mut Vec<u8>) {
        let start = out.len();
        append_le_u16(out, self.mode);
        append_le_u16(out, self.unused);
        append_le_u32(out, self.length);
        self.created.append(out);
        append_le_u32(out, self.cluster);
        append_le_u32(out, self.dir_entry);
        self.modified.append(out);
        append_le_u32(out, self.attr);
        out.extend_from_slice(&self.reserved);
        out.extend_from_slice(&self.name.0);
        out.resize(start + ENTRY_SIZE, 0);
    }
}

#[derive(Debug, Clone, PartialEq, Eq)]
pub struct SaveFile {
    pub entry: DirectoryEntry,
    pub data: Vec<u8>,
}

/// A save directory decoded from any container: the folder record, its two
/// dot records and the files in card order.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct SaveArchive {
    pub directory: DirectoryEntry,
    pub dot_entries: [DirectoryEntry; 2],
    pub files: Vec<SaveFile>,
}

impl SaveArchive {
    pub fn new(directory: DirectoryEntry) -> Self {
        let dot_entries = DirectoryEntry::dot_entries(&directory);
        Self {
            directory,
            dot_entries,
            files: Vec::new(),
        }
    }

    pub fn name(&self) -> String {
        self.directory.name.as_str().into_owned()
    }

    pub fn push_file(&mut self, mut entry: DirectoryEntry, data: Vec<u8>) {
        entry.length = data.len() as u32;
        self.files.push(SaveFile { entry, data });
        self.directory.length = self.files.len() as u32 + 2;
    }

    pub fn file(&self, name: &str) -> Option<&SaveFile> {
        self.files
            .iter()
            .find(|file| file.entry.name.trimmed() == name.as_bytes())
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn sample_time() -> McDateTime {
        McDateTime {
            reserved: 0,
            sec: 5,
            min: 4,
            hour: 3,
            day: 2,
            month: 1,
            year: 2024,
        }
    }

    #[test]
    fn datetime_converts_through_chrono() {
        let time = sample_time();
        let naive = time.to_naive().expect("valid date");
        assert_eq!(
            naive,
            NaiveDate::from_ymd_opt(2024, 1, 2)
                .unwrap()
                .and_hms_opt(3, 4, 5)
                .unwrap()
        );
        assert_eq!(McDateTime::from(naive), time);
        assert_eq!(McDateTime::from_bytes(&time.to_bytes()), time);
        assert!(McDateTime::default().to_naive().is_none());
    }

    #[test]
    fn entry_layout_matches_card_record() {
        let mut entry = DirectoryEntry::file("BESLES-12345", 10, sample_time());
        entry.attr = 0xDEAD_BEEF;
        entry.reserved[0] = 7;
        let bytes = entry.to_bytes();

        assert_eq!(bytes.len(), ENTRY_SIZE);
        assert_eq!(&bytes[0..2], &FILE_ID.to_le_bytes());
        assert_eq!(&bytes[4..8], &10u32.to_le_bytes());
        assert_eq!(&bytes[0x20..0x24], &0xDEAD_BEEFu32.to_le_bytes());
        assert_eq!(bytes[0x24], 7);
        assert_eq!(&bytes[0x40..0x4C], b"BESLES-12345");
        assert_eq!(DirectoryEntry::parse(&bytes).unwrap(), entry);
    }

    #[test]
    fn names_keep_trailing_bytes() {
        let mut raw = [0u8; NAME_SIZE];
        raw[..4].copy_from_slice(b"DATA");
        raw[10] = 0x55;
        let name = EntryName(raw);
        assert_eq!(name.as_str(), "DATA");
        assert_eq!(name.0[10], 0x55);
        assert_eq!(EntryName::new(&"X".repeat(40)).trimmed().len(), NAME_SIZE - 1);
    }

    #[test]
    fn archive_tracks_child_count() {
        let mut archive = SaveArchive::new(DirectoryEntry::directory("SAVE", sample_time()));
        archive.push_file(DirectoryEntry::file("A", 0, sample_time()), vec![1, 2, 3]);
        assert_eq!(archive.directory.length, 3);
        assert_eq!(archive.files[0].entry.length, 3);
        assert_eq!(archive.dot_entries[0].name.as_str(), ".");
        assert_eq!(archive.dot_entries[1].mode, PARENT_DIR_ID);
        assert!(archive.file("A").is_some());
        assert!(archive.dot_entries.iter().all(|entry| entry.is_dot()));
    }
}
