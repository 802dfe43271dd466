use crate::{mode, ByteReader, DirectoryEntry, Error, Result, SaveArchive, SaveFile, ENTRY_SIZE};

/// Data in a PSU is padded to this boundary with 0xFF.
pub const PAGE_SIZE: usize = 0x400;

/// Root, "." and "..".
pub const PSU_MIN_SIZE: usize = ENTRY_SIZE * 3;

/// A PSU is a raw dump of the card's directory records, so every entry,
/// including the dot entries, is kept exactly as stored.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct PSU {
    pub archive: SaveArchive,
}

impl PSU {
    /// PSU has no magic. This only checks that the data starts with a
    /// directory record and is large enough to hold the dot entries.
    pub fn probe(data: &[u8]) -> bool {
        data.len() >= PSU_MIN_SIZE
            && DirectoryEntry::parse(data).is_ok_and(|root| root.mode & mode::SUBDIR != 0)
    }

    pub fn new(data: &[u8]) -> Result<Self> {
        if !Self::probe(data) {
            return Err(Error::FormatMismatch("PSU"));
        }

        let mut reader = ByteReader::new(data);
        let directory = DirectoryEntry::read(&mut reader)?;
        let dot_entries = [
            DirectoryEntry::read(&mut reader)?,
            DirectoryEntry::read(&mut reader)?,
        ];

        let count = directory.length.saturating_sub(2);
        let mut files = Vec::new();
        for _ in 0..count {
            let entry = DirectoryEntry::read(&mut reader)?;
            let contents = if entry.is_file() {
                let contents = reader.take(entry.length as usize)?.to_vec();
                let padding = padding_for(contents.len());
                reader.skip(padding.min(reader.remaining()))?;
                contents
            } else {
                Vec::new()
            };
            files.push(SaveFile {
                entry,
                data: contents,
            });
        }

        Ok(Self {
            archive: SaveArchive {
                directory,
                dot_entries,
                files,
            },
        })
    }
}

/// 0xFF bytes that follow `len` bytes of file data.
pub fn padding_for(len: usize) -> usize {
    (PAGE_SIZE - len % PAGE_SIZE) % PAGE_SIZE
}
