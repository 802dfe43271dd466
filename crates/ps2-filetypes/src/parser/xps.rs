use crate::{
    fixed_str, ByteReader, DirectoryEntry, EntryName, Error, McDateTime, Result, SaveArchive,
    SaveFile, NAME_SIZE,
};

pub const XPS_MAGIC: &[u8; 16] = b"SharkPortSave\0\0\0";
const XPS_MAGIC_OFFSET: usize = 4;
const XPS_PREAMBLE_SIZE: usize = 0x15;
pub const XPS_ENTRY_SIZE: usize = 250;

/// One SharkPort/X-Port directory record.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct XpsEntry {
    pub entry_size: u16,
    pub name: [u8; 64],
    pub length: u32,
    pub start: u32,
    pub end: u32,
    pub mode: u16,
    pub created: McDateTime,
    pub modified: McDateTime,
    pub title_ascii: String,
}

impl XpsEntry {
    fn read(reader: &mut ByteReader) -> Result<Self> {
        let base = reader.position();
        let entry_size = reader.u16()?;
        let name = reader.array()?;
        let length = reader.u32()?;
        let start = reader.u32()?;
        let end = reader.u32()?;
        // Stored big-endian in the low half of a 32-bit field.
        let mode = reader.u16_be()?;
        reader.skip(2)?;
        let created = McDateTime::read(reader)?;
        let modified = McDateTime::read(reader)?;
        reader.skip(4 + 12)?;
        let title_ascii = fixed_str(reader.take(64)?);
        reader.seek(base)?;
        reader.skip(XPS_ENTRY_SIZE)?;

        Ok(Self {
            entry_size,
            name,
            length,
            start,
            end,
            mode,
            created,
            modified,
            title_ascii,
        })
    }

    /// Card names are 32 bytes; the longer XPS field is cut down.
    fn to_directory_entry(&self) -> DirectoryEntry {
        DirectoryEntry {
            mode: self.mode,
            length: self.length,
            created: self.created,
            modified: self.modified,
            name: EntryName::from_field(&self.name[..NAME_SIZE]),
            ..Default::default()
        }
    }
}

/// SharkPort / X-Port save. Import only.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct XPS {
    pub title: String,
    pub description: String,
    pub archive: SaveArchive,
}

impl XPS {
    pub fn probe(data: &[u8]) -> bool {
        data.len() >= XPS_PREAMBLE_SIZE
            && &data[XPS_MAGIC_OFFSET..XPS_MAGIC_OFFSET + XPS_MAGIC.len()] == XPS_MAGIC
    }

    pub fn new(data: &[u8]) -> Result<Self> {
        if !Self::probe(data) {
            return Err(Error::FormatMismatch("XPS"));
        }

        let mut reader = ByteReader::at(data, XPS_PREAMBLE_SIZE)?;
        let len = reader.u32()? as usize;
        let title = fixed_str(reader.take(len)?);
        let len = reader.u32()? as usize;
        let description = fixed_str(reader.take(len)?);
        reader.skip(8)?;

        let root = XpsEntry::read(&mut reader)?;
        let mut archive = SaveArchive::new(root.to_directory_entry());

        for _ in 0..root.length.saturating_sub(2) {
            let entry = XpsEntry::read(&mut reader)?;
            let contents = reader.take(entry.length as usize)?;
            archive.files.push(SaveFile {
                entry: entry.to_directory_entry(),
                data: contents.to_vec(),
            });
        }

        Ok(Self {
            title,
            description,
            archive,
        })
    }
}

#[cfg(test)]
pub(crate) fn build_xps(dir: &str, mode: u16, files: &[(&str, &[u8])]) -> Vec<u8> {
    fn entry(name: &str, length: u32, mode: u16) -> Vec<u8> {
        let mut out = vec![0u8; XPS_ENTRY_SIZE];
        out[..2].copy_from_slice(&(XPS_ENTRY_SIZE as u16).to_le_bytes());
        out[2..2 + name.len()].copy_from_slice(name.as_bytes());
        out[66..70].copy_from_slice(&length.to_le_bytes());
        out[78..80].copy_from_slice(&mode.to_be_bytes());
        out[82..90].copy_from_slice(&[0, 1, 2, 3, 4, 5, 0xE8, 0x07]);
        out
    }

    let mut data = vec![0u8; XPS_PREAMBLE_SIZE];
    data[XPS_MAGIC_OFFSET..XPS_MAGIC_OFFSET + 16].copy_from_slice(XPS_MAGIC);
    for blob in [&b"Some Game"[..], &b"Cleared chapter 3\0"[..]] {
        data.extend_from_slice(&(blob.len() as u32).to_le_bytes());
        data.extend_from_slice(blob);
    }
    data.extend_from_slice(&[0u8; 8]);
    data.extend_from_slice(&entry(dir, files.len() as u32 + 2, mode));
    for (name, contents) in files {
        data.extend_from_slice(&entry(name, contents.len() as u32, crate::FILE_ID));
        data.extend_from_slice(contents);
    }
    data
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::DIR_ID;

    #[test]
    fn decodes_synthetic_save() {
        let data = build_xps("BASLUS-20001", DIR_ID, &[("icon.sys", b"abc"), ("DATA", b"")]);
        let xps = XPS::new(&data).unwrap();

        assert_eq!(xps.title, "Some Game");
        assert_eq!(xps.description, "Cleared chapter 3");
        assert_eq!(xps.archive.directory.mode, DIR_ID);
        assert_eq!(xps.archive.directory.name.as_str(), "BASLUS-20001");
        assert_eq!(xps.archive.directory.created.year, 2024);
        assert_eq!(xps.archive.files.len(), 2);
        assert_eq!(xps.archive.files[0].data, b"abc");
        assert_eq!(xps.archive.files[0].entry.mode, crate::FILE_ID);
        assert!(xps.archive.files[1].data.is_empty());
    }

    #[test]
    fn long_names_are_cut_to_card_width() {
        let long = "N".repeat(40);
        let data = build_xps(&long, DIR_ID, &[]);
        let xps = XPS::new(&data).unwrap();
        assert_eq!(xps.archive.directory.name.0, [b'N'; NAME_SIZE]);
    }

    #[test]
    fn truncated_file_data_is_an_error() {
        let data = build_xps("DIR", DIR_ID, &[("A", b"0123456789")]);
        assert!(matches!(
            XPS::new(&data[..data.len() - 4]),
            Err(Error::TruncatedOrCorrupt(_))
        ));
        assert!(XPS::new(b"not an xps file at all").unwrap_err().is_format_mismatch());
    }
}
