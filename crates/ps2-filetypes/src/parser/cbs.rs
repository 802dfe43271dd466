use std::io::Read;

use flate2::read::ZlibDecoder;
use tracing::debug;

use crate::crypto::cbs_crypt;
use crate::{
    fixed_str, ByteReader, DirectoryEntry, EntryName, Error, McDateTime, Result, SaveArchive,
    SaveFile, MAX_DECOMPRESSED_SIZE,
};

pub const CBS_MAGIC: &[u8; 4] = b"CFU\0";
pub const CBS_HEADER_SIZE: usize = 0x128;
pub const CBS_ENTRY_SIZE: usize = 64;
pub const CBS_TITLE_SIZE: usize = 72;
pub const CBS_DESCRIPTION_SIZE: usize = 132;

/// CodeBreaker save header. Fields with unknown meaning are carried as-is.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct CbsHeader {
    pub unk1: u32,
    pub data_offset: u32,
    pub decompressed_size: u32,
    pub compressed_size: u32,
    pub name: EntryName,
    pub created: McDateTime,
    pub modified: McDateTime,
    pub unk2: u32,
    pub mode: u32,
    pub unk3: [u8; 16],
    pub title: String,
    pub description: String,
}

impl CbsHeader {
    pub fn parse(data: &[u8]) -> Result<Self> {
        if data.len() < CBS_HEADER_SIZE || &data[..4] != CBS_MAGIC {
            return Err(Error::FormatMismatch("CBS"));
        }

        let mut reader = ByteReader::at(data, 4)?;
        let header = Self {
            unk1: reader.u32()?,
            data_offset: reader.u32()?,
            decompressed_size: reader.u32()?,
            compressed_size: reader.u32()?,
            name: EntryName(reader.array()?),
            created: McDateTime::read(&mut reader)?,
            modified: McDateTime::read(&mut reader)?,
            unk2: reader.u32()?,
            mode: reader.u32()?,
            unk3: reader.array()?,
            title: fixed_str(reader.take(CBS_TITLE_SIZE)?),
            description: fixed_str(reader.take(CBS_DESCRIPTION_SIZE)?),
        };

        if header.data_offset as usize != CBS_HEADER_SIZE {
            return Err(Error::FormatMismatch("CBS"));
        }
        Ok(header)
    }
}

/// CodeBreaker save: RC4-obfuscated zlib stream of entry headers and data.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct CBS {
    pub header: CbsHeader,
    pub archive: SaveArchive,
}

impl CBS {
    pub fn probe(data: &[u8]) -> bool {
        CbsHeader::parse(data).is_ok()
    }

    pub fn new(data: &[u8]) -> Result<Self> {
        let header = CbsHeader::parse(data)?;

        // Some tools write a wrong compressed size, so the whole tail is used.
        let mut compressed = data[CBS_HEADER_SIZE..].to_vec();
        cbs_crypt(&mut compressed);
        let payload = inflate(&compressed)?;
        if payload.len() != header.decompressed_size as usize {
            debug!(
                "CBS payload is {} bytes, header says {}",
                payload.len(),
                header.decompressed_size
            );
        }

        let mut archive = SaveArchive::new(DirectoryEntry {
            mode: header.mode as u16,
            created: header.created,
            modified: header.modified,
            name: header.name,
            ..Default::default()
        });

        let mut reader = ByteReader::new(&payload);
        while reader.remaining() >= CBS_ENTRY_SIZE {
            let created = McDateTime::read(&mut reader)?;
            let modified = McDateTime::read(&mut reader)?;
            let length = reader.u32()?;
            let mode = reader.u32()?;
            reader.skip(8)?;
            let name = EntryName(reader.array()?);
            let contents = reader.take(length as usize).map_err(|_| {
                Error::truncated(format!("CBS entry {name} runs past the payload"))
            })?;

            archive.files.push(SaveFile {
                entry: DirectoryEntry {
                    mode: mode as u16,
                    length,
                    created,
                    modified,
                    name,
                    ..Default::default()
                },
                data: contents.to_vec(),
            });
        }
        archive.directory.length = archive.files.len() as u32 + 2;

        Ok(Self { header, archive })
    }
}

fn inflate(compressed: &[u8]) -> Result<Vec<u8>> {
    let mut payload = Vec::new();
    ZlibDecoder::new(compressed)
        .take(MAX_DECOMPRESSED_SIZE as u64 + 1)
        .read_to_end(&mut payload)
        .map_err(|err| Error::truncated(format!("CBS decompression failed: {err}")))?;
    if payload.len() > MAX_DECOMPRESSED_SIZE {
        return Err(Error::truncated(format!(
            "CBS payload exceeds {MAX_DECOMPRESSED_SIZE} bytes"
        )));
    }
    Ok(payload)
}
