use tracing::debug;

use crate::{
    fixed_str, lzari, round_up, ByteReader, DirectoryEntry, EntryName, Error, Result, SaveArchive,
    FILE_ID, MAX_DECOMPRESSED_SIZE,
};

pub const MAX_MAGIC: &[u8; 12] = b"Ps2PowerSave";
pub const MAX_HEADER_SIZE: usize = 92;
/// The last header field doubles as the LZARI length prefix.
pub const MAX_STREAM_OFFSET: usize = 88;
const MAX_ENTRY_SIZE: usize = 36;

#[derive(Debug, Clone, PartialEq, Eq)]
pub struct MaxHeader {
    pub crc: u32,
    pub dir_name: EntryName,
    pub icon_sys_name: EntryName,
    pub compressed_size: u32,
    pub num_files: u32,
    pub decompressed_size: u32,
}

impl MaxHeader {
    pub fn parse(data: &[u8]) -> Result<Self> {
        let mut reader = ByteReader::new(data);
        let magic: [u8; 12] = reader.array().map_err(|_| Error::FormatMismatch("MAX"))?;
        if &magic != MAX_MAGIC {
            return Err(Error::FormatMismatch("MAX"));
        }

        let header = Self {
            crc: reader.u32()?,
            dir_name: EntryName(reader.array()?),
            icon_sys_name: EntryName(reader.array()?),
            compressed_size: reader.u32()?,
            num_files: reader.u32()?,
            decompressed_size: reader.u32()?,
        };
        header.log();

        if header.compressed_size == 0
            || header.decompressed_size == 0
            || header.num_files == 0
            || header.dir_name.is_empty()
            || header.icon_sys_name.is_empty()
        {
            return Err(Error::FormatMismatch("MAX"));
        }
        Ok(header)
    }

    fn log(&self) {
        debug!("CRC              : {:08X}", self.crc);
        debug!("dirName          : {}", self.dir_name);
        debug!("iconSysName      : {}", self.icon_sys_name);
        debug!("compressedSize   : {}", self.compressed_size);
        debug!("numFiles         : {}", self.num_files);
        debug!("decompressedSize : {}", self.decompressed_size);
    }
}

/// Where the next entry header starts, given where the current entry's data
/// starts. The encoder aligns `data + length + 8` to 16, so entries land on
/// 8 mod 16.
pub fn next_entry_offset(data_offset: usize, length: usize) -> usize {
    round_up(data_offset + length + 8, 16) - 8
}

/// Action Replay Max save. Import only.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct MAX {
    pub header: MaxHeader,
    pub archive: SaveArchive,
}

impl MAX {
    pub fn probe(data: &[u8]) -> bool {
        MaxHeader::parse(data).is_ok()
    }

    pub fn new(data: &[u8]) -> Result<Self> {
        let header = MaxHeader::parse(data)?;

        let stream = data
            .get(MAX_STREAM_OFFSET..)
            .and_then(|rest| rest.get(..header.compressed_size as usize))
            .ok_or_else(|| {
                Error::truncated(format!(
                    "compressed size: actual={}, expected={}",
                    data.len().saturating_sub(MAX_STREAM_OFFSET),
                    header.compressed_size
                ))
            })?;

        // The declared size is known to be inaccurate; it only sizes the buffer.
        let mut decompressed =
            vec![0u8; (header.decompressed_size as usize).min(MAX_DECOMPRESSED_SIZE)];
        let produced = lzari::decompress(stream, &mut decompressed)?;
        decompressed.truncate(produced);

        let mut archive = SaveArchive::new(DirectoryEntry {
            name: header.dir_name,
            ..DirectoryEntry::directory("", Default::default())
        });

        let mut offset = 0;
        for _ in 0..header.num_files {
            let mut reader = ByteReader::at(&decompressed, offset)?;
            let length = reader.u32()? as usize;
            let name = EntryName(reader.array()?);
            let data_offset = offset + MAX_ENTRY_SIZE;
            let contents = reader.take(length).map_err(|_| {
                Error::truncated(format!("MAX entry {name} runs past the payload"))
            })?;

            archive.push_file(
                DirectoryEntry {
                    mode: FILE_ID,
                    name,
                    ..Default::default()
                },
                contents.to_vec(),
            );
            offset = next_entry_offset(data_offset, length);
        }

        Ok(Self { header, archive })
    }

    pub fn dir_name(&self) -> String {
        fixed_str(&self.header.dir_name.0)
    }
}

#[cfg(test)]
pub(crate) fn build_max(dir: &str, files: &[(&str, Vec<u8>)]) -> Vec<u8> {
    let mut payload = Vec::new();
    for (name, contents) in files {
        let start = payload.len();
        payload.extend_from_slice(&(contents.len() as u32).to_le_bytes());
        payload.extend_from_slice(&EntryName::new(name).0);
        payload.extend_from_slice(contents);
        let next = next_entry_offset(start + MAX_ENTRY_SIZE, contents.len());
        payload.resize(next, 0);
    }

    let stream = lzari::compress(&payload);
    let mut data = Vec::new();
    data.extend_from_slice(MAX_MAGIC);
    data.extend_from_slice(&0u32.to_le_bytes());
    data.extend_from_slice(&EntryName::new(dir).0);
    data.extend_from_slice(&EntryName::new("icon.sys").0);
    data.extend_from_slice(&(stream.len() as u32).to_le_bytes());
    data.extend_from_slice(&(files.len() as u32).to_le_bytes());
    data.extend_from_slice(&stream);
    data
}
