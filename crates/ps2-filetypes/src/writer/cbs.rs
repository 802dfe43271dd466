use std::io::Write;

use flate2::{write::ZlibEncoder, Compression};
use tracing::debug;

use crate::crypto::cbs_crypt;
use crate::{
    append_le_u32, put_fixed_str, Result, SaveArchive, CBS_DESCRIPTION_SIZE, CBS_ENTRY_SIZE,
    CBS_HEADER_SIZE, CBS_MAGIC, CBS_TITLE_SIZE,
};

const CBS_UNK1: u32 = 0x1F40;

pub struct CBSWriter {
    archive: SaveArchive,
    title: String,
}

impl CBSWriter {
    pub fn new(archive: SaveArchive, title: impl Into<String>) -> Self {
        Self {
            archive,
            title: title.into(),
        }
    }

    pub fn to_bytes(&self) -> Result<Vec<u8>> {
        let files: Vec<_> = self
            .archive
            .files
            .iter()
            .filter(|file| file.entry.is_file())
            .collect();

        let payload_size: usize = files
            .iter()
            .map(|file| CBS_ENTRY_SIZE + file.data.len())
            .sum();
        let mut payload = Vec::with_capacity(payload_size);
        for file in &files {
            file.entry.created.append(&mut payload);
            file.entry.modified.append(&mut payload);
            append_le_u32(&mut payload, file.data.len() as u32);
            append_le_u32(&mut payload, file.entry.mode.into());
            payload.extend_from_slice(&[0u8; 8]);
            payload.extend_from_slice(&file.entry.name.0);
            payload.extend_from_slice(&file.data);
        }

        let mut encoder = ZlibEncoder::new(Vec::new(), Compression::best());
        encoder.write_all(&payload)?;
        let mut compressed = encoder.finish()?;
        debug!(
            "CBS payload {} bytes, compressed to {}",
            payload.len(),
            compressed.len()
        );

        let dir = &self.archive.directory;
        let mut out = Vec::with_capacity(CBS_HEADER_SIZE + compressed.len());
        out.extend_from_slice(CBS_MAGIC);
        append_le_u32(&mut out, CBS_UNK1);
        append_le_u32(&mut out, CBS_HEADER_SIZE as u32);
        append_le_u32(&mut out, payload.len() as u32);
        append_le_u32(&mut out, (compressed.len() + CBS_HEADER_SIZE) as u32);
        out.extend_from_slice(&dir.name.0);
        dir.created.append(&mut out);
        dir.modified.append(&mut out);
        append_le_u32(&mut out, 0);
        append_le_u32(&mut out, dir.mode.into());
        out.extend_from_slice(&[0u8; 16]);
        put_fixed_str(&mut out, &self.title, CBS_TITLE_SIZE);
        out.resize(out.len() + CBS_DESCRIPTION_SIZE, 0);

        cbs_crypt(&mut compressed);
        out.extend_from_slice(&compressed);
        Ok(out)
    }
}
