use crate::{padding_for, SaveArchive, ENTRY_SIZE};

pub struct PSUWriter {
    archive: SaveArchive,
}

impl PSUWriter {
    pub fn new(archive: SaveArchive) -> Self {
        Self { archive }
    }

    pub fn to_bytes(&self) -> Vec<u8> {
        let archive = &self.archive;
        let data_size: usize = archive
            .files
            .iter()
            .map(|file| ENTRY_SIZE + file.data.len() + padding_for(file.data.len()))
            .sum();
        let mut out = Vec::with_capacity(ENTRY_SIZE * 3 + data_size);

        let mut root = archive.directory.clone();
        root.length = archive.files.len() as u32 + 2;
        root.append(&mut out);
        for dot in &archive.dot_entries {
            dot.append(&mut out);
        }

        for file in &archive.files {
            if !file.entry.is_file() {
                file.entry.append(&mut out);
                continue;
            }
            let mut entry = file.entry.clone();
            entry.length = file.data.len() as u32;
            entry.append(&mut out);
            out.extend_from_slice(&file.data);
            out.resize(out.len() + padding_for(file.data.len()), 0xFF);
        }

        out
    }
}
