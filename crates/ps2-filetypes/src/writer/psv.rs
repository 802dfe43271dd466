use tracing::debug;

use crate::crypto::psv::{resign, PSV_MAGIC, TYPE_PS1, TYPE_PS2};
use crate::{
    append_le_u32, IconSys, Ps1Save, Result, SaveArchive, ICON_SYS_FILE, PS1_NAME_SIZE,
    PS2_DIR_INFO_OFFSET, PS2_DIR_INFO_SIZE, PS2_FILE_INFO_SIZE, PSV_PS1_DATA_OFFSET,
    PSV_PS1_HEADER_SIZE, PSV_PS2_HEADER_SIZE, PSV_SALT,
};

const PS1_START_OF_DATA: u32 = 0x84;
const PS1_BLOCK_SIZE: u32 = 0x200;
const PS1_UNKNOWN: u32 = 0x9003;

/// Output name a PS3 expects: the first 12 characters of the save folder
/// name, then every remaining byte as uppercase hex.
pub fn psv_file_name(dir_name: &[u8]) -> String {
    let end = dir_name.iter().position(|&b| b == 0).unwrap_or(dir_name.len());
    let dir_name = &dir_name[..end];
    let split = dir_name.len().min(12);

    let mut name = String::from_utf8_lossy(&dir_name[..split]).into_owned();
    for byte in &dir_name[split..] {
        name.push_str(&format!("{byte:02X}"));
    }
    name.push_str(".PSV");
    name
}

fn append_header(out: &mut Vec<u8>, save_type: u8) {
    out.extend_from_slice(PSV_MAGIC);
    append_le_u32(out, 0);
    out.extend_from_slice(PSV_SALT);
    out.extend_from_slice(&[0u8; 20]);
    append_le_u32(out, 0);
    append_le_u32(out, 0);
    append_le_u32(
        out,
        if save_type == TYPE_PS1 {
            PSV_PS1_HEADER_SIZE
        } else {
            PSV_PS2_HEADER_SIZE
        },
    );
    append_le_u32(out, save_type.into());
}

pub enum PSVWriter {
    Ps2(SaveArchive),
    Ps1(Ps1Save),
}

impl PSVWriter {
    pub fn ps2(archive: SaveArchive) -> Self {
        Self::Ps2(archive)
    }

    pub fn ps1(save: Ps1Save) -> Self {
        Self::Ps1(save)
    }

    pub fn file_name(&self) -> String {
        match self {
            Self::Ps2(archive) => psv_file_name(archive.directory.name.trimmed()),
            Self::Ps1(save) => psv_file_name(&save.name),
        }
    }

    /// Builds the file and signs it.
    pub fn to_bytes(&self) -> Result<Vec<u8>> {
        let mut out = self.to_unsigned_bytes();
        resign(&mut out)?;
        Ok(out)
    }

    /// Same layout with the signature field left zeroed.
    pub fn to_unsigned_bytes(&self) -> Vec<u8> {
        match self {
            Self::Ps2(archive) => ps2_bytes(archive),
            Self::Ps1(save) => ps1_bytes(save),
        }
    }
}

#[derive(Default)]
struct Slot {
    pos: u32,
    size: u32,
}

fn ps2_bytes(archive: &SaveArchive) -> Vec<u8> {
    let icon_sys = archive
        .file(ICON_SYS_FILE)
        .and_then(|file| IconSys::new(&file.data).ok());
    if icon_sys.is_none() {
        debug!("no usable icon.sys in {}, icon offsets left empty", archive.name());
    }

    let files: Vec<_> = archive.files.iter().filter(|f| f.entry.is_file()).collect();
    let mut position =
        (PS2_DIR_INFO_OFFSET + PS2_DIR_INFO_SIZE + PS2_FILE_INFO_SIZE * files.len()) as u32;

    let mut sys = Slot::default();
    let mut icons: [Slot; 3] = Default::default();
    let mut display_size = 0u32;
    let mut infos = Vec::with_capacity(PS2_FILE_INFO_SIZE * files.len());

    for file in &files {
        let size = file.data.len() as u32;
        let name = file.entry.name.as_str();
        if let Some(icon_sys) = &icon_sys {
            let names = [
                &icon_sys.icon_file,
                &icon_sys.icon_copy_file,
                &icon_sys.icon_delete_file,
            ];
            for (slot, icon_name) in icons.iter_mut().zip(names) {
                if name == icon_name.as_str() {
                    *slot = Slot { pos: position, size };
                }
            }
        }
        if name == ICON_SYS_FILE {
            sys = Slot { pos: position, size };
        }

        file.entry.created.append(&mut infos);
        file.entry.modified.append(&mut infos);
        append_le_u32(&mut infos, size);
        append_le_u32(&mut infos, file.entry.mode.into());
        infos.extend_from_slice(&file.entry.name.0);
        append_le_u32(&mut infos, position);

        position += size;
        display_size += size;
    }

    let mut out = Vec::with_capacity(position as usize);
    append_header(&mut out, TYPE_PS2);

    for value in [
        display_size,
        sys.pos,
        sys.size,
        icons[0].pos,
        icons[0].size,
        icons[1].pos,
        icons[1].size,
        icons[2].pos,
        icons[2].size,
        files.len() as u32,
    ] {
        append_le_u32(&mut out, value);
    }

    let dir = &archive.directory;
    dir.created.append(&mut out);
    dir.modified.append(&mut out);
    append_le_u32(&mut out, files.len() as u32 + 2);
    append_le_u32(&mut out, dir.mode.into());
    out.extend_from_slice(&dir.name.0);

    out.extend_from_slice(&infos);
    for file in &files {
        out.extend_from_slice(&file.data);
    }
    out
}

fn ps1_bytes(save: &Ps1Save) -> Vec<u8> {
    let size = save.data.len() as u32;
    let mut out = Vec::with_capacity(PSV_PS1_DATA_OFFSET + save.data.len());
    append_header(&mut out, TYPE_PS1);

    append_le_u32(&mut out, size);
    append_le_u32(&mut out, PS1_START_OF_DATA);
    append_le_u32(&mut out, PS1_BLOCK_SIZE);
    out.extend_from_slice(&[0u8; 16]);
    append_le_u32(&mut out, size);
    append_le_u32(&mut out, PS1_UNKNOWN);
    out.extend_from_slice(&save.name[..PS1_NAME_SIZE]);
    out.extend_from_slice(&[0u8; 12]);

    out.extend_from_slice(&save.data);
    out
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::crypto::psv::{verify, HEADER_SIZE, SIGNATURE_OFFSET, TYPE_OFFSET};
    use crate::parser::sample_icon_sys;
    use crate::{DirectoryEntry, EntryName, Error, McDateTime, PsvContent, PSV};

    fn archive() -> SaveArchive {
        let time = McDateTime {
            day: 1,
            month: 2,
            year: 2003,
            ..Default::default()
        };
        let mut archive = SaveArchive::new(DirectoryEntry::directory("BASLUS-21050SAVE01", time));
        archive.push_file(
            DirectoryEntry::file(ICON_SYS_FILE, 0, time),
            sample_icon_sys("TITLE", "view.ico", "copy.ico", "view.ico"),
        );
        archive.push_file(DirectoryEntry::file("view.ico", 0, time), vec![1; 100]);
        archive.push_file(DirectoryEntry::file("copy.ico", 0, time), vec![2; 50]);
        archive.push_file(DirectoryEntry::file("DATA", 0, time), vec![3; 7]);
        archive
    }

    #[test]
    fn names_hex_encode_past_twelve_chars() {
        assert_eq!(psv_file_name(b"BASLUS-21050SAVE01"), "BASLUS-2105053415645303031.PSV");
        assert_eq!(psv_file_name(b"SHORT\0junk"), "SHORT.PSV");
    }

    #[test]
    fn ps2_round_trip_and_icon_offsets() {
        let original = archive();
        let bytes = PSVWriter::ps2(original.clone()).to_bytes().unwrap();
        assert!(verify(&bytes).unwrap());
        assert_eq!(bytes[TYPE_OFFSET], TYPE_PS2);

        let psv = PSV::new(&bytes).unwrap();
        let PsvContent::Ps2 { header, archive } = psv.content else {
            panic!("expected a PS2 save");
        };
        assert_eq!(archive, original);
        assert_eq!(&psv.signature[..], &bytes[SIGNATURE_OFFSET..SIGNATURE_OFFSET + 20]);

        let data_start = (PS2_DIR_INFO_OFFSET + PS2_DIR_INFO_SIZE + PS2_FILE_INFO_SIZE * 4) as u32;
        assert_eq!(header.number_of_files, 4);
        assert_eq!(header.sys_pos, data_start);
        assert_eq!(header.sys_size, 964);
        assert_eq!(header.icon1_pos, data_start + 964);
        assert_eq!(header.icon1_size, 100);
        assert_eq!(header.icon2_pos, data_start + 1064);
        assert_eq!(header.icon3_pos, header.icon1_pos);
        assert_eq!(header.display_size, 964 + 100 + 50 + 7);
    }

    #[test]
    fn file_data_is_located_by_offset() {
        let mut bytes = PSVWriter::ps2(archive()).to_bytes().unwrap();
        // Point view.ico at the icon.sys data.
        let first = PS2_DIR_INFO_OFFSET + PS2_DIR_INFO_SIZE + PS2_FILE_INFO_SIZE - 4;
        let second = first + PS2_FILE_INFO_SIZE;
        let sys_pos: [u8; 4] = bytes[first..first + 4].try_into().unwrap();
        bytes[second..second + 4].copy_from_slice(&sys_pos);

        let PsvContent::Ps2 { archive, .. } = PSV::new(&bytes).unwrap().content else {
            panic!("expected a PS2 save");
        };
        assert_eq!(archive.files[1].entry.length, 100);
        assert_eq!(archive.files[1].data, archive.files[0].data[..100]);
    }

    #[test]
    fn ps1_layout() {
        let save = Ps1Save::new("BESCES-00344", b"SC\x11\x01data".to_vec());
        let writer = PSVWriter::ps1(save.clone());
        assert_eq!(writer.file_name(), "BESCES-00344.PSV");

        let bytes = writer.to_bytes().unwrap();
        assert!(verify(&bytes).unwrap());
        assert_eq!(bytes[TYPE_OFFSET], TYPE_PS1);
        assert_eq!(&bytes[0x38..0x3C], &PSV_PS1_HEADER_SIZE.to_le_bytes());
        assert_eq!(&bytes[HEADER_SIZE..HEADER_SIZE + 4], &8u32.to_le_bytes());
        assert_eq!(&bytes[0x44..0x48], &0x84u32.to_le_bytes());
        assert_eq!(&bytes[0x64..0x70], b"BESCES-00344");
        assert_eq!(&bytes[PSV_PS1_DATA_OFFSET..], &save.data[..]);

        assert_eq!(PSV::new(&bytes).unwrap().content, PsvContent::Ps1(save));
    }

    #[test]
    fn unknown_type_and_truncation() {
        let mut bytes = PSVWriter::ps2(archive()).to_bytes().unwrap();
        bytes.truncate(bytes.len() - 1);
        assert!(matches!(PSV::new(&bytes), Err(Error::TruncatedOrCorrupt(_))));

        bytes[TYPE_OFFSET] = 9;
        assert!(matches!(PSV::new(&bytes), Err(Error::UnsupportedVariant(_))));
        assert!(!PSV::probe(&bytes));
        assert!(PSV::new(b"\0VS").unwrap_err().is_format_mismatch());
    }

    #[test]
    fn missing_icon_sys_leaves_offsets_empty() {
        let mut archive = SaveArchive::new(DirectoryEntry::directory("X", McDateTime::default()));
        archive.push_file(DirectoryEntry::file("DATA", 0, McDateTime::default()), vec![9; 3]);
        let bytes = PSVWriter::ps2(archive).to_bytes().unwrap();
        let PsvContent::Ps2 { header, archive } = PSV::new(&bytes).unwrap().content else {
            panic!("expected a PS2 save");
        };
        assert_eq!(header.sys_size, 0);
        assert_eq!(archive.files[0].entry.name, EntryName::new("DATA"));
    }
}
