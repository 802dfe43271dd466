use tracing::debug;

use crate::crypto::psv::{
    HEADER_SIZE, PSV_MAGIC, SIGNATURE_OFFSET, SIGNATURE_SIZE, TYPE_OFFSET, TYPE_PS1, TYPE_PS2,
};
use crate::{
    ByteReader, DirectoryEntry, EntryName, Error, McDateTime, Ps1Save, Result, SaveArchive,
    SaveFile, PS1_NAME_SIZE,
};

pub const PSV_SALT: &[u8; 20] = b"www.bucanero.com.ar\0";
pub const PSV_PS2_HEADER_SIZE: u32 = 0x2C;
pub const PSV_PS1_HEADER_SIZE: u32 = 0x14;

pub(crate) const PS2_SUBHEADER_SIZE: usize = 0x28;
pub(crate) const PS2_DIR_INFO_OFFSET: usize = HEADER_SIZE + PS2_SUBHEADER_SIZE;
pub(crate) const PS2_DIR_INFO_SIZE: usize = 0x38;
pub(crate) const PS2_FILE_INFO_SIZE: usize = 0x3C;
pub(crate) const PS1_SUBHEADER_SIZE: usize = 0x44;
pub(crate) const PS1_PROD_CODE_OFFSET: usize = HEADER_SIZE + 0x24;
pub const PSV_PS1_DATA_OFFSET: usize = HEADER_SIZE + PS1_SUBHEADER_SIZE;

/// Offsets of `icon.sys` and the three icon models inside a PS2 PSV.
#[derive(Debug, Default, Clone, Copy, PartialEq, Eq)]
pub struct PsvPs2Header {
    pub display_size: u32,
    pub sys_pos: u32,
    pub sys_size: u32,
    pub icon1_pos: u32,
    pub icon1_size: u32,
    pub icon2_pos: u32,
    pub icon2_size: u32,
    pub icon3_pos: u32,
    pub icon3_size: u32,
    pub number_of_files: u32,
}

impl PsvPs2Header {
    fn read(reader: &mut ByteReader) -> Result<Self> {
        Ok(Self {
            display_size: reader.u32()?,
            sys_pos: reader.u32()?,
            sys_size: reader.u32()?,
            icon1_pos: reader.u32()?,
            icon1_size: reader.u32()?,
            icon2_pos: reader.u32()?,
            icon2_size: reader.u32()?,
            icon3_pos: reader.u32()?,
            icon3_size: reader.u32()?,
            number_of_files: reader.u32()?,
        })
    }
}

#[derive(Debug, Clone, PartialEq, Eq)]
pub enum PsvContent {
    Ps2 {
        header: PsvPs2Header,
        archive: SaveArchive,
    },
    Ps1(Ps1Save),
}

/// PS3 export of a PS1 or PS2 save.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct PSV {
    pub signature: [u8; SIGNATURE_SIZE],
    pub content: PsvContent,
}

impl PSV {
    pub fn probe(data: &[u8]) -> bool {
        data.len() >= HEADER_SIZE
            && &data[..4] == PSV_MAGIC
            && matches!(data[TYPE_OFFSET], TYPE_PS1 | TYPE_PS2)
    }

    pub fn new(data: &[u8]) -> Result<Self> {
        if data.len() < HEADER_SIZE || &data[..4] != PSV_MAGIC {
            return Err(Error::FormatMismatch("PSV"));
        }

        let mut signature = [0u8; SIGNATURE_SIZE];
        signature.copy_from_slice(&data[SIGNATURE_OFFSET..SIGNATURE_OFFSET + SIGNATURE_SIZE]);

        let content = match data[TYPE_OFFSET] {
            TYPE_PS2 => parse_ps2(data)?,
            TYPE_PS1 => parse_ps1(data)?,
            other => {
                return Err(Error::UnsupportedVariant(format!(
                    "PSV save type {other:#04x}"
                )))
            }
        };

        Ok(Self { signature, content })
    }
}

fn parse_ps2(data: &[u8]) -> Result<PsvContent> {
    let mut reader = ByteReader::at(data, HEADER_SIZE)?;
    let header = PsvPs2Header::read(&mut reader)?;

    let created = McDateTime::read(&mut reader)?;
    let modified = McDateTime::read(&mut reader)?;
    let children = reader.u32()?;
    let attribute = reader.u32()?;
    let name = EntryName(reader.array()?);
    debug!("PSV directory {} with {} entries", name, children);

    let directory = DirectoryEntry {
        mode: attribute as u16,
        length: children,
        created,
        modified,
        name,
        ..Default::default()
    };
    let mut archive = SaveArchive::new(directory);

    // File infos are sequential, the data they point at is not.
    for _ in 0..children.saturating_sub(2) {
        let created = McDateTime::read(&mut reader)?;
        let modified = McDateTime::read(&mut reader)?;
        let size = reader.u32()?;
        let attribute = reader.u32()?;
        let name = EntryName(reader.array()?);
        let position = reader.u32()?;

        let contents = ByteReader::at(data, position as usize)
            .and_then(|mut at| at.take(size as usize))
            .map_err(|_| {
                Error::truncated(format!(
                    "PSV file {name} ({size} bytes at {position:#x}) is past the end"
                ))
            })?;

        archive.files.push(SaveFile {
            entry: DirectoryEntry {
                mode: attribute as u16,
                length: size,
                created,
                modified,
                name,
                ..Default::default()
            },
            data: contents.to_vec(),
        });
    }

    Ok(PsvContent::Ps2 { header, archive })
}

fn parse_ps1(data: &[u8]) -> Result<PsvContent> {
    if data.len() < PSV_PS1_DATA_OFFSET {
        return Err(Error::truncated("PS1 PSV shorter than its header"));
    }
    let name = &data[PS1_PROD_CODE_OFFSET..PS1_PROD_CODE_OFFSET + PS1_NAME_SIZE];
    Ok(PsvContent::Ps1(Ps1Save::from_parts(
        name,
        &data[PSV_PS1_DATA_OFFSET..],
    )))
}
