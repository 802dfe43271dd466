use crate::{fixed_str, sjis, Error, Result};

pub const ICON_SYS_MAGIC: &[u8; 4] = b"PS2D";
pub const ICON_SYS_FILE: &str = "icon.sys";

const TITLE_OFFSET: usize = 0xC0;
const TITLE_SIZE: usize = 68;
const ICON_NAME_SIZE: usize = 64;
const ICON_VIEW_OFFSET: usize = 0x104;
const ICON_COPY_OFFSET: usize = 0x144;
const ICON_DELETE_OFFSET: usize = 0x184;
const ICON_SYS_MIN_SIZE: usize = ICON_DELETE_OFFSET + ICON_NAME_SIZE;

/// The parts of `icon.sys` the converters need: the save title and the
/// names of the three icon models.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct IconSys {
    pub line_break: u16,
    pub title_raw: Vec<u8>,
    pub icon_file: String,
    pub icon_copy_file: String,
    pub icon_delete_file: String,
}

impl IconSys {
    pub fn new(data: &[u8]) -> Result<Self> {
        if data.len() < 4 || &data[..4] != ICON_SYS_MAGIC {
            return Err(Error::FormatMismatch("icon.sys"));
        }
        if data.len() < ICON_SYS_MIN_SIZE {
            return Err(Error::truncated(format!(
                "icon.sys is {} bytes, need {ICON_SYS_MIN_SIZE}",
                data.len()
            )));
        }

        let field = |offset: usize| fixed_str(&data[offset..offset + ICON_NAME_SIZE]);
        Ok(Self {
            line_break: u16::from_le_bytes([data[6], data[7]]),
            title_raw: data[TITLE_OFFSET..TITLE_OFFSET + TITLE_SIZE].to_vec(),
            icon_file: field(ICON_VIEW_OFFSET),
            icon_copy_file: field(ICON_COPY_OFFSET),
            icon_delete_file: field(ICON_DELETE_OFFSET),
        })
    }

    /// Title folded to ASCII. The two lines are joined with a space.
    pub fn title(&self) -> String {
        let split = usize::from(self.line_break).min(self.title_raw.len());
        let first = sjis::to_ascii(&self.title_raw[..split]);
        let second = sjis::to_ascii(&self.title_raw[split..]);
        match (first.trim().is_empty(), second.trim().is_empty()) {
            (_, true) => first.trim().to_string(),
            (true, false) => second.trim().to_string(),
            (false, false) => format!("{} {}", first.trim(), second.trim()),
        }
    }
}

#[cfg(test)]
pub(crate) fn sample_icon_sys(title: &str, view: &str, copy: &str, delete: &str) -> Vec<u8> {
    let mut data = vec![0u8; 964];
    data[..4].copy_from_slice(ICON_SYS_MAGIC);
    data[TITLE_OFFSET..TITLE_OFFSET + title.len()].copy_from_slice(title.as_bytes());
    for (offset, name) in [
        (ICON_VIEW_OFFSET, view),
        (ICON_COPY_OFFSET, copy),
        (ICON_DELETE_OFFSET, delete),
    ] {
        data[offset..offset + name.len()].copy_from_slice(name.as_bytes());
    }
    data
}
