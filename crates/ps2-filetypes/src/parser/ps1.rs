use crate::{fixed_str, Error, Result};

pub const PS1_NAME_SIZE: usize = 20;
pub const PS1_SAVE_MAGIC: &[u8; 2] = b"SC";

pub const MCS_HEADER_SIZE: usize = 0x80;
const MCS_NAME_OFFSET: usize = 0x0A;
pub const PSX_HEADER_SIZE: usize = 0x36;

/// A PS1 save: the raw block image that starts with `SC` and the product
/// code the card uses as its file name.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Ps1Save {
    pub name: [u8; PS1_NAME_SIZE],
    pub data: Vec<u8>,
}

impl Ps1Save {
    pub fn new(name: &str, data: Vec<u8>) -> Self {
        let mut raw = [0u8; PS1_NAME_SIZE];
        let len = name.len().min(PS1_NAME_SIZE - 1);
        raw[..len].copy_from_slice(&name.as_bytes()[..len]);
        Self { name: raw, data }
    }

    pub(crate) fn from_parts(name: &[u8], data: &[u8]) -> Self {
        let mut raw = [0u8; PS1_NAME_SIZE];
        raw.copy_from_slice(&name[..PS1_NAME_SIZE]);
        Self {
            name: raw,
            data: data.to_vec(),
        }
    }

    pub fn name(&self) -> String {
        fixed_str(&self.name)
    }
}

/// Single-save `.mcs` export (memory card block with a 128-byte header).
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct MCS {
    pub save: Ps1Save,
}

impl MCS {
    pub fn probe(data: &[u8]) -> bool {
        data.len() >= MCS_HEADER_SIZE + 2
            && data[0] == b'Q'
            && &data[MCS_HEADER_SIZE..MCS_HEADER_SIZE + 2] == PS1_SAVE_MAGIC
    }

    pub fn new(data: &[u8]) -> Result<Self> {
        if !Self::probe(data) {
            return Err(Error::FormatMismatch("MCS"));
        }
        Ok(Self {
            save: Ps1Save::from_parts(&data[MCS_NAME_OFFSET..], &data[MCS_HEADER_SIZE..]),
        })
    }
}

/// `.psx` (Action Replay / X-Port) single save.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct PSX {
    pub save: Ps1Save,
}

impl PSX {
    pub fn probe(data: &[u8]) -> bool {
        data.len() >= PSX_HEADER_SIZE + 2
            && &data[PSX_HEADER_SIZE..PSX_HEADER_SIZE + 2] == PS1_SAVE_MAGIC
    }

    pub fn new(data: &[u8]) -> Result<Self> {
        if !Self::probe(data) {
            return Err(Error::FormatMismatch("PSX"));
        }
        Ok(Self {
            save: Ps1Save::from_parts(data, &data[PSX_HEADER_SIZE..]),
        })
    }
}
