use std::fmt;
use std::path::Path;

use ps2_filetypes::{CBS, MAX, MCS, PSU, PSV, PSX, XPS};

use crate::Result;

#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum SaveFormat {
    Psv,
    Max,
    Cbs,
    Xps,
    Mcs,
    Psx,
    Psu,
}

impl SaveFormat {
    /// Probe order. PSU has no magic and goes last.
    pub const ALL: [SaveFormat; 7] = [
        SaveFormat::Psv,
        SaveFormat::Max,
        SaveFormat::Cbs,
        SaveFormat::Xps,
        SaveFormat::Mcs,
        SaveFormat::Psx,
        SaveFormat::Psu,
    ];

    pub fn extension(self) -> &'static str {
        match self {
            SaveFormat::Psv => "psv",
            SaveFormat::Max => "max",
            SaveFormat::Cbs => "cbs",
            SaveFormat::Xps => "xps",
            SaveFormat::Mcs => "mcs",
            SaveFormat::Psx => "psx",
            SaveFormat::Psu => "psu",
        }
    }

    pub fn can_export(self) -> bool {
        matches!(
            self,
            SaveFormat::Psv | SaveFormat::Cbs | SaveFormat::Mcs | SaveFormat::Psu
        )
    }

    fn matches(self, data: &[u8], path: &Path, psu_min_size: usize) -> bool {
        match self {
            SaveFormat::Psv => PSV::probe(data),
            SaveFormat::Max => MAX::probe(data),
            SaveFormat::Cbs => CBS::probe(data),
            SaveFormat::Xps => XPS::probe(data),
            SaveFormat::Mcs => MCS::probe(data),
            SaveFormat::Psx => PSX::probe(data),
            SaveFormat::Psu => {
                has_extension(path, "psu") && data.len() >= psu_min_size && PSU::probe(data)
            }
        }
    }
}

impl fmt::Display for SaveFormat {
    fn fmt(&self, f: &mut fmt::Formatter) -> fmt::Result {
        write!(f, "{}", self.extension().to_ascii_uppercase())
    }
}

fn has_extension(path: &Path, extension: &str) -> bool {
    path.extension()
        .and_then(|ext| ext.to_str())
        .map(|ext| ext.eq_ignore_ascii_case(extension))
        .unwrap_or(false)
}

/// Detects the container in `data`. `path` only matters for PSU, which is
/// recognised by its extension and a plausible root entry.
pub fn probe_bytes(data: &[u8], path: &Path, psu_min_size: usize) -> Option<SaveFormat> {
    SaveFormat::ALL
        .into_iter()
        .find(|format| format.matches(data, path, psu_min_size))
}

pub fn probe(path: &Path, psu_min_size: usize) -> Result<Option<SaveFormat>> {
    let data = std::fs::read(path)?;
    Ok(probe_bytes(&data, path, psu_min_size))
}
