use std::path::Path;

use memcard::{CardKind, MemcardIo};
use ps2_filetypes::{
    DirectoryEntry, McDateTime, Ps1Save, PsvContent, SaveArchive, CBS, MAX, MCS, PSU, PSV, PSX,
    PS1_DIR_ID, XPS,
};
use tracing::{info, warn};

use crate::probe::probe_bytes;
use crate::{Error, Progress, Result, SaveFormat};

/// Outcome of importing one save. Per-file write failures do not abort the
/// import; they are counted in `failed`.
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct ImportReport {
    pub dir_name: String,
    pub written: usize,
    pub failed: usize,
}

impl ImportReport {
    pub fn is_complete(&self) -> bool {
        self.failed == 0
    }
}

/// Writes a decoded PS2 save to `card`. Only creating the save directory is
/// fatal; each file is written best-effort.
pub fn write_archive(
    card: &mut dyn MemcardIo,
    archive: &SaveArchive,
    progress: &mut dyn Progress,
) -> Result<ImportReport> {
    let dir = archive.name();
    if card.kind() != CardKind::Ps2 {
        return Err(Error::WrongCard(dir));
    }
    card.create_dir(&dir)?;

    let files: Vec<_> = archive
        .files
        .iter()
        .filter(|file| file.entry.is_file())
        .collect();
    let mut report = ImportReport {
        dir_name: dir.clone(),
        ..Default::default()
    };

    progress.begin(&dir, files.len());
    for (index, file) in files.iter().enumerate() {
        let name = file.entry.name.as_str();
        let path = format!("{dir}/{name}");
        progress.step(index + 1, files.len(), &name);
        info!("{:8} bytes : {}", file.data.len(), name);

        let written = card
            .write_file(&path, &file.data)
            .and_then(|()| card.set_entry_info(&path, &file.entry));
        match written {
            Ok(()) => report.written += 1,
            Err(err) => {
                warn!("failed to write {path}: {err}");
                progress.skipped(&path, "could not be written");
                report.failed += 1;
            }
        }
    }

    // Last, so the directory keeps the archive's timestamps.
    if let Err(err) = card.set_entry_info(&dir, &archive.directory) {
        warn!("failed to set attributes on {dir}: {err}");
    }
    progress.end();

    info!(
        "imported {dir}: {} written, {} failed",
        report.written, report.failed
    );
    Ok(report)
}

/// Writes a PS1 save. A PS1 card stores it as a root file; a PS2 card gets a
/// PS1-mode directory holding a file of the same name.
pub fn write_ps1_save(
    card: &mut dyn MemcardIo,
    save: &Ps1Save,
    progress: &mut dyn Progress,
) -> Result<ImportReport> {
    let name = save.name();
    progress.begin(&name, 1);
    progress.step(1, 1, &name);
    info!("{:8} bytes : {}", save.data.len(), name);

    match card.kind() {
        CardKind::Ps1 => card.write_file(&name, &save.data)?,
        CardKind::Ps2 => {
            card.create_dir(&name)?;
            card.write_file(&format!("{name}/{name}"), &save.data)?;
            let info = DirectoryEntry {
                mode: PS1_DIR_ID,
                ..DirectoryEntry::directory(&name, McDateTime::now())
            };
            card.set_entry_info(&name, &info)?;
        }
    }
    progress.end();

    Ok(ImportReport {
        dir_name: name,
        written: 1,
        failed: 0,
    })
}

pub fn import_psu(
    path: &Path,
    card: &mut dyn MemcardIo,
    progress: &mut dyn Progress,
) -> Result<ImportReport> {
    import_bytes(&std::fs::read(path)?, SaveFormat::Psu, card, progress)
}

pub fn import_psv(
    path: &Path,
    card: &mut dyn MemcardIo,
    progress: &mut dyn Progress,
) -> Result<ImportReport> {
    import_bytes(&std::fs::read(path)?, SaveFormat::Psv, card, progress)
}

pub fn import_max(
    path: &Path,
    card: &mut dyn MemcardIo,
    progress: &mut dyn Progress,
) -> Result<ImportReport> {
    import_bytes(&std::fs::read(path)?, SaveFormat::Max, card, progress)
}

pub fn import_cbs(
    path: &Path,
    card: &mut dyn MemcardIo,
    progress: &mut dyn Progress,
) -> Result<ImportReport> {
    import_bytes(&std::fs::read(path)?, SaveFormat::Cbs, card, progress)
}

pub fn import_xps(
    path: &Path,
    card: &mut dyn MemcardIo,
    progress: &mut dyn Progress,
) -> Result<ImportReport> {
    import_bytes(&std::fs::read(path)?, SaveFormat::Xps, card, progress)
}

pub fn import_mcs(
    path: &Path,
    card: &mut dyn MemcardIo,
    progress: &mut dyn Progress,
) -> Result<ImportReport> {
    import_bytes(&std::fs::read(path)?, SaveFormat::Mcs, card, progress)
}

pub fn import_psx(
    path: &Path,
    card: &mut dyn MemcardIo,
    progress: &mut dyn Progress,
) -> Result<ImportReport> {
    import_bytes(&std::fs::read(path)?, SaveFormat::Psx, card, progress)
}

/// Decodes `data` as `format` and writes the save to `card`.
pub fn import_bytes(
    data: &[u8],
    format: SaveFormat,
    card: &mut dyn MemcardIo,
    progress: &mut dyn Progress,
) -> Result<ImportReport> {
    match format {
        SaveFormat::Psu => write_archive(card, &PSU::new(data)?.archive, progress),
        SaveFormat::Psv => match PSV::new(data)?.content {
            PsvContent::Ps2 { archive, .. } => write_archive(card, &archive, progress),
            PsvContent::Ps1(save) => write_ps1_save(card, &save, progress),
        },
        SaveFormat::Max => write_archive(card, &MAX::new(data)?.archive, progress),
        SaveFormat::Cbs => write_archive(card, &CBS::new(data)?.archive, progress),
        SaveFormat::Xps => {
            let xps = XPS::new(data)?;
            info!("XPS title: {}", xps.title);
            write_archive(card, &xps.archive, progress)
        }
        SaveFormat::Mcs => write_ps1_save(card, &MCS::new(data)?.save, progress),
        SaveFormat::Psx => write_ps1_save(card, &PSX::new(data)?.save, progress),
    }
}

/// Probes `path` and imports it with the matching codec. The file is read
/// once.
pub fn import_any(
    path: &Path,
    card: &mut dyn MemcardIo,
    psu_min_size: usize,
    progress: &mut dyn Progress,
) -> Result<ImportReport> {
    let data = std::fs::read(path)?;
    let format =
        probe_bytes(&data, path, psu_min_size).ok_or_else(|| Error::UnknownFormat(path.into()))?;
    info!("{} is {format}", path.display());
    import_bytes(&data, format, card, progress)
}
