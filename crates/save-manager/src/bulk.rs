use std::path::{Path, PathBuf};

use chrono::Utc;
use memcard::MemcardIo;
use tracing::{info, warn};

use crate::export::{
    export_cbs, export_mcs, export_psu, export_psv, is_ps1_save, read_archive, read_ps1_save,
};
use crate::import::{import_any, write_archive, write_ps1_save, ImportReport};
use crate::naming::{export_file_name, title_id};
use crate::{Error, NoProgress, Progress, Result, SaveFormat, Settings};

/// Done and failed counts of a bulk operation.
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct BulkReport {
    pub done: usize,
    pub errors: usize,
}

impl BulkReport {
    fn record<T>(&mut self, what: &str, result: Result<T>) {
        match result {
            Ok(_) => self.done += 1,
            Err(err) => {
                warn!("{what}: {err}");
                self.errors += 1;
            }
        }
    }

    pub fn total(&self) -> usize {
        self.done + self.errors
    }
}

/// Imports every file, continuing past failures.
pub fn bulk_import(
    paths: &[PathBuf],
    card: &mut dyn MemcardIo,
    settings: &Settings,
    progress: &mut dyn Progress,
) -> BulkReport {
    let mut report = BulkReport::default();
    progress.begin("Importing saves", paths.len());
    for (index, path) in paths.iter().enumerate() {
        let name = path.display().to_string();
        progress.step(index + 1, paths.len(), &name);
        let result = import_any(path, card, settings.psu_min_size, &mut NoProgress);
        report.record(&name, result);
    }
    progress.end();
    info!("{}/{} saves imported", report.done, report.total());
    report
}

/// Exports each save to `out_dir`, or to the configured output directory
/// when none is given. PS1 saves always go out as MCS. PSV files are named
/// the way a PS3 expects; the other formats use [`export_file_name`] with the
/// current UTC time unless the settings pin one.
pub fn bulk_export(
    card: &dyn MemcardIo,
    dirs: &[String],
    format: SaveFormat,
    out_dir: Option<&Path>,
    settings: &Settings,
    progress: &mut dyn Progress,
) -> Result<BulkReport> {
    if !format.can_export() {
        return Err(Error::ExportUnsupported(format));
    }
    let out_dir = out_dir
        .or(settings.output_dir.as_deref())
        .ok_or_else(|| Error::ConfigError("no output directory for export".to_string()))?;
    std::fs::create_dir_all(out_dir)?;
    let timestamp = settings
        .timestamp
        .unwrap_or_else(|| Utc::now().naive_utc());

    let mut report = BulkReport::default();
    progress.begin("Exporting saves", dirs.len());
    for (index, dir) in dirs.iter().enumerate() {
        progress.step(index + 1, dirs.len(), dir);
        let result = is_ps1_save(card, dir).and_then(|ps1| {
            let format = if ps1 { SaveFormat::Mcs } else { format };
            let dest = out_dir.join(export_file_name(&title_id(dir), format, timestamp));
            match format {
                SaveFormat::Psv => {
                    export_psv(card, dir, out_dir, settings, &mut NoProgress).map(drop)
                }
                SaveFormat::Psu => export_psu(card, dir, &dest, &mut NoProgress),
                SaveFormat::Cbs => export_cbs(card, dir, &dest, settings, &mut NoProgress),
                SaveFormat::Mcs => export_mcs(card, dir, &dest),
                other => Err(Error::ExportUnsupported(other)),
            }
        });
        report.record(dir, result);
    }
    progress.end();
    info!("{}/{} saves exported to {}", report.done, report.total(), out_dir.display());
    Ok(report)
}

/// Copies one save from `src` to `dst`, e.g. from a virtual card to a real
/// one. PS1 saves are re-homed according to the destination card kind.
pub fn copy_save(
    src: &dyn MemcardIo,
    dir: &str,
    dst: &mut dyn MemcardIo,
    progress: &mut dyn Progress,
) -> Result<ImportReport> {
    if is_ps1_save(src, dir)? {
        let save = read_ps1_save(src, dir)?;
        return write_ps1_save(dst, &save, progress);
    }
    let archive = read_archive(src, dir, &mut NoProgress)?;
    write_archive(dst, &archive, progress)
}
