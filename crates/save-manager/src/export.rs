use std::path::{Path, PathBuf};

use memcard::MemcardIo;
use ps2_filetypes::{
    mode, CBSWriter, IconSys, MCSWriter, PSUWriter, PSVWriter, Ps1Save, SaveArchive,
    ICON_SYS_FILE,
};
use tracing::{debug, info};

use crate::{Error, Progress, Result, Settings};

/// Reads a PS2 save directory back into memory. The dot entries are
/// synthesized from the directory entry.
pub fn read_archive(
    card: &dyn MemcardIo,
    dir: &str,
    progress: &mut dyn Progress,
) -> Result<SaveArchive> {
    let directory = card.stat(dir)?;
    if !directory.is_dir() {
        return Err(memcard::Error::NotDirectory(dir.to_string()).into());
    }
    let entries = card.read_dir(dir)?;

    let total = entries.len();
    let mut archive = SaveArchive::new(directory);
    progress.begin(dir, total);
    for (index, entry) in entries.into_iter().enumerate() {
        let name = entry.name.as_str().into_owned();
        progress.step(index + 1, total, &name);
        let data = card.read_file(&format!("{dir}/{name}"))?;
        debug!("{:8} bytes : {}", data.len(), name);
        archive.push_file(entry, data);
    }
    progress.end();
    Ok(archive)
}

pub(crate) fn is_ps1_save(card: &dyn MemcardIo, name: &str) -> Result<bool> {
    let entry = card.stat(name)?;
    Ok(entry.is_file() || entry.mode & mode::PS1 != 0)
}

/// Reads a PS1 save: a root file on a PS1 card, or the file of the same
/// name inside a PS1-mode directory on a PS2 card.
pub fn read_ps1_save(card: &dyn MemcardIo, name: &str) -> Result<Ps1Save> {
    let entry = card.stat(name)?;
    let data = if entry.is_file() {
        card.read_file(name)?
    } else {
        card.read_file(&format!("{name}/{name}"))?
    };
    Ok(Ps1Save::new(name, data))
}

fn write_output(dest: &Path, bytes: &[u8]) -> Result<()> {
    if let Some(parent) = dest.parent() {
        if !parent.as_os_str().is_empty() {
            std::fs::create_dir_all(parent)?;
        }
    }
    std::fs::write(dest, bytes)?;
    info!("wrote {} bytes to {}", bytes.len(), dest.display());
    Ok(())
}

pub fn export_psu(
    card: &dyn MemcardIo,
    dir: &str,
    dest: &Path,
    progress: &mut dyn Progress,
) -> Result<()> {
    let archive = read_archive(card, dir, progress)?;
    write_output(dest, &PSUWriter::new(archive).to_bytes())
}

fn psv_bytes(writer: &PSVWriter, settings: &Settings) -> Result<Vec<u8>> {
    if settings.resign_psv {
        Ok(writer.to_bytes()?)
    } else {
        Ok(writer.to_unsigned_bytes())
    }
}

/// Exports `dir` as a PSV into `out_dir` under the name a PS3 expects and
/// returns the written path. PS1 saves become PS1 PSVs.
pub fn export_psv(
    card: &dyn MemcardIo,
    dir: &str,
    out_dir: &Path,
    settings: &Settings,
    progress: &mut dyn Progress,
) -> Result<PathBuf> {
    let writer = if is_ps1_save(card, dir)? {
        PSVWriter::ps1(read_ps1_save(card, dir)?)
    } else {
        let archive = read_archive(card, dir, progress)?;
        if archive.file(ICON_SYS_FILE).is_none() {
            return Err(Error::MissingIconSys(dir.to_string()));
        }
        PSVWriter::ps2(archive)
    };

    let dest = out_dir.join(writer.file_name());
    write_output(&dest, &psv_bytes(&writer, settings)?)?;
    Ok(dest)
}

/// CBS title: the `icon.sys` title, else the configured fallback, else the
/// directory name.
pub fn cbs_title(archive: &SaveArchive, settings: &Settings) -> String {
    archive
        .file(ICON_SYS_FILE)
        .and_then(|file| IconSys::new(&file.data).ok())
        .map(|icon_sys| icon_sys.title())
        .filter(|title| !title.is_empty())
        .or_else(|| settings.cbs_title.clone())
        .unwrap_or_else(|| archive.name())
}

pub fn export_cbs(
    card: &dyn MemcardIo,
    dir: &str,
    dest: &Path,
    settings: &Settings,
    progress: &mut dyn Progress,
) -> Result<()> {
    let archive = read_archive(card, dir, progress)?;
    let title = cbs_title(&archive, settings);
    write_output(dest, &CBSWriter::new(archive, title).to_bytes()?)
}

pub fn export_mcs(card: &dyn MemcardIo, name: &str, dest: &Path) -> Result<()> {
    let save = read_ps1_save(card, name)?;
    write_output(dest, &MCSWriter::new(save).to_bytes())
}
