use std::fs;
use std::path::{Path, PathBuf};
use std::time::{SystemTime, UNIX_EPOCH};

use chrono::{DateTime, Local};
use indexmap::IndexMap;
use ps2_filetypes::{DirectoryEntry, McDateTime};
use serde::{Deserialize, Serialize};
use tracing::debug;

use crate::{copy_entry_info, CardKind, CardPath, Error, MemcardIo, Result};

/// Per-directory file holding the card attributes a host filesystem has no
/// place for.
pub const SIDECAR_FILE: &str = ".entries.json";

/// Source of `(created, modified)` times for host files the sidecar has no
/// record of. `created` is `None` where the filesystem keeps no birth time.
pub trait HostTimes {
    fn times(&self, path: &Path) -> std::io::Result<(Option<SystemTime>, SystemTime)>;
}

#[derive(Default)]
pub struct FsTimes;

impl HostTimes for FsTimes {
    fn times(&self, path: &Path) -> std::io::Result<(Option<SystemTime>, SystemTime)> {
        let metadata = fs::metadata(path)?;
        Ok((metadata.created().ok(), metadata.modified()?))
    }
}

/// Host time as the local wall-clock time a card entry stores.
fn card_time(time: SystemTime) -> Option<McDateTime> {
    let since_epoch = time.duration_since(UNIX_EPOCH).ok()?;
    let utc = DateTime::from_timestamp(since_epoch.as_secs() as i64, since_epoch.subsec_nanos())?;
    Some(utc.with_timezone(&Local).naive_local().into())
}

#[derive(Debug, Default, Serialize, Deserialize)]
struct Sidecar {
    #[serde(default, skip_serializing_if = "Option::is_none")]
    directory: Option<DirectoryEntry>,
    #[serde(default)]
    files: IndexMap<String, DirectoryEntry>,
}

/// A card mapped onto a host directory. Saves are subdirectories (or plain
/// files for PS1 root saves); modes, card timestamps and the opaque entry
/// fields live in a JSON sidecar next to the files. Entries without a
/// sidecar record fall back to host file times.
pub struct HostCard<T: HostTimes = FsTimes> {
    root: PathBuf,
    kind: CardKind,
    clock: T,
}

impl HostCard {
    pub fn new(root: impl Into<PathBuf>, kind: CardKind) -> Self {
        Self::with_host_times(root, kind, FsTimes)
    }
}

impl<T: HostTimes> HostCard<T> {
    pub fn with_host_times(root: impl Into<PathBuf>, kind: CardKind, clock: T) -> Self {
        Self {
            root: root.into(),
            kind,
            clock,
        }
    }

    pub fn root(&self) -> &Path {
        &self.root
    }

    fn host_path(&self, path: CardPath) -> PathBuf {
        match path {
            CardPath::Root(name) => self.root.join(name),
            CardPath::Child(dir, name) => self.root.join(dir).join(name),
        }
    }

    fn sidecar_path(&self, dir: Option<&str>) -> PathBuf {
        match dir {
            Some(dir) => self.root.join(dir).join(SIDECAR_FILE),
            None => self.root.join(SIDECAR_FILE),
        }
    }

    fn load_sidecar(&self, dir: Option<&str>) -> Result<Sidecar> {
        let path = self.sidecar_path(dir);
        if !path.is_file() {
            return Ok(Sidecar::default());
        }
        let text = fs::read_to_string(&path)?;
        serde_json::from_str(&text).map_err(|source| Error::Sidecar { path, source })
    }

    fn save_sidecar(&self, dir: Option<&str>, sidecar: &Sidecar) -> Result<()> {
        let path = self.sidecar_path(dir);
        let text = serde_json::to_string_pretty(sidecar)
            .map_err(|source| Error::Sidecar { path: path.clone(), source })?;
        fs::write(&path, text)?;
        Ok(())
    }

    fn host_times(&self, path: &Path) -> (McDateTime, McDateTime) {
        let Ok((created, modified)) = self.clock.times(path) else {
            return Default::default();
        };
        let modified = card_time(modified).unwrap_or_default();
        let created = created.and_then(card_time).unwrap_or(modified);
        (created, modified)
    }

    fn file_entry(&self, sidecar: &Sidecar, name: &str, host: &Path) -> Result<DirectoryEntry> {
        let length = fs::metadata(host)?.len() as u32;
        let mut entry = match sidecar.files.get(name) {
            Some(entry) => entry.clone(),
            None => {
                let (created, modified) = self.host_times(host);
                let mut entry = DirectoryEntry::file(name, 0, created);
                entry.modified = modified;
                entry
            }
        };
        entry.length = length;
        Ok(entry)
    }

    fn dir_entry(&self, name: &str) -> Result<DirectoryEntry> {
        let sidecar = self.load_sidecar(Some(name))?;
        let mut entry = match sidecar.directory.clone() {
            Some(entry) => entry,
            None => {
                let (created, modified) = self.host_times(&self.root.join(name));
                let mut entry = DirectoryEntry::directory(name, created);
                entry.modified = modified;
                entry
            }
        };
        entry.length = self.file_names(&self.root.join(name), &sidecar)?.len() as u32 + 2;
        Ok(entry)
    }

    /// Files in `dir`: sidecar order first, then unrecorded files by name.
    fn file_names(&self, dir: &Path, sidecar: &Sidecar) -> Result<Vec<String>> {
        let mut on_disk = Vec::new();
        for entry in fs::read_dir(dir)? {
            let entry = entry?;
            if !entry.file_type()?.is_file() {
                continue;
            }
            if let Some(name) = entry.file_name().to_str() {
                if name != SIDECAR_FILE {
                    on_disk.push(name.to_string());
                }
            }
        }

        let mut names: Vec<String> = sidecar
            .files
            .keys()
            .filter(|name| on_disk.contains(name))
            .cloned()
            .collect();
        let mut rest: Vec<String> = on_disk
            .into_iter()
            .filter(|name| !sidecar.files.contains_key(name))
            .collect();
        rest.sort_by_key(|name| name.to_ascii_lowercase());
        names.extend(rest);
        Ok(names)
    }
}

impl<T: HostTimes> MemcardIo for HostCard<T> {
    fn kind(&self) -> CardKind {
        self.kind
    }

    fn list_saves(&self) -> Result<Vec<DirectoryEntry>> {
        let sidecar = self.load_sidecar(None)?;
        let mut names = Vec::new();
        for entry in fs::read_dir(&self.root)? {
            let entry = entry?;
            if let Some(name) = entry.file_name().to_str() {
                if name != SIDECAR_FILE && CardPath::parse(name).is_ok() {
                    names.push((name.to_string(), entry.file_type()?.is_dir()));
                }
            }
        }
        names.sort_by_key(|(name, _)| name.to_ascii_lowercase());

        names
            .into_iter()
            .map(|(name, is_dir)| {
                if is_dir {
                    self.dir_entry(&name)
                } else {
                    self.file_entry(&sidecar, &name, &self.root.join(&name))
                }
            })
            .collect()
    }

    fn read_dir(&self, dir: &str) -> Result<Vec<DirectoryEntry>> {
        let CardPath::Root(dir) = CardPath::parse(dir)? else {
            return Err(Error::NotDirectory(dir.to_string()));
        };
        let host = self.root.join(dir);
        if host.is_file() {
            return Err(Error::NotDirectory(dir.to_string()));
        }
        if !host.is_dir() {
            return Err(Error::NotFound(dir.to_string()));
        }

        let sidecar = self.load_sidecar(Some(dir))?;
        self.file_names(&host, &sidecar)?
            .iter()
            .map(|name| self.file_entry(&sidecar, name, &host.join(name)))
            .collect()
    }

    fn stat(&self, path: &str) -> Result<DirectoryEntry> {
        let card_path = CardPath::parse(path)?;
        let host = self.host_path(card_path);
        match card_path {
            CardPath::Root(name) if host.is_dir() => self.dir_entry(name),
            CardPath::Root(name) if host.is_file() => {
                self.file_entry(&self.load_sidecar(None)?, name, &host)
            }
            CardPath::Child(dir, name) if host.is_file() && name != SIDECAR_FILE => {
                self.file_entry(&self.load_sidecar(Some(dir))?, name, &host)
            }
            _ => Err(Error::NotFound(path.to_string())),
        }
    }

    fn read_file(&self, path: &str) -> Result<Vec<u8>> {
        let card_path = CardPath::parse(path)?;
        let host = self.host_path(card_path);
        if host.is_dir() {
            return Err(Error::IsDirectory(path.to_string()));
        }
        if !host.is_file() || card_path.name() == SIDECAR_FILE {
            return Err(Error::NotFound(path.to_string()));
        }
        Ok(fs::read(host)?)
    }

    fn write_file(&mut self, path: &str, data: &[u8]) -> Result<()> {
        let card_path = CardPath::parse(path)?;
        let (dir, name) = match card_path {
            CardPath::Root(name) => (None, name),
            CardPath::Child(dir, name) => {
                let parent = self.root.join(dir);
                if parent.is_file() {
                    return Err(Error::NotDirectory(dir.to_string()));
                }
                if !parent.is_dir() {
                    return Err(Error::NotFound(dir.to_string()));
                }
                (Some(dir), name)
            }
        };
        if name == SIDECAR_FILE {
            return Err(Error::InvalidPath(path.to_string()));
        }
        let host = self.host_path(card_path);
        if host.is_dir() {
            return Err(Error::IsDirectory(path.to_string()));
        }

        fs::write(&host, data)?;
        let mut sidecar = self.load_sidecar(dir)?;
        if !sidecar.files.contains_key(name) {
            sidecar.files.insert(
                name.to_string(),
                DirectoryEntry::file(name, data.len() as u32, McDateTime::now()),
            );
            self.save_sidecar(dir, &sidecar)?;
        }
        debug!("{} bytes -> {}", data.len(), host.display());
        Ok(())
    }

    fn create_dir(&mut self, dir: &str) -> Result<()> {
        let CardPath::Root(name) = CardPath::parse(dir)? else {
            return Err(Error::InvalidPath(dir.to_string()));
        };
        let host = self.root.join(name);
        if host.is_dir() {
            return Ok(());
        }
        if host.exists() {
            return Err(Error::NotDirectory(dir.to_string()));
        }

        fs::create_dir_all(&host)?;
        let sidecar = Sidecar {
            directory: Some(DirectoryEntry::directory(name, McDateTime::now())),
            files: IndexMap::new(),
        };
        self.save_sidecar(Some(name), &sidecar)
    }

    fn set_entry_info(&mut self, path: &str, info: &DirectoryEntry) -> Result<()> {
        let mut entry = self.stat(path)?;
        copy_entry_info(&mut entry, info);

        match CardPath::parse(path)? {
            CardPath::Root(name) if self.root.join(name).is_dir() => {
                let mut sidecar = self.load_sidecar(Some(name))?;
                sidecar.directory = Some(entry);
                self.save_sidecar(Some(name), &sidecar)
            }
            CardPath::Root(name) => {
                let mut sidecar = self.load_sidecar(None)?;
                sidecar.files.insert(name.to_string(), entry);
                self.save_sidecar(None, &sidecar)
            }
            CardPath::Child(dir, name) => {
                let mut sidecar = self.load_sidecar(Some(dir))?;
                sidecar.files.insert(name.to_string(), entry);
                self.save_sidecar(Some(dir), &sidecar)
            }
        }
    }
}
