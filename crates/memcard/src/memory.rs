use indexmap::IndexMap;
use ps2_filetypes::{DirectoryEntry, McDateTime};
use tracing::trace;

use crate::{copy_entry_info, CardKind, CardPath, Error, MemcardIo, Result};

#[derive(Debug, Clone)]
struct Leaf {
    entry: DirectoryEntry,
    data: Vec<u8>,
}

impl Leaf {
    fn empty(name: &str) -> Self {
        Self {
            entry: DirectoryEntry::file(name, 0, McDateTime::now()),
            data: Vec::new(),
        }
    }
}

#[derive(Debug, Clone)]
enum Node {
    Dir {
        entry: DirectoryEntry,
        files: IndexMap<String, Leaf>,
    },
    File(Leaf),
}

/// A card held entirely in memory. Entries are listed in creation order,
/// like a freshly formatted card.
#[derive(Debug, Clone)]
pub struct MemoryCard {
    kind: CardKind,
    root: IndexMap<String, Node>,
}

impl MemoryCard {
    pub fn new(kind: CardKind) -> Self {
        Self {
            kind,
            root: IndexMap::new(),
        }
    }

    fn dir_files(&self, dir: &str) -> Result<&IndexMap<String, Leaf>> {
        match self.root.get(dir) {
            Some(Node::Dir { files, .. }) => Ok(files),
            Some(Node::File(_)) => Err(Error::NotDirectory(dir.to_string())),
            None => Err(Error::NotFound(dir.to_string())),
        }
    }

    fn dir_files_mut(&mut self, dir: &str) -> Result<&mut IndexMap<String, Leaf>> {
        match self.root.get_mut(dir) {
            Some(Node::Dir { files, .. }) => Ok(files),
            Some(Node::File(_)) => Err(Error::NotDirectory(dir.to_string())),
            None => Err(Error::NotFound(dir.to_string())),
        }
    }
}

fn dir_entry(entry: &DirectoryEntry, files: &IndexMap<String, Leaf>) -> DirectoryEntry {
    DirectoryEntry {
        length: files.len() as u32 + 2,
        ..entry.clone()
    }
}

impl MemcardIo for MemoryCard {
    fn kind(&self) -> CardKind {
        self.kind
    }

    fn list_saves(&self) -> Result<Vec<DirectoryEntry>> {
        Ok(self
            .root
            .values()
            .map(|node| match node {
                Node::Dir { entry, files } => dir_entry(entry, files),
                Node::File(leaf) => leaf.entry.clone(),
            })
            .collect())
    }

    fn read_dir(&self, dir: &str) -> Result<Vec<DirectoryEntry>> {
        let CardPath::Root(dir) = CardPath::parse(dir)? else {
            return Err(Error::NotDirectory(dir.to_string()));
        };
        Ok(self.dir_files(dir)?.values().map(|leaf| leaf.entry.clone()).collect())
    }

    fn stat(&self, path: &str) -> Result<DirectoryEntry> {
        let not_found = || Error::NotFound(path.to_string());
        match CardPath::parse(path)? {
            CardPath::Root(name) => match self.root.get(name).ok_or_else(not_found)? {
                Node::Dir { entry, files } => Ok(dir_entry(entry, files)),
                Node::File(leaf) => Ok(leaf.entry.clone()),
            },
            CardPath::Child(dir, name) => self
                .dir_files(dir)?
                .get(name)
                .map(|leaf| leaf.entry.clone())
                .ok_or_else(not_found),
        }
    }

    fn read_file(&self, path: &str) -> Result<Vec<u8>> {
        let not_found = || Error::NotFound(path.to_string());
        match CardPath::parse(path)? {
            CardPath::Root(name) => match self.root.get(name).ok_or_else(not_found)? {
                Node::File(leaf) => Ok(leaf.data.clone()),
                Node::Dir { .. } => Err(Error::IsDirectory(path.to_string())),
            },
            CardPath::Child(dir, name) => self
                .dir_files(dir)?
                .get(name)
                .map(|leaf| leaf.data.clone())
                .ok_or_else(not_found),
        }
    }

    fn write_file(&mut self, path: &str, data: &[u8]) -> Result<()> {
        let card_path = CardPath::parse(path)?;
        let (slot, name) = match card_path {
            CardPath::Root(name) => {
                if let Some(Node::Dir { .. }) = self.root.get(name) {
                    return Err(Error::IsDirectory(path.to_string()));
                }
                let node = self
                    .root
                    .entry(name.to_string())
                    .or_insert_with(|| Node::File(Leaf::empty(name)));
                let Node::File(leaf) = node else {
                    return Err(Error::IsDirectory(path.to_string()));
                };
                (leaf, name)
            }
            CardPath::Child(dir, name) => {
                let leaf = self
                    .dir_files_mut(dir)?
                    .entry(name.to_string())
                    .or_insert_with(|| Leaf::empty(name));
                (leaf, name)
            }
        };
        slot.data = data.to_vec();
        slot.entry.length = data.len() as u32;
        trace!("wrote {} bytes to {name}", data.len());
        Ok(())
    }

    fn create_dir(&mut self, dir: &str) -> Result<()> {
        let CardPath::Root(name) = CardPath::parse(dir)? else {
            return Err(Error::InvalidPath(dir.to_string()));
        };
        match self.root.get(name) {
            Some(Node::Dir { .. }) => Ok(()),
            Some(Node::File(_)) => Err(Error::NotDirectory(dir.to_string())),
            None => {
                self.root.insert(
                    name.to_string(),
                    Node::Dir {
                        entry: DirectoryEntry::directory(name, McDateTime::now()),
                        files: IndexMap::new(),
                    },
                );
                Ok(())
            }
        }
    }

    fn set_entry_info(&mut self, path: &str, info: &DirectoryEntry) -> Result<()> {
        let not_found = || Error::NotFound(path.to_string());
        let entry = match CardPath::parse(path)? {
            CardPath::Root(name) => match self.root.get_mut(name).ok_or_else(not_found)? {
                Node::Dir { entry, .. } => entry,
                Node::File(leaf) => &mut leaf.entry,
            },
            CardPath::Child(dir, name) => {
                &mut self
                    .dir_files_mut(dir)?
                    .get_mut(name)
                    .ok_or_else(not_found)?
                    .entry
            }
        };
        copy_entry_info(entry, info);
        Ok(())
    }
}
