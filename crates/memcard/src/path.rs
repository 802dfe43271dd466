use ps2_filetypes::NAME_SIZE;

use crate::{Error, Result};

/// A card path is one or two levels deep: a root entry (`BASLUS-21050`) or
/// a file inside a save directory (`BASLUS-21050/icon.sys`).
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum CardPath<'a> {
    Root(&'a str),
    Child(&'a str, &'a str),
}

impl<'a> CardPath<'a> {
    pub fn parse(path: &'a str) -> Result<Self> {
        let trimmed = path.trim_matches('/');
        let mut parts = trimmed.split('/');
        let first = parts.next().unwrap_or_default();
        let parsed = match (parts.next(), parts.next()) {
            (None, _) => Self::Root(first),
            (Some(second), None) => Self::Child(first, second),
            _ => return Err(Error::InvalidPath(path.to_string())),
        };

        let valid = |name: &str| {
            !name.is_empty()
                && name != "."
                && name != ".."
                && name.len() < NAME_SIZE
                && !name.contains(['\\', '\0'])
        };
        let ok = match parsed {
            Self::Root(name) => valid(name),
            Self::Child(dir, name) => valid(dir) && valid(name),
        };
        if !ok {
            return Err(Error::InvalidPath(path.to_string()));
        }
        Ok(parsed)
    }

    pub fn name(&self) -> &'a str {
        match self {
            Self::Root(name) | Self::Child(_, name) => name,
        }
    }
}
