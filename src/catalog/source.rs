//! Table sources: where range-table entries come from.
//!
//! A [`TableSource`] only knows how to **list entry names** and **open an entry** for
//! reading. Filename parsing, filtering and loading live in [`Catalog`](super::Catalog),
//! so the same discovery rules apply to every source.
//!
//! Implementations
//! -----------------
//! * [`DirectorySource`] – a flat directory of CSV files on disk.
//! * [`MemorySource`] – named in-memory CSV texts, for tests and embedded tables.
use std::collections::BTreeMap;
use std::fs::{self, File};
use std::io::{self, BufReader, Cursor, Read};

use camino::{Utf8Path, Utf8PathBuf};
use tracing::trace;

use super::CatalogError;

/// Capability to enumerate and read range-table entries.
pub trait TableSource {
    /// Human-readable location, used in errors and listings.
    fn describe(&self) -> String;

    /// Names of every candidate entry (unparsed, unfiltered).
    fn list_entries(&self) -> Result<Vec<String>, CatalogError>;

    /// Open one entry by name.
    fn open_entry(&self, name: &str) -> io::Result<Box<dyn Read + '_>>;
}

/// A flat directory of range-table files.
///
/// Hidden entries (leading `.`), subdirectories and names that are not valid UTF-8 are
/// never listed. The directory is not traversed recursively.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct DirectorySource {
    root: Utf8PathBuf,
}

impl DirectorySource {
    pub fn new(root: impl Into<Utf8PathBuf>) -> Self {
        DirectorySource { root: root.into() }
    }

    pub fn root(&self) -> &Utf8Path {
        &self.root
    }

    /// Full path of an entry.
    pub fn path_of(&self, name: &str) -> Utf8PathBuf {
        self.root.join(name)
    }
}

impl TableSource for DirectorySource {
    fn describe(&self) -> String {
        self.root.to_string()
    }

    fn list_entries(&self) -> Result<Vec<String>, CatalogError> {
        if !self.root.is_dir() {
            return Err(CatalogError::NoDirectory(self.root.clone()));
        }

        let read_dir = fs::read_dir(&self.root).map_err(|source| CatalogError::Io {
            location: self.describe(),
            source,
        })?;

        let mut names = Vec::new();
        for entry in read_dir {
            let entry = entry.map_err(|source| CatalogError::Io {
                location: self.describe(),
                source,
            })?;

            let Ok(name) = entry.file_name().into_string() else {
                trace!("skipping non UTF-8 entry in {}", self.root);
                continue;
            };
            if name.starts_with('.') {
                continue;
            }
            if self.root.join(&name).is_dir() {
                continue;
            }
            names.push(name);
        }
        Ok(names)
    }

    fn open_entry(&self, name: &str) -> io::Result<Box<dyn Read + '_>> {
        let file = File::open(self.path_of(name))?;
        Ok(Box::new(BufReader::new(file)))
    }
}

/// Named CSV texts held in memory.
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct MemorySource {
    entries: BTreeMap<String, String>,
}

impl MemorySource {
    pub fn new() -> Self {
        Self::default()
    }

    /// Builder-style insertion of one entry.
    #[must_use]
    pub fn with_entry(mut self, name: impl Into<String>, content: impl Into<String>) -> Self {
        self.insert(name, content);
        self
    }

    pub fn insert(&mut self, name: impl Into<String>, content: impl Into<String>) {
        self.entries.insert(name.into(), content.into());
    }
}

impl TableSource for MemorySource {
    fn describe(&self) -> String {
        "<memory>".to_string()
    }

    fn list_entries(&self) -> Result<Vec<String>, CatalogError> {
        Ok(self.entries.keys().cloned().collect())
    }

    fn open_entry(&self, name: &str) -> io::Result<Box<dyn Read + '_>> {
        match self.entries.get(name) {
            Some(content) => Ok(Box::new(Cursor::new(content.as_bytes()))),
            None => Err(io::Error::new(
                io::ErrorKind::NotFound,
                format!("no in-memory entry named {name}"),
            )),
        }
    }
}
