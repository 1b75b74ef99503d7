//! Stored ROM images on disk.

use std::{
    fs,
    path::{Path, PathBuf},
};

use log::{debug, info};
use thiserror::Error;

use crate::cart::header::HEADER_END;

const ROM_EXTENSIONS: [&str; 2] = ["gb", "gbc"];

#[derive(Debug, Error)]
pub enum LibraryError {
    #[error("I/O error: {0}")]
    Io(#[from] std::io::Error),
    #[error("no ROM file found at {0:?}")]
    NotFound(PathBuf),
    #[error("{path:?} is too small to be a ROM ({len} bytes)")]
    TooSmall { path: PathBuf, len: usize },
    #[error("invalid ROM name {0:?}")]
    InvalidName(String),
}

#[derive(Debug, PartialEq, Eq, Clone, Copy)]
pub enum EntryKind {
    Rom,
    Directory,
}

#[derive(Debug, PartialEq, Eq, Clone)]
pub struct RomEntry {
    pub name: String,
    pub path: PathBuf,
    pub kind: EntryKind,
}

pub struct RomLibrary {
    root: PathBuf,
}

impl RomLibrary {
    /// Opens the library at `root`, creating the directory if needed.
    pub fn open(root: impl Into<PathBuf>) -> Result<Self, LibraryError> {
        let root = root.into();
        fs::create_dir_all(&root)?;
        debug!("Opened ROM library at {:?}", root);
        Ok(Self { root })
    }

    pub fn root(&self) -> &Path {
        &self.root
    }

    /// ROM files and sub-directories, sorted by name.
    pub fn entries(&self) -> Result<Vec<RomEntry>, LibraryError> {
        let mut entries = Vec::new();
        for dir_entry in fs::read_dir(&self.root)? {
            let dir_entry = dir_entry?;
            let path = dir_entry.path();

            let kind = if dir_entry.file_type()?.is_dir() {
                EntryKind::Directory
            } else if is_rom(&path) {
                EntryKind::Rom
            } else {
                continue;
            };

            let name = match kind {
                EntryKind::Directory => path.file_name(),
                EntryKind::Rom => path.file_stem(),
            };
            if let Some(name) = name.and_then(|n| n.to_str()) {
                entries.push(RomEntry {
                    name: name.to_string(),
                    path,
                    kind,
                });
            }
        }
        entries.sort_by(|a, b| a.name.cmp(&b.name));
        Ok(entries)
    }

    pub fn rom_path(&self, name: &str) -> PathBuf {
        self.root.join(format!("{}.gb", name))
    }

    /// Reads the listed ROM called `name`, whichever extension it has.
    pub fn read(&self, name: &str) -> Result<Vec<u8>, LibraryError> {
        check_name(name)?;
        let path = self.resolve(name)?;
        info!("Identified ROM file at {:?}", path);
        Ok(fs::read(path)?)
    }

    /// `<name>.gb` wins; otherwise the listed ROM entry with that name.
    fn resolve(&self, name: &str) -> Result<PathBuf, LibraryError> {
        let path = self.rom_path(name);
        if path.is_file() {
            return Ok(path);
        }
        self.entries()?
            .into_iter()
            .find(|entry| entry.kind == EntryKind::Rom && entry.name == name)
            .map(|entry| entry.path)
            .ok_or(LibraryError::NotFound(path))
    }

    /// Copies a ROM into the library under its file stem.
    pub fn import(&self, source: &Path) -> Result<RomEntry, LibraryError> {
        let name = source
            .file_stem()
            .and_then(|n| n.to_str())
            .ok_or_else(|| LibraryError::InvalidName(source.display().to_string()))?
            .to_string();
        check_name(&name)?;

        let rom = fs::read(source)?;
        if rom.len() < HEADER_END {
            return Err(LibraryError::TooSmall {
                path: source.to_path_buf(),
                len: rom.len(),
            });
        }

        let path = self.rom_path(&name);
        fs::write(&path, rom)?;
        info!("Imported {:?} as {:?}", source, name);
        Ok(RomEntry {
            name,
            path,
            kind: EntryKind::Rom,
        })
    }
}

fn is_rom(path: &Path) -> bool {
    path.extension()
        .and_then(|ext| ext.to_str())
        .is_some_and(|ext| ROM_EXTENSIONS.contains(&ext.to_ascii_lowercase().as_str()))
}

fn check_name(name: &str) -> Result<(), LibraryError> {
    if name.is_empty() || name.contains(['/', '\\']) || name == "." || name == ".." {
        return Err(LibraryError::InvalidName(name.to_string()));
    }
    Ok(())
}
