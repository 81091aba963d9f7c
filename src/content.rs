//! Named access to game content (maps, tilesets, scripts, catalog, savefile).
//!
//! Asset decoding is somebody else's job; the core only needs text by name.

use std::collections::HashMap;
use std::fmt;
use std::fs;
use std::io;
use std::path::{Path, PathBuf};

use crate::error::ResourceLoadError;

#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum ContentKind {
    Map,
    Tileset,
    Script,
    Catalog,
    Savefile,
}

impl fmt::Display for ContentKind {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        let word = match self {
            ContentKind::Map => "map",
            ContentKind::Tileset => "tileset",
            ContentKind::Script => "script",
            ContentKind::Catalog => "item catalog",
            ContentKind::Savefile => "savefile",
        };
        f.write_str(word)
    }
}

pub trait ContentSource {
    fn read(&self, kind: ContentKind, name: &str) -> Result<String, ResourceLoadError>;

    fn write(&mut self, kind: ContentKind, name: &str, text: &str)
    -> Result<(), ResourceLoadError>;
}

/// Content laid out on disk:
///
/// ```text
/// <root>/Map/<name>.json
/// <root>/Tilesets/<name>.json
/// <root>/Script/<name>.npc
/// <root>/<name>              (catalog, savefile)
/// ```
#[derive(Debug, Clone)]
pub struct DirectorySource {
    root: PathBuf,
}

impl DirectorySource {
    pub fn new(root: impl Into<PathBuf>) -> Self {
        Self { root: root.into() }
    }

    pub fn root(&self) -> &Path {
        &self.root
    }

    pub fn path_for(&self, kind: ContentKind, name: &str) -> PathBuf {
        match kind {
            ContentKind::Map => self.root.join("Map").join(format!("{name}.json")),
            ContentKind::Tileset => self.root.join("Tilesets").join(format!("{name}.json")),
            ContentKind::Script => self.root.join("Script").join(format!("{name}.npc")),
            ContentKind::Catalog | ContentKind::Savefile => self.root.join(name),
        }
    }
}

impl ContentSource for DirectorySource {
    fn read(&self, kind: ContentKind, name: &str) -> Result<String, ResourceLoadError> {
        let path = self.path_for(kind, name);
        fs::read_to_string(&path).map_err(|source| match source.kind() {
            io::ErrorKind::NotFound => ResourceLoadError::Missing {
                kind,
                name: name.to_string(),
                path,
            },
            _ => ResourceLoadError::Io {
                kind,
                name: name.to_string(),
                source,
            },
        })
    }

    fn write(
        &mut self,
        kind: ContentKind,
        name: &str,
        text: &str,
    ) -> Result<(), ResourceLoadError> {
        let path = self.path_for(kind, name);
        let io_err = |source| ResourceLoadError::Io {
            kind,
            name: name.to_string(),
            source,
        };
        if let Some(parent) = path.parent() {
            fs::create_dir_all(parent).map_err(io_err)?;
        }
        fs::write(&path, text).map_err(io_err)
    }
}

/// In-memory content, used by the editor and by tests.
#[derive(Debug, Clone, Default)]
pub struct MemorySource {
    entries: HashMap<(ContentKind, String), String>,
}

impl MemorySource {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn insert(&mut self, kind: ContentKind, name: &str, text: impl Into<String>) {
        self.entries.insert((kind, name.to_string()), text.into());
    }

    pub fn with(mut self, kind: ContentKind, name: &str, text: impl Into<String>) -> Self {
        self.insert(kind, name, text);
        self
    }

    pub fn get(&self, kind: ContentKind, name: &str) -> Option<&str> {
        self.entries
            .get(&(kind, name.to_string()))
            .map(String::as_str)
    }
}

impl ContentSource for MemorySource {
    fn read(&self, kind: ContentKind, name: &str) -> Result<String, ResourceLoadError> {
        self.get(kind, name)
            .map(str::to_string)
            .ok_or_else(|| ResourceLoadError::Missing {
                kind,
                name: name.to_string(),
                path: PathBuf::from(format!("memory://{kind}/{name}")),
            })
    }

    fn write(
        &mut self,
        kind: ContentKind,
        name: &str,
        text: &str,
    ) -> Result<(), ResourceLoadError> {
        self.insert(kind, name, text);
        Ok(())
    }
}
