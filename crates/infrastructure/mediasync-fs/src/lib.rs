//! Several read-only source roots presented as one logical tree.
//!
//! Roots are consulted in the order they were configured. When more than one
//! root provides the same relative path, the earliest root wins for `stat`,
//! `open` and `remove`; directory listings and walks return the union of all
//! roots with the same first-root-wins metadata.

use std::collections::{BTreeMap, BTreeSet};
use std::io::Read;

use camino::Utf8Path;
use chrono::{DateTime, Utc};
use mediasync_core::path_utils::AssetPath;
use tracing::{debug, info};

pub mod dir_root;
pub mod persist;
pub mod zip_root;

pub use dir_root::DirRoot;
pub use persist::atomic_write;
pub use zip_root::ZipRoot;

#[derive(Debug, thiserror::Error)]
pub enum FsError {
    #[error("source unavailable: {path}: {reason}")]
    SourceUnavailable { path: String, reason: String },
    #[error("not found: {0}")]
    NotFound(String),
    #[error("read-only source: cannot modify {0}")]
    ReadOnly(String),
    #[error("IO error: {0}")]
    Io(#[from] std::io::Error),
    #[error("archive error: {0}")]
    Archive(#[from] zip::result::ZipError),
}

#[derive(Debug, Clone, PartialEq, Eq)]
pub struct FileMeta {
    pub size: u64,
    pub modified: Option<DateTime<Utc>>,
    pub is_dir: bool,
}

#[derive(Debug, Clone, PartialEq, Eq, PartialOrd, Ord)]
pub struct DirEntry {
    pub name: String,
    pub is_dir: bool,
}

/// One source of files: a directory on disk or an opened archive.
/// Paths are normalized relative paths, `""` being the root itself.
pub trait FsRoot: Send + Sync {
    /// Label used in logs.
    fn label(&self) -> &str;
    fn stat(&self, path: &str) -> Option<FileMeta>;
    fn open(&self, path: &str) -> Result<Box<dyn Read + Send>, FsError>;
    /// Children of a directory, empty when `path` is not a directory.
    fn read_dir(&self, path: &str) -> Vec<DirEntry>;
    /// Every regular file of the root.
    fn files(&self) -> Vec<String>;
    fn remove(&self, path: &str) -> Result<(), FsError> {
        Err(FsError::ReadOnly(format!("{}:{path}", self.label())))
    }
}

pub struct MergedFs {
    roots: Vec<Box<dyn FsRoot>>,
}

impl MergedFs {
    pub fn new(roots: Vec<Box<dyn FsRoot>>) -> Self {
        Self { roots }
    }

    /// Open every configured path up front: directories as-is, `.zip` files
    /// as archives. Any root that cannot be opened fails the whole call.
    pub fn open_paths<P: AsRef<Utf8Path>>(paths: &[P]) -> Result<Self, FsError> {
        let mut roots: Vec<Box<dyn FsRoot>> = Vec::with_capacity(paths.len());
        for path in paths {
            let path = path.as_ref();
            let meta = std::fs::metadata(path).map_err(|e| FsError::SourceUnavailable {
                path: path.to_string(),
                reason: e.to_string(),
            })?;

            if meta.is_dir() {
                info!("Source folder {}", path);
                roots.push(Box::new(DirRoot::new(path)));
            } else if path
                .extension()
                .is_some_and(|ext| ext.eq_ignore_ascii_case("zip"))
            {
                info!("Source archive {}", path);
                roots.push(Box::new(ZipRoot::open(path)?));
            } else {
                return Err(FsError::SourceUnavailable {
                    path: path.to_string(),
                    reason: "not a directory or a zip archive".into(),
                });
            }
        }
        Ok(Self::new(roots))
    }

    pub fn root_count(&self) -> usize {
        self.roots.len()
    }

    /// Index of the winning root and its metadata for `path`.
    pub fn resolve(&self, path: &str) -> Result<(usize, FileMeta), FsError> {
        let key = AssetPath::normalize(path);
        let found = self
            .roots
            .iter()
            .enumerate()
            .find_map(|(i, root)| root.stat(&key).map(|meta| (i, meta)));
        found.ok_or(FsError::NotFound(key))
    }

    pub fn stat(&self, path: &str) -> Result<FileMeta, FsError> {
        self.resolve(path).map(|(_, meta)| meta)
    }

    pub fn open(&self, path: &str) -> Result<Box<dyn Read + Send>, FsError> {
        let (i, meta) = self.resolve(path)?;
        if meta.is_dir {
            return Err(FsError::NotFound(format!("{path} is a directory")));
        }
        self.roots[i].open(&AssetPath::normalize(path))
    }

    pub fn read(&self, path: &str) -> Result<Vec<u8>, FsError> {
        let mut buf = Vec::new();
        self.open(path)?.read_to_end(&mut buf)?;
        Ok(buf)
    }

    /// Union of the children of `path` across roots, sorted by name.
    pub fn read_dir(&self, path: &str) -> Result<Vec<DirEntry>, FsError> {
        let key = AssetPath::normalize(path);
        let mut found = false;
        let mut merged: BTreeMap<String, DirEntry> = BTreeMap::new();
        for root in &self.roots {
            if !root.stat(&key).is_some_and(|m| m.is_dir) {
                continue;
            }
            found = true;
            for entry in root.read_dir(&key) {
                merged.entry(entry.name.clone()).or_insert(entry);
            }
        }
        if !found {
            return Err(FsError::NotFound(key));
        }
        Ok(merged.into_values().collect())
    }

    /// Every regular file of the merged tree, each path once, sorted.
    pub fn walk(&self) -> Vec<String> {
        let mut all = BTreeSet::new();
        for root in &self.roots {
            let files = root.files();
            debug!("{} files in {}", files.len(), root.label());
            all.extend(files);
        }
        all.into_iter().collect()
    }

    /// Delete `path` from the root that currently wins it.
    pub fn remove(&self, path: &str) -> Result<(), FsError> {
        let (i, _) = self.resolve(path)?;
        self.roots[i].remove(&AssetPath::normalize(path))
    }
}

pub(crate) fn not_found(path: &str) -> FsError {
    FsError::NotFound(path.to_string())
}
