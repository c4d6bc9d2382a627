use std::fs;
use std::io::Read;

use camino::{Utf8Path, Utf8PathBuf};
use chrono::{DateTime, Utc};
use mediasync_core::path_utils::AssetPath;
use tracing::warn;
use walkdir::WalkDir;

use crate::{not_found, DirEntry, FileMeta, FsError, FsRoot};

/// A plain directory. The only root kind that supports `remove`.
pub struct DirRoot {
    root: Utf8PathBuf,
    label: String,
}

impl DirRoot {
    pub fn new(root: &Utf8Path) -> Self {
        Self {
            root: root.to_owned(),
            label: root.to_string(),
        }
    }

    fn full_path(&self, path: &str) -> Option<Utf8PathBuf> {
        if !AssetPath::verify_safe(path) {
            return None;
        }
        Some(if path.is_empty() {
            self.root.clone()
        } else {
            self.root.join(path)
        })
    }
}

fn file_meta(meta: &fs::Metadata) -> FileMeta {
    FileMeta {
        size: if meta.is_dir() { 0 } else { meta.len() },
        modified: meta.modified().ok().map(DateTime::<Utc>::from),
        is_dir: meta.is_dir(),
    }
}

impl FsRoot for DirRoot {
    fn label(&self) -> &str {
        &self.label
    }

    fn stat(&self, path: &str) -> Option<FileMeta> {
        let full = self.full_path(path)?;
        fs::metadata(full).ok().map(|m| file_meta(&m))
    }

    fn open(&self, path: &str) -> Result<Box<dyn Read + Send>, FsError> {
        let full = self.full_path(path).ok_or_else(|| not_found(path))?;
        match fs::File::open(&full) {
            Ok(f) => Ok(Box::new(f)),
            Err(e) if e.kind() == std::io::ErrorKind::NotFound => Err(not_found(path)),
            Err(e) => Err(e.into()),
        }
    }

    fn read_dir(&self, path: &str) -> Vec<DirEntry> {
        let Some(full) = self.full_path(path) else {
            return Vec::new();
        };
        let Ok(entries) = fs::read_dir(&full) else {
            return Vec::new();
        };
        entries
            .filter_map(|e| e.ok())
            .filter_map(|e| {
                let name = e.file_name().into_string().ok()?;
                let is_dir = e.file_type().ok()?.is_dir();
                Some(DirEntry { name, is_dir })
            })
            .collect()
    }

    fn files(&self) -> Vec<String> {
        WalkDir::new(&self.root)
            .into_iter()
            .filter_map(|e| match e {
                Ok(e) => Some(e),
                Err(err) => {
                    warn!("Skipping unreadable entry under {}: {}", self.root, err);
                    None
                }
            })
            .filter(|e| e.file_type().is_file())
            .filter_map(|e| {
                let rel = e.path().strip_prefix(&self.root).ok()?;
                match rel.to_str() {
                    Some(s) => Some(AssetPath::normalize(s)),
                    None => {
                        warn!("Skipping non UTF-8 path {}", e.path().display());
                        None
                    }
                }
            })
            .collect()
    }

    fn remove(&self, path: &str) -> Result<(), FsError> {
        let full = self.full_path(path).ok_or_else(|| not_found(path))?;
        fs::remove_file(full)?;
        Ok(())
    }
}
