use std::collections::{BTreeMap, BTreeSet};
use std::fs::File;
use std::io::{self, Read, Seek, SeekFrom};
use std::sync::Mutex;

use camino::Utf8Path;
use chrono::{DateTime, NaiveDate, Utc};
use mediasync_core::path_utils::AssetPath;
use tracing::warn;
use zip::ZipArchive;

use crate::{not_found, DirEntry, FileMeta, FsError, FsRoot};

#[derive(Debug, Clone)]
struct ZipEntry {
    index: usize,
    size: u64,
    modified: Option<DateTime<Utc>>,
}

/// A zip archive opened once, read through a shared handle.
pub struct ZipRoot {
    label: String,
    archive: Mutex<ZipArchive<File>>,
    files: BTreeMap<String, ZipEntry>,
    dirs: BTreeSet<String>,
}

impl ZipRoot {
    pub fn open(path: &Utf8Path) -> Result<Self, FsError> {
        let unavailable = |reason: String| FsError::SourceUnavailable {
            path: path.to_string(),
            reason,
        };
        let file = File::open(path).map_err(|e| unavailable(e.to_string()))?;
        let mut archive = ZipArchive::new(file).map_err(|e| unavailable(e.to_string()))?;

        let mut files = BTreeMap::new();
        let mut dirs = BTreeSet::new();
        dirs.insert(String::new());

        for index in 0..archive.len() {
            let entry = archive
                .by_index(index)
                .map_err(|e| unavailable(e.to_string()))?;
            let name = AssetPath::normalize(entry.name());
            if name.is_empty() || !AssetPath::verify_safe(&name) {
                warn!("Ignoring unsafe archive member {:?} in {}", entry.name(), path);
                continue;
            }

            let mut parent = AssetPath::parent(&name);
            while !parent.is_empty() {
                dirs.insert(parent.to_string());
                parent = AssetPath::parent(parent);
            }

            if entry.is_dir() {
                dirs.insert(name);
            } else {
                files.insert(
                    name,
                    ZipEntry {
                        index,
                        size: entry.size(),
                        modified: entry.last_modified().and_then(zip_time),
                    },
                );
            }
        }

        Ok(Self {
            label: path.to_string(),
            archive: Mutex::new(archive),
            files,
            dirs,
        })
    }
}

fn zip_time(dt: zip::DateTime) -> Option<DateTime<Utc>> {
    NaiveDate::from_ymd_opt(i32::from(dt.year()), u32::from(dt.month()), u32::from(dt.day()))?
        .and_hms_opt(
            u32::from(dt.hour()),
            u32::from(dt.minute()),
            u32::from(dt.second()),
        )
        .map(|n| n.and_utc())
}

impl FsRoot for ZipRoot {
    fn label(&self) -> &str {
        &self.label
    }

    fn stat(&self, path: &str) -> Option<FileMeta> {
        if let Some(entry) = self.files.get(path) {
            return Some(FileMeta {
                size: entry.size,
                modified: entry.modified,
                is_dir: false,
            });
        }
        self.dirs.contains(path).then_some(FileMeta {
            size: 0,
            modified: None,
            is_dir: true,
        })
    }

    /// Members are inflated into an anonymous temp file; the archive handle
    /// is released before the reader is returned.
    fn open(&self, path: &str) -> Result<Box<dyn Read + Send>, FsError> {
        let entry = self.files.get(path).ok_or_else(|| not_found(path))?;
        let mut spool = tempfile::tempfile()?;
        {
            let mut archive = self
                .archive
                .lock()
                .map_err(|_| FsError::Io(io::Error::other("archive lock poisoned")))?;
            let mut member = archive.by_index(entry.index)?;
            io::copy(&mut member, &mut spool)?;
        }
        spool.seek(SeekFrom::Start(0))?;
        Ok(Box::new(spool))
    }

    fn read_dir(&self, path: &str) -> Vec<DirEntry> {
        if !self.dirs.contains(path) {
            return Vec::new();
        }
        let children = |name: &String| AssetPath::parent(name) == path && !name.is_empty();
        let mut entries: Vec<DirEntry> = self
            .dirs
            .iter()
            .filter(|d| children(d))
            .map(|d| DirEntry {
                name: AssetPath::base_name(d).to_string(),
                is_dir: true,
            })
            .collect();
        entries.extend(self.files.keys().filter(|f| children(f)).map(|f| DirEntry {
            name: AssetPath::base_name(f).to_string(),
            is_dir: false,
        }));
        entries
    }

    fn files(&self) -> Vec<String> {
        self.files.keys().cloned().collect()
    }
}
