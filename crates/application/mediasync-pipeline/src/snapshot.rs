use std::fs;
use std::io::Read;
use std::path::{Path, PathBuf};
use std::sync::{Mutex, MutexGuard};

use mediasync_core::{Album, RemoteAsset, RemoteId};
use mediasync_fs::atomic_write;
use mediasync_source::CandidateAsset;
use serde::{Deserialize, Serialize};
use tracing::{debug, info, warn};
use uuid::Uuid;

use crate::catalog::{CatalogClient, CatalogError};

/// On-disk catalog state.
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
pub struct CatalogSnapshot {
    #[serde(default)]
    pub assets: Vec<RemoteAsset>,
    #[serde(default)]
    pub albums: Vec<Album>,
}

/// A catalog kept in a single JSON file, rewritten on every mutation.
pub struct SnapshotCatalog {
    path: PathBuf,
    state: Mutex<CatalogSnapshot>,
}

impl SnapshotCatalog {
    /// Loads `path`, or starts empty when it does not exist yet.
    pub fn open(path: impl Into<PathBuf>) -> Result<Self, CatalogError> {
        let path = path.into();
        let state = if path.exists() {
            let content = fs::read_to_string(&path)?;
            serde_json::from_str(&content)?
        } else {
            debug!("No snapshot at {}, starting empty", path.display());
            CatalogSnapshot::default()
        };
        Ok(Self {
            path,
            state: Mutex::new(state),
        })
    }

    pub fn path(&self) -> &Path {
        &self.path
    }

    pub fn snapshot(&self) -> Result<CatalogSnapshot, CatalogError> {
        Ok(self.lock()?.clone())
    }

    fn lock(&self) -> Result<MutexGuard<'_, CatalogSnapshot>, CatalogError> {
        self.state
            .lock()
            .map_err(|_| CatalogError::Unreachable("snapshot lock poisoned".into()))
    }

    fn persist(&self, state: &CatalogSnapshot) -> Result<(), CatalogError> {
        if let Some(parent) = self.path.parent() {
            if !parent.as_os_str().is_empty() {
                fs::create_dir_all(parent)?;
            }
        }
        let json = serde_json::to_string_pretty(state)?;
        atomic_write(&self.path, json.as_bytes())?;
        Ok(())
    }

    /// Writes `next` to disk and only then makes it the live state.
    fn commit(&self, state: &mut CatalogSnapshot, next: CatalogSnapshot) -> Result<(), CatalogError> {
        self.persist(&next)?;
        *state = next;
        Ok(())
    }
}

#[async_trait::async_trait]
impl CatalogClient for SnapshotCatalog {
    async fn ping(&self) -> Result<(), CatalogError> {
        match self.path.parent() {
            Some(parent) if !parent.as_os_str().is_empty() && parent.is_file() => Err(
                CatalogError::Unreachable(format!("{} is not a directory", parent.display())),
            ),
            _ => Ok(()),
        }
    }

    async fn list_all_assets(&self) -> Result<Vec<RemoteAsset>, CatalogError> {
        Ok(self.lock()?.assets.clone())
    }

    async fn upload(&self, asset: &CandidateAsset, device_id: &str) -> Result<RemoteId, CatalogError> {
        let (size, checksum) = digest(asset).map_err(|e| CatalogError::UploadFailed {
            path: asset.path().to_string(),
            reason: e.to_string(),
        })?;
        let record = RemoteAsset {
            id: Uuid::new_v4().to_string(),
            title: asset.info.matching_title(),
            device_id: device_id.to_string(),
            size,
            checksum: Some(checksum),
            date_taken: asset.info.date_taken,
            just_uploaded: false,
        };
        let id = record.id.clone();

        let mut state = self.lock()?;
        let mut next = state.clone();
        next.assets.push(record);
        self.commit(&mut state, next)?;
        debug!("Stored {} as {}", asset.path(), id);
        Ok(id)
    }

    async fn delete_assets(&self, ids: &[RemoteId]) -> Result<(), CatalogError> {
        let mut state = self.lock()?;
        let mut next = state.clone();
        next.assets.retain(|a| !ids.contains(&a.id));
        for album in &mut next.albums {
            album.asset_ids.retain(|id| !ids.contains(id));
        }
        let removed = state.assets.len() - next.assets.len();
        if removed < ids.len() {
            warn!("{} of {} ids were not in the catalog", ids.len() - removed, ids.len());
        }
        self.commit(&mut state, next)?;
        info!("Deleted {} assets", removed);
        Ok(())
    }

    async fn list_albums(&self) -> Result<Vec<Album>, CatalogError> {
        Ok(self.lock()?.albums.clone())
    }

    async fn create_album(&self, name: &str, ids: &[RemoteId]) -> Result<Album, CatalogError> {
        let album = Album {
            id: Uuid::new_v4().to_string(),
            name: name.to_string(),
            asset_ids: ids.to_vec(),
        };
        let mut state = self.lock()?;
        let mut next = state.clone();
        next.albums.push(album.clone());
        self.commit(&mut state, next)?;
        Ok(album)
    }

    async fn update_album(&self, album_id: &str, ids: &[RemoteId]) -> Result<(), CatalogError> {
        let mut state = self.lock()?;
        let mut next = state.clone();
        let album = next
            .albums
            .iter_mut()
            .find(|a| a.id == album_id)
            .ok_or_else(|| CatalogError::AlbumNotFound(album_id.to_string()))?;
        for id in ids {
            if !album.asset_ids.contains(id) {
                album.asset_ids.push(id.clone());
            }
        }
        self.commit(&mut state, next)?;
        Ok(())
    }
}

/// Byte count and MD5 of the candidate's content.
fn digest(asset: &CandidateAsset) -> Result<(u64, String), CatalogError> {
    let mut reader = asset.open()?;
    let mut hasher = md5::Context::new();
    let mut buf = vec![0u8; 64 * 1024];
    let mut size = 0u64;
    loop {
        let n = reader.read(&mut buf)?;
        if n == 0 {
            break;
        }
        hasher.consume(&buf[..n]);
        size += n as u64;
    }
    Ok((size, format!("{:x}", hasher.finalize())))
}
