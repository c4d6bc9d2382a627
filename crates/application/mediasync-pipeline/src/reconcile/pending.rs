use std::collections::BTreeMap;

use mediasync_core::RemoteId;
use mediasync_source::CandidateAsset;
use tokio_util::sync::CancellationToken;
use tracing::{error, info, warn};

use crate::catalog::{CatalogClient, CatalogError};

/// Side effects deferred to the end of a run.
#[derive(Debug, Default)]
pub struct PendingSets {
    delete_local: Vec<CandidateAsset>,
    delete_server: Vec<RemoteId>,
    album_updates: BTreeMap<String, Vec<RemoteId>>,
}

/// Result of the end-of-run flush. Failures are collected, never fatal.
#[derive(Debug, Default, Clone, PartialEq, Eq)]
pub struct FlushReport {
    pub albums_created: Vec<String>,
    pub albums_updated: Vec<String>,
    /// (album name, error)
    pub album_failures: Vec<(String, String)>,
    pub server_deleted: usize,
    pub server_delete_error: Option<String>,
    pub local_deleted: usize,
    /// (path, error)
    pub local_failures: Vec<(String, String)>,
    /// The token fired part way; later steps were not attempted.
    pub interrupted: bool,
}

impl FlushReport {
    pub fn failure_count(&self) -> usize {
        self.album_failures.len()
            + self.local_failures.len()
            + usize::from(self.server_delete_error.is_some())
    }

    /// Folds every collected failure into one `BatchMutationFailed`.
    pub fn check(&self) -> Result<(), CatalogError> {
        let mut failures: Vec<String> = self
            .album_failures
            .iter()
            .map(|(album, e)| format!("album {album}: {e}"))
            .collect();
        if let Some(e) = &self.server_delete_error {
            failures.push(format!("server deletion: {e}"));
        }
        failures.extend(self.local_failures.iter().map(|(path, e)| format!("local {path}: {e}")));
        if failures.is_empty() {
            Ok(())
        } else {
            Err(CatalogError::BatchMutationFailed(failures.join("; ")))
        }
    }
}

impl PendingSets {
    pub fn queue_local_delete(&mut self, asset: CandidateAsset) {
        if !self.delete_local.iter().any(|a| a.path() == asset.path()) {
            self.delete_local.push(asset);
        }
    }

    pub fn queue_server_delete(&mut self, id: RemoteId) {
        if !self.delete_server.contains(&id) {
            self.delete_server.push(id);
        }
    }

    pub fn add_to_album(&mut self, album: &str, id: &RemoteId) {
        let ids = self.album_updates.entry(album.to_string()).or_default();
        if !ids.contains(id) {
            ids.push(id.clone());
        }
    }

    pub fn local_deletes(&self) -> impl Iterator<Item = &str> {
        self.delete_local.iter().map(|a| a.path())
    }

    pub fn server_deletes(&self) -> &[RemoteId] {
        &self.delete_server
    }

    pub fn album_updates(&self) -> &BTreeMap<String, Vec<RemoteId>> {
        &self.album_updates
    }

    pub fn is_empty(&self) -> bool {
        self.delete_local.is_empty() && self.delete_server.is_empty() && self.album_updates.is_empty()
    }

    /// Albums, then one batch of server deletions, then local files.
    pub async fn flush(self, catalog: &dyn CatalogClient, cancel: &CancellationToken) -> FlushReport {
        let mut report = FlushReport::default();

        if !self.album_updates.is_empty() {
            Self::flush_albums(&self.album_updates, catalog, cancel, &mut report).await;
        }
        if report.interrupted {
            return report;
        }

        if !self.delete_server.is_empty() {
            if cancel.is_cancelled() {
                report.interrupted = true;
                return report;
            }
            info!("Deleting {} replaced assets from the server", self.delete_server.len());
            match catalog.delete_assets(&self.delete_server).await {
                Ok(()) => report.server_deleted = self.delete_server.len(),
                Err(e) => {
                    error!("Server deletion failed: {}", e);
                    report.server_delete_error = Some(e.to_string());
                }
            }
        }

        for asset in &self.delete_local {
            if cancel.is_cancelled() {
                report.interrupted = true;
                return report;
            }
            match asset.remove() {
                Ok(()) => {
                    info!("Deleted local file {}", asset.path());
                    report.local_deleted += 1;
                }
                Err(e) => {
                    warn!("Cannot delete {}: {}", asset.path(), e);
                    report.local_failures.push((asset.path().to_string(), e.to_string()));
                }
            }
        }
        report
    }

    async fn flush_albums(
        updates: &BTreeMap<String, Vec<RemoteId>>,
        catalog: &dyn CatalogClient,
        cancel: &CancellationToken,
        report: &mut FlushReport,
    ) {
        let existing = match catalog.list_albums().await {
            Ok(albums) => albums,
            Err(e) => {
                error!("Cannot list albums: {}", e);
                for name in updates.keys() {
                    report.album_failures.push((name.clone(), e.to_string()));
                }
                return;
            }
        };

        for (name, ids) in updates {
            if cancel.is_cancelled() {
                report.interrupted = true;
                return;
            }
            let result = match existing.iter().find(|a| &a.name == name) {
                Some(album) => {
                    let missing: Vec<RemoteId> = ids
                        .iter()
                        .filter(|id| !album.asset_ids.contains(id))
                        .cloned()
                        .collect();
                    if missing.is_empty() {
                        continue;
                    }
                    info!("Adding {} assets to album {}", missing.len(), name);
                    catalog
                        .update_album(&album.id, &missing)
                        .await
                        .map(|()| report.albums_updated.push(name.clone()))
                }
                None => {
                    info!("Creating album {} with {} assets", name, ids.len());
                    catalog
                        .create_album(name, ids)
                        .await
                        .map(|_| report.albums_created.push(name.clone()))
                }
            };
            if let Err(e) = result {
                error!("Album {} not updated: {}", name, e);
                report.album_failures.push((name.clone(), e.to_string()));
            }
        }
    }
}
