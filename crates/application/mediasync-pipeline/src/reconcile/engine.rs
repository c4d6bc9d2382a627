use std::sync::Arc;

use mediasync_core::{Advice, AssetIndex, AssetInfo, RemoteId};
use mediasync_source::{CandidateAsset, SourceBrowser};
use tokio_util::sync::CancellationToken;
use tracing::{debug, error, info, warn};

use crate::catalog::CatalogClient;
use crate::reconcile::pending::PendingSets;
use crate::reconcile::{AlbumMode, Outcome, ReconcileError, ReconcileOptions, RunReport, RunStats};

type ProgressCb = Box<dyn Fn(RunStats) + Send + Sync>;

/// Pulls candidates from one browser and reconciles each against the catalog.
pub struct ReconcileDriver {
    catalog: Arc<dyn CatalogClient>,
    options: ReconcileOptions,
    index: AssetIndex,
    pending: PendingSets,
    stats: RunStats,
    on_progress: Option<ProgressCb>,
}

impl ReconcileDriver {
    pub fn new(catalog: Arc<dyn CatalogClient>, device_id: &str, options: ReconcileOptions) -> Self {
        Self {
            catalog,
            options,
            index: AssetIndex::new(device_id),
            pending: PendingSets::default(),
            stats: RunStats::default(),
            on_progress: None,
        }
    }

    pub fn with_progress(mut self, cb: impl Fn(RunStats) + Send + Sync + 'static) -> Self {
        self.on_progress = Some(Box::new(cb));
        self
    }

    pub fn index(&self) -> &AssetIndex {
        &self.index
    }

    pub fn pending(&self) -> &PendingSets {
        &self.pending
    }

    pub fn stats(&self) -> &RunStats {
        &self.stats
    }

    /// Handshake and seed the index from a full remote listing.
    pub async fn connect(&mut self) -> Result<(), ReconcileError> {
        self.catalog.ping().await.map_err(ReconcileError::Handshake)?;
        let assets = self
            .catalog
            .list_all_assets()
            .await
            .map_err(ReconcileError::Listing)?;
        info!("Catalog lists {} assets", assets.len());
        self.index = AssetIndex::seed(self.index.device_id().to_string(), assets);
        Ok(())
    }

    /// Connect, drain the browser, then flush the pending sets unless the
    /// run was cancelled.
    pub async fn run(
        mut self,
        browser: Box<dyn SourceBrowser>,
        cancel: CancellationToken,
    ) -> Result<RunReport, ReconcileError> {
        self.connect().await?;

        let mut rx = browser.browse(cancel.clone());
        loop {
            let next = tokio::select! {
                biased;
                _ = cancel.cancelled() => None,
                c = rx.recv() => c,
            };
            let Some(candidate) = next else {
                break;
            };
            let path = candidate.path().to_string();
            let outcome = self.process(candidate, &cancel).await;
            debug!("{}: {:?}", path, outcome);
            self.report_progress();
        }
        drop(rx);

        if cancel.is_cancelled() {
            warn!("Run cancelled, pending changes discarded");
            return Ok(RunReport {
                stats: self.stats,
                cancelled: true,
                flush: None,
            });
        }

        self.log_pending();
        let flush = self.pending.flush(self.catalog.as_ref(), &cancel).await;
        Ok(RunReport {
            stats: self.stats,
            cancelled: flush.interrupted,
            flush: Some(flush),
        })
    }

    /// Reconcile one candidate. The candidate is consumed; only deletion
    /// queues keep it past this call.
    pub async fn process(&mut self, candidate: CandidateAsset, cancel: &CancellationToken) -> Outcome {
        self.stats.scanned += 1;

        if let Some(reason) = self.filter_reason(&candidate.info) {
            debug!("{}: filtered ({})", candidate.path(), reason);
            self.stats.filtered += 1;
            return Outcome::SkippedFiltered(reason);
        }

        let advice = self.index.should_upload(&candidate.info);
        let reason = advice.reason();
        match advice {
            Advice::NotOnServer => {
                info!("{}: {}", candidate.path(), reason);
                match self.upload(&candidate, cancel).await {
                    Ok(id) => {
                        self.stats.uploaded += 1;
                        self.after_upload(candidate, &id);
                        Outcome::Uploaded(id)
                    }
                    Err(outcome) => outcome,
                }
            }
            Advice::SmallerOnServer(record) => {
                info!(
                    "{}: server copy is smaller ({} < {} bytes), replacing {}",
                    candidate.path(),
                    record.size,
                    candidate.info.size,
                    record.id
                );
                match self.upload(&candidate, cancel).await {
                    Ok(id) => {
                        self.stats.replaced += 1;
                        self.pending.queue_server_delete(record.id.clone());
                        self.after_upload(candidate, &id);
                        Outcome::ReplacedAndQueued {
                            id,
                            replaced: record.id,
                        }
                    }
                    Err(outcome) => outcome,
                }
            }
            Advice::SameOnServer(record) if record.just_uploaded => {
                debug!("{}: already uploaded in this run as {}", candidate.path(), record.id);
                self.stats.duplicates += 1;
                Outcome::SkippedDuplicate
            }
            Advice::SameOnServer(record) => {
                info!("{}: {} ({})", candidate.path(), reason, record.id);
                self.stats.duplicates += 1;
                if self.options.delete_local {
                    self.pending.queue_local_delete(candidate);
                }
                Outcome::SkippedDuplicate
            }
        }
    }

    fn filter_reason(&self, info: &AssetInfo) -> Option<&'static str> {
        let filter = &self.options.filter;
        if !filter.accepts_extension(info.extension()) {
            return Some("extension");
        }
        if info.from_partner && !self.options.keep_partner {
            return Some("partner share");
        }
        if info.trashed && !self.options.keep_trashed {
            return Some("trashed");
        }
        if let Some(album) = &self.options.from_album {
            if !info.in_album(album) {
                return Some("not in album");
            }
        }
        if !filter.accepts_date(info.date_taken) {
            if info.date_taken.is_none() {
                error!("{}: no capture date, cannot apply date range", info.file_name);
            }
            return Some("date range");
        }
        None
    }

    /// On failure the index is left untouched and the outcome to report is
    /// returned instead.
    async fn upload(&mut self, candidate: &CandidateAsset, cancel: &CancellationToken) -> Result<RemoteId, Outcome> {
        if cancel.is_cancelled() {
            return Err(Outcome::Cancelled);
        }
        match self.catalog.upload(candidate, self.index.device_id()).await {
            Ok(id) => {
                self.index.add_local_asset(&candidate.info, id.clone());
                Ok(id)
            }
            Err(e) => {
                error!("{}: upload failed: {}", candidate.path(), e);
                self.stats.failed += 1;
                Err(Outcome::Failed(e.to_string()))
            }
        }
    }

    fn after_upload(&mut self, candidate: CandidateAsset, id: &RemoteId) {
        match &self.options.album_mode {
            AlbumMode::Off => {}
            AlbumMode::Into(album) => self.pending.add_to_album(album, id),
            AlbumMode::Mirror => {
                for album in &candidate.info.albums {
                    self.pending.add_to_album(album, id);
                }
            }
        }
        if let Some(album) = &self.options.from_album {
            self.pending.add_to_album(album, id);
        }
        if self.options.delete_local {
            self.pending.queue_local_delete(candidate);
        }
    }

    fn report_progress(&self) {
        if let Some(cb) = &self.on_progress {
            cb(self.stats.clone());
        }
    }

    /// Deletions are announced at warn level so they show before they run.
    fn log_pending(&self) {
        if self.pending.is_empty() {
            return;
        }
        for (album, ids) in self.pending.album_updates() {
            info!("Pending: {} assets for album {}", ids.len(), album);
        }
        let server = self.pending.server_deletes();
        if !server.is_empty() {
            warn!("Pending: {} replaced server assets to delete: {}", server.len(), server.join(", "));
        }
        let local: Vec<&str> = self.pending.local_deletes().collect();
        if !local.is_empty() {
            warn!("Pending: {} local files to delete", local.len());
            for path in local {
                warn!("Pending: delete local {}", path);
            }
        }
    }
}
