use mediasync_core::{InclusionFilter, RemoteId};
use serde::{Deserialize, Serialize};

use crate::catalog::CatalogError;

pub mod engine;
pub mod pending;

pub use engine::ReconcileDriver;
pub use pending::{FlushReport, PendingSets};

/// Where uploaded assets are filed.
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub enum AlbumMode {
    #[default]
    Off,
    /// Every upload goes into this album.
    Into(String),
    /// Recreate the albums the source assigned.
    Mirror,
}

#[derive(Debug, Clone)]
pub struct ReconcileOptions {
    pub filter: InclusionFilter,
    pub keep_partner: bool,
    pub keep_trashed: bool,
    /// Only candidates in this source album are considered. They are also
    /// filed into an album of that name when uploaded.
    pub from_album: Option<String>,
    pub album_mode: AlbumMode,
    /// Delete local files once the server holds an equivalent copy.
    pub delete_local: bool,
}

impl Default for ReconcileOptions {
    fn default() -> Self {
        Self {
            filter: InclusionFilter::default(),
            keep_partner: true,
            keep_trashed: false,
            from_album: None,
            album_mode: AlbumMode::Off,
            delete_local: false,
        }
    }
}

/// Running counters, reported after every candidate.
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
pub struct RunStats {
    pub scanned: u64,
    pub uploaded: u64,
    pub replaced: u64,
    pub duplicates: u64,
    pub filtered: u64,
    pub failed: u64,
}

/// What happened to one candidate.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum Outcome {
    SkippedFiltered(&'static str),
    Uploaded(RemoteId),
    ReplacedAndQueued { id: RemoteId, replaced: RemoteId },
    SkippedDuplicate,
    Failed(String),
    Cancelled,
}

#[derive(Debug, Default)]
pub struct RunReport {
    pub stats: RunStats,
    pub cancelled: bool,
    /// `None` when the run was cancelled before the flush.
    pub flush: Option<FlushReport>,
}

/// Errors that stop a run before any candidate is handled.
#[derive(Debug, thiserror::Error)]
pub enum ReconcileError {
    #[error("Catalog handshake failed: {0}")]
    Handshake(#[source] CatalogError),
    #[error("Remote listing failed: {0}")]
    Listing(#[source] CatalogError),
}
