pub mod catalog;
pub mod reconcile;
pub mod snapshot;

pub use catalog::{CatalogClient, CatalogError};
pub use reconcile::{
    AlbumMode, FlushReport, Outcome, PendingSets, ReconcileDriver, ReconcileError,
    ReconcileOptions, RunReport, RunStats,
};
pub use snapshot::{CatalogSnapshot, SnapshotCatalog};

// Re-export source types often needed by consumers
pub use mediasync_source::{CandidateAsset, SourceBrowser};
