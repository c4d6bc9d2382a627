use mediasync_core::{Album, RemoteAsset, RemoteId};
use mediasync_fs::FsError;
use mediasync_source::CandidateAsset;

#[derive(Debug, thiserror::Error)]
pub enum CatalogError {
    #[error("Catalog unreachable: {0}")]
    Unreachable(String),
    #[error("Upload failed for {path}: {reason}")]
    UploadFailed { path: String, reason: String },
    #[error("Batch mutation failed: {0}")]
    BatchMutationFailed(String),
    #[error("Album not found: {0}")]
    AlbumNotFound(RemoteId),
    #[error("Source error: {0}")]
    Source(#[from] FsError),
    #[error("IO error: {0}")]
    Io(#[from] std::io::Error),
    #[error("Serialization error: {0}")]
    Serde(#[from] serde_json::Error),
}

/// The remote asset catalog, seen from the driver.
#[async_trait::async_trait]
pub trait CatalogClient: Send + Sync {
    async fn ping(&self) -> Result<(), CatalogError>;
    async fn list_all_assets(&self) -> Result<Vec<RemoteAsset>, CatalogError>;
    /// Stores the content under `device_id` and returns the new record's id.
    async fn upload(&self, asset: &CandidateAsset, device_id: &str) -> Result<RemoteId, CatalogError>;
    async fn delete_assets(&self, ids: &[RemoteId]) -> Result<(), CatalogError>;
    async fn list_albums(&self) -> Result<Vec<Album>, CatalogError>;
    async fn create_album(&self, name: &str, ids: &[RemoteId]) -> Result<Album, CatalogError>;
    /// Adds `ids` to an existing album.
    async fn update_album(&self, album_id: &str, ids: &[RemoteId]) -> Result<(), CatalogError>;
}
