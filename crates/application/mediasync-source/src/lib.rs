use mediasync_core::AssetInfo;
use mediasync_fs::{FsError, MergedFs};
use std::fmt;
use std::io::Read;
use std::sync::Arc;
use std::thread;
use tokio::sync::mpsc;
use tokio_util::sync::CancellationToken;
use tracing::{debug, error};

mod date_hint;
pub mod local;
pub mod takeout;

pub use local::LocalFolderBrowser;
pub use takeout::{PairingRules, TakeoutBrowser};

#[derive(Debug, thiserror::Error)]
pub enum BrowseError {
    #[error("Filesystem error: {0}")]
    Fs(#[from] FsError),
    #[error("Metadata unavailable for {path}: {reason}")]
    MetadataUnavailable { path: String, reason: String },
}

/// A local file on its way to the reconciliation driver.
pub struct CandidateAsset {
    pub info: AssetInfo,
    fs: Arc<MergedFs>,
}

impl CandidateAsset {
    pub fn new(info: AssetInfo, fs: Arc<MergedFs>) -> Self {
        Self { info, fs }
    }

    /// Path inside the merged source tree.
    pub fn path(&self) -> &str {
        &self.info.file_name
    }

    /// Fresh reader over the content. The handle is released when dropped.
    pub fn open(&self) -> Result<Box<dyn Read + Send>, FsError> {
        self.fs.open(&self.info.file_name)
    }

    pub fn remove(&self) -> Result<(), FsError> {
        self.fs.remove(&self.info.file_name)
    }
}

impl fmt::Debug for CandidateAsset {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("CandidateAsset")
            .field("info", &self.info)
            .finish_non_exhaustive()
    }
}

/// Produces the candidates of one source, once.
///
/// The browser is consumed: candidates arrive on a bounded channel fed by a
/// dedicated thread, and the channel closes when the source is exhausted or
/// `cancel` fires.
pub trait SourceBrowser: Send {
    fn browse(self: Box<Self>, cancel: CancellationToken) -> mpsc::Receiver<CandidateAsset>;
}

/// Sending half handed to a producer thread.
pub(crate) struct Emitter {
    tx: mpsc::Sender<CandidateAsset>,
    cancel: CancellationToken,
}

impl Emitter {
    pub(crate) fn is_cancelled(&self) -> bool {
        self.cancel.is_cancelled()
    }

    /// Blocks until the driver accepts the candidate. Returns false when the
    /// producer should stop.
    pub(crate) fn emit(&self, asset: CandidateAsset) -> bool {
        if self.is_cancelled() {
            return false;
        }
        self.tx.blocking_send(asset).is_ok()
    }
}

pub(crate) fn spawn_producer<F>(
    name: &str,
    capacity: usize,
    cancel: CancellationToken,
    produce: F,
) -> mpsc::Receiver<CandidateAsset>
where
    F: FnOnce(&Emitter) + Send + 'static,
{
    let (tx, rx) = mpsc::channel(mediasync_config::clamp_channel_capacity(capacity));
    let emitter = Emitter { tx, cancel };
    let spawned = thread::Builder::new().name(name.to_string()).spawn(move || {
        produce(&emitter);
        debug!("Producer finished");
    });
    if let Err(e) = spawned {
        // The sender went down with the closure, so the receiver just ends.
        error!("Failed to start {}: {}", name, e);
    }
    rx
}
