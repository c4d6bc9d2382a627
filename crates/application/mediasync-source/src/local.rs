use crate::date_hint::date_from_name;
use crate::{spawn_producer, CandidateAsset, Emitter, SourceBrowser};
use mediasync_config::DEFAULT_CHANNEL_CAPACITY;
use mediasync_core::media::is_supported_media;
use mediasync_core::path_utils::AssetPath;
use mediasync_core::AssetInfo;
use mediasync_fs::MergedFs;
use std::sync::Arc;
use tokio::sync::mpsc;
use tokio_util::sync::CancellationToken;
use tracing::{debug, info, warn};

/// Plain folders and archives: every media file is a candidate, no sidecars.
pub struct LocalFolderBrowser {
    fs: Arc<MergedFs>,
    capacity: usize,
    album_from_folder: bool,
}

impl LocalFolderBrowser {
    pub fn new(fs: Arc<MergedFs>) -> Self {
        Self {
            fs,
            capacity: DEFAULT_CHANNEL_CAPACITY,
            album_from_folder: false,
        }
    }

    pub fn with_capacity(mut self, capacity: usize) -> Self {
        self.capacity = capacity;
        self
    }

    /// Attach the containing folder name as an album.
    pub fn album_from_folder(mut self, enabled: bool) -> Self {
        self.album_from_folder = enabled;
        self
    }

    fn candidate(&self, path: &str) -> Option<CandidateAsset> {
        let meta = match self.fs.stat(path) {
            Ok(m) => m,
            Err(e) => {
                warn!("Skipping {}: {}", path, e);
                return None;
            }
        };

        let name = AssetPath::base_name(path);
        let date_taken = date_from_name(name).or(meta.modified);
        if date_taken.is_none() {
            debug!("No capture date for {}", path);
        }

        let mut info = AssetInfo {
            file_name: path.to_string(),
            title: name.to_string(),
            size: meta.size,
            date_taken,
            ..AssetInfo::default()
        };
        if self.album_from_folder {
            info.add_album(AssetPath::base_name(AssetPath::parent(path)));
        }
        Some(CandidateAsset::new(info, self.fs.clone()))
    }

    fn produce(&self, out: &Emitter) {
        let files = self.fs.walk();
        info!("Browsing {} files across {} roots", files.len(), self.fs.root_count());

        let mut emitted = 0usize;
        for path in &files {
            if out.is_cancelled() {
                info!("Browse cancelled after {} candidates", emitted);
                return;
            }
            if !is_supported_media(AssetPath::extension(path)) {
                debug!("Not a media file: {}", path);
                continue;
            }
            let Some(candidate) = self.candidate(path) else {
                continue;
            };
            if !out.emit(candidate) {
                return;
            }
            emitted += 1;
        }
        info!("Browse complete: {} candidates", emitted);
    }
}

impl SourceBrowser for LocalFolderBrowser {
    fn browse(self: Box<Self>, cancel: CancellationToken) -> mpsc::Receiver<CandidateAsset> {
        let capacity = self.capacity;
        spawn_producer("mediasync-browse-local", capacity, cancel, move |out| {
            self.produce(out)
        })
    }
}
