use crate::{spawn_producer, BrowseError, CandidateAsset, Emitter, SourceBrowser};
use chrono::{DateTime, Utc};
use mediasync_config::DEFAULT_CHANNEL_CAPACITY;
use mediasync_core::media::is_supported_media;
use mediasync_core::path_utils::AssetPath;
use mediasync_core::AssetInfo;
use mediasync_fs::{FsError, MergedFs};
use std::collections::{BTreeMap, HashMap};
use std::io::Read;
use std::sync::Arc;
use tokio::sync::mpsc;
use tokio_util::sync::CancellationToken;
use tracing::{debug, info, warn};

pub mod pairing;
pub mod sidecar;

pub use pairing::{Pairing, PairingRules, SidecarName};
pub use sidecar::Sidecar;

use sidecar::is_album_metadata_name;

/// Google Takeout exports: one directory per album, JSON sidecars next to
/// the media files, the same photo repeated across album and year folders.
pub struct TakeoutBrowser {
    fs: Arc<MergedFs>,
    rules: PairingRules,
    capacity: usize,
}

/// One occurrence of a media file in the export.
#[derive(Debug, Clone)]
struct Occurrence {
    path: String,
    size: u64,
    modified: Option<DateTime<Utc>>,
    sidecar: Option<Sidecar>,
    album: Option<String>,
}

#[derive(Debug, Default)]
struct DirListing {
    media: Vec<String>,
    sidecars: Vec<String>,
}

impl TakeoutBrowser {
    pub fn new(fs: Arc<MergedFs>) -> Self {
        Self {
            fs,
            rules: PairingRules::default(),
            capacity: DEFAULT_CHANNEL_CAPACITY,
        }
    }

    pub fn with_rules(mut self, rules: PairingRules) -> Self {
        self.rules = rules;
        self
    }

    pub fn with_capacity(mut self, capacity: usize) -> Self {
        self.capacity = capacity;
        self
    }

    /// Index the whole export. Returns merged assets in discovery order, or
    /// `None` when cancelled part way.
    fn collect(&self, out: &Emitter) -> Option<Vec<AssetInfo>> {
        let mut dirs: BTreeMap<String, DirListing> = BTreeMap::new();
        for path in self.fs.walk() {
            let name = AssetPath::base_name(&path).to_string();
            let ext = AssetPath::extension(&name);
            let listing = dirs.entry(AssetPath::parent(&path).to_string()).or_default();
            if is_supported_media(ext) {
                listing.media.push(name);
            } else if ext.eq_ignore_ascii_case(".json") {
                listing.sidecars.push(name);
            } else {
                debug!("Not a media file: {}", path);
            }
        }

        let mut found = Vec::new();
        for (dir, listing) in &dirs {
            if out.is_cancelled() {
                return None;
            }
            found.extend(self.index_dir(dir, listing));
        }
        info!("Indexed {} media files in {} directories", found.len(), dirs.len());

        self.merge_duplicates(found, out)
    }

    fn index_dir(&self, dir: &str, listing: &DirListing) -> Vec<Occurrence> {
        let mut album_title = None;
        let mut names = Vec::new();
        let mut parsed = Vec::new();

        for name in &listing.sidecars {
            let path = AssetPath::join(dir, name);
            match self.load_sidecar(&path) {
                Ok(s) if is_album_metadata_name(name) && s.describes_album() => {
                    album_title = Some(s.title);
                }
                Ok(s) => {
                    names.push(SidecarName::new(name.as_str(), s.title.as_str()));
                    parsed.push(s);
                }
                Err(e) => warn!("Ignoring sidecar: {}", e),
            }
        }
        let album = album_name(dir, album_title);

        let mut paired: Vec<Option<usize>> = vec![None; listing.media.len()];
        let mut claimed = vec![false; names.len()];
        for (m, media) in listing.media.iter().enumerate() {
            if let Some((i, how)) = self.rules.exact_match(media, &names) {
                debug!("{} paired with {} ({:?})", media, names[i].file_name, how);
                paired[m] = Some(i);
                claimed[i] = true;
            }
        }
        for (m, media) in listing.media.iter().enumerate() {
            if paired[m].is_some() {
                continue;
            }
            if let Some((i, how)) = self.rules.fallback_match(media, &names, &claimed) {
                debug!("{} paired with {} ({:?})", media, names[i].file_name, how);
                paired[m] = Some(i);
                claimed[i] = true;
            }
        }
        for (i, used) in claimed.iter().enumerate() {
            if !used {
                debug!("Sidecar {} matches no media file, ignored", AssetPath::join(dir, &names[i].file_name));
            }
        }

        let mut found = Vec::with_capacity(listing.media.len());
        for (m, media) in listing.media.iter().enumerate() {
            let path = AssetPath::join(dir, media);
            let meta = match self.fs.stat(&path) {
                Ok(meta) => meta,
                Err(e) => {
                    warn!("Skipping {}: {}", path, e);
                    continue;
                }
            };
            let sidecar = paired[m].map(|i| parsed[i].clone());
            if sidecar.is_none() {
                let e = BrowseError::MetadataUnavailable {
                    path: path.clone(),
                    reason: "no sidecar".into(),
                };
                warn!("{}, using file timestamp", e);
            }
            found.push(Occurrence {
                path,
                size: meta.size,
                modified: meta.modified,
                sidecar,
                album: album.clone(),
            });
        }
        found
    }

    fn load_sidecar(&self, path: &str) -> Result<Sidecar, BrowseError> {
        let bytes = self.fs.read(path)?;
        Sidecar::parse(&bytes).map_err(|e| BrowseError::MetadataUnavailable {
            path: path.to_string(),
            reason: e.to_string(),
        })
    }

    /// Same name and size is a suspected copy; equal content confirms it.
    fn merge_duplicates(&self, found: Vec<Occurrence>, out: &Emitter) -> Option<Vec<AssetInfo>> {
        let mut order: Vec<Vec<usize>> = Vec::new();
        let mut by_signature: HashMap<(String, u64), usize> = HashMap::new();
        for (i, occ) in found.iter().enumerate() {
            let key = (AssetPath::base_name(&occ.path).to_lowercase(), occ.size);
            match by_signature.get(&key) {
                Some(&g) => order[g].push(i),
                None => {
                    by_signature.insert(key, order.len());
                    order.push(vec![i]);
                }
            }
        }

        let mut assets = Vec::with_capacity(order.len());
        for group in order {
            if out.is_cancelled() {
                return None;
            }
            if group.len() == 1 {
                assets.push(merge(&found, &group));
                continue;
            }
            for cluster in self.split_by_content(&found, &group) {
                if cluster.len() > 1 {
                    debug!("{} copies of {} merged", cluster.len(), found[cluster[0]].path);
                }
                assets.push(merge(&found, &cluster));
            }
        }
        Some(assets)
    }

    fn split_by_content(&self, found: &[Occurrence], group: &[usize]) -> Vec<Vec<usize>> {
        let mut clusters: Vec<(Option<String>, Vec<usize>)> = Vec::new();
        for &i in group {
            let digest = match content_digest(&self.fs, &found[i].path) {
                Ok(d) => Some(d),
                Err(e) => {
                    warn!("Cannot hash {}: {}", found[i].path, e);
                    None
                }
            };
            let slot = digest
                .as_ref()
                .and_then(|d| clusters.iter().position(|(c, _)| c.as_ref() == Some(d)));
            match slot {
                Some(k) => clusters[k].1.push(i),
                None => clusters.push((digest, vec![i])),
            }
        }
        clusters.into_iter().map(|(_, members)| members).collect()
    }

    fn produce(&self, out: &Emitter) {
        let Some(assets) = self.collect(out) else {
            info!("Browse cancelled while indexing");
            return;
        };
        info!("Browsing {} distinct assets", assets.len());

        let mut emitted = 0usize;
        for info in assets {
            if !out.emit(CandidateAsset::new(info, self.fs.clone())) {
                info!("Browse stopped after {} candidates", emitted);
                return;
            }
            emitted += 1;
        }
        info!("Browse complete: {} candidates", emitted);
    }
}

impl SourceBrowser for TakeoutBrowser {
    fn browse(self: Box<Self>, cancel: CancellationToken) -> mpsc::Receiver<CandidateAsset> {
        let capacity = self.capacity;
        spawn_producer("mediasync-browse-takeout", capacity, cancel, move |out| {
            self.produce(out)
        })
    }
}

/// Folder name, or the album title from `metadata.json`. Year folders are
/// not albums.
fn album_name(dir: &str, title: Option<String>) -> Option<String> {
    let folder = AssetPath::base_name(dir);
    if folder.is_empty() || is_year_folder(folder) {
        return None;
    }
    match title {
        Some(t) if !t.trim().is_empty() => Some(t),
        _ => Some(folder.to_string()),
    }
}

fn is_year_folder(folder: &str) -> bool {
    folder
        .strip_prefix("Photos from ")
        .is_some_and(|y| y.len() == 4 && y.bytes().all(|b| b.is_ascii_digit()))
}

/// Primary occurrence is the first one with a sidecar.
fn merge(found: &[Occurrence], members: &[usize]) -> AssetInfo {
    let primary = members
        .iter()
        .map(|&i| &found[i])
        .find(|o| o.sidecar.is_some())
        .unwrap_or(&found[members[0]]);
    let sidecar = primary.sidecar.as_ref();

    let title = sidecar
        .map(|s| s.title.trim())
        .filter(|t| !t.is_empty())
        .unwrap_or_else(|| AssetPath::base_name(&primary.path));

    let mut info = AssetInfo {
        file_name: primary.path.clone(),
        title: title.to_string(),
        size: primary.size,
        date_taken: sidecar.and_then(Sidecar::taken_at).or(primary.modified),
        albums: Vec::new(),
        from_partner: sidecar.is_some_and(Sidecar::from_partner),
        trashed: sidecar.is_some_and(|s| s.trashed),
        archived: sidecar.is_some_and(|s| s.archived),
    };
    for &i in members {
        if let Some(album) = &found[i].album {
            info.add_album(album);
        }
    }
    info
}

fn content_digest(fs: &MergedFs, path: &str) -> Result<String, FsError> {
    let mut reader = fs.open(path)?;
    let mut hasher = md5::Context::new();
    let mut buf = vec![0u8; 64 * 1024];
    loop {
        let n = reader.read(&mut buf)?;
        if n == 0 {
            break;
        }
        hasher.consume(&buf[..n]);
    }
    Ok(format!("{:X}", hasher.finalize()))
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn year_folders_carry_no_album() {
        assert_eq!(album_name("Takeout/Google Photos/Photos from 2019", None), None);
        assert_eq!(album_name("", None), None);
        assert_eq!(
            album_name("Takeout/Google Photos/Photos from the trip", None),
            Some("Photos from the trip".to_string())
        );
    }

    #[test]
    fn metadata_title_overrides_folder() {
        assert_eq!(
            album_name("Takeout/Google Photos/Trip(1)", Some("Trip".into())),
            Some("Trip".to_string())
        );
        assert_eq!(
            album_name("Takeout/Google Photos/Trip", Some("  ".into())),
            Some("Trip".to_string())
        );
    }

    #[test]
    fn merge_prefers_occurrence_with_sidecar() {
        let with_sidecar = Sidecar {
            title: "beach.jpg".into(),
            trashed: true,
            ..Sidecar::default()
        };
        let found = vec![
            Occurrence {
                path: "Photos from 2019/beach.jpg".into(),
                size: 10,
                modified: None,
                sidecar: None,
                album: None,
            },
            Occurrence {
                path: "Trip/beach.jpg".into(),
                size: 10,
                modified: None,
                sidecar: Some(with_sidecar),
                album: Some("Trip".into()),
            },
        ];
        let info = merge(&found, &[0, 1]);
        assert_eq!(info.file_name, "Trip/beach.jpg");
        assert!(info.trashed);
        assert_eq!(info.albums, vec!["Trip".to_string()]);
    }
}
