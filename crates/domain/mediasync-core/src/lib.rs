use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};

pub mod filters;
pub mod fingerprint;
pub mod index;
pub mod media;
pub mod path_utils;

pub use filters::{DateRange, ExtensionList, FilterError, InclusionFilter};
pub use fingerprint::Fingerprint;
pub use index::{Advice, AssetIndex};
pub use media::MediaType;

use path_utils::AssetPath;

/// Opaque identifier handed out by the remote catalog.
pub type RemoteId = String;

/// Everything a browser knows about one local file before reconciliation.
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
pub struct AssetInfo {
    /// Normalized path inside the merged source tree.
    pub file_name: String,
    pub title: String,
    pub size: u64,
    pub date_taken: Option<DateTime<Utc>>,
    /// Album memberships, in discovery order, without duplicates.
    #[serde(default)]
    pub albums: Vec<String>,
    #[serde(default)]
    pub from_partner: bool,
    #[serde(default)]
    pub trashed: bool,
    #[serde(default)]
    pub archived: bool,
}

impl AssetInfo {
    pub fn extension(&self) -> &str {
        AssetPath::extension(&self.file_name)
    }

    /// Title used for matching. Sidecar titles sometimes drop the extension,
    /// in which case the file's own extension is appended.
    pub fn matching_title(&self) -> String {
        let title = if self.title.is_empty() {
            AssetPath::base_name(&self.file_name)
        } else {
            AssetPath::base_name(&self.title)
        };
        if AssetPath::extension(title).is_empty() {
            format!("{title}{}", self.extension())
        } else {
            title.to_string()
        }
    }

    pub fn in_album(&self, name: &str) -> bool {
        self.albums.iter().any(|a| a == name)
    }

    pub fn add_album(&mut self, name: &str) {
        if !name.is_empty() && !self.in_album(name) {
            self.albums.push(name.to_string());
        }
    }
}

/// A record from the remote catalog listing.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct RemoteAsset {
    pub id: RemoteId,
    pub title: String,
    #[serde(default)]
    pub device_id: String,
    pub size: u64,
    #[serde(default)]
    pub checksum: Option<String>,
    #[serde(default)]
    pub date_taken: Option<DateTime<Utc>>,
    /// Set when this record was created by an upload of the current run.
    #[serde(skip)]
    pub just_uploaded: bool,
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct Album {
    pub id: RemoteId,
    pub name: String,
    #[serde(default)]
    pub asset_ids: Vec<RemoteId>,
}
