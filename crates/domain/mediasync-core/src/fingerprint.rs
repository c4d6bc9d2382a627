use std::fmt;

use crate::path_utils::AssetPath;
use crate::{AssetInfo, RemoteAsset};

/// Matching key for the asset index: uploading device plus normalized title.
///
/// Only metadata available before downloading anything is used, so two
/// different files sharing a name on the same device collide.
#[derive(Debug, Clone, PartialEq, Eq, Hash, PartialOrd, Ord)]
pub struct Fingerprint {
    device_id: String,
    title: String,
}

impl Fingerprint {
    pub fn new(device_id: &str, title: &str) -> Self {
        Self {
            device_id: device_id.to_string(),
            title: normalize_title(title),
        }
    }

    pub fn of_local(device_id: &str, asset: &AssetInfo) -> Self {
        Self::new(device_id, &asset.matching_title())
    }

    pub fn of_remote(asset: &RemoteAsset) -> Self {
        Self::new(&asset.device_id, &asset.title)
    }

    pub fn device_id(&self) -> &str {
        &self.device_id
    }

    pub fn title(&self) -> &str {
        &self.title
    }
}

impl fmt::Display for Fingerprint {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{}:{}", self.device_id, self.title)
    }
}

/// Base name, lowercased, whitespace removed.
pub fn normalize_title(title: &str) -> String {
    AssetPath::base_name(&AssetPath::normalize(title))
        .chars()
        .filter(|c| !c.is_whitespace())
        .flat_map(char::to_lowercase)
        .collect()
}
