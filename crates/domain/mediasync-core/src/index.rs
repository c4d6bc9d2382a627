use std::collections::HashMap;

use tracing::debug;

use crate::fingerprint::Fingerprint;
use crate::{AssetInfo, RemoteAsset, RemoteId};

/// Outcome of one reconciliation query.
#[derive(Debug, Clone, PartialEq)]
pub enum Advice {
    NotOnServer,
    /// The local file is bigger; upload it and retire the carried record.
    SmallerOnServer(RemoteAsset),
    SameOnServer(RemoteAsset),
}

impl Advice {
    pub fn reason(&self) -> &'static str {
        match self {
            Advice::NotOnServer => "no matching asset on server",
            Advice::SmallerOnServer(_) => "server copy is smaller, replacing it",
            Advice::SameOnServer(_) => "equivalent asset already on server",
        }
    }

    pub fn server_asset(&self) -> Option<&RemoteAsset> {
        match self {
            Advice::NotOnServer => None,
            Advice::SmallerOnServer(a) | Advice::SameOnServer(a) => Some(a),
        }
    }
}

/// Remote catalog state keyed by fingerprint, one record per key.
#[derive(Debug, Default)]
pub struct AssetIndex {
    device_id: String,
    by_fingerprint: HashMap<Fingerprint, RemoteAsset>,
}

impl AssetIndex {
    pub fn new(device_id: impl Into<String>) -> Self {
        Self {
            device_id: device_id.into(),
            by_fingerprint: HashMap::new(),
        }
    }

    /// Build from a full remote listing. When the listing holds several
    /// records for one fingerprint the biggest is kept.
    pub fn seed(device_id: impl Into<String>, records: impl IntoIterator<Item = RemoteAsset>) -> Self {
        let mut index = Self::new(device_id);
        for record in records {
            let key = Fingerprint::of_remote(&record);
            match index.by_fingerprint.get(&key) {
                Some(existing) if existing.size >= record.size => {
                    debug!("Listing has duplicate {key}, keeping {}", existing.id);
                }
                _ => {
                    index.by_fingerprint.insert(key, record);
                }
            }
        }
        index
    }

    pub fn device_id(&self) -> &str {
        &self.device_id
    }

    pub fn len(&self) -> usize {
        self.by_fingerprint.len()
    }

    pub fn is_empty(&self) -> bool {
        self.by_fingerprint.is_empty()
    }

    pub fn fingerprint_of(&self, asset: &AssetInfo) -> Fingerprint {
        Fingerprint::of_local(&self.device_id, asset)
    }

    pub fn get(&self, key: &Fingerprint) -> Option<&RemoteAsset> {
        self.by_fingerprint.get(key)
    }

    pub fn should_upload(&self, asset: &AssetInfo) -> Advice {
        match self.by_fingerprint.get(&self.fingerprint_of(asset)) {
            None => Advice::NotOnServer,
            Some(record) if asset.size > record.size => Advice::SmallerOnServer(record.clone()),
            Some(record) => Advice::SameOnServer(record.clone()),
        }
    }

    /// Record an acknowledged upload. Replaces whatever the fingerprint held
    /// and returns it.
    pub fn add_local_asset(&mut self, asset: &AssetInfo, id: RemoteId) -> Option<RemoteAsset> {
        let key = self.fingerprint_of(asset);
        let record = RemoteAsset {
            id,
            title: asset.matching_title(),
            device_id: self.device_id.clone(),
            size: asset.size,
            checksum: None,
            date_taken: asset.date_taken,
            just_uploaded: true,
        };
        self.by_fingerprint.insert(key, record)
    }
}
