use chrono::{DateTime, Utc};
use serde::Deserialize;
use serde_json::Value;

/// Takeout JSON metadata, either for one media file or (`metadata.json`)
/// for a whole album directory.
#[derive(Debug, Clone, Default, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct Sidecar {
    #[serde(default)]
    pub title: String,
    #[serde(default)]
    pub photo_taken_time: Option<TakeoutTime>,
    #[serde(default)]
    pub creation_time: Option<TakeoutTime>,
    #[serde(default)]
    pub trashed: bool,
    #[serde(default)]
    pub archived: bool,
    #[serde(default)]
    pub google_photos_origin: Option<Origin>,
}

#[derive(Debug, Clone, Deserialize)]
pub struct TakeoutTime {
    /// Seconds since the epoch. Exports write it as a string, older ones as a number.
    pub timestamp: Value,
}

#[derive(Debug, Clone, Default, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct Origin {
    #[serde(default)]
    pub from_partner_sharing: Option<Value>,
}

impl TakeoutTime {
    pub fn to_datetime(&self) -> Option<DateTime<Utc>> {
        let secs = match &self.timestamp {
            Value::String(s) => s.trim().parse::<i64>().ok()?,
            Value::Number(n) => n.as_i64()?,
            _ => return None,
        };
        // Zero marks an unknown date.
        if secs == 0 {
            return None;
        }
        DateTime::from_timestamp(secs, 0)
    }
}

impl Sidecar {
    pub fn parse(bytes: &[u8]) -> Result<Self, serde_json::Error> {
        serde_json::from_slice(bytes)
    }

    pub fn taken_at(&self) -> Option<DateTime<Utc>> {
        self.photo_taken_time.as_ref().and_then(TakeoutTime::to_datetime)
    }

    pub fn from_partner(&self) -> bool {
        self.google_photos_origin
            .as_ref()
            .is_some_and(|o| o.from_partner_sharing.is_some())
    }

    /// Album descriptors carry a title but no capture time.
    pub fn describes_album(&self) -> bool {
        self.photo_taken_time.is_none() && !self.title.is_empty()
    }
}

pub fn is_album_metadata_name(name: &str) -> bool {
    name.eq_ignore_ascii_case("metadata.json")
}
