use crate::filters::{ExtensionList, FilterError};
use serde::{Deserialize, Serialize};
use std::str::FromStr;

const VIDEO_EXTENSIONS: &[&str] = &[
    ".3gp", ".avi", ".flv", ".insv", ".m2ts", ".m4v", ".mkv", ".mov", ".mp4", ".mpg", ".mts",
    ".webm", ".wmv",
];

const PICTURE_EXTENSIONS: &[&str] = &[
    ".3fr", ".ari", ".arw", ".avif", ".bmp", ".cap", ".cin", ".cr2", ".cr3", ".crw", ".dcr",
    ".dng", ".erf", ".fff", ".gif", ".heic", ".heif", ".hif", ".iiq", ".insp", ".jpe", ".jpeg",
    ".jpg", ".jxl", ".k25", ".kdc", ".mrw", ".nef", ".orf", ".ori", ".pef", ".png", ".psd",
    ".raf", ".raw", ".rw2", ".rwl", ".sr2", ".srf", ".srw", ".tif", ".tiff", ".webp", ".x3f",
];

/// Sidecars travel with their media file whatever type group is selected.
const SIDECAR_EXTENSIONS: &[&str] = &[".xmp", ".json"];

#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum MediaType {
    Video,
    Picture,
}

impl MediaType {
    /// The fixed extension set a `--include-type` shortcut expands to.
    pub fn extensions(self) -> ExtensionList {
        let group = match self {
            MediaType::Video => VIDEO_EXTENSIONS,
            MediaType::Picture => PICTURE_EXTENSIONS,
        };
        ExtensionList::new(group.iter().chain(SIDECAR_EXTENSIONS))
    }

    pub fn of_extension(ext: &str) -> Option<MediaType> {
        let matches = |list: &[&str]| list.iter().any(|e| e.eq_ignore_ascii_case(ext));
        if matches(PICTURE_EXTENSIONS) {
            Some(MediaType::Picture)
        } else if matches(VIDEO_EXTENSIONS) {
            Some(MediaType::Video)
        } else {
            None
        }
    }
}

impl FromStr for MediaType {
    type Err = FilterError;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        match s.trim().to_ascii_lowercase().as_str() {
            "video" | "videos" => Ok(MediaType::Video),
            "picture" | "pictures" | "image" | "photo" => Ok(MediaType::Picture),
            other => Err(FilterError::UnknownMediaType(other.to_string())),
        }
    }
}

pub fn is_supported_media(ext: &str) -> bool {
    MediaType::of_extension(ext).is_some()
}
