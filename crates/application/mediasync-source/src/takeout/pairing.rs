use mediasync_config::{DEFAULT_MIN_SIDECAR_PREFIX, DEFAULT_SIDECAR_NAME_LIMIT};
use mediasync_core::media::is_supported_media;
use mediasync_core::path_utils::AssetPath;

const JSON: &str = ".json";

/// Limits Takeout applies when it shortens long sidecar names.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct PairingRules {
    /// Longest sidecar file name, `.json` included.
    pub max_sidecar_name_len: usize,
    /// Shortest stem the prefix fallback will trust.
    pub min_prefix_len: usize,
}

impl Default for PairingRules {
    fn default() -> Self {
        Self {
            max_sidecar_name_len: DEFAULT_SIDECAR_NAME_LIMIT,
            min_prefix_len: DEFAULT_MIN_SIDECAR_PREFIX,
        }
    }
}

/// A sidecar of the directory being paired.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct SidecarName {
    pub file_name: String,
    /// `title` field of the sidecar, empty if it has none.
    pub title: String,
}

impl SidecarName {
    pub fn new(file_name: impl Into<String>, title: impl Into<String>) -> Self {
        Self {
            file_name: file_name.into(),
            title: title.into(),
        }
    }
}

/// How a media file found its sidecar.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Pairing {
    /// `X.ext.json`
    Exact,
    /// `X.json`
    Stem,
    /// `X(n).ext` with `X.ext(n).json`
    Numbered,
    /// `X.mp4` shares `X.heic.json` with its still image
    LivePhoto,
    /// `X-edited.ext` borrows the sidecar of `X.ext`
    Edited,
    /// The sidecar's `title` names the media file
    Title,
    /// The expected name, cut to the length limit
    Truncated,
    /// Longest sidecar stem that starts the media name
    Prefix,
}

impl PairingRules {
    /// Name-based rules. A sidecar may serve several media files here
    /// (live photos, edited copies).
    pub fn exact_match(&self, media: &str, sidecars: &[SidecarName]) -> Option<(usize, Pairing)> {
        let lookup = |name: &str| sidecars.iter().position(|s| s.file_name == name);
        let stem = AssetPath::stem(media);
        let ext = AssetPath::extension(media);

        if let Some(i) = lookup(&format!("{media}{JSON}")) {
            return Some((i, Pairing::Exact));
        }
        if let Some(i) = lookup(&format!("{stem}{JSON}")) {
            return Some((i, Pairing::Stem));
        }
        if let Some((base, n)) = split_counter(stem) {
            if let Some(i) = lookup(&format!("{base}{ext}({n}){JSON}")) {
                return Some((i, Pairing::Numbered));
            }
        }
        let shared = sidecars.iter().position(|s| {
            s.file_name.strip_suffix(JSON).is_some_and(|inner| {
                AssetPath::stem(inner) == stem && is_supported_media(AssetPath::extension(inner))
            })
        });
        if let Some(i) = shared {
            return Some((i, Pairing::LivePhoto));
        }
        if let Some(base) = stem.strip_suffix("-edited") {
            let original = format!("{base}{ext}");
            if let Some((i, _)) = self.exact_match(&original, sidecars) {
                return Some((i, Pairing::Edited));
            }
        }
        None
    }

    /// Fallback rules, only over sidecars no other file has claimed.
    pub fn fallback_match(
        &self,
        media: &str,
        sidecars: &[SidecarName],
        claimed: &[bool],
    ) -> Option<(usize, Pairing)> {
        let free = |i: usize| !claimed.get(i).copied().unwrap_or(false);

        if let Some(i) = (0..sidecars.len()).find(|&i| free(i) && sidecars[i].title == media) {
            return Some((i, Pairing::Title));
        }

        let expected = format!("{media}{JSON}");
        if expected.chars().count() > self.max_sidecar_name_len {
            let keep = self.max_sidecar_name_len.saturating_sub(JSON.len());
            let cut: String = media.chars().take(keep).collect();
            let truncated = format!("{cut}{JSON}");
            if let Some(i) = (0..sidecars.len()).find(|&i| free(i) && sidecars[i].file_name == truncated) {
                return Some((i, Pairing::Truncated));
            }
        }

        (0..sidecars.len())
            .filter(|&i| free(i))
            .filter_map(|i| {
                let prefix = sidecars[i].file_name.strip_suffix(JSON)?;
                let long_enough = prefix.chars().count() >= self.min_prefix_len;
                (long_enough && media.starts_with(prefix)).then_some((i, prefix.len()))
            })
            .max_by_key(|&(_, len)| len)
            .map(|(i, _)| (i, Pairing::Prefix))
    }
}

/// `IMG_0001(2)` -> (`IMG_0001`, `2`)
fn split_counter(stem: &str) -> Option<(&str, &str)> {
    let inner = stem.strip_suffix(')')?;
    let open = inner.rfind('(')?;
    let n = &inner[open + 1..];
    if n.is_empty() || !n.bytes().all(|b| b.is_ascii_digit()) {
        return None;
    }
    Some((&inner[..open], n))
}
