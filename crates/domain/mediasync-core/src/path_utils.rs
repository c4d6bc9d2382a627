pub struct AssetPath;

impl AssetPath {
    /// Forward slashes, no leading `./` or `/`, no empty segments.
    /// This is the key format used by every root of the merged tree.
    pub fn normalize(path: &str) -> String {
        path.replace('\\', "/")
            .split('/')
            .filter(|seg| !seg.is_empty() && *seg != ".")
            .collect::<Vec<_>>()
            .join("/")
    }

    pub fn base_name(path: &str) -> &str {
        path.rsplit('/').next().unwrap_or(path)
    }

    /// Parent directory of a normalized path, `""` for top-level entries.
    pub fn parent(path: &str) -> &str {
        path.rfind('/').map(|i| &path[..i]).unwrap_or("")
    }

    pub fn join(dir: &str, name: &str) -> String {
        if dir.is_empty() {
            name.to_string()
        } else {
            format!("{dir}/{name}")
        }
    }

    /// Dot-prefixed extension of the last segment, `""` when there is none.
    /// Dotfiles such as `.nomedia` have no extension.
    pub fn extension(path: &str) -> &str {
        let name = Self::base_name(path);
        match name.rfind('.') {
            Some(0) | None => "",
            Some(i) => &name[i..],
        }
    }

    pub fn stem(path: &str) -> &str {
        let name = Self::base_name(path);
        let ext = Self::extension(name);
        &name[..name.len() - ext.len()]
    }

    /// Reject entries that would escape a root, e.g. crafted archive members.
    pub fn verify_safe(rel_path: &str) -> bool {
        let p = std::path::Path::new(rel_path);
        !p.is_absolute()
            && !p
                .components()
                .any(|c| matches!(c, std::path::Component::ParentDir))
    }
}

#[cfg(test)]
mod tests {
    use super::AssetPath;

    #[test]
    fn normalize_strips_separators_and_dots() {
        assert_eq!(
            AssetPath::normalize(".\\Takeout\\Google Photos//a.jpg"),
            "Takeout/Google Photos/a.jpg"
        );
        assert_eq!(AssetPath::normalize("/a/./b/"), "a/b");
    }

    #[test]
    fn extension_and_stem() {
        assert_eq!(AssetPath::extension("dir/IMG_1.JPG"), ".JPG");
        assert_eq!(AssetPath::stem("dir/IMG_1.JPG"), "IMG_1");
        assert_eq!(AssetPath::extension("dir/.nomedia"), "");
        assert_eq!(AssetPath::extension("IMG_1.jpg.json"), ".json");
        assert_eq!(AssetPath::stem("IMG_1.jpg.json"), "IMG_1.jpg");
    }

    #[test]
    fn parent_of_top_level_is_empty() {
        assert_eq!(AssetPath::parent("a.jpg"), "");
        assert_eq!(AssetPath::parent("album/a.jpg"), "album");
    }

    #[test]
    fn verify_safe_rejects_traversal() {
        assert!(AssetPath::verify_safe("album/a.jpg"));
        assert!(!AssetPath::verify_safe("../a.jpg"));
        assert!(!AssetPath::verify_safe("/etc/passwd"));
    }
}
