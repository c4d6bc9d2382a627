use std::fs;
use std::io::Write;
use std::sync::Arc;

use camino::{Utf8Path, Utf8PathBuf};
use chrono::{TimeZone, Utc};
use filetime::FileTime;
use mediasync_fs::MergedFs;
use mediasync_source::{CandidateAsset, PairingRules, SourceBrowser, TakeoutBrowser};
use tempfile::tempdir;
use tokio_util::sync::CancellationToken;
use zip::write::SimpleFileOptions;

const GP: &str = "Takeout/Google Photos";
const TAKEN: i64 = 1_565_008_496;

// --- Helper Functions ---

fn utf8(p: &std::path::Path) -> Utf8PathBuf {
    Utf8PathBuf::from_path_buf(p.to_path_buf()).unwrap()
}

fn write_file(root: &Utf8Path, rel: &str, contents: &[u8]) -> Utf8PathBuf {
    let path = root.join(rel);
    fs::create_dir_all(path.parent().unwrap()).unwrap();
    fs::write(&path, contents).unwrap();
    path
}

fn sidecar(title: &str, taken: i64) -> Vec<u8> {
    format!(r#"{{"title": "{title}", "photoTakenTime": {{"timestamp": "{taken}"}}}}"#).into_bytes()
}

fn browse_paths(paths: &[Utf8PathBuf], rules: PairingRules) -> Vec<CandidateAsset> {
    let fs = Arc::new(MergedFs::open_paths(paths).unwrap());
    let browser = Box::new(TakeoutBrowser::new(fs).with_rules(rules));
    let mut rx = browser.browse(CancellationToken::new());
    let mut out = Vec::new();
    while let Some(c) = rx.blocking_recv() {
        out.push(c);
    }
    out
}

fn browse(root: &Utf8Path) -> Vec<CandidateAsset> {
    browse_paths(&[root.to_owned()], PairingRules::default())
}

// --- Tests ---

#[test]
fn sidecar_date_wins_over_mtime() {
    let dir = tempdir().unwrap();
    let root = utf8(dir.path());
    let media = write_file(&root, &format!("{GP}/Trip/IMG_0001.jpg"), b"jpeg");
    write_file(&root, &format!("{GP}/Trip/IMG_0001.jpg.json"), &sidecar("IMG_0001.jpg", TAKEN));
    filetime::set_file_mtime(&media, FileTime::from_unix_time(978_307_200, 0)).unwrap();

    let found = browse(&root);
    assert_eq!(found.len(), 1);
    let info = &found[0].info;
    assert_eq!(info.title, "IMG_0001.jpg");
    assert_eq!(info.date_taken, Some(Utc.timestamp_opt(TAKEN, 0).unwrap()));
    assert_eq!(info.albums, vec!["Trip".to_string()]);
}

#[test]
fn missing_sidecar_falls_back_to_mtime() {
    let dir = tempdir().unwrap();
    let root = utf8(dir.path());
    let media = write_file(&root, &format!("{GP}/Trip/lonely.jpg"), b"jpeg");
    write_file(&root, &format!("{GP}/Trip/orphan.png.json"), &sidecar("orphan.png", TAKEN));
    filetime::set_file_mtime(&media, FileTime::from_unix_time(978_307_200, 0)).unwrap();

    let found = browse(&root);
    assert_eq!(found.len(), 1);
    assert_eq!(found[0].info.title, "lonely.jpg");
    assert_eq!(found[0].info.date_taken, Some(Utc.timestamp_opt(978_307_200, 0).unwrap()));
}

#[test]
fn album_metadata_title_and_year_folders() {
    let dir = tempdir().unwrap();
    let root = utf8(dir.path());
    write_file(&root, &format!("{GP}/Trip(1)/metadata.json"), br#"{"title": "Summer Trip"}"#);
    write_file(&root, &format!("{GP}/Trip(1)/a.jpg"), b"aaaa");
    write_file(&root, &format!("{GP}/Trip(1)/a.jpg.json"), &sidecar("a.jpg", TAKEN));
    write_file(&root, &format!("{GP}/Photos from 2019/b.jpg"), b"bbbb");
    write_file(&root, &format!("{GP}/Photos from 2019/b.jpg.json"), &sidecar("b.jpg", TAKEN));

    let found = browse(&root);
    assert_eq!(found.len(), 2);
    let b = found.iter().find(|c| c.info.title == "b.jpg").unwrap();
    assert!(b.info.albums.is_empty());
    let a = found.iter().find(|c| c.info.title == "a.jpg").unwrap();
    assert_eq!(a.info.albums, vec!["Summer Trip".to_string()]);
}

#[test]
fn one_asset_in_several_albums_is_emitted_once() {
    let dir = tempdir().unwrap();
    let root = utf8(dir.path());
    for album in ["Beach", "Family", "Photos from 2019"] {
        write_file(&root, &format!("{GP}/{album}/IMG_0001.jpg"), b"same bytes");
    }
    write_file(&root, &format!("{GP}/Photos from 2019/IMG_0001.jpg.json"), &sidecar("IMG_0001.jpg", TAKEN));

    let found = browse(&root);
    assert_eq!(found.len(), 1);
    let info = &found[0].info;
    assert_eq!(info.albums, vec!["Beach".to_string(), "Family".to_string()]);
    assert_eq!(info.file_name, format!("{GP}/Photos from 2019/IMG_0001.jpg"));
    assert_eq!(info.date_taken, Some(Utc.timestamp_opt(TAKEN, 0).unwrap()));
}

#[test]
fn same_name_and_size_with_different_content_stays_separate() {
    let dir = tempdir().unwrap();
    let root = utf8(dir.path());
    write_file(&root, &format!("{GP}/Beach/IMG_0001.jpg"), b"AAAA");
    write_file(&root, &format!("{GP}/Family/IMG_0001.jpg"), b"BBBB");

    let found = browse(&root);
    assert_eq!(found.len(), 2);
    assert_eq!(found[0].info.albums, vec!["Beach".to_string()]);
    assert_eq!(found[1].info.albums, vec!["Family".to_string()]);
}

#[test]
fn sidecar_flags_are_carried() {
    let dir = tempdir().unwrap();
    let root = utf8(dir.path());
    write_file(&root, &format!("{GP}/Trash/gone.jpg"), b"g");
    write_file(
        &root,
        &format!("{GP}/Trash/gone.jpg.json"),
        br#"{"title": "gone.jpg", "trashed": true, "archived": true,
             "googlePhotosOrigin": {"fromPartnerSharing": {}}}"#,
    );

    let found = browse(&root);
    let info = &found[0].info;
    assert!(info.trashed);
    assert!(info.archived);
    assert!(info.from_partner);
    assert!(info.date_taken.is_some());
}

#[test]
fn numbered_and_edited_copies_pair_with_their_sidecars() {
    let dir = tempdir().unwrap();
    let root = utf8(dir.path());
    let d = format!("{GP}/Trip");
    write_file(&root, &format!("{d}/IMG_0001.jpg"), b"one");
    write_file(&root, &format!("{d}/IMG_0001.jpg.json"), &sidecar("IMG_0001.jpg", TAKEN));
    write_file(&root, &format!("{d}/IMG_0001(1).jpg"), b"two");
    write_file(&root, &format!("{d}/IMG_0001.jpg(1).json"), &sidecar("IMG_0001.jpg", TAKEN + 60));
    write_file(&root, &format!("{d}/IMG_0001-edited.jpg"), b"three");

    let found = browse(&root);
    assert_eq!(found.len(), 3);
    let date_of = |name: &str| {
        found
            .iter()
            .find(|c| c.path().ends_with(name))
            .and_then(|c| c.info.date_taken)
            .unwrap()
    };
    assert_eq!(date_of("/IMG_0001(1).jpg"), Utc.timestamp_opt(TAKEN + 60, 0).unwrap());
    assert_eq!(date_of("/IMG_0001-edited.jpg"), Utc.timestamp_opt(TAKEN, 0).unwrap());
}

#[test]
fn live_photo_video_takes_the_still_sidecar_date() {
    let dir = tempdir().unwrap();
    let root = utf8(dir.path());
    let d = format!("{GP}/Trip");
    let still = write_file(&root, &format!("{d}/IMG_0001.HEIC"), b"heic");
    let video = write_file(&root, &format!("{d}/IMG_0001.MP4"), b"mp4");
    write_file(&root, &format!("{d}/IMG_0001.HEIC.json"), &sidecar("IMG_0001.HEIC", TAKEN));
    for path in [&still, &video] {
        filetime::set_file_mtime(path, FileTime::from_unix_time(978_307_200, 0)).unwrap();
    }

    let found = browse(&root);
    assert_eq!(found.len(), 2);
    for candidate in &found {
        assert_eq!(candidate.info.date_taken, Some(Utc.timestamp_opt(TAKEN, 0).unwrap()));
        assert_eq!(candidate.info.albums, vec!["Trip".to_string()]);
    }
}

#[test]
fn truncated_sidecar_names_follow_pairing_rules() {
    let dir = tempdir().unwrap();
    let root = utf8(dir.path());
    let media = "Screenshot_20190805-123456_Some Very Long App Name.jpg";
    let cut: String = media.chars().take(46).collect();
    write_file(&root, &format!("{GP}/Trip/{media}"), b"png");
    // Untitled, so only the name rules can pair it.
    write_file(&root, &format!("{GP}/Trip/{cut}.json"), &sidecar("", TAKEN));

    let found = browse(&root);
    assert_eq!(found[0].info.date_taken, Some(Utc.timestamp_opt(TAKEN, 0).unwrap()));

    // A stricter prefix rule and a longer limit leave the file unpaired.
    let rules = PairingRules {
        max_sidecar_name_len: 200,
        min_prefix_len: 100,
    };
    let found = browse_paths(&[root.clone()], rules);
    assert_ne!(found[0].info.date_taken, Some(Utc.timestamp_opt(TAKEN, 0).unwrap()));
}

#[test]
fn export_split_across_archive_and_folder() {
    let dir = tempdir().unwrap();
    let root = utf8(dir.path());
    let part2 = root.join("part2");
    write_file(&part2, &format!("{GP}/Trip/IMG_0002.jpg.json"), &sidecar("IMG_0002.jpg", TAKEN));

    let part1 = root.join("takeout-001.zip");
    let file = fs::File::create(&part1).unwrap();
    let mut zip = zip::ZipWriter::new(file);
    let options = SimpleFileOptions::default().compression_method(zip::CompressionMethod::Stored);
    zip.start_file(format!("{GP}/Trip/IMG_0002.jpg"), options).unwrap();
    zip.write_all(b"zipped jpeg").unwrap();
    zip.finish().unwrap();

    let found = browse_paths(&[part1, part2], PairingRules::default());
    assert_eq!(found.len(), 1);
    assert_eq!(found[0].info.size, 11);
    assert_eq!(found[0].info.date_taken, Some(Utc.timestamp_opt(TAKEN, 0).unwrap()));
    assert_eq!(found[0].info.albums, vec!["Trip".to_string()]);
}
