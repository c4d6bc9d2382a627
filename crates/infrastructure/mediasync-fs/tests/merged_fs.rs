use std::fs;
use std::io::{Read, Write};

use camino::{Utf8Path, Utf8PathBuf};
use mediasync_fs::{FsError, MergedFs};
use tempfile::tempdir;
use zip::write::SimpleFileOptions;

fn utf8(p: &std::path::Path) -> Utf8PathBuf {
    Utf8PathBuf::from_path_buf(p.to_path_buf()).unwrap()
}

fn write_file(root: &Utf8Path, rel: &str, contents: &[u8]) {
    let path = root.join(rel);
    fs::create_dir_all(path.parent().unwrap()).unwrap();
    fs::write(path, contents).unwrap();
}

fn write_zip(path: &Utf8Path, members: &[(&str, &[u8])]) {
    let file = fs::File::create(path).unwrap();
    let mut zip = zip::ZipWriter::new(file);
    let options =
        SimpleFileOptions::default().compression_method(zip::CompressionMethod::Stored);
    for (name, data) in members {
        zip.start_file(*name, options).unwrap();
        zip.write_all(data).unwrap();
    }
    zip.finish().unwrap();
}

fn read_all(fs: &MergedFs, path: &str) -> Vec<u8> {
    let mut buf = Vec::new();
    fs.open(path).unwrap().read_to_end(&mut buf).unwrap();
    buf
}

#[test]
fn earliest_root_wins_deterministically() {
    let first = tempdir().unwrap();
    let second = tempdir().unwrap();
    let (a, b) = (utf8(first.path()), utf8(second.path()));
    write_file(&a, "a.txt", b"first");
    write_file(&b, "a.txt", b"second");

    let merged = MergedFs::open_paths(&[a.clone(), b.clone()]).unwrap();
    for _ in 0..5 {
        assert_eq!(read_all(&merged, "a.txt"), b"first");
        assert_eq!(merged.resolve("a.txt").unwrap().0, 0);
    }

    let reversed = MergedFs::open_paths(&[b, a]).unwrap();
    assert_eq!(read_all(&reversed, "a.txt"), b"second");
}

#[test]
fn archive_and_folder_listings_are_merged() {
    let dir = tempdir().unwrap();
    let root = utf8(dir.path());
    let folder = root.join("folder");
    write_file(&folder, "Takeout/Trip/a.jpg", b"aaaa");
    let archive = root.join("takeout-001.zip");
    write_zip(
        &archive,
        &[
            ("Takeout/Trip/b.jpg", b"bb"),
            ("Takeout/Trip/a.jpg", b"zip copy"),
        ],
    );

    let merged = MergedFs::open_paths(&[folder, archive]).unwrap();

    let names: Vec<String> = merged
        .read_dir("Takeout/Trip")
        .unwrap()
        .into_iter()
        .map(|e| e.name)
        .collect();
    assert_eq!(names, vec!["a.jpg", "b.jpg"]);
    assert_eq!(
        merged.walk(),
        vec!["Takeout/Trip/a.jpg".to_string(), "Takeout/Trip/b.jpg".to_string()]
    );
    assert_eq!(read_all(&merged, "Takeout/Trip/a.jpg"), b"aaaa");
    assert_eq!(read_all(&merged, "Takeout/Trip/b.jpg"), b"bb");
    assert_eq!(merged.stat("Takeout/Trip/b.jpg").unwrap().size, 2);
    assert!(merged.stat("Takeout").unwrap().is_dir);
}

#[test]
fn missing_path_is_not_found() {
    let dir = tempdir().unwrap();
    let merged = MergedFs::open_paths(&[utf8(dir.path())]).unwrap();
    assert!(matches!(merged.stat("nope.jpg"), Err(FsError::NotFound(_))));
    assert!(matches!(merged.open("nope.jpg"), Err(FsError::NotFound(_))));
    assert!(matches!(merged.read_dir("nope"), Err(FsError::NotFound(_))));
}

#[test]
fn unopenable_roots_fail_at_construction() {
    let dir = tempdir().unwrap();
    let root = utf8(dir.path());

    let missing = root.join("does-not-exist");
    assert!(matches!(
        MergedFs::open_paths(&[missing]),
        Err(FsError::SourceUnavailable { .. })
    ));

    let corrupt = root.join("broken.zip");
    fs::write(&corrupt, b"this is not a zip").unwrap();
    assert!(matches!(
        MergedFs::open_paths(&[root.clone(), corrupt]),
        Err(FsError::SourceUnavailable { .. })
    ));

    let plain = root.join("notes.txt");
    fs::write(&plain, b"hello").unwrap();
    assert!(matches!(
        MergedFs::open_paths(&[plain]),
        Err(FsError::SourceUnavailable { .. })
    ));
}

#[test]
fn remove_deletes_from_folders_and_refuses_archives() {
    let dir = tempdir().unwrap();
    let root = utf8(dir.path());
    let folder = root.join("folder");
    write_file(&folder, "a.jpg", b"a");
    let archive = root.join("b.zip");
    write_zip(&archive, &[("b.jpg", b"b")]);

    let merged = MergedFs::open_paths(&[folder.clone(), archive]).unwrap();
    merged.remove("a.jpg").unwrap();
    assert!(!folder.join("a.jpg").exists());
    assert!(matches!(merged.remove("b.jpg"), Err(FsError::ReadOnly(_))));
}

#[test]
fn large_archive_members_stream_independently() {
    let dir = tempdir().unwrap();
    let root = utf8(dir.path());
    let archive = root.join("big.zip");
    let big: Vec<u8> = (0..3 * 1024 * 1024u32).map(|i| (i % 251) as u8).collect();
    {
        let mut zip = zip::ZipWriter::new(fs::File::create(&archive).unwrap());
        let options =
            SimpleFileOptions::default().compression_method(zip::CompressionMethod::Deflated);
        zip.start_file("video.mp4", options).unwrap();
        zip.write_all(&big).unwrap();
        zip.start_file("small.jpg", options).unwrap();
        zip.write_all(b"tiny").unwrap();
        zip.finish().unwrap();
    }

    let merged = MergedFs::open_paths(&[archive]).unwrap();
    assert_eq!(merged.stat("video.mp4").unwrap().size, big.len() as u64);

    // Two readers open at once do not share a position.
    let mut video = merged.open("video.mp4").unwrap();
    let mut head = [0u8; 1000];
    video.read_exact(&mut head).unwrap();
    assert_eq!(read_all(&merged, "small.jpg"), b"tiny");

    let mut rest = Vec::new();
    video.read_to_end(&mut rest).unwrap();
    assert_eq!(&head[..], &big[..1000]);
    assert_eq!(rest, &big[1000..]);
}
