use std::fs;
use std::io::{self, Write};
use std::path::{Path, PathBuf};

/// Replace `path` with `contents` through a sibling `.tmp` file, so readers
/// see either the old file or the new one.
pub fn atomic_write(path: &Path, contents: &[u8]) -> io::Result<()> {
    let tmp_path = {
        let mut name = path.as_os_str().to_os_string();
        name.push(".tmp");
        PathBuf::from(name)
    };

    let mut file = fs::File::create(&tmp_path)?;
    if let Err(e) = file.write_all(contents).and_then(|()| file.sync_all()) {
        drop(file);
        fs::remove_file(&tmp_path).ok();
        return Err(e);
    }
    drop(file);

    match fs::rename(&tmp_path, path) {
        Ok(()) => Ok(()),
        Err(e) if e.kind() == io::ErrorKind::AlreadyExists => {
            fs::remove_file(path).ok();
            fs::rename(&tmp_path, path)
        }
        Err(e) => {
            fs::remove_file(&tmp_path).ok();
            Err(e)
        }
    }
}
