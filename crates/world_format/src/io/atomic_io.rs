use std::fs::{self, File};
use std::io::{self, Write};
use std::path::{Path, PathBuf};

/// Replaces `path` with `bytes` so readers see either the old file or the
/// complete new one.
///
/// With `keep_backup`, an existing file is first copied to [`backup_path_for`].
pub(crate) fn replace_file_atomic(path: &Path, bytes: &[u8], keep_backup: bool) -> io::Result<()> {
    if let Some(parent) = path.parent().filter(|parent| !parent.as_os_str().is_empty()) {
        fs::create_dir_all(parent)?;
    }

    let tmp_path = temp_path_for(path);
    let staged = write_synced(&tmp_path, bytes).and_then(|()| {
        if keep_backup && path.is_file() {
            fs::copy(path, backup_path_for(path))?;
        }
        fs::rename(&tmp_path, path)
    });
    if staged.is_err() {
        let _ = fs::remove_file(&tmp_path);
    }
    staged
}

fn write_synced(path: &Path, bytes: &[u8]) -> io::Result<()> {
    let mut file = File::create(path)?;
    file.write_all(bytes)?;
    file.sync_all()
}

fn sibling_with_suffix(path: &Path, suffix: &str) -> PathBuf {
    let mut name = path
        .file_name()
        .map(|name| name.to_os_string())
        .unwrap_or_else(|| "world".into());
    name.push(suffix);
    path.with_file_name(name)
}

pub(crate) fn temp_path_for(path: &Path) -> PathBuf {
    sibling_with_suffix(path, ".tmp")
}

pub fn backup_path_for(path: &Path) -> PathBuf {
    sibling_with_suffix(path, ".bak")
}
