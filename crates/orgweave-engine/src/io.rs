//! Reading, writing and discovering `.org` files.

use std::fs;
use std::path::{Path, PathBuf};

#[derive(Debug, thiserror::Error)]
pub enum IoError {
    #[error("no such file: {0}")]
    NotFound(PathBuf),
    #[error("not a notes directory: {0}")]
    NotADirectory(PathBuf),
    #[error(transparent)]
    Io(#[from] std::io::Error),
}

pub fn read_file(path: &Path) -> Result<String, IoError> {
    match fs::read_to_string(path) {
        Err(e) if e.kind() == std::io::ErrorKind::NotFound => {
            Err(IoError::NotFound(path.to_owned()))
        }
        other => Ok(other?),
    }
}

/// Write `content`, creating missing parent directories.
pub fn write_file(path: &Path, content: &str) -> Result<(), IoError> {
    if let Some(parent) = path.parent() {
        fs::create_dir_all(parent)?;
    }
    Ok(fs::write(path, content)?)
}

/// Every `.org` file under `notes_root`, recursively, sorted by path.
pub fn scan_org_files(notes_root: &Path) -> Result<Vec<PathBuf>, IoError> {
    validate_notes_dir(notes_root)?;
    let mut files = Vec::new();
    let mut pending = vec![notes_root.to_owned()];
    while let Some(dir) = pending.pop() {
        for entry in fs::read_dir(&dir)? {
            let path = entry?.path();
            if path.is_dir() {
                pending.push(path);
            } else if path.extension().is_some_and(|ext| ext == "org") {
                files.push(path);
            }
        }
    }
    files.sort();
    Ok(files)
}

pub fn validate_notes_dir(path: &Path) -> Result<(), IoError> {
    if path.is_dir() {
        Ok(())
    } else {
        Err(IoError::NotADirectory(path.to_owned()))
    }
}
