//! SHA-256 digests of files and prepared dataset folders.

use std::fs;
use std::path::{Path, PathBuf};

use sha2::{Digest, Sha256};

use crate::domain::error::Result;

/// Hex SHA-256 of a single file.
pub fn file_digest(path: &Path) -> Result<String> {
    let content = fs::read(path)?;
    Ok(hex::encode(Sha256::digest(&content)))
}

/// Hex SHA-256 over every file below `root`.
///
/// Files are visited in sorted relative-path order and each relative path is
/// hashed together with its content, so renames change the digest.
pub fn folder_digest(root: &Path) -> Result<String> {
    let mut files = walk_files(root)?;
    files.sort();

    let mut hasher = Sha256::new();
    for file in files {
        let rel = file.strip_prefix(root).unwrap_or(&file);
        hasher.update(rel.to_string_lossy().as_bytes());
        hasher.update(b"\0");
        hasher.update(fs::read(&file)?);
    }
    Ok(hex::encode(hasher.finalize()))
}

fn walk_files(dir: &Path) -> Result<Vec<PathBuf>> {
    let mut files = Vec::new();
    if dir.is_dir() {
        for entry in fs::read_dir(dir)? {
            let path = entry?.path();
            if path.is_dir() {
                files.extend(walk_files(&path)?);
            } else {
                files.push(path);
            }
        }
    }
    Ok(files)
}

#[cfg(test)]
mod tests {
    use super::*;
    use tempfile::tempdir;

    #[test]
    fn folder_digest_deterministic() {
        let dir = tempdir().unwrap();
        fs::create_dir_all(dir.path().join("a")).unwrap();
        fs::write(dir.path().join("a/x.csv"), b"1,2,3").unwrap();
        fs::write(dir.path().join("y.csv"), b"4,5,6").unwrap();

        let d1 = folder_digest(dir.path()).unwrap();
        let d2 = folder_digest(dir.path()).unwrap();
        assert_eq!(d1, d2);
        assert_eq!(d1.len(), 64);
    }

    #[test]
    fn folder_digest_changes_with_content() {
        let dir = tempdir().unwrap();
        fs::write(dir.path().join("x.csv"), b"v1").unwrap();
        let d1 = folder_digest(dir.path()).unwrap();

        fs::write(dir.path().join("x.csv"), b"v2").unwrap();
        let d2 = folder_digest(dir.path()).unwrap();
        assert_ne!(d1, d2);
    }

    #[test]
    fn folder_digest_changes_with_rename() {
        let a = tempdir().unwrap();
        let b = tempdir().unwrap();
        fs::write(a.path().join("x.csv"), b"same").unwrap();
        fs::write(b.path().join("y.csv"), b"same").unwrap();
        assert_ne!(folder_digest(a.path()).unwrap(), folder_digest(b.path()).unwrap());
    }

    #[test]
    fn file_digest_matches_sha256() {
        let dir = tempdir().unwrap();
        let path = dir.path().join("mlcube.yaml");
        fs::write(&path, b"hello world").unwrap();
        assert_eq!(
            file_digest(&path).unwrap(),
            "b94d27b9934d3e08a52e52d7da7dabfac484efe37a5380ee9088f7ace2efcde9"
        );
    }
}
