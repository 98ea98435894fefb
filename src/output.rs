//! The output directory: existing-file scan and atomic writes.

use std::collections::HashSet;
use std::fs;
use std::io::ErrorKind;
use std::path::{Path, PathBuf};

use tracing::debug;

use crate::error::{BadgeError, Result};

/// Directory that receives rendered badges.
#[derive(Debug, Clone)]
pub struct OutputDir {
    root: PathBuf,
}

impl OutputDir {
    pub fn new(root: impl Into<PathBuf>) -> Self {
        Self { root: root.into() }
    }

    pub fn root(&self) -> &Path {
        &self.root
    }

    /// Full path of an output file.
    pub fn path_for(&self, filename: &str) -> PathBuf {
        self.root.join(filename)
    }

    /// Creates the directory and its parents if needed.
    pub fn ensure(&self) -> Result<()> {
        fs::create_dir_all(&self.root).map_err(|e| BadgeError::io(&self.root, e))
    }

    /// Names of the `.png` files already present.
    ///
    /// A directory that does not exist yet simply has no outputs.
    pub fn existing(&self) -> Result<HashSet<String>> {
        let entries = match fs::read_dir(&self.root) {
            Ok(entries) => entries,
            Err(e) if e.kind() == ErrorKind::NotFound => return Ok(HashSet::new()),
            Err(e) => return Err(BadgeError::io(&self.root, e)),
        };

        let mut names = HashSet::new();
        for entry in entries {
            let entry = entry.map_err(|e| BadgeError::io(&self.root, e))?;
            let is_file = entry.file_type().map(|t| t.is_file()).unwrap_or(false);
            if !is_file {
                continue;
            }
            if let Some(name) = entry.file_name().to_str() {
                if name.ends_with(".png") {
                    names.insert(name.to_string());
                }
            }
        }

        debug!(dir = %self.root.display(), count = names.len(), "Scanned existing outputs");
        Ok(names)
    }

    /// Writes `bytes` under `filename` without ever exposing a partial file.
    ///
    /// Data goes to a hidden sibling first and is renamed into place.
    pub fn write_atomic(&self, filename: &str, bytes: &[u8]) -> Result<PathBuf> {
        let target = self.path_for(filename);
        let partial = self.path_for(&format!(".{filename}.partial"));

        if let Err(e) = fs::write(&partial, bytes) {
            let _ = fs::remove_file(&partial);
            return Err(BadgeError::io(&partial, e));
        }
        if let Err(e) = fs::rename(&partial, &target) {
            let _ = fs::remove_file(&partial);
            return Err(BadgeError::io(&target, e));
        }
        Ok(target)
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn missing_directory_has_no_outputs() {
        let dir = tempfile::tempdir().unwrap();
        let output = OutputDir::new(dir.path().join("not-yet"));
        assert!(output.existing().unwrap().is_empty());
    }

    #[test]
    fn existing_lists_only_png_files() {
        let dir = tempfile::tempdir().unwrap();
        fs::write(dir.path().join("0-1-0-2.png"), b"x").unwrap();
        fs::write(dir.path().join("notes.txt"), b"x").unwrap();
        fs::create_dir(dir.path().join("nested.png")).unwrap();

        let names = OutputDir::new(dir.path()).existing().unwrap();
        assert_eq!(names.len(), 1);
        assert!(names.contains("0-1-0-2.png"));
    }

    #[test]
    fn write_atomic_leaves_no_partial_file() {
        let dir = tempfile::tempdir().unwrap();
        let output = OutputDir::new(dir.path().join("out"));
        output.ensure().unwrap();

        let path = output.write_atomic("badge.png", b"data").unwrap();
        assert_eq!(fs::read(&path).unwrap(), b"data");
        assert!(!output.path_for(".badge.png.partial").exists());
        assert_eq!(output.existing().unwrap().len(), 1);
    }

    #[test]
    fn write_into_missing_directory_fails() {
        let dir = tempfile::tempdir().unwrap();
        let output = OutputDir::new(dir.path().join("absent"));
        let err = output.write_atomic("a.png", b"data").unwrap_err();
        assert!(matches!(err, BadgeError::Io { .. }));
    }
}
