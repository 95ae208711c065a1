//! In-memory tree of resources bundled with the program.
//!
//! Bundled resources are addressed by virtual paths prefixed with the reserved
//! [`RESOURCE_MARKER`], e.g. `:/Graphics/Hats/cap.png`. The marker is optional
//! for the bundle's own methods, so `:/a` and `/a` name the same entry.

use std::collections::BTreeMap;
use std::path::{Path, PathBuf};

use crate::core::{Result, utils};
use crate::error::VfsError;
use crate::vfs::{Entry, EntryType};

/// Prefix that marks a virtual path as a bundled resource.
pub const RESOURCE_MARKER: &str = ":";

/// Resource form of an absolute virtual path (`/a` becomes `:/a`).
pub fn resource_path(path: &str) -> String {
    format!("{RESOURCE_MARKER}{path}")
}

/// Read-only resources kept in memory.
///
/// ### Invariants
///
/// 1. **Root existence**: `/` is always present and is a directory.
/// 2. **Path normalization**: keys are inner absolute normalized paths.
/// 3. **Parent consistency**: every entry's parent exists as a directory.
#[derive(Debug, Clone)]
pub struct ResourceBundle {
    entries: BTreeMap<PathBuf, Entry>,
}

impl Default for ResourceBundle {
    fn default() -> Self {
        Self::new()
    }
}

impl ResourceBundle {
    pub fn new() -> Self {
        let mut entries = BTreeMap::new();
        entries.insert(PathBuf::from("/"), Entry::new(EntryType::Directory));
        Self { entries }
    }

    /// Builds a bundle from every file and directory below `host_dir`.
    pub fn from_dir<P: AsRef<Path>>(host_dir: P) -> Result<Self> {
        let host_dir = host_dir.as_ref();
        if !host_dir.is_dir() {
            return Err(VfsError::not_found(host_dir.display().to_string()));
        }
        let mut bundle = Self::new();
        bundle.add_recursive(Path::new("/"), host_dir)?;
        Ok(bundle)
    }

    fn to_inner(path: &str) -> PathBuf {
        let path = path.strip_prefix(RESOURCE_MARKER).unwrap_or(path);
        utils::normalize(Path::new("/").join(path))
    }

    fn add_recursive(&mut self, inner_path: &Path, host_path: &Path) -> Result<()> {
        if host_path.is_dir() {
            self.entries
                .insert(inner_path.to_path_buf(), Entry::new(EntryType::Directory));
            for entry in std::fs::read_dir(host_path)? {
                let entry = entry?;
                self.add_recursive(&inner_path.join(entry.file_name()), &entry.path())?;
            }
        } else {
            let mut file = Entry::new(EntryType::File);
            file.set_content(&std::fs::read(host_path)?);
            self.entries.insert(inner_path.to_path_buf(), file);
        }
        Ok(())
    }

    /// Creates a directory and all its missing parents.
    pub fn mkdir(&mut self, path: &str) -> Result<()> {
        let inner_path = Self::to_inner(path);
        if let Some(entry) = self.entries.get(&inner_path) {
            if entry.is_file() {
                return Err(VfsError::write_error(format!(
                    "{} is a file",
                    inner_path.display()
                )));
            }
            return Ok(());
        }

        let mut built = PathBuf::new();
        for component in inner_path.components() {
            built.push(component);
            match self.entries.get(&built) {
                Some(entry) if entry.is_file() => {
                    return Err(VfsError::write_error(format!(
                        "{} is a file",
                        built.display()
                    )));
                }
                Some(_) => {}
                None => {
                    self.entries
                        .insert(built.clone(), Entry::new(EntryType::Directory));
                }
            }
        }
        Ok(())
    }

    /// Adds a file, creating its parent directories. Replaces an existing file.
    pub fn mkfile(&mut self, path: &str, content: &[u8]) -> Result<()> {
        let file_path = Self::to_inner(path);
        if utils::is_virtual_root(&file_path) || self.is_dir(path) {
            return Err(VfsError::write_error(format!(
                "{} is a directory",
                file_path.display()
            )));
        }
        if let Some(parent) = file_path.parent() {
            self.mkdir(&parent.to_string_lossy())?;
        }

        let mut entry = Entry::new(EntryType::File);
        entry.set_content(content);
        self.entries.insert(file_path, entry);
        Ok(())
    }

    pub fn exists(&self, path: &str) -> bool {
        self.entries.contains_key(&Self::to_inner(path))
    }

    pub fn is_dir(&self, path: &str) -> bool {
        self.entries
            .get(&Self::to_inner(path))
            .is_some_and(Entry::is_dir)
    }

    pub fn is_file(&self, path: &str) -> bool {
        self.entries
            .get(&Self::to_inner(path))
            .is_some_and(Entry::is_file)
    }

    /// Names of the immediate children of the directory at `path`.
    pub fn ls(&self, path: &str) -> Result<Vec<String>> {
        let inner_path = Self::to_inner(path);
        if !self.is_dir(path) {
            return Err(VfsError::not_found(inner_path.display().to_string()));
        }
        Ok(utils::children(
            self.entries.keys().map(PathBuf::as_path),
            &inner_path,
        ))
    }

    pub fn read(&self, path: &str) -> Result<Vec<u8>> {
        let inner_path = Self::to_inner(path);
        match self.entries.get(&inner_path) {
            Some(entry) if entry.is_file() => Ok(entry.content().cloned().unwrap_or_default()),
            Some(_) => Err(VfsError::not_found(format!(
                "{} is a directory",
                inner_path.display()
            ))),
            None => Err(VfsError::not_found(inner_path.display().to_string())),
        }
    }

    /// Number of entries, the root included.
    pub fn len(&self) -> usize {
        self.entries.len()
    }

    pub fn is_empty(&self) -> bool {
        self.entries.len() == 1
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use tempdir::TempDir;

    fn setup_test_bundle() -> ResourceBundle {
        let mut bundle = ResourceBundle::new();
        bundle.mkdir("/Graphics/Hats").unwrap();
        bundle.mkfile("/Graphics/Hats/cap.png", b"cap").unwrap();
        bundle.mkfile("/Graphics/Flags/cm_x.png", b"flag").unwrap();
        bundle.mkfile("/readme.txt", b"docs").unwrap();
        bundle
    }

    mod creations {
        use super::*;

        #[test]
        fn test_new_contains_only_root() {
            let bundle = ResourceBundle::new();
            assert!(bundle.is_dir("/"));
            assert!(bundle.is_empty());
            assert_eq!(bundle.len(), 1);
        }

        #[test]
        fn test_mkfile_creates_parents() {
            let bundle = setup_test_bundle();
            assert!(bundle.is_dir("/Graphics"));
            assert!(bundle.is_dir("/Graphics/Flags"));
            assert!(bundle.is_file("/Graphics/Flags/cm_x.png"));
        }

        #[test]
        fn test_mkfile_over_directory_fails() {
            let mut bundle = setup_test_bundle();
            assert!(bundle.mkfile("/Graphics", b"x").is_err());
            assert!(bundle.mkfile("/", b"x").is_err());
        }

        #[test]
        fn test_mkdir_through_file_fails() {
            let mut bundle = setup_test_bundle();
            assert!(bundle.mkdir("/readme.txt/sub").is_err());
        }

        #[test]
        fn test_from_dir_loads_tree() -> anyhow::Result<()> {
            let temp_dir = TempDir::new("bundle_test")?;
            std::fs::create_dir_all(temp_dir.path().join("Data/Maps"))?;
            std::fs::write(temp_dir.path().join("Data/Maps/map.cfg"), b"Rope")?;

            let bundle = ResourceBundle::from_dir(temp_dir.path())?;
            assert!(bundle.is_dir(":/Data/Maps"));
            assert_eq!(bundle.read(":/Data/Maps/map.cfg")?, b"Rope");
            Ok(())
        }

        #[test]
        fn test_from_dir_missing_dir() {
            assert!(ResourceBundle::from_dir("/definitely/not/here").is_err());
        }
    }

    mod lookups {
        use super::*;

        #[test]
        fn test_marker_is_optional() {
            let bundle = setup_test_bundle();
            assert!(bundle.exists(":/readme.txt"));
            assert!(bundle.exists("/readme.txt"));
            assert!(bundle.exists("readme.txt"));
            assert!(!bundle.exists(":/missing.txt"));
        }

        #[test]
        fn test_read_file_and_directory() -> Result<()> {
            let bundle = setup_test_bundle();
            assert_eq!(bundle.read(":/Graphics/Hats/cap.png")?, b"cap");
            assert!(matches!(
                bundle.read(":/Graphics"),
                Err(VfsError::NotFound(_))
            ));
            assert!(bundle.read(":/nope").is_err());
            Ok(())
        }

        #[test]
        fn test_ls_is_shallow() -> Result<()> {
            let bundle = setup_test_bundle();
            assert_eq!(bundle.ls(":/")?, vec!["Graphics", "readme.txt"]);
            assert_eq!(bundle.ls(":/Graphics")?, vec!["Flags", "Hats"]);
            assert!(bundle.ls(":/readme.txt").is_err());
            Ok(())
        }

        #[test]
        fn test_resource_path() {
            assert_eq!(resource_path("/a/b.png"), ":/a/b.png");
        }
    }
}
