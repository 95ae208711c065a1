//! Mount source backed by a real directory on the host.

use std::fs::File;
use std::path::{Path, PathBuf};

use crate::core::Result;
use crate::error::VfsError;
use crate::stream::Stream;
use crate::vfs::EntryType;

/// A host directory mounted into the search path.
///
/// Paths handed to it are sanitized virtual paths relative to the mount
/// point, so joining them onto `root` can never escape it.
#[derive(Debug)]
pub struct DirSource {
    root: PathBuf, // host-related path
}

impl DirSource {
    pub fn new<P: AsRef<Path>>(root: P) -> Result<Self> {
        let root = root.as_ref();
        if !root.is_dir() {
            return Err(VfsError::mount_rejected(format!(
                "{} is not a directory",
                root.display()
            )));
        }
        Ok(Self {
            root: root.to_path_buf(),
        })
    }

    pub fn root(&self) -> &Path {
        &self.root
    }

    pub fn to_host(&self, rel: &str) -> PathBuf {
        if rel.is_empty() {
            self.root.clone()
        } else {
            self.root.join(rel)
        }
    }

    pub fn entry_type(&self, rel: &str) -> Option<EntryType> {
        let meta = std::fs::metadata(self.to_host(rel)).ok()?;
        if meta.is_dir() {
            Some(EntryType::Directory)
        } else if meta.is_file() {
            Some(EntryType::File)
        } else {
            None
        }
    }

    pub fn ls(&self, rel: &str) -> Option<Vec<String>> {
        let entries = std::fs::read_dir(self.to_host(rel)).ok()?;
        Some(
            entries
                .filter_map(|entry| entry.ok())
                .map(|entry| entry.file_name().to_string_lossy().into_owned())
                .collect(),
        )
    }

    pub fn open(&self, rel: &str) -> Result<Stream> {
        let host = self.to_host(rel);
        if !host.is_file() {
            return Err(VfsError::not_found(rel));
        }
        Ok(Stream::Host(File::open(host)?))
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::io::Read;
    use tempdir::TempDir;

    fn setup_test_env() -> TempDir {
        let temp_dir = TempDir::new("dir_source_test").unwrap();
        std::fs::create_dir_all(temp_dir.path().join("Data/Themes")).unwrap();
        std::fs::write(temp_dir.path().join("Data/Themes/Nature.cfg"), b"sky").unwrap();
        temp_dir
    }

    #[test]
    fn test_new_requires_directory() {
        let temp_dir = setup_test_env();
        assert!(DirSource::new(temp_dir.path()).is_ok());
        assert!(DirSource::new(temp_dir.path().join("Data/Themes/Nature.cfg")).is_err());
        assert!(DirSource::new(temp_dir.path().join("missing")).is_err());
    }

    #[test]
    fn test_entry_types() {
        let temp_dir = setup_test_env();
        let source = DirSource::new(temp_dir.path()).unwrap();
        assert_eq!(source.entry_type(""), Some(EntryType::Directory));
        assert_eq!(source.entry_type("Data/Themes"), Some(EntryType::Directory));
        assert_eq!(source.entry_type("Data/Themes/Nature.cfg"), Some(EntryType::File));
        assert_eq!(source.entry_type("Data/nothing"), None);
    }

    #[test]
    fn test_open_and_ls() -> Result<()> {
        let temp_dir = setup_test_env();
        let source = DirSource::new(temp_dir.path())?;

        let mut content = String::new();
        source
            .open("Data/Themes/Nature.cfg")?
            .read_to_string(&mut content)?;
        assert_eq!(content, "sky");

        assert!(source.open("Data/Themes").is_err());
        assert_eq!(source.ls("Data"), Some(vec!["Themes".to_string()]));
        assert_eq!(source.ls("Data/Themes/Nature.cfg"), None);
        Ok(())
    }
}
