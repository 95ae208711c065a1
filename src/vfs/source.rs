use std::path::Path;

use crate::core::Result;
use crate::error::VfsError;
use crate::stream::Stream;
use crate::vfs::EntryType;
use crate::vfs::dir_source::DirSource;
use crate::vfs::zip_source::ZipSource;

/// Anything that can sit in the search path.
#[derive(Debug)]
pub enum MountSource {
    Directory(DirSource),
    Archive(ZipSource),
}

impl MountSource {
    /// Directories are mounted as-is, regular files must be zip archives.
    pub fn open(host: &Path) -> Result<Self> {
        if host.is_dir() {
            Ok(MountSource::Directory(DirSource::new(host)?))
        } else if host.is_file() {
            Ok(MountSource::Archive(ZipSource::open(host)?))
        } else {
            Err(VfsError::mount_rejected(format!(
                "{}: no such file or directory",
                host.display()
            )))
        }
    }

    /// The mounted directory or archive file on the host.
    pub fn host_path(&self) -> &Path {
        match self {
            MountSource::Directory(dir) => dir.root(),
            MountSource::Archive(zip) => zip.path(),
        }
    }

    pub fn entry_type(&self, rel: &str) -> Option<EntryType> {
        match self {
            MountSource::Directory(dir) => dir.entry_type(rel),
            MountSource::Archive(zip) => zip.entry_type(rel),
        }
    }

    pub fn ls(&self, rel: &str) -> Option<Vec<String>> {
        match self {
            MountSource::Directory(dir) => dir.ls(rel),
            MountSource::Archive(zip) => zip.ls(rel),
        }
    }

    pub fn open_member(&self, rel: &str) -> Result<Stream> {
        match self {
            MountSource::Directory(dir) => dir.open(rel),
            MountSource::Archive(zip) => zip.open_member(rel),
        }
    }
}
