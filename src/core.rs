use std::path::{Path, PathBuf};

use crate::error::VfsError;
use crate::stream::Stream;

pub type Result<T> = std::result::Result<T, VfsError>;

/// How a file handle is opened. `Append` implies write access.
#[derive(Debug, Copy, Clone, PartialEq, Eq)]
pub enum OpenMode {
    Read,
    Write,
    Append,
}

impl OpenMode {
    pub fn is_write(self) -> bool {
        matches!(self, OpenMode::Write | OpenMode::Append)
    }
}

/// One entry of the search path, as reported by [`FsBackend::search_path`].
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct MountPoint {
    /// Host path of the mounted archive or directory.
    pub source: PathBuf,
    /// Virtual prefix the source is mounted under (`""` is the root).
    pub prefix: String,
    /// Whether the source was appended to the end of the search path.
    pub append: bool,
}

/// Storage realization behind the [`Vfs`](crate::Vfs) manager.
///
/// All paths are virtual paths: forward slashes, with or without a leading
/// slash. Both realizations honor the same contract so that callers never
/// branch on which one is active.
pub trait FsBackend {
    /// One-time bootstrap with the running program's own path.
    fn init(&mut self, invocation_path: &str) -> Result<()>;

    /// Releases everything `init` and later calls acquired.
    fn deinit(&mut self);

    /// `false` when mounting is a no-op for this realization.
    fn supports_mounting(&self) -> bool;

    /// Adds `source` to the search path under `mount_point`.
    /// `append` puts it behind every existing mount, otherwise it goes first.
    fn mount(&mut self, source: &Path, mount_point: &str, append: bool) -> Result<()>;

    fn unmount(&mut self, source: &Path) -> Result<()>;

    /// Mount points in search order (first is searched first).
    fn search_path(&self) -> Vec<MountPoint>;

    /// Designates the single directory receiving all write-mode opens,
    /// replacing any previous one.
    fn set_write_dir(&mut self, path: &Path) -> Result<()>;

    fn write_dir(&self) -> Option<&Path>;

    /// Directory of the invocation path captured by `init`, if any.
    fn base_dir(&self) -> Option<&Path>;

    fn exists(&self, path: &str) -> bool;

    fn is_dir(&self, path: &str) -> bool;

    fn is_file(&self, path: &str) -> bool;

    /// Names of the direct children of the directory at `path`.
    fn ls(&self, path: &str) -> Result<Vec<String>>;

    /// Physical location backing `path`.
    fn real_dir(&self, path: &str) -> Option<PathBuf>;

    fn open(&self, path: &str, mode: OpenMode) -> Result<Stream>;

    /// Creates a directory (and its missing parents) inside the write directory.
    fn mkdir(&self, path: &str) -> Result<()>;

    /// Removes a file or an empty directory inside the write directory.
    fn rm(&self, path: &str) -> Result<()>;

    /// Message of the most recent backend-level failure.
    fn last_error(&self) -> String;
}

pub mod utils {
    use std::path::{Component, Path, PathBuf};

    use super::Result;
    use crate::error::VfsError;

    /// Collapses `.` and `..` lexically; `..` never climbs above the root.
    pub fn normalize<P: AsRef<Path>>(path: P) -> PathBuf {
        let mut result = PathBuf::new();
        for component in path.as_ref().components() {
            match component {
                Component::CurDir => {}
                Component::ParentDir => {
                    if let Some(parent) = result.parent() {
                        result = parent.to_path_buf();
                    }
                }
                _ => result.push(component),
            }
        }
        result
    }

    /// Turns a virtual path into its canonical relative form (`a/b/c`, root is `""`).
    /// Rejects any `..` segment.
    pub fn sanitize(path: &str) -> Result<String> {
        let mut parts = Vec::new();
        for part in path.split('/') {
            match part {
                "" | "." => {}
                ".." => return Err(VfsError::invalid_path(path)),
                _ => parts.push(part),
            }
        }
        Ok(parts.join("/"))
    }

    /// Inner absolute form of a sanitized path, as used for index keys.
    pub fn to_inner(rel: &str) -> PathBuf {
        Path::new("/").join(rel)
    }

    pub fn is_virtual_root<P: AsRef<Path>>(path: P) -> bool {
        let components: Vec<_> = path.as_ref().components().collect();
        components.len() == 1 && components[0] == Component::RootDir
    }

    /// Path of `rel` below `prefix`, or `None` if `rel` is outside the prefix.
    /// Both arguments are sanitized.
    pub fn strip_mount_prefix<'a>(rel: &'a str, prefix: &str) -> Option<&'a str> {
        if prefix.is_empty() {
            return Some(rel);
        }
        if rel == prefix {
            return Some("");
        }
        rel.strip_prefix(prefix)
            .and_then(|rest| rest.strip_prefix('/'))
    }

    /// Immediate children names of `dir` among inner absolute `paths`.
    pub fn children<'a, I>(paths: I, dir: &Path) -> Vec<String>
    where
        I: Iterator<Item = &'a Path>,
    {
        let component_count = dir.components().count() + 1;
        paths
            .filter(|&path| {
                path.starts_with(dir) && path != dir && path.components().count() == component_count
            })
            .filter_map(|path| path.file_name())
            .map(|name| name.to_string_lossy().into_owned())
            .collect()
    }

    /// Makes directories recursively; returns the ones actually created.
    pub fn mkdir_all<P: AsRef<Path>>(path: P) -> std::io::Result<Vec<PathBuf>> {
        let mut created = Vec::new();
        let mut built = PathBuf::new();
        for component in path.as_ref().components() {
            built.push(component);
            if !std::fs::exists(&built)? {
                std::fs::create_dir(&built)?;
                created.push(built.clone());
            }
        }
        Ok(created)
    }

    /// Creates or truncates `target`, or opens it for appending.
    pub fn open_for_write(target: &Path, append: bool) -> std::io::Result<std::fs::File> {
        std::fs::OpenOptions::new()
            .write(true)
            .create(true)
            .truncate(!append)
            .append(append)
            .open(target)
    }

    pub fn rm_on_host<P: AsRef<Path>>(path: P) -> std::io::Result<()> {
        let path = path.as_ref();
        if path.is_dir() {
            std::fs::remove_dir(path)
        } else {
            std::fs::remove_file(path)
        }
    }

    /// Probes that `path` accepts new files.
    pub fn check_permissions<P: AsRef<Path>>(path: P) -> bool {
        let filename = path.as_ref().join(".access");
        if std::fs::write(&filename, b"check").is_err() {
            return false;
        }
        std::fs::remove_file(filename).is_ok()
    }
}
