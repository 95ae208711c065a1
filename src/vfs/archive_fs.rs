//! Archive-backed realization: a search path of mounted packages.
//!
//! ### Key Features:
//! - **Search path**: mounted zip archives and host directories are searched
//!   in order; the first source containing a path wins.
//! - **Prepend / append**: a mount goes to the front of the search path unless
//!   it is appended, so the most recently prepended source shadows the rest.
//! - **Mount prefixes**: a source can be grafted below a virtual prefix; the
//!   prefix components show up as directories.
//! - **Write directory**: the single host directory receiving every
//!   write-mode open. It is consulted before the search path for reads.
//! - **Global error slot**: every failing call overwrites `last_error()`.

use std::cell::RefCell;
use std::collections::BTreeSet;
use std::fs::File;
use std::path::{Path, PathBuf};

use log::{debug, info};

use crate::core::{FsBackend, MountPoint, OpenMode, Result, utils};
use crate::error::VfsError;
use crate::stream::Stream;
use crate::vfs::EntryType;
use crate::vfs::source::MountSource;

#[derive(Debug)]
struct Mounted {
    point: MountPoint,
    source: MountSource,
}

/// Where a sanitized path was found.
enum Location<'a> {
    WriteDir(PathBuf, EntryType),
    Mount(&'a Mounted, String, EntryType),
    /// A root or mount-prefix directory with no backing entry.
    Synthetic,
}

impl Location<'_> {
    fn entry_type(&self) -> EntryType {
        match self {
            Location::WriteDir(_, entry_type) | Location::Mount(_, _, entry_type) => *entry_type,
            Location::Synthetic => EntryType::Directory,
        }
    }
}

/// Virtual file system over mounted packages.
///
/// ### Usage notes:
/// - `init()` must succeed before mounting or designating a write directory.
/// - Mounted sources are read-only; writes only ever land in the write directory.
/// - Not thread‑safe (single-threaded cooperative use).
#[derive(Debug, Default)]
pub struct ArchiveFS {
    initialized: bool,
    base_dir: Option<PathBuf>,
    mounts: Vec<Mounted>, // search order
    write_dir: Option<PathBuf>,
    last_error: RefCell<String>,
}

impl ArchiveFS {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn is_initialized(&self) -> bool {
        self.initialized
    }

    fn record(&self, err: &VfsError) {
        *self.last_error.borrow_mut() = err.to_string();
    }

    fn fail<T>(&self, err: VfsError) -> Result<T> {
        self.record(&err);
        Err(err)
    }

    fn sanitize(&self, path: &str) -> Result<String> {
        utils::sanitize(path).inspect_err(|e| self.record(e))
    }

    fn write_target(&self, path: &str) -> Result<PathBuf> {
        let Some(write_dir) = &self.write_dir else {
            return self.fail(VfsError::write_error("no write directory is set"));
        };
        let Ok(rel) = utils::sanitize(path) else {
            return self.fail(VfsError::write_error(format!(
                "{path}: escapes the write directory"
            )));
        };
        if rel.is_empty() {
            return self.fail(VfsError::write_error(format!("{path}: not a file name")));
        }
        Ok(write_dir.join(rel))
    }

    fn locate(&self, rel: &str) -> Option<Location<'_>> {
        if let Some(write_dir) = &self.write_dir {
            let host = if rel.is_empty() {
                write_dir.clone()
            } else {
                write_dir.join(rel)
            };
            if let Ok(meta) = std::fs::metadata(&host) {
                if meta.is_dir() {
                    return Some(Location::WriteDir(host, EntryType::Directory));
                }
                if meta.is_file() {
                    return Some(Location::WriteDir(host, EntryType::File));
                }
            }
        }

        for mounted in &self.mounts {
            if let Some(sub) = utils::strip_mount_prefix(rel, &mounted.point.prefix) {
                if let Some(entry_type) = mounted.source.entry_type(sub) {
                    return Some(Location::Mount(mounted, sub.to_string(), entry_type));
                }
            }
        }

        if rel.is_empty() || self.mount_prefix_child(rel).is_some() {
            return Some(Location::Synthetic);
        }
        None
    }

    /// Names of mount-prefix components directly below `rel`.
    fn mount_prefix_child(&self, rel: &str) -> Option<BTreeSet<String>> {
        let names: BTreeSet<String> = self
            .mounts
            .iter()
            .filter_map(|mounted| {
                let prefix = mounted.point.prefix.as_str();
                let rest = if rel.is_empty() {
                    prefix
                } else {
                    prefix.strip_prefix(rel)?.strip_prefix('/')?
                };
                rest.split('/').next().filter(|name| !name.is_empty())
            })
            .map(str::to_string)
            .collect();
        (!names.is_empty()).then_some(names)
    }
}

impl FsBackend for ArchiveFS {
    /// Captures the base directory from the invocation path.
    /// Fails on an empty path or when already initialized.
    fn init(&mut self, invocation_path: &str) -> Result<()> {
        if self.initialized {
            return self.fail(VfsError::backend_init("already initialized"));
        }
        if invocation_path.is_empty() {
            return self.fail(VfsError::backend_init("invocation path is empty"));
        }

        let base_dir = Path::new(invocation_path)
            .parent()
            .filter(|dir| !dir.as_os_str().is_empty())
            .map(Path::to_path_buf)
            .or_else(|| {
                std::env::current_exe()
                    .ok()
                    .and_then(|exe| exe.parent().map(Path::to_path_buf))
            });
        let Some(base_dir) = base_dir else {
            return self.fail(VfsError::backend_init(format!(
                "cannot locate base directory of {invocation_path}"
            )));
        };

        info!("archive backend initialized, base dir {}", base_dir.display());
        self.base_dir = Some(base_dir);
        self.initialized = true;
        Ok(())
    }

    /// Unmounts everything and resets the backend state.
    fn deinit(&mut self) {
        let unmounted = self.mounts.len();
        self.mounts.clear();
        self.write_dir = None;
        self.base_dir = None;
        self.initialized = false;
        self.last_error.borrow_mut().clear();
        info!("archive backend deinitialized, {unmounted} mount(s) released");
    }

    fn supports_mounting(&self) -> bool {
        true
    }

    fn mount(&mut self, source: &Path, mount_point: &str, append: bool) -> Result<()> {
        if !self.initialized {
            return self.fail(VfsError::mount_rejected("backend is not initialized"));
        }
        let prefix = match utils::sanitize(mount_point) {
            Ok(prefix) => prefix,
            Err(_) => {
                return self.fail(VfsError::mount_rejected(format!(
                    "invalid mount point {mount_point:?}"
                )));
            }
        };
        if self.mounts.iter().any(|m| m.point.source == source) {
            return self.fail(VfsError::mount_rejected(format!(
                "{} is already mounted",
                source.display()
            )));
        }

        let mounted = Mounted {
            point: MountPoint {
                source: source.to_path_buf(),
                prefix,
                append,
            },
            source: MountSource::open(source).inspect_err(|e| self.record(e))?,
        };
        info!(
            "mounted {} at /{} ({})",
            mounted.source.host_path().display(),
            mounted.point.prefix,
            if append { "append" } else { "prepend" }
        );
        if append {
            self.mounts.push(mounted);
        } else {
            self.mounts.insert(0, mounted);
        }
        Ok(())
    }

    fn unmount(&mut self, source: &Path) -> Result<()> {
        match self.mounts.iter().position(|m| m.point.source == source) {
            Some(index) => {
                self.mounts.remove(index);
                info!("unmounted {}", source.display());
                Ok(())
            }
            None => self.fail(VfsError::not_found(format!(
                "{} is not mounted",
                source.display()
            ))),
        }
    }

    fn search_path(&self) -> Vec<MountPoint> {
        self.mounts.iter().map(|m| m.point.clone()).collect()
    }

    /// The directory must exist and accept new files.
    fn set_write_dir(&mut self, path: &Path) -> Result<()> {
        if !self.initialized {
            return self.fail(VfsError::write_error("backend is not initialized"));
        }
        if !path.is_dir() {
            return self.fail(VfsError::write_error(format!(
                "{} is not a directory",
                path.display()
            )));
        }
        if !utils::check_permissions(path) {
            return self.fail(VfsError::write_error(format!(
                "{} is not writable",
                path.display()
            )));
        }
        info!("write directory set to {}", path.display());
        self.write_dir = Some(path.to_path_buf());
        Ok(())
    }

    fn write_dir(&self) -> Option<&Path> {
        self.write_dir.as_deref()
    }

    fn base_dir(&self) -> Option<&Path> {
        self.base_dir.as_deref()
    }

    fn exists(&self, path: &str) -> bool {
        utils::sanitize(path)
            .ok()
            .is_some_and(|rel| self.locate(&rel).is_some())
    }

    fn is_dir(&self, path: &str) -> bool {
        utils::sanitize(path).ok().is_some_and(|rel| {
            self.locate(&rel)
                .is_some_and(|loc| loc.entry_type() == EntryType::Directory)
        })
    }

    fn is_file(&self, path: &str) -> bool {
        utils::sanitize(path).ok().is_some_and(|rel| {
            self.locate(&rel)
                .is_some_and(|loc| loc.entry_type() == EntryType::File)
        })
    }

    /// Merges the children of `path` across the write directory, every
    /// mount and the mount prefixes. Sorted, without duplicates.
    fn ls(&self, path: &str) -> Result<Vec<String>> {
        let rel = self.sanitize(path)?;
        if !self.is_dir(&rel) {
            return self.fail(VfsError::not_found(format!("{path}: not a directory")));
        }

        let mut names = BTreeSet::new();
        if let Some(write_dir) = &self.write_dir {
            if let Ok(entries) = std::fs::read_dir(write_dir.join(&rel)) {
                names.extend(
                    entries
                        .filter_map(|entry| entry.ok())
                        .map(|entry| entry.file_name().to_string_lossy().into_owned()),
                );
            }
        }
        for mounted in &self.mounts {
            if let Some(sub) = utils::strip_mount_prefix(&rel, &mounted.point.prefix) {
                if let Some(children) = mounted.source.ls(sub) {
                    names.extend(children);
                }
            }
        }
        if let Some(prefixes) = self.mount_prefix_child(&rel) {
            names.extend(prefixes);
        }
        Ok(names.into_iter().collect())
    }

    /// The write directory or the mounted archive/directory holding `path`.
    fn real_dir(&self, path: &str) -> Option<PathBuf> {
        let rel = utils::sanitize(path).ok()?;
        match self.locate(&rel)? {
            Location::WriteDir(..) => self.write_dir.clone(),
            Location::Mount(mounted, ..) => Some(mounted.point.source.clone()),
            Location::Synthetic => None,
        }
    }

    fn open(&self, path: &str, mode: OpenMode) -> Result<Stream> {
        if mode.is_write() {
            let target = self.write_target(path)?;
            let append = mode == OpenMode::Append;
            debug!("opening {} for {:?}", target.display(), mode);
            return utils::open_for_write(&target, append)
                .map(Stream::Host)
                .or_else(|e| self.fail(VfsError::write_error(format!("{path}: {e}"))));
        }

        let rel = self.sanitize(path)?;
        match self.locate(&rel) {
            Some(Location::WriteDir(host, EntryType::File)) => File::open(host)
                .map(Stream::Host)
                .or_else(|e| self.fail(VfsError::from(e))),
            Some(Location::Mount(mounted, sub, EntryType::File)) => mounted
                .source
                .open_member(&sub)
                .inspect_err(|e| self.record(e)),
            Some(_) => self.fail(VfsError::not_found(format!("{path}: is a directory"))),
            None => self.fail(VfsError::not_found(path)),
        }
    }

    fn mkdir(&self, path: &str) -> Result<()> {
        let target = self.write_target(path)?;
        utils::mkdir_all(&target)
            .map(|_| ())
            .or_else(|e| self.fail(VfsError::write_error(format!("{path}: {e}"))))
    }

    fn rm(&self, path: &str) -> Result<()> {
        let target = self.write_target(path)?;
        if !std::fs::exists(&target).unwrap_or(false) {
            return self.fail(VfsError::not_found(path));
        }
        utils::rm_on_host(&target)
            .or_else(|e| self.fail(VfsError::write_error(format!("{path}: {e}"))))
    }

    fn last_error(&self) -> String {
        self.last_error.borrow().clone()
    }
}
