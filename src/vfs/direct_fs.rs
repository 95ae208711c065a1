//! Direct-path realization for targets without an archive-mounting facility.
//!
//! Virtual paths are resolved through a [`Resolver`]: bundled resources first
//! (absolute paths only), then the literal host path, then the write
//! directory. Mounting is a no-op and no global error state is kept.

use std::fs::File;
use std::path::{Path, PathBuf};

use log::debug;

use crate::core::{FsBackend, MountPoint, OpenMode, Result, utils};
use crate::error::VfsError;
use crate::stream::Stream;
use crate::vfs::bundle::{RESOURCE_MARKER, ResourceBundle};
use crate::vfs::resolve::{ResolveContext, Resolved, Resolver};

#[derive(Debug, Default)]
pub struct DirectFS {
    bundle: ResourceBundle,
    resolver: Resolver,
    write_dir: Option<PathBuf>,
}

impl ResolveContext for DirectFS {
    fn has_resource(&self, resource: &str) -> bool {
        self.bundle.exists(resource)
    }

    fn host_exists(&self, path: &Path) -> bool {
        path.exists()
    }

    fn write_root(&self) -> Option<&Path> {
        self.write_dir.as_deref()
    }
}

impl DirectFS {
    pub fn new(bundle: ResourceBundle) -> Self {
        Self {
            bundle,
            resolver: Resolver::default(),
            write_dir: None,
        }
    }

    /// Replaces the read-resolution strategy list.
    pub fn set_resolver(&mut self, resolver: Resolver) {
        self.resolver = resolver;
    }

    pub fn bundle(&self) -> &ResourceBundle {
        &self.bundle
    }

    pub fn resolve(&self, path: &str) -> Resolved {
        let resolved = self.resolver.resolve(path, self);
        debug!("resolved {path} to {resolved:?}");
        resolved
    }

    fn write_target(&self, path: &str) -> Result<PathBuf> {
        let Some(write_dir) = &self.write_dir else {
            return Err(VfsError::write_error("no write directory is set"));
        };
        if path.starts_with(RESOURCE_MARKER) {
            return Err(VfsError::write_error(format!("{path}: resources are read-only")));
        }
        let Ok(rel) = utils::sanitize(path) else {
            return Err(VfsError::write_error(format!(
                "{path}: escapes the write directory"
            )));
        };
        if rel.is_empty() {
            return Err(VfsError::write_error(format!("{path}: not a file name")));
        }
        Ok(write_dir.join(rel))
    }
}

impl FsBackend for DirectFS {
    fn init(&mut self, _invocation_path: &str) -> Result<()> {
        debug!("direct-path realization needs no initialization");
        Ok(())
    }

    fn deinit(&mut self) {}

    fn supports_mounting(&self) -> bool {
        false
    }

    fn mount(&mut self, source: &Path, _mount_point: &str, _append: bool) -> Result<()> {
        debug!("ignoring mount of {} (direct-path realization)", source.display());
        Ok(())
    }

    fn unmount(&mut self, _source: &Path) -> Result<()> {
        Ok(())
    }

    fn search_path(&self) -> Vec<MountPoint> {
        Vec::new()
    }

    /// Records the path as-is.
    fn set_write_dir(&mut self, path: &Path) -> Result<()> {
        self.write_dir = Some(path.to_path_buf());
        Ok(())
    }

    fn write_dir(&self) -> Option<&Path> {
        self.write_dir.as_deref()
    }

    fn base_dir(&self) -> Option<&Path> {
        None
    }

    fn exists(&self, path: &str) -> bool {
        match self.resolve(path) {
            Resolved::Resource(resource) => self.bundle.exists(&resource),
            Resolved::Host(host) => host.exists(),
        }
    }

    fn is_dir(&self, path: &str) -> bool {
        match self.resolve(path) {
            Resolved::Resource(resource) => self.bundle.is_dir(&resource),
            Resolved::Host(host) => host.is_dir(),
        }
    }

    fn is_file(&self, path: &str) -> bool {
        match self.resolve(path) {
            Resolved::Resource(resource) => self.bundle.is_file(&resource),
            Resolved::Host(host) => host.is_file(),
        }
    }

    fn ls(&self, path: &str) -> Result<Vec<String>> {
        match self.resolve(path) {
            Resolved::Resource(resource) => self.bundle.ls(&resource),
            Resolved::Host(host) => {
                if !host.is_dir() {
                    return Err(VfsError::not_found(format!("{path}: not a directory")));
                }
                let mut names: Vec<String> = std::fs::read_dir(&host)?
                    .filter_map(|entry| entry.ok())
                    .map(|entry| entry.file_name().to_string_lossy().into_owned())
                    .collect();
                names.sort();
                Ok(names)
            }
        }
    }

    /// Absolute directory containing the resolved entry; bundled resources
    /// report their parent in marker form.
    fn real_dir(&self, path: &str) -> Option<PathBuf> {
        match self.resolve(path) {
            Resolved::Resource(resource) => {
                if !self.bundle.exists(&resource) {
                    return None;
                }
                let inner = resource.strip_prefix(RESOURCE_MARKER).unwrap_or(&resource);
                let parent = Path::new(inner).parent().unwrap_or(Path::new("/"));
                Some(PathBuf::from(format!(
                    "{RESOURCE_MARKER}{}",
                    parent.display()
                )))
            }
            Resolved::Host(host) => {
                if !host.exists() {
                    return None;
                }
                std::path::absolute(&host)
                    .ok()?
                    .parent()
                    .map(Path::to_path_buf)
            }
        }
    }

    fn open(&self, path: &str, mode: OpenMode) -> Result<Stream> {
        if mode.is_write() {
            let target = self.write_target(path)?;
            return utils::open_for_write(&target, mode == OpenMode::Append)
                .map(Stream::Host)
                .map_err(|e| VfsError::write_error(format!("{path}: {e}")));
        }

        match self.resolve(path) {
            Resolved::Resource(resource) => self.bundle.read(&resource).map(Stream::from_bytes),
            Resolved::Host(host) => {
                if !host.is_file() {
                    return Err(VfsError::not_found(path));
                }
                Ok(Stream::Host(File::open(host)?))
            }
        }
    }

    fn mkdir(&self, path: &str) -> Result<()> {
        let target = self.write_target(path)?;
        utils::mkdir_all(&target)
            .map(|_| ())
            .map_err(|e| VfsError::write_error(format!("{path}: {e}")))
    }

    fn rm(&self, path: &str) -> Result<()> {
        let target = self.write_target(path)?;
        if !target.exists() {
            return Err(VfsError::not_found(path));
        }
        utils::rm_on_host(&target).map_err(|e| VfsError::write_error(format!("{path}: {e}")))
    }

    /// No centralized error state is tracked.
    fn last_error(&self) -> String {
        String::new()
    }
}
