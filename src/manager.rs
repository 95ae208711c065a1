//! The file system manager.

use std::io::Write;
use std::path::{Path, PathBuf};

use image::DynamicImage;
use log::{debug, error, info, warn};

use crate::core::{FsBackend, MountPoint, OpenMode, Result};
use crate::error::VfsError;
use crate::file::FileHandle;
use crate::imaging::{Icon, ImageCodec, Pixmap, RasterCodec};
use crate::packages::PackageDiscovery;
use crate::vfs::{ArchiveFS, DirectFS, ResourceBundle};

#[derive(Debug, Copy, Clone, PartialEq, Eq)]
pub enum Lifecycle {
    Uninitialized,
    Initialized,
    Deinitialized,
}

/// Owns the active storage realization and is the single authority for path
/// resolution and the mount table.
///
/// A `Vfs` is constructed once, passed around by reference and torn down with
/// [`deinit`](Self::deinit) (or on drop). File handles borrow it, so the
/// mount table cannot change while a handle is alive.
///
/// ### Key Features:
/// - **One contract, two realizations**: [`ArchiveFS`] or [`DirectFS`], chosen
///   by [`Vfs::new`] from the `direct-path` cargo feature, or explicitly.
/// - **Lossy helpers**: `read_file`, `write_file` and the `decode_*` family
///   never fail loudly; they log a warning and return an empty result.
/// - **Hooks**: package discovery and image decoding are pluggable.
pub struct Vfs {
    backend: Box<dyn FsBackend>,
    lifecycle: Lifecycle,
    discovery: Option<Box<dyn PackageDiscovery>>,
    codec: Box<dyn ImageCodec>,
}

impl Default for Vfs {
    fn default() -> Self {
        Self::new()
    }
}

impl Vfs {
    /// Builds the realization selected at compile time.
    pub fn new() -> Self {
        if cfg!(feature = "direct-path") {
            Self::direct(ResourceBundle::new())
        } else {
            Self::archive()
        }
    }

    pub fn archive() -> Self {
        Self::with_backend(Box::new(ArchiveFS::new()))
    }

    pub fn direct(bundle: ResourceBundle) -> Self {
        Self::with_backend(Box::new(DirectFS::new(bundle)))
    }

    pub fn with_backend(backend: Box<dyn FsBackend>) -> Self {
        Self {
            backend,
            lifecycle: Lifecycle::Uninitialized,
            discovery: None,
            codec: Box::new(RasterCodec),
        }
    }

    pub fn backend(&self) -> &dyn FsBackend {
        self.backend.as_ref()
    }

    pub fn lifecycle(&self) -> Lifecycle {
        self.lifecycle
    }

    pub fn set_package_discovery<D: PackageDiscovery + 'static>(&mut self, discovery: D) {
        self.discovery = Some(Box::new(discovery));
    }

    pub fn set_image_codec<C: ImageCodec + 'static>(&mut self, codec: C) {
        self.codec = Box::new(codec);
    }

    /// One-time bootstrap with the running program's own path.
    pub fn init(&mut self, invocation_path: &str) -> Result<()> {
        if self.lifecycle != Lifecycle::Uninitialized {
            return Err(VfsError::backend_init(format!(
                "cannot initialize from state {:?}",
                self.lifecycle
            )));
        }
        if let Err(e) = self.backend.init(invocation_path) {
            error!("file system initialization failed: {e}");
            return Err(e);
        }
        self.lifecycle = Lifecycle::Initialized;
        Ok(())
    }

    /// Releases the backend. Only an initialized manager has anything to release.
    pub fn deinit(&mut self) {
        if self.lifecycle != Lifecycle::Initialized {
            debug!("deinit skipped in state {:?}", self.lifecycle);
            return;
        }
        self.backend.deinit();
        self.lifecycle = Lifecycle::Deinitialized;
    }

    /// Adds an archive or directory to the search path under `mount_point`.
    /// Without `append` it is searched before everything already mounted.
    pub fn mount<P: AsRef<Path>>(
        &mut self,
        source: P,
        mount_point: &str,
        append: bool,
    ) -> Result<()> {
        self.backend.mount(source.as_ref(), mount_point, append)
    }

    pub fn unmount<P: AsRef<Path>>(&mut self, source: P) -> Result<()> {
        self.backend.unmount(source.as_ref())
    }

    pub fn search_path(&self) -> Vec<MountPoint> {
        self.backend.search_path()
    }

    /// Runs the package discovery hook; returns the number of packages mounted.
    pub fn mount_packages(&mut self) -> usize {
        if !self.backend.supports_mounting() {
            debug!("package discovery skipped, mounting is not supported");
            return 0;
        }
        let Some(discovery) = self.discovery.as_ref() else {
            debug!("no package discovery hook installed");
            return 0;
        };
        match discovery.mount_packages(self.backend.as_mut()) {
            Ok(mounted) => {
                info!("{mounted} package(s) mounted");
                mounted
            }
            Err(e) => {
                warn!("package discovery failed: {e:#}");
                0
            }
        }
    }

    pub fn set_write_dir<P: AsRef<Path>>(&mut self, path: P) -> Result<()> {
        self.backend.set_write_dir(path.as_ref())
    }

    pub fn write_dir(&self) -> Option<&Path> {
        self.backend.write_dir()
    }

    pub fn base_dir(&self) -> Option<&Path> {
        self.backend.base_dir()
    }

    pub fn exists(&self, path: &str) -> bool {
        self.backend.exists(path)
    }

    pub fn is_dir(&self, path: &str) -> bool {
        self.backend.is_dir(path)
    }

    /// Direct children of a directory; empty if `path` is not one.
    pub fn list_directory(&self, path: &str) -> Vec<String> {
        self.backend.ls(path).unwrap_or_else(|e| {
            debug!("cannot list {path}: {e}");
            Vec::new()
        })
    }

    pub fn real_dir(&self, path: &str) -> Option<PathBuf> {
        self.backend.real_dir(path)
    }

    /// Most recent backend-level failure. Always empty for the direct-path
    /// realization. The slot is shared by every call, so it may describe an
    /// unrelated earlier failure.
    pub fn last_error(&self) -> String {
        self.backend.last_error()
    }

    /// A closed handle bound to `path`.
    pub fn open_file(&self, path: &str) -> FileHandle<'_> {
        FileHandle::new(self.backend.as_ref(), path)
    }

    /// Whole content of `path`, or nothing if it cannot be read.
    pub fn read_file(&self, path: &str) -> Vec<u8> {
        let mut file = self.open_file(path);
        if let Err(e) = file.open(OpenMode::Read) {
            warn!("cannot open {path} for reading: {e}");
            return Vec::new();
        }
        file.read_all().unwrap_or_else(|e| {
            warn!("cannot read {path}: {e}");
            Vec::new()
        })
    }

    /// Replaces `path` in the write directory with `content`.
    pub fn write_file(&self, path: &str, content: &[u8]) -> bool {
        let mut file = self.open_file(path);
        if let Err(e) = file.open(OpenMode::Write) {
            warn!("cannot open {path} for writing: {e}");
            return false;
        }
        match file.write_bytes(content) {
            Ok(written) if written == content.len() => {}
            Ok(written) => {
                warn!("short write to {path}: {written} of {} bytes", content.len());
                return false;
            }
            Err(e) => {
                warn!("cannot write {path}: {e}");
                return false;
            }
        }
        if let Err(e) = file.flush() {
            warn!("cannot flush {path}: {e}");
            return false;
        }
        true
    }

    pub fn mkdir(&self, path: &str) -> Result<()> {
        self.backend.mkdir(path)
    }

    pub fn remove(&self, path: &str) -> Result<()> {
        self.backend.rm(path)
    }

    pub fn decode_image(&self, path: &str) -> Option<DynamicImage> {
        let bytes = self.read_file(path);
        if bytes.is_empty() {
            warn!("no image data in {path}");
            return None;
        }
        self.codec
            .decode(&bytes)
            .inspect_err(|e| warn!("cannot decode {path}: {e}"))
            .ok()
    }

    pub fn decode_pixmap(&self, path: &str) -> Option<Pixmap> {
        self.decode_image(path).map(|image| image.to_rgba8())
    }

    pub fn decode_icon(&self, path: &str) -> Option<Icon> {
        self.decode_pixmap(path).map(Icon::from_pixmap)
    }
}

impl std::fmt::Debug for Vfs {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("Vfs")
            .field("lifecycle", &self.lifecycle)
            .field("search_path", &self.backend.search_path())
            .field("write_dir", &self.backend.write_dir())
            .finish_non_exhaustive()
    }
}

impl Drop for Vfs {
    fn drop(&mut self) {
        if self.lifecycle == Lifecycle::Initialized {
            self.deinit();
        }
    }
}
