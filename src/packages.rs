//! Package discovery hooks run by [`Vfs::mount_packages`](crate::Vfs::mount_packages).

use std::path::{Path, PathBuf};

use anyhow::Context;
use log::{info, warn};

use crate::core::FsBackend;

/// Locates bundled packages and mounts them through `fs`.
/// Returns how many were mounted.
pub trait PackageDiscovery {
    fn mount_packages(&self, fs: &mut dyn FsBackend) -> anyhow::Result<usize>;
}

impl<F> PackageDiscovery for F
where
    F: Fn(&mut dyn FsBackend) -> anyhow::Result<usize>,
{
    fn mount_packages(&self, fs: &mut dyn FsBackend) -> anyhow::Result<usize> {
        self(fs)
    }
}

/// Mounts every package file found directly in one host directory.
///
/// Packages are mounted in file-name order, each one prepended, so a package
/// shadows the ones sorting before it. A package the backend rejects is
/// skipped with a warning.
#[derive(Debug, Clone)]
pub struct PackDirDiscovery {
    dir: PathBuf,
    mount_point: String,
    extensions: Vec<String>,
}

impl PackDirDiscovery {
    pub fn new<P: AsRef<Path>>(dir: P) -> Self {
        Self {
            dir: dir.as_ref().to_path_buf(),
            mount_point: String::new(),
            extensions: vec!["hwp".to_string(), "zip".to_string()],
        }
    }

    pub fn with_mount_point(mut self, mount_point: &str) -> Self {
        self.mount_point = mount_point.to_string();
        self
    }

    /// Replaces the recognized extensions (compared case-insensitively).
    pub fn with_extensions(mut self, extensions: &[&str]) -> Self {
        self.extensions = extensions.iter().map(|ext| ext.to_string()).collect();
        self
    }

    pub fn dir(&self) -> &Path {
        &self.dir
    }

    /// Package files in the directory, sorted by file name.
    pub fn packages(&self) -> anyhow::Result<Vec<PathBuf>> {
        let entries = std::fs::read_dir(&self.dir)
            .with_context(|| format!("cannot scan {}", self.dir.display()))?;

        let mut packages = Vec::new();
        for entry in entries {
            let path = entry?.path();
            if path.is_file() && self.is_package(&path) {
                packages.push(path);
            }
        }
        packages.sort_by(|a, b| a.file_name().cmp(&b.file_name()));
        Ok(packages)
    }

    fn is_package(&self, path: &Path) -> bool {
        path.extension()
            .map(|ext| ext.to_string_lossy())
            .is_some_and(|ext| {
                self.extensions
                    .iter()
                    .any(|known| known.eq_ignore_ascii_case(&ext))
            })
    }
}

impl PackageDiscovery for PackDirDiscovery {
    fn mount_packages(&self, fs: &mut dyn FsBackend) -> anyhow::Result<usize> {
        let mut mounted = 0;
        for package in self.packages()? {
            match fs.mount(&package, &self.mount_point, false) {
                Ok(()) => mounted += 1,
                Err(e) => warn!("skipping package {}: {e}", package.display()),
            }
        }
        info!("{mounted} package(s) mounted from {}", self.dir.display());
        Ok(mounted)
    }
}
