//! Read-path resolution for the direct-path realization.
//!
//! Without an archive-mounting facility a virtual path is probed against an
//! ordered list of strategies; the first one that finds something wins. When
//! none does, the original path is handed back untouched so that opening it
//! fails with an ordinary not-found error.

use std::path::{Path, PathBuf};

use crate::vfs::bundle::{RESOURCE_MARKER, resource_path};

/// Where a virtual path resolved to.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum Resolved {
    /// A bundled resource, in marker form (`:/a/b`).
    Resource(String),
    /// A path on the host filesystem.
    Host(PathBuf),
}

/// What the strategies may look at.
pub trait ResolveContext {
    fn has_resource(&self, resource: &str) -> bool;
    fn host_exists(&self, path: &Path) -> bool;
    fn write_root(&self) -> Option<&Path>;
}

#[derive(Debug, Copy, Clone, PartialEq, Eq)]
pub enum Strategy {
    /// Absolute paths are looked up in the resource bundle.
    BundledResource,
    /// The virtual path taken verbatim as a host path.
    LiteralPath,
    /// The virtual path below the write directory.
    WriteDirectory,
}

impl Strategy {
    pub fn try_resolve(self, path: &str, ctx: &dyn ResolveContext) -> Option<Resolved> {
        match self {
            Strategy::BundledResource => {
                if !path.starts_with('/') {
                    return None;
                }
                let resource = resource_path(path);
                ctx.has_resource(&resource)
                    .then_some(Resolved::Resource(resource))
            }
            Strategy::LiteralPath => {
                let host = PathBuf::from(path);
                ctx.host_exists(&host).then_some(Resolved::Host(host))
            }
            Strategy::WriteDirectory => {
                let host = ctx.write_root()?.join(path.trim_start_matches('/'));
                ctx.host_exists(&host).then_some(Resolved::Host(host))
            }
        }
    }
}

/// Ordered strategy list; first success wins.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Resolver {
    strategies: Vec<Strategy>,
}

impl Default for Resolver {
    fn default() -> Self {
        Self::new(vec![
            Strategy::BundledResource,
            Strategy::LiteralPath,
            Strategy::WriteDirectory,
        ])
    }
}

impl Resolver {
    pub fn new(strategies: Vec<Strategy>) -> Self {
        Self { strategies }
    }

    pub fn strategies(&self) -> &[Strategy] {
        &self.strategies
    }

    pub fn resolve(&self, path: &str, ctx: &dyn ResolveContext) -> Resolved {
        if path.starts_with(RESOURCE_MARKER) {
            return Resolved::Resource(path.to_string());
        }
        self.strategies
            .iter()
            .find_map(|strategy| strategy.try_resolve(path, ctx))
            .unwrap_or_else(|| Resolved::Host(PathBuf::from(path)))
    }
}
