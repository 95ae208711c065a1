//! A virtual file system over layered archive packages, with a direct-path
//! fallback for targets that cannot mount archives.
//!
//! ### Overview
//!
//! `vfs-pack` gives one API for reading, writing, enumerating and inspecting
//! files whether they live inside mounted zip packages, in plain host
//! directories or in an in-memory resource bundle.
//! It defines the `FsBackend` trait and provides two realizations of it,
//! `ArchiveFS` (a search path of mounted packages) and `DirectFS` (ordered
//! path resolution against bundled resources, the literal path and the write
//! directory). The `Vfs` manager owns one of them and is passed around
//! explicitly.
//!
//! **Key ideas**:
//! - **Search path**: mounts are prepended or appended; the first source holding a path wins.
//! - **One write directory**: every write-mode open lands in the designated directory.
//! - **Uniform handles**: `FileHandle` behaves the same whatever backs the bytes.
//! - **Lossy helpers**: whole-file read/write and image decoding absorb failures,
//!   log a warning and return an empty result.
//! - **Config**: `IniReader` parses sectioned `key=value` files read through the VFS.

mod config;
mod core;
mod error;
mod file;
mod imaging;
mod manager;
mod packages;
mod stream;
mod vfs;

pub use config::{IniReader, Value};
pub use crate::core::{FsBackend, MountPoint, OpenMode, Result};
pub use error::VfsError;
pub use file::{FileHandle, HandleState};
pub use imaging::{Icon, ImageCodec, Pixmap, RasterCodec};
pub use manager::{Lifecycle, Vfs};
pub use packages::{PackDirDiscovery, PackageDiscovery};
pub use stream::Stream;
pub use vfs::{
    ArchiveFS, DirectFS, Entry, EntryType, RESOURCE_MARKER, ResolveContext, Resolved, Resolver,
    ResourceBundle, Strategy, resource_path,
};
