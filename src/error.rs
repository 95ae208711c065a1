//! VFS error types.

use std::io;

use thiserror::Error;

/// Errors produced by the file system layer.
#[derive(Debug, Error)]
pub enum VfsError {
    /// The virtual path could not be resolved for reading.
    #[error("not found: {0}")]
    NotFound(String),

    /// No write directory is designated, or the store rejected a write-mode open.
    #[error("write error: {0}")]
    WriteError(String),

    /// The archive backend refused to bootstrap.
    #[error("backend initialization failed: {0}")]
    BackendInit(String),

    /// A mount source is unreadable, not an archive, or already mounted.
    #[error("mount rejected: {0}")]
    MountRejected(String),

    /// Image bytes could not be decoded.
    #[error("image decoding failed: {0}")]
    Decode(String),

    /// The virtual path escapes the root.
    #[error("invalid path: {0}")]
    InvalidPath(String),

    #[error("I/O error: {0}")]
    Io(#[from] io::Error),
}

impl VfsError {
    pub fn not_found(path: impl Into<String>) -> Self {
        Self::NotFound(path.into())
    }

    pub fn write_error(msg: impl Into<String>) -> Self {
        Self::WriteError(msg.into())
    }

    pub fn backend_init(msg: impl Into<String>) -> Self {
        Self::BackendInit(msg.into())
    }

    pub fn mount_rejected(msg: impl Into<String>) -> Self {
        Self::MountRejected(msg.into())
    }

    pub fn decode(msg: impl Into<String>) -> Self {
        Self::Decode(msg.into())
    }

    pub fn invalid_path(path: impl Into<String>) -> Self {
        Self::InvalidPath(path.into())
    }
}

/// Lets file handles surface VFS failures through `std::io` traits.
impl From<VfsError> for io::Error {
    fn from(e: VfsError) -> Self {
        match e {
            VfsError::NotFound(msg) => io::Error::new(io::ErrorKind::NotFound, msg),
            VfsError::WriteError(msg) => io::Error::new(io::ErrorKind::PermissionDenied, msg),
            VfsError::InvalidPath(msg) => io::Error::new(io::ErrorKind::InvalidInput, msg),
            VfsError::Io(e) => e,
            other => io::Error::other(other.to_string()),
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_messages_carry_context() {
        assert_eq!(
            VfsError::not_found("/data/x.png").to_string(),
            "not found: /data/x.png"
        );
        assert_eq!(
            VfsError::mount_rejected("duplicate").to_string(),
            "mount rejected: duplicate"
        );
    }

    #[test]
    fn test_into_io_error_kind() {
        let e: io::Error = VfsError::not_found("a").into();
        assert_eq!(e.kind(), io::ErrorKind::NotFound);

        let e: io::Error = VfsError::write_error("no write directory").into();
        assert_eq!(e.kind(), io::ErrorKind::PermissionDenied);

        let e: io::Error = VfsError::decode("bad png").into();
        assert_eq!(e.kind(), io::ErrorKind::Other);
    }
}
