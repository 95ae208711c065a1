//! File handles bound to one virtual path.

use std::io::{self, Read, Seek, SeekFrom, Write};

use log::warn;

use crate::core::{FsBackend, OpenMode, Result};
use crate::error::VfsError;
use crate::stream::Stream;

#[derive(Debug, Copy, Clone, PartialEq, Eq)]
pub enum HandleState {
    Closed,
    OpenRead,
    OpenWrite,
}

/// A seekable byte stream over one virtual path.
///
/// The handle is created closed and becomes usable once [`open`](Self::open)
/// succeeds. Whatever backs the bytes (a zip member, a bundled resource or a
/// host file), the handle behaves the same way.
///
/// ### Usage notes:
/// - Failing calls return `Err` and keep the message in [`error_string`](Self::error_string).
/// - `close()` is idempotent; dropping the handle closes it.
/// - Read handles cannot seek past their end; write handles can.
pub struct FileHandle<'a> {
    fs: &'a dyn FsBackend,
    path: String,
    stream: Option<Stream>,
    mode: Option<OpenMode>,
    error: String,
}

impl<'a> FileHandle<'a> {
    pub fn new(fs: &'a dyn FsBackend, path: &str) -> Self {
        Self {
            fs,
            path: path.to_string(),
            stream: None,
            mode: None,
            error: String::new(),
        }
    }

    pub fn path(&self) -> &str {
        &self.path
    }

    pub fn state(&self) -> HandleState {
        match self.mode {
            None => HandleState::Closed,
            Some(mode) if mode.is_write() => HandleState::OpenWrite,
            Some(_) => HandleState::OpenRead,
        }
    }

    pub fn is_open(&self) -> bool {
        self.stream.is_some()
    }

    /// Message of the last failure on this handle; empty after a successful open.
    pub fn error_string(&self) -> &str {
        &self.error
    }

    fn fail<T>(&mut self, err: VfsError) -> Result<T> {
        self.error = err.to_string();
        Err(err)
    }

    fn not_open(&self) -> VfsError {
        VfsError::Io(io::Error::new(
            io::ErrorKind::NotConnected,
            format!("{}: file is not open", self.path),
        ))
    }

    /// Opens the handle, closing it first if it is already open.
    pub fn open(&mut self, mode: OpenMode) -> Result<()> {
        self.close();
        match self.fs.open(&self.path, mode) {
            Ok(stream) => {
                self.stream = Some(stream);
                self.mode = Some(mode);
                self.error.clear();
                Ok(())
            }
            Err(e) => self.fail(e),
        }
    }

    pub fn close(&mut self) {
        if let Some(mut stream) = self.stream.take() {
            if self.mode.is_some_and(OpenMode::is_write) {
                if let Err(e) = stream.flush() {
                    warn!("flushing {} failed: {e}", self.path);
                }
            }
        }
        self.mode = None;
    }

    /// Total byte length; 0 when closed.
    pub fn size(&self) -> u64 {
        self.stream
            .as_ref()
            .and_then(|stream| stream.len().ok())
            .unwrap_or(0)
    }

    /// Cursor position; 0 when closed.
    pub fn position(&self) -> u64 {
        self.stream
            .as_ref()
            .and_then(|stream| stream.position().ok())
            .unwrap_or(0)
    }

    /// Moves the cursor to the absolute `offset`.
    /// Returns `false` and leaves the cursor alone when that is not possible.
    pub fn seek(&mut self, offset: u64) -> bool {
        if !self.is_open() {
            let err = self.not_open();
            self.error = err.to_string();
            return false;
        }
        if self.state() == HandleState::OpenRead && offset > self.size() {
            self.error = format!("{}: cannot seek to {offset}, past the end", self.path);
            return false;
        }
        let Some(stream) = self.stream.as_mut() else {
            return false;
        };
        match stream.seek(SeekFrom::Start(offset)) {
            Ok(_) => true,
            Err(e) => {
                self.error = e.to_string();
                false
            }
        }
    }

    /// Both realizations support random access.
    pub fn is_sequential(&self) -> bool {
        false
    }

    /// Whether the path resolves to a regular file, open or not.
    pub fn exists(&self) -> bool {
        self.fs.is_file(&self.path)
    }

    /// Reads until `buf` is full or the stream ends; returns the byte count.
    pub fn read_bytes(&mut self, buf: &mut [u8]) -> Result<usize> {
        if self.state() != HandleState::OpenRead {
            return self.fail(self.wrong_state("reading"));
        }
        let Some(stream) = self.stream.as_mut() else {
            return self.fail(self.not_open());
        };

        let mut total = 0;
        let result = loop {
            if total == buf.len() {
                break Ok(total);
            }
            match stream.read(&mut buf[total..]) {
                Ok(0) => break Ok(total),
                Ok(n) => total += n,
                Err(e) if e.kind() == io::ErrorKind::Interrupted => {}
                Err(e) => break Err(e),
            }
        };
        result.or_else(|e| self.fail(e.into()))
    }

    /// Writes the whole buffer; returns its length.
    pub fn write_bytes(&mut self, buf: &[u8]) -> Result<usize> {
        if self.state() != HandleState::OpenWrite {
            return self.fail(self.wrong_state("writing"));
        }
        let Some(stream) = self.stream.as_mut() else {
            return self.fail(self.not_open());
        };
        match stream.write_all(buf) {
            Ok(()) => Ok(buf.len()),
            Err(e) => self.fail(e.into()),
        }
    }

    /// Everything from the cursor to the end.
    pub fn read_all(&mut self) -> Result<Vec<u8>> {
        let mut content = Vec::with_capacity(self.size().saturating_sub(self.position()) as usize);
        let mut chunk = [0u8; 8192];
        loop {
            let n = self.read_bytes(&mut chunk)?;
            content.extend_from_slice(&chunk[..n]);
            if n < chunk.len() {
                return Ok(content);
            }
        }
    }

    fn wrong_state(&self, action: &str) -> VfsError {
        match self.state() {
            HandleState::Closed => self.not_open(),
            _ => VfsError::Io(io::Error::new(
                io::ErrorKind::PermissionDenied,
                format!("{}: not opened for {action}", self.path),
            )),
        }
    }
}

impl std::fmt::Debug for FileHandle<'_> {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("FileHandle")
            .field("path", &self.path)
            .field("state", &self.state())
            .field("error", &self.error)
            .finish()
    }
}

impl Read for FileHandle<'_> {
    fn read(&mut self, buf: &mut [u8]) -> io::Result<usize> {
        Ok(self.read_bytes(buf)?)
    }
}

impl Write for FileHandle<'_> {
    fn write(&mut self, buf: &[u8]) -> io::Result<usize> {
        Ok(self.write_bytes(buf)?)
    }

    fn flush(&mut self) -> io::Result<()> {
        match self.stream.as_mut() {
            Some(stream) => stream.flush(),
            None => Err(self.not_open().into()),
        }
    }
}

impl Drop for FileHandle<'_> {
    fn drop(&mut self) {
        self.close();
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::vfs::zip_source::tests::write_zip;
    use crate::vfs::{ArchiveFS, DirectFS, ResourceBundle};
    use tempdir::TempDir;

    fn setup_test_env() -> (TempDir, ArchiveFS) {
        let temp_dir = TempDir::new("file_handle_test").unwrap();
        let pack = temp_dir.path().join("Data.hwp");
        write_zip(&pack, &[("Maps/Cave/map.cfg", b"0123456789")]);
        let write_dir = temp_dir.path().join("user");
        std::fs::create_dir(&write_dir).unwrap();

        let mut fs = ArchiveFS::new();
        fs.init(&temp_dir.path().join("hedgewars").to_string_lossy())
            .unwrap();
        fs.mount(&pack, "", false).unwrap();
        fs.set_write_dir(&write_dir).unwrap();
        (temp_dir, fs)
    }

    mod closed {
        use super::*;

        #[test]
        fn test_closed_defaults() {
            let (_temp_dir, fs) = setup_test_env();
            let mut file = FileHandle::new(&fs, "/Maps/Cave/map.cfg");
            assert_eq!(file.state(), HandleState::Closed);
            assert_eq!(file.size(), 0);
            assert_eq!(file.position(), 0);
            assert!(!file.seek(1));
            assert!(!file.error_string().is_empty());
            assert!(file.read_bytes(&mut [0u8; 4]).is_err());
            assert!(file.write_bytes(b"x").is_err());
            assert!(!file.is_sequential());
        }

        #[test]
        fn test_close_is_idempotent() -> Result<()> {
            let (_temp_dir, fs) = setup_test_env();
            let mut file = FileHandle::new(&fs, "/Maps/Cave/map.cfg");
            file.open(OpenMode::Read)?;
            assert_eq!(file.size(), 10);
            file.close();
            file.close();
            assert_eq!(file.state(), HandleState::Closed);
            assert_eq!(file.size(), 0);
            assert_eq!(file.position(), 0);
            Ok(())
        }

        #[test]
        fn test_exists_ignores_open_state() {
            let (_temp_dir, fs) = setup_test_env();
            assert!(FileHandle::new(&fs, "Maps/Cave/map.cfg").exists());
            assert!(!FileHandle::new(&fs, "Maps/Cave").exists());
            assert!(!FileHandle::new(&fs, "Maps/Cave/missing.cfg").exists());
        }
    }

    mod reading {
        use super::*;

        #[test]
        fn test_partial_reads() -> Result<()> {
            let (_temp_dir, fs) = setup_test_env();
            let mut file = FileHandle::new(&fs, "/Maps/Cave/map.cfg");
            file.open(OpenMode::Read)?;
            assert_eq!(file.state(), HandleState::OpenRead);

            let mut buf = [0u8; 4];
            assert_eq!(file.read_bytes(&mut buf)?, 4);
            assert_eq!(&buf, b"0123");
            assert_eq!(file.position(), 4);
            assert_eq!(file.read_bytes(&mut buf)?, 4);
            assert_eq!(file.read_bytes(&mut buf)?, 2);
            assert_eq!(&buf[..2], b"89");
            assert_eq!(file.read_bytes(&mut buf)?, 0);
            Ok(())
        }

        #[test]
        fn test_seek_within_bounds() -> Result<()> {
            let (_temp_dir, fs) = setup_test_env();
            let mut file = FileHandle::new(&fs, "/Maps/Cave/map.cfg");
            file.open(OpenMode::Read)?;

            assert!(file.seek(7));
            assert_eq!(file.position(), 7);
            assert_eq!(file.read_all()?, b"789");
            assert!(file.seek(10));
            assert!(!file.seek(11));
            assert_eq!(file.position(), 10);
            assert!(file.error_string().contains("past the end"));
            Ok(())
        }

        #[test]
        fn test_missing_file() {
            let (_temp_dir, fs) = setup_test_env();
            let mut file = FileHandle::new(&fs, "/Maps/Nowhere/map.cfg");
            assert!(matches!(
                file.open(OpenMode::Read),
                Err(VfsError::NotFound(_))
            ));
            assert_eq!(file.state(), HandleState::Closed);
            assert!(file.error_string().starts_with("not found"));
        }

        #[test]
        fn test_write_on_read_handle() -> Result<()> {
            let (_temp_dir, fs) = setup_test_env();
            let mut file = FileHandle::new(&fs, "/Maps/Cave/map.cfg");
            file.open(OpenMode::Read)?;
            assert!(file.write_bytes(b"x").is_err());
            assert!(file.error_string().contains("not opened for writing"));
            Ok(())
        }

        #[test]
        fn test_std_read() -> anyhow::Result<()> {
            let (_temp_dir, fs) = setup_test_env();
            let mut file = FileHandle::new(&fs, "/Maps/Cave/map.cfg");
            file.open(OpenMode::Read)?;
            let mut text = String::new();
            file.read_to_string(&mut text)?;
            assert_eq!(text, "0123456789");
            Ok(())
        }
    }

    mod writing {
        use super::*;

        #[test]
        fn test_write_then_read() -> Result<()> {
            let (temp_dir, fs) = setup_test_env();
            let mut file = FileHandle::new(&fs, "settings.ini");
            file.open(OpenMode::Write)?;
            assert_eq!(file.state(), HandleState::OpenWrite);
            assert_eq!(file.write_bytes(b"[video]\n")?, 8);
            assert!(file.seek(100));
            assert_eq!(file.position(), 100);
            assert!(file.seek(8));

            file.open(OpenMode::Append)?;
            file.write_bytes(b"fullscreen=true\n")?;
            file.close();
            assert_eq!(
                std::fs::read(temp_dir.path().join("user/settings.ini"))?,
                b"[video]\nfullscreen=true\n"
            );

            file.open(OpenMode::Read)?;
            assert_eq!(file.read_all()?, b"[video]\nfullscreen=true\n");
            Ok(())
        }

        #[test]
        fn test_drop_closes() -> anyhow::Result<()> {
            let (temp_dir, fs) = setup_test_env();
            {
                let mut file = FileHandle::new(&fs, "log.txt");
                file.open(OpenMode::Write)?;
                file.write_all(b"dropped")?;
            }
            assert_eq!(std::fs::read(temp_dir.path().join("user/log.txt"))?, b"dropped");
            Ok(())
        }

        #[test]
        fn test_write_without_write_dir() {
            let fs = DirectFS::new(ResourceBundle::new());
            let mut file = FileHandle::new(&fs, "save.txt");
            assert!(matches!(
                file.open(OpenMode::Write),
                Err(VfsError::WriteError(_))
            ));
            assert!(file.error_string().starts_with("write error"));
        }
    }

    #[test]
    fn test_bundled_resource_handle() -> Result<()> {
        let mut bundle = ResourceBundle::new();
        bundle.mkfile("/Data/Fonts/font.ttf", b"glyphs")?;
        let fs = DirectFS::new(bundle);

        let mut file = FileHandle::new(&fs, "/Data/Fonts/font.ttf");
        assert!(file.exists());
        file.open(OpenMode::Read)?;
        assert_eq!(file.size(), 6);
        assert!(file.seek(3));
        assert_eq!(file.read_all()?, b"phs");
        assert!(!file.seek(7));
        Ok(())
    }
}
