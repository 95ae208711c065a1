//! Byte streams behind an open file handle.

use std::fs::File;
use std::io::{self, Cursor, Read, Seek, SeekFrom, Write};

/// The resource an open [`FileHandle`](crate::FileHandle) reads or writes.
///
/// Host entries (mounted directories, the write directory, literal paths)
/// stream straight from the platform file; archive members and bundled
/// resources are materialized in memory and are read-only.
#[derive(Debug)]
pub enum Stream {
    Host(File),
    Memory(Cursor<Vec<u8>>),
}

impl Stream {
    pub fn from_bytes(bytes: Vec<u8>) -> Self {
        Stream::Memory(Cursor::new(bytes))
    }

    /// Total length in bytes.
    pub fn len(&self) -> io::Result<u64> {
        match self {
            Stream::Host(file) => Ok(file.metadata()?.len()),
            Stream::Memory(cursor) => Ok(cursor.get_ref().len() as u64),
        }
    }

    pub fn is_empty(&self) -> io::Result<bool> {
        Ok(self.len()? == 0)
    }

    pub fn position(&self) -> io::Result<u64> {
        match self {
            Stream::Host(file) => {
                let mut file: &File = file;
                file.stream_position()
            }
            Stream::Memory(cursor) => Ok(cursor.position()),
        }
    }
}

impl Read for Stream {
    fn read(&mut self, buf: &mut [u8]) -> io::Result<usize> {
        match self {
            Stream::Host(file) => file.read(buf),
            Stream::Memory(cursor) => cursor.read(buf),
        }
    }
}

impl Write for Stream {
    fn write(&mut self, buf: &[u8]) -> io::Result<usize> {
        match self {
            Stream::Host(file) => file.write(buf),
            Stream::Memory(_) => Err(io::Error::new(
                io::ErrorKind::PermissionDenied,
                "stream is read-only",
            )),
        }
    }

    fn flush(&mut self) -> io::Result<()> {
        match self {
            Stream::Host(file) => file.flush(),
            Stream::Memory(_) => Ok(()),
        }
    }
}

impl Seek for Stream {
    fn seek(&mut self, pos: SeekFrom) -> io::Result<u64> {
        match self {
            Stream::Host(file) => file.seek(pos),
            Stream::Memory(cursor) => cursor.seek(pos),
        }
    }
}
