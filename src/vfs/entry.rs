#[derive(Debug, Copy, Clone, PartialEq, Eq)]
pub enum EntryType {
    File,
    Directory,
}

/// Where the bytes of a file entry live.
#[derive(Debug, Clone, PartialEq)]
pub(crate) enum Payload {
    None,
    Bytes(Vec<u8>),
    /// Member index inside the owning zip archive.
    Archived(usize),
}

/// An indexed entry of an in-memory tree (resource bundle or archive index).
#[derive(Debug, Clone, PartialEq)]
pub struct Entry {
    entry_type: EntryType,
    payload: Payload,
}

impl Entry {
    pub fn new(entry_type: EntryType) -> Self {
        Self {
            entry_type,
            payload: Payload::None,
        }
    }

    pub(crate) fn archived(index: usize) -> Self {
        Self {
            entry_type: EntryType::File,
            payload: Payload::Archived(index),
        }
    }

    pub fn entry_type(&self) -> EntryType {
        self.entry_type
    }

    pub fn is_file(&self) -> bool {
        self.entry_type == EntryType::File
    }

    pub fn is_dir(&self) -> bool {
        self.entry_type == EntryType::Directory
    }

    pub fn content(&self) -> Option<&Vec<u8>> {
        match &self.payload {
            Payload::Bytes(bytes) => Some(bytes),
            _ => None,
        }
    }

    pub fn set_content(&mut self, content: &[u8]) {
        self.payload = Payload::Bytes(content.to_vec());
    }

    pub(crate) fn archive_index(&self) -> Option<usize> {
        match self.payload {
            Payload::Archived(index) => Some(index),
            _ => None,
        }
    }
}
