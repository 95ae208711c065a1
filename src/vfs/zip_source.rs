//! Mount source backed by a zip archive (`.hwp` packages are plain zips).

use std::cell::RefCell;
use std::collections::BTreeMap;
use std::fs::File;
use std::io::{self, Read};
use std::path::{Path, PathBuf};

use log::warn;
use zip::ZipArchive;

use crate::core::{Result, utils};
use crate::error::VfsError;
use crate::stream::Stream;
use crate::vfs::{Entry, EntryType};

/// A zip archive mounted into the search path.
///
/// The central directory is indexed once at mount time. Directories implied
/// by member names exist even when the archive has no explicit entry for
/// them. Members are inflated into memory when opened.
pub struct ZipSource {
    path: PathBuf,
    archive: RefCell<ZipArchive<File>>,
    entries: BTreeMap<PathBuf, Entry>, // inner absolute normalized paths
}

impl std::fmt::Debug for ZipSource {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("ZipSource")
            .field("path", &self.path)
            .field("entries", &self.entries.len())
            .finish()
    }
}

impl ZipSource {
    pub fn open<P: AsRef<Path>>(path: P) -> Result<Self> {
        let path = path.as_ref();
        let file = File::open(path).map_err(|e| {
            VfsError::mount_rejected(format!("{}: {}", path.display(), e))
        })?;
        let mut archive = ZipArchive::new(file).map_err(|e| {
            VfsError::mount_rejected(format!("{}: {}", path.display(), e))
        })?;

        let mut entries = BTreeMap::new();
        entries.insert(PathBuf::from("/"), Entry::new(EntryType::Directory));

        for index in 0..archive.len() {
            let (name, is_dir) = {
                let member = archive.by_index_raw(index).map_err(|e| {
                    VfsError::mount_rejected(format!("{}: {}", path.display(), e))
                })?;
                (member.name().to_string(), member.is_dir())
            };

            let rel = match utils::sanitize(&name) {
                Ok(rel) if !rel.is_empty() => rel,
                _ => {
                    warn!("skipping unsafe member {:?} in {}", name, path.display());
                    continue;
                }
            };
            let inner = utils::to_inner(&rel);

            let mut parent = inner.parent();
            while let Some(dir) = parent {
                entries
                    .entry(dir.to_path_buf())
                    .or_insert_with(|| Entry::new(EntryType::Directory));
                parent = dir.parent();
            }

            if is_dir {
                entries.insert(inner, Entry::new(EntryType::Directory));
            } else {
                entries.insert(inner, Entry::archived(index));
            }
        }

        Ok(Self {
            path: path.to_path_buf(),
            archive: RefCell::new(archive),
            entries,
        })
    }

    pub fn path(&self) -> &Path {
        &self.path
    }

    pub fn entry_type(&self, rel: &str) -> Option<EntryType> {
        self.entries
            .get(&utils::to_inner(rel))
            .map(Entry::entry_type)
    }

    pub fn ls(&self, rel: &str) -> Option<Vec<String>> {
        let inner = utils::to_inner(rel);
        if !self.entries.get(&inner)?.is_dir() {
            return None;
        }
        Some(utils::children(
            self.entries.keys().map(PathBuf::as_path),
            &inner,
        ))
    }

    pub fn open_member(&self, rel: &str) -> Result<Stream> {
        let index = self
            .entries
            .get(&utils::to_inner(rel))
            .and_then(Entry::archive_index)
            .ok_or_else(|| VfsError::not_found(rel))?;

        let mut archive = self.archive.borrow_mut();
        let mut member = archive
            .by_index(index)
            .map_err(|e| VfsError::Io(io::Error::other(e)))?;
        let mut bytes = Vec::with_capacity(member.size().min(1 << 20) as usize);
        member.read_to_end(&mut bytes)?;
        Ok(Stream::from_bytes(bytes))
    }
}

#[cfg(test)]
pub(crate) mod tests {
    use super::*;
    use std::io::Write;
    use tempdir::TempDir;
    use zip::write::SimpleFileOptions;

    /// Writes a stored (uncompressed) zip with the given members.
    /// Names ending in `/` become directory entries.
    pub(crate) fn write_zip(path: &Path, members: &[(&str, &[u8])]) {
        let mut writer = zip::ZipWriter::new(File::create(path).unwrap());
        let options =
            SimpleFileOptions::default().compression_method(zip::CompressionMethod::Stored);
        for (name, content) in members {
            if name.ends_with('/') {
                writer.add_directory(*name, options).unwrap();
            } else {
                writer.start_file(*name, options).unwrap();
                writer.write_all(content).unwrap();
            }
        }
        writer.finish().unwrap();
    }

    fn setup_test_env() -> (TempDir, PathBuf) {
        let temp_dir = TempDir::new("zip_source_test").unwrap();
        let archive = temp_dir.path().join("Default.hwp");
        write_zip(
            &archive,
            &[
                ("Sounds/", b""),
                ("Graphics/Hats/cap.png", b"cap"),
                ("Graphics/Hats/crown.png", b"crown"),
                ("readme.txt", b"hello"),
            ],
        );
        (temp_dir, archive)
    }

    #[test]
    fn test_index_implies_parents() -> Result<()> {
        let (_temp_dir, archive) = setup_test_env();
        let source = ZipSource::open(&archive)?;

        assert_eq!(source.entry_type(""), Some(EntryType::Directory));
        assert_eq!(source.entry_type("Graphics"), Some(EntryType::Directory));
        assert_eq!(source.entry_type("Sounds"), Some(EntryType::Directory));
        assert_eq!(source.entry_type("Graphics/Hats/cap.png"), Some(EntryType::File));
        assert_eq!(source.entry_type("Graphics/Hats/none.png"), None);
        Ok(())
    }

    #[test]
    fn test_open_member() -> Result<()> {
        let (_temp_dir, archive) = setup_test_env();
        let source = ZipSource::open(&archive)?;

        let mut content = Vec::new();
        source.open_member("Graphics/Hats/crown.png")?.read_to_end(&mut content)?;
        assert_eq!(content, b"crown");

        assert!(matches!(source.open_member("Graphics"), Err(VfsError::NotFound(_))));
        assert!(source.open_member("missing").is_err());
        Ok(())
    }

    #[test]
    fn test_ls() -> Result<()> {
        let (_temp_dir, archive) = setup_test_env();
        let source = ZipSource::open(&archive)?;

        assert_eq!(
            source.ls(""),
            Some(vec![
                "Graphics".to_string(),
                "Sounds".to_string(),
                "readme.txt".to_string()
            ])
        );
        assert_eq!(
            source.ls("Graphics/Hats"),
            Some(vec!["cap.png".to_string(), "crown.png".to_string()])
        );
        assert_eq!(source.ls("readme.txt"), None);
        Ok(())
    }

    #[test]
    fn test_forged_member_size_is_not_trusted() -> Result<()> {
        let temp_dir = TempDir::new("zip_source_test")?;
        let archive = temp_dir.path().join("Forged.hwp");
        write_zip(&archive, &[("big.bin", b"tiny")]);

        // Claim an uncompressed size close to 4 GiB in both headers.
        let forged = 0xFFFF_FFF0u32.to_le_bytes();
        let mut bytes = std::fs::read(&archive)?;
        for (signature, offset) in [([0x50, 0x4b, 0x03, 0x04], 22), ([0x50, 0x4b, 0x01, 0x02], 24)] {
            let header = bytes
                .windows(4)
                .position(|w| w == signature)
                .expect("header present");
            bytes[header + offset..header + offset + 4].copy_from_slice(&forged);
        }
        std::fs::write(&archive, &bytes)?;

        if let Ok(source) = ZipSource::open(&archive) {
            if let Ok(stream) = source.open_member("big.bin") {
                assert!(stream.len()? <= 4);
            }
        }
        Ok(())
    }

    #[test]
    fn test_open_rejects_non_archive() {
        let temp_dir = TempDir::new("zip_source_test").unwrap();
        let bogus = temp_dir.path().join("bogus.hwp");
        std::fs::write(&bogus, b"definitely not a zip").unwrap();

        assert!(matches!(
            ZipSource::open(&bogus),
            Err(VfsError::MountRejected(_))
        ));
        assert!(ZipSource::open(temp_dir.path().join("missing.hwp")).is_err());
    }
}
