//! Disk Store Module
//!
//! One file per key under a private directory. Each file holds the 8-byte
//! expiration header followed by the payload. All operations are
//! synchronous; ordering of mutations is imposed by the write queue.

use std::fs::{self, File};
use std::io::{ErrorKind, Read, Write};
use std::path::{Path, PathBuf};
use std::sync::atomic::{AtomicU64, Ordering};

use tracing::debug;

use crate::cache::entry::{decode_entry, encode_entry, Expiration, HEADER_LEN};
use crate::error::{CacheError, Result};

/// Name prefix of in-flight temp files. Caller keys may not start with it.
pub(crate) const TMP_PREFIX: &str = ".~tmp-";

static TMP_COUNTER: AtomicU64 = AtomicU64::new(0);

// == Disk Store ==
/// Path-addressed persistent byte store.
#[derive(Debug, Clone)]
pub struct DiskStore {
    /// Directory holding the entry files
    root: PathBuf,
}

impl DiskStore {
    // == Constructor ==
    /// Opens a store rooted at `root`, creating the directory if needed.
    pub fn open(root: impl Into<PathBuf>) -> Result<Self> {
        let root = root.into();
        fs::create_dir_all(&root)?;
        Ok(Self { root })
    }

    /// Builds a handle without touching the filesystem.
    pub fn unchecked(root: impl Into<PathBuf>) -> Self {
        Self { root: root.into() }
    }

    pub fn root(&self) -> &Path {
        &self.root
    }

    /// Path of the file addressed by `key`.
    pub fn path_for(&self, key: &str) -> PathBuf {
        self.root.join(key)
    }

    /// Fresh temp file path, independent of the key's length.
    fn tmp_path(&self) -> PathBuf {
        let n = TMP_COUNTER.fetch_add(1, Ordering::Relaxed);
        self.root
            .join(format!("{}{}-{}", TMP_PREFIX, std::process::id(), n))
    }

    // == Read ==
    /// Reads the expiration and payload for `key`.
    ///
    /// Fails with `NotFound` if the file is absent and `Corrupt` if it is
    /// shorter than the header.
    pub fn read(&self, key: &str) -> Result<(Expiration, Vec<u8>)> {
        let bytes = match fs::read(self.path_for(key)) {
            Ok(bytes) => bytes,
            Err(err) if err.kind() == ErrorKind::NotFound => {
                return Err(CacheError::NotFound(key.to_string()))
            }
            Err(err) => return Err(err.into()),
        };

        match decode_entry(&bytes) {
            Some((expiration, payload)) => Ok((expiration, payload.to_vec())),
            None => Err(CacheError::Corrupt {
                key: key.to_string(),
                len: bytes.len() as u64,
            }),
        }
    }

    // == Read Meta ==
    /// Reads only the expiration header for `key`.
    pub fn read_meta(&self, key: &str) -> Result<Expiration> {
        let mut file = match File::open(self.path_for(key)) {
            Ok(file) => file,
            Err(err) if err.kind() == ErrorKind::NotFound => {
                return Err(CacheError::NotFound(key.to_string()))
            }
            Err(err) => return Err(err.into()),
        };

        let mut header = [0u8; HEADER_LEN];
        match file.read_exact(&mut header) {
            Ok(()) => Ok(Expiration::from_timestamp(i64::from_le_bytes(header))),
            Err(err) if err.kind() == ErrorKind::UnexpectedEof => Err(CacheError::Corrupt {
                key: key.to_string(),
                len: file.metadata().map(|m| m.len()).unwrap_or(0),
            }),
            Err(err) => Err(err.into()),
        }
    }

    // == Write ==
    /// Replaces the file for `key` atomically (temp file, then rename).
    pub fn write(&self, key: &str, expiration: Expiration, payload: &[u8]) -> Result<()> {
        let tmp = self.tmp_path();
        let result = (|| -> Result<()> {
            let mut file = File::create(&tmp)?;
            file.write_all(&encode_entry(expiration, payload))?;
            file.sync_data()?;
            fs::rename(&tmp, self.path_for(key))?;
            Ok(())
        })();

        if result.is_err() {
            let _ = fs::remove_file(&tmp);
        }
        result
    }

    // == Remove ==
    /// Deletes the file for `key`; absent files are not an error.
    pub fn remove(&self, key: &str) -> Result<()> {
        match fs::remove_file(self.path_for(key)) {
            Ok(()) => Ok(()),
            Err(err) if err.kind() == ErrorKind::NotFound => Ok(()),
            Err(err) => Err(err.into()),
        }
    }

    // == Clear ==
    /// Deletes every file in the cache directory.
    ///
    /// Returns the number of files removed.
    pub fn clear(&self) -> Result<usize> {
        let entries = match fs::read_dir(&self.root) {
            Ok(entries) => entries,
            Err(err) if err.kind() == ErrorKind::NotFound => return Ok(0),
            Err(err) => return Err(err.into()),
        };

        let mut removed = 0;
        for entry in entries {
            let entry = entry?;
            if !entry.file_type()?.is_file() {
                continue;
            }
            match fs::remove_file(entry.path()) {
                Ok(()) => removed += 1,
                Err(err) if err.kind() == ErrorKind::NotFound => {}
                Err(err) => return Err(err.into()),
            }
        }

        debug!(root = ?self.root, removed, "Disk tier cleared");
        Ok(removed)
    }

    // == Exists ==
    /// Checks for the file without reading it.
    pub fn exists(&self, key: &str) -> bool {
        self.path_for(key).is_file()
    }

    // == Length ==
    /// Counts entry files, skipping in-flight temp files.
    pub fn len(&self) -> usize {
        fs::read_dir(&self.root)
            .map(|entries| {
                entries
                    .filter_map(|e| e.ok())
                    .filter(|e| e.file_type().map(|t| t.is_file()).unwrap_or(false))
                    .filter(|e| !e.file_name().to_string_lossy().starts_with(TMP_PREFIX))
                    .count()
            })
            .unwrap_or(0)
    }

    pub fn is_empty(&self) -> bool {
        self.len() == 0
    }
}
