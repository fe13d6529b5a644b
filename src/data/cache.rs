//! Content-addressed memo cache for input files.
//!
//! Each path maps to the SHA-256 of the bytes last parsed and the parsed
//! value. A lookup re-reads the file but only re-parses when the digest
//! changed, so unchanged inputs keep handing out the same `Arc`.

use sha2::{Digest, Sha256};
use std::collections::HashMap;
use std::path::{Path, PathBuf};
use std::sync::Arc;
use tracing::debug;

use crate::types::ForecastError;

/// Hex-encoded SHA-256 of a byte slice.
pub fn content_digest(bytes: &[u8]) -> String {
    let mut hasher = Sha256::new();
    hasher.update(bytes);
    hex::encode(hasher.finalize())
}

struct CacheEntry<T> {
    digest: String,
    value: Arc<T>,
}

/// Result of a cache lookup.
pub struct Cached<T> {
    pub value: Arc<T>,
    pub digest: String,
    /// True when the file was parsed on this call.
    pub parsed: bool,
}

pub struct FileCache<T> {
    entries: HashMap<PathBuf, CacheEntry<T>>,
}

impl<T> Default for FileCache<T> {
    fn default() -> Self {
        Self { entries: HashMap::new() }
    }
}

impl<T> FileCache<T> {
    pub fn new() -> Self {
        Self::default()
    }

    /// Return the cached value for `path`, parsing only if the file's
    /// content differs from what was cached.
    pub fn get_or_load<F>(&mut self, path: &Path, parse: F) -> Result<Cached<T>, ForecastError>
    where
        F: FnOnce(&[u8]) -> Result<T, ForecastError>,
    {
        let bytes = std::fs::read(path).map_err(|e| ForecastError::Io {
            path: path.display().to_string(),
            message: e.to_string(),
        })?;
        let digest = content_digest(&bytes);

        if let Some(entry) = self.entries.get(path) {
            if entry.digest == digest {
                debug!(path = %path.display(), digest = %digest, "Cache hit");
                return Ok(Cached {
                    value: Arc::clone(&entry.value),
                    digest,
                    parsed: false,
                });
            }
        }

        let value = Arc::new(parse(&bytes)?);
        debug!(path = %path.display(), digest = %digest, "Cache miss, parsed");
        self.entries.insert(
            path.to_path_buf(),
            CacheEntry {
                digest: digest.clone(),
                value: Arc::clone(&value),
            },
        );
        Ok(Cached { value, digest, parsed: true })
    }

    pub fn len(&self) -> usize {
        self.entries.len()
    }

    pub fn is_empty(&self) -> bool {
        self.entries.is_empty()
    }
}

// ---------------------------------------------------------------------------
// Tests
// ---------------------------------------------------------------------------
