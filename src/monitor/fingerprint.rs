//! Content fingerprints used to tell "touched" from "changed".

use std::{
    fs::File,
    io::{Result as IoResult, copy},
    path::{Path, PathBuf},
};

use {
    dashmap::{DashMap, mapref::entry::Entry},
    sha2::{Digest, Sha256},
};

/// Computes the SHA-256 digest of a file's full contents.
///
/// # Errors
///
/// Returns the underlying IO error if the file cannot be opened or read.
pub fn hash_file(path: &Path) -> IoResult<Vec<u8>> {
    let mut file = File::open(path)?;
    let mut hasher = Sha256::new();
    copy(&mut file, &mut hasher)?;
    Ok(hasher.finalize().to_vec())
}

/// Byte-for-byte digest comparison.
pub fn digests_equal(a: &[u8], b: &[u8]) -> bool {
    if a.len() != b.len() {
        return false;
    }

    a.iter().zip(b).all(|(left, right)| left == right)
}

/// Last-known digest per path, kept in memory for the watch session.
#[derive(Debug, Default)]
pub struct FingerprintStore {
    hashes: DashMap<PathBuf, Vec<u8>>,
}

impl FingerprintStore {
    /// Creates an empty store.
    #[must_use]
    pub fn new() -> Self {
        Self::default()
    }

    /// Stores `digest` for `path` unless it equals the stored one.
    ///
    /// # Returns
    ///
    /// `true` if the content is new or different (the digest was stored),
    /// `false` if it matched the previous fingerprint.
    pub fn record_if_changed(&self, path: &Path, digest: Vec<u8>) -> bool {
        match self.hashes.entry(path.to_path_buf()) {
            Entry::Occupied(mut stored) => {
                if digests_equal(stored.get(), &digest) {
                    false
                } else {
                    stored.insert(digest);
                    true
                }
            }
            Entry::Vacant(slot) => {
                slot.insert(digest);
                true
            }
        }
    }

    /// Returns the stored digest for `path`.
    pub fn get(&self, path: &Path) -> Option<Vec<u8>> {
        self.hashes.get(path).map(|digest| digest.value().clone())
    }

    /// Number of fingerprinted paths.
    pub fn len(&self) -> usize {
        self.hashes.len()
    }

    /// Whether no path has been fingerprinted yet.
    pub fn is_empty(&self) -> bool {
        self.hashes.is_empty()
    }
}
