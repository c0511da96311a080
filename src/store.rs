//! In-memory asset store
//!
//! A flat map from slash-separated path to blob. Directories do not exist as
//! entries; the [`vfs`](crate::vfs) module synthesizes them from key prefixes.

use crate::cipher;
use crate::error::{EmbedError, Result};
use crate::vfs::{self, FileInfo, VirtualFile};
use std::collections::btree_map;
use std::collections::BTreeMap;
use std::ops::Bound;
use tracing::{debug, info};

/// Mapping from asset path to raw bytes
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct AssetStore {
    entries: BTreeMap<String, Vec<u8>>,
}

impl AssetStore {
    /// Create an empty store
    pub fn new() -> Self {
        Self::default()
    }

    /// Insert a blob, validating the path first.
    ///
    /// Returns the previous blob stored under `path`, if any.
    pub fn insert(&mut self, path: impl Into<String>, data: Vec<u8>) -> Result<Option<Vec<u8>>> {
        let path = path.into();
        validate_path(&path)?;
        Ok(self.entries.insert(path, data))
    }

    /// Insert a blob without validating the path.
    ///
    /// Used by generated source, whose keys were validated when it was packed.
    pub fn insert_unchecked(&mut self, path: impl Into<String>, data: Vec<u8>) {
        self.entries.insert(path.into(), data);
    }

    /// Get the blob stored under exactly `path`
    pub fn get(&self, path: &str) -> Option<&[u8]> {
        self.entries.get(path).map(Vec::as_slice)
    }

    /// Check if a blob is stored under exactly `path`
    pub fn contains(&self, path: &str) -> bool {
        self.entries.contains_key(path)
    }

    /// Number of stored blobs
    pub fn len(&self) -> usize {
        self.entries.len()
    }

    /// True if the store holds no blobs
    pub fn is_empty(&self) -> bool {
        self.entries.is_empty()
    }

    /// Iterate over `(path, blob)` pairs in path order
    pub fn iter(&self) -> impl Iterator<Item = (&str, &[u8])> {
        self.entries
            .iter()
            .map(|(path, data)| (path.as_str(), data.as_slice()))
    }

    /// Iterate over stored paths in order
    pub fn paths(&self) -> impl Iterator<Item = &str> {
        self.entries.keys().map(String::as_str)
    }

    /// Paths whose raw string starts with `prefix`
    pub fn list_prefix<'a>(&'a self, prefix: &'a str) -> impl Iterator<Item = &'a str> + 'a {
        self.entries
            .range::<str, _>((Bound::Included(prefix), Bound::Unbounded))
            .map(|(path, _)| path.as_str())
            .take_while(move |path| path.starts_with(prefix))
    }

    /// Total number of blob bytes held
    pub fn total_size(&self) -> usize {
        self.entries.values().map(Vec::len).sum()
    }

    /// Open `path` as a [`VirtualFile`].
    ///
    /// An exact key yields a readable leaf; a path that only exists as a prefix
    /// of deeper keys yields a listable directory.
    pub fn open(&self, path: &str) -> Result<VirtualFile<'_>> {
        vfs::open(self, path)
    }

    /// Metadata for `path`, resolved the same way as [`open`](Self::open)
    pub fn stat(&self, path: &str) -> Result<FileInfo> {
        Ok(self.open(path)?.stat())
    }

    /// Replace every blob with its plaintext.
    ///
    /// All entries are decrypted into a fresh map first; the store is only
    /// updated when every entry succeeds, so a failure leaves it untouched.
    pub fn decrypt(&mut self, key: &[u8]) -> Result<()> {
        cipher::check_key(key)?;
        let decrypted = self.transform(|path, data| {
            cipher::decrypt(key, data).map_err(|source| EmbedError::DecryptEntry {
                path: path.to_string(),
                source: Box::new(source),
            })
        })?;
        self.entries = decrypted;
        info!(entries = self.entries.len(), "Decrypted asset store");
        Ok(())
    }

    /// Replace every blob with its ciphertext under `key`
    pub fn encrypt(&mut self, key: &[u8]) -> Result<()> {
        cipher::check_key(key)?;
        let encrypted = self.transform(|_, data| cipher::encrypt(key, data))?;
        self.entries = encrypted;
        info!(entries = self.entries.len(), "Encrypted asset store");
        Ok(())
    }

    fn transform<F>(&self, mut f: F) -> Result<BTreeMap<String, Vec<u8>>>
    where
        F: FnMut(&str, &[u8]) -> Result<Vec<u8>>,
    {
        let mut output = BTreeMap::new();
        for (path, data) in &self.entries {
            let transformed = f(path.as_str(), data.as_slice())?;
            debug!(path = %path, from = data.len(), to = transformed.len(), "Transformed entry");
            output.insert(path.clone(), transformed);
        }
        Ok(output)
    }
}

impl<'a> IntoIterator for &'a AssetStore {
    type Item = (&'a String, &'a Vec<u8>);
    type IntoIter = btree_map::Iter<'a, String, Vec<u8>>;

    fn into_iter(self) -> Self::IntoIter {
        self.entries.iter()
    }
}

impl FromIterator<(String, Vec<u8>)> for AssetStore {
    /// Collect pairs without validation; see [`AssetStore::insert`] for the checked path
    fn from_iter<I: IntoIterator<Item = (String, Vec<u8>)>>(iter: I) -> Self {
        Self {
            entries: iter.into_iter().collect(),
        }
    }
}

/// Check that `path` is one or more non-empty `/`-separated segments, with at
/// most one leading slash and no `.` or `..` segments.
pub fn validate_path(path: &str) -> Result<()> {
    let trimmed = path.strip_prefix('/').unwrap_or(path);
    if trimmed.is_empty() {
        return Err(EmbedError::InvalidPath(path.to_string()));
    }
    for segment in trimmed.split('/') {
        if segment.is_empty() || segment == "." || segment == ".." {
            return Err(EmbedError::InvalidPath(path.to_string()));
        }
    }
    Ok(())
}

#[cfg(test)]
mod tests {
    use super::*;

    const KEY: [u8; 16] = [0x42; 16];

    fn sample() -> AssetStore {
        let mut store = AssetStore::new();
        store.insert("/a/b.txt", b"bee".to_vec()).unwrap();
        store.insert("/a/c/d.txt", b"dee".to_vec()).unwrap();
        store.insert("/z.bin", vec![0u8; 100]).unwrap();
        store
    }

    #[test]
    fn test_validate_path() {
        for good in ["a", "/a", "a/b/c.txt", "/a/b/c.txt", "with space/x"] {
            assert!(validate_path(good).is_ok(), "{} should be valid", good);
        }
        for bad in ["", "/", "//a", "a//b", "a/", "/a/./b", "../a", "a/..", "//"] {
            assert!(
                matches!(validate_path(bad), Err(EmbedError::InvalidPath(_))),
                "{:?} should be rejected",
                bad
            );
        }
    }

    #[test]
    fn test_insert_and_get() {
        let mut store = AssetStore::new();
        assert!(store.is_empty());
        assert_eq!(store.insert("/x", b"1".to_vec()).unwrap(), None);
        assert_eq!(store.insert("/x", b"2".to_vec()).unwrap(), Some(b"1".to_vec()));
        assert_eq!(store.get("/x"), Some(&b"2"[..]));
        assert!(store.get("x").is_none());
        assert_eq!(store.len(), 1);
        assert!(store.insert("a//b", Vec::new()).is_err());
    }

    #[test]
    fn test_list_prefix_is_raw_string_match() {
        let store = sample();
        let under_a: Vec<&str> = store.list_prefix("/a").collect();
        assert_eq!(under_a, vec!["/a/b.txt", "/a/c/d.txt"]);
        assert_eq!(store.list_prefix("/q").count(), 0);
        assert_eq!(store.list_prefix("").count(), 3);
        assert_eq!(store.list_prefix("/a/c/").collect::<Vec<_>>(), vec!["/a/c/d.txt"]);
        assert_eq!(store.list_prefix("/z.bin").collect::<Vec<_>>(), vec!["/z.bin"]);
    }

    #[test]
    fn test_encrypt_then_decrypt() {
        let original = sample();
        let mut store = original.clone();

        store.encrypt(&KEY).unwrap();
        assert_ne!(store, original);
        for (path, data) in store.iter() {
            let plain = original.get(path).unwrap();
            assert!(data.len() >= cipher::MIN_CIPHERTEXT_SIZE);
            assert!(data.len() > plain.len());
        }

        store.decrypt(&KEY).unwrap();
        assert_eq!(store, original);
    }

    #[test]
    fn test_failed_decrypt_leaves_store_untouched() {
        let mut store = sample();
        store.encrypt(&KEY).unwrap();
        store.insert_unchecked("/a/c/d.txt", vec![0u8; 64]);
        let before = store.clone();

        let err = store.decrypt(&KEY).unwrap_err();
        match err {
            EmbedError::DecryptEntry { path, source } => {
                assert_eq!(path, "/a/c/d.txt");
                assert!(matches!(*source, EmbedError::AuthenticationFailed));
            }
            other => panic!("unexpected error: {:?}", other),
        }
        assert_eq!(store, before);
    }

    #[test]
    fn test_decrypt_rejects_bad_key_up_front() {
        let mut store = sample();
        assert!(matches!(
            store.decrypt(&[1, 2, 3]),
            Err(EmbedError::InvalidKeyLength(3))
        ));
        assert_eq!(store, sample());
    }

    #[test]
    fn test_total_size() {
        assert_eq!(sample().total_size(), 106);
    }
}
