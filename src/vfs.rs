//! Virtual filesystem over an [`AssetStore`]
//!
//! The store is a flat key space. A path resolves to a leaf when it is stored
//! verbatim, and to a synthetic directory when at least one stored key extends
//! it by one or more segments. Segments are compared after splitting on `/` and
//! dropping empty pieces, so `a`, `/a` and `/a/` name the same directory.
//!
//! Every [`open`] returns an independent [`VirtualFile`] with its own cursor or
//! listing offset; nothing is cached between calls.

use crate::error::{EmbedError, Result};
use crate::store::AssetStore;
use serde::Serialize;
use std::cmp;
use std::collections::BTreeSet;
use std::io;
use std::time::SystemTime;

/// Permission bits reported for every node (read-only for everyone)
pub const MODE_READ_ONLY: u32 = 0o444;

/// Directory type bit, as in `S_IFDIR`
pub const MODE_DIR: u32 = 0o040000;

/// Outcome of resolving a path against a store
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Node<'a> {
    /// Stored blob
    Leaf(&'a [u8]),
    /// Path with stored descendants but no data of its own
    Directory,
}

/// Origin for [`VirtualFile::seek_to`]
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Whence {
    Start,
    Current,
    End,
}

/// Metadata for a leaf or synthetic directory
#[derive(Debug, Clone, Serialize)]
pub struct FileInfo {
    /// Last path segment
    pub name: String,
    /// Full path as stored, or as synthesized for directories
    pub path: String,
    /// Blob length; zero for directories
    pub size: u64,
    pub is_dir: bool,
    pub mode: u32,
    /// Always the time of the call; the store keeps no timestamps
    pub modified: SystemTime,
}

impl FileInfo {
    fn leaf(path: &str, size: usize) -> Self {
        Self {
            name: base_name(path),
            path: path.to_string(),
            size: size as u64,
            is_dir: false,
            mode: MODE_READ_ONLY,
            modified: SystemTime::now(),
        }
    }

    fn directory(path: &str) -> Self {
        Self {
            name: base_name(path),
            path: path.to_string(),
            size: 0,
            is_dir: true,
            mode: MODE_DIR | MODE_READ_ONLY,
            modified: SystemTime::now(),
        }
    }
}

/// Split a path into its non-empty segments
pub fn segments(path: &str) -> Vec<&str> {
    path.split('/').filter(|s| !s.is_empty()).collect()
}

/// Resolve `path` to a leaf, a synthetic directory, or nothing.
///
/// An exact key match wins over a directory match. The root (no segments)
/// is a directory whenever the store is non-empty.
pub fn resolve<'a>(store: &'a AssetStore, path: &str) -> Option<Node<'a>> {
    if let Some(data) = store.get(path) {
        return Some(Node::Leaf(data));
    }
    let base = segments(path);
    store
        .paths()
        .any(|key| descendant_tail(&base, key).is_some())
        .then_some(Node::Directory)
}

/// Open `path` in `store`
pub fn open<'a>(store: &'a AssetStore, path: &str) -> Result<VirtualFile<'a>> {
    let kind = match resolve(store, path) {
        Some(Node::Leaf(data)) => Kind::Leaf { data, position: 0 },
        Some(Node::Directory) => Kind::Directory { offset: 0 },
        None => return Err(EmbedError::NotFound(path.to_string())),
    };
    Ok(VirtualFile {
        store,
        path: path.to_string(),
        kind,
    })
}

#[derive(Debug)]
enum Kind<'a> {
    Leaf { data: &'a [u8], position: usize },
    Directory { offset: usize },
}

/// Cursor over one resolved path.
///
/// A leaf is readable and seekable; a directory is listable. The mode is fixed
/// when the file is opened.
#[derive(Debug)]
pub struct VirtualFile<'a> {
    store: &'a AssetStore,
    path: String,
    kind: Kind<'a>,
}

impl<'a> VirtualFile<'a> {
    /// Path this file was opened with
    pub fn path(&self) -> &str {
        &self.path
    }

    /// Last segment of the path
    pub fn name(&self) -> String {
        base_name(&self.path)
    }

    pub fn is_dir(&self) -> bool {
        matches!(self.kind, Kind::Directory { .. })
    }

    /// Blob length, or zero for a directory
    pub fn len(&self) -> usize {
        match self.kind {
            Kind::Leaf { data, .. } => data.len(),
            Kind::Directory { .. } => 0,
        }
    }

    pub fn is_empty(&self) -> bool {
        self.len() == 0
    }

    /// Current cursor position (always zero for a directory)
    pub fn position(&self) -> usize {
        match self.kind {
            Kind::Leaf { position, .. } => position,
            Kind::Directory { .. } => 0,
        }
    }

    /// Whole blob of a leaf, independent of the cursor
    pub fn data(&self) -> Option<&'a [u8]> {
        match self.kind {
            Kind::Leaf { data, .. } => Some(data),
            Kind::Directory { .. } => None,
        }
    }

    /// Metadata for this node
    pub fn stat(&self) -> FileInfo {
        match self.kind {
            Kind::Leaf { data, .. } => FileInfo::leaf(&self.path, data.len()),
            Kind::Directory { .. } => FileInfo::directory(&self.path),
        }
    }

    /// Copy bytes from the cursor into `buf` and advance the cursor.
    ///
    /// Returns [`EmbedError::EndOfFile`] once the cursor sits at the end of the
    /// blob and `buf` is non-empty. An empty `buf` always reads 0 bytes.
    pub fn read_bytes(&mut self, buf: &mut [u8]) -> Result<usize> {
        let (data, position) = match &mut self.kind {
            Kind::Leaf { data, position } => (*data, position),
            Kind::Directory { .. } => return Err(EmbedError::IsADirectory(self.path.clone())),
        };
        if buf.is_empty() {
            return Ok(0);
        }

        let remaining = &data[*position..];
        if remaining.is_empty() {
            return Err(EmbedError::EndOfFile);
        }

        let n = cmp::min(buf.len(), remaining.len());
        buf[..n].copy_from_slice(&remaining[..n]);
        *position += n;
        Ok(n)
    }

    /// Move the cursor and return its new absolute position.
    ///
    /// The target is clamped into `[0, len]`; out-of-range seeks saturate
    /// instead of failing.
    pub fn seek_to(&mut self, offset: i64, whence: Whence) -> u64 {
        let len = self.len();
        let Kind::Leaf { position, .. } = &mut self.kind else {
            return 0;
        };

        let base = match whence {
            Whence::Start => 0i128,
            Whence::Current => *position as i128,
            Whence::End => len as i128,
        };
        let target = (base + offset as i128).clamp(0, len as i128);
        *position = target as usize;
        *position as u64
    }

    /// List up to `count` children of a directory; `0` lists all that remain.
    ///
    /// Direct children that are stored blobs come first in path order, then one
    /// synthetic directory per distinct intermediate segment. Successive calls
    /// page through the listing. When nothing is left the call returns
    /// [`EmbedError::EndOfListing`] and rewinds, so the next call starts over.
    pub fn read_dir(&mut self, count: usize) -> Result<Vec<FileInfo>> {
        let offset = match &mut self.kind {
            Kind::Directory { offset } => offset,
            Kind::Leaf { .. } => return Err(EmbedError::NotADirectory(self.path.clone())),
        };

        let children = list_children(self.store, &self.path);
        let start = cmp::min(*offset, children.len());
        let mut page: Vec<FileInfo> = children.into_iter().skip(start).collect();
        if count > 0 {
            page.truncate(count);
        }

        if page.is_empty() {
            *offset = 0;
            return Err(EmbedError::EndOfListing);
        }
        *offset += page.len();
        Ok(page)
    }

    /// Release the file
    pub fn close(self) {}
}

impl io::Read for VirtualFile<'_> {
    fn read(&mut self, buf: &mut [u8]) -> io::Result<usize> {
        match self.read_bytes(buf) {
            Ok(n) => Ok(n),
            Err(EmbedError::EndOfFile) => Ok(0),
            Err(e) => Err(io::Error::other(e)),
        }
    }
}

impl io::Seek for VirtualFile<'_> {
    fn seek(&mut self, pos: io::SeekFrom) -> io::Result<u64> {
        let position = match pos {
            io::SeekFrom::Start(n) => self.seek_to(i64::try_from(n).unwrap_or(i64::MAX), Whence::Start),
            io::SeekFrom::Current(n) => self.seek_to(n, Whence::Current),
            io::SeekFrom::End(n) => self.seek_to(n, Whence::End),
        };
        Ok(position)
    }
}

/// Segments of `key` below `base`, if `key` lies strictly beneath it
fn descendant_tail<'k>(base: &[&str], key: &'k str) -> Option<Vec<&'k str>> {
    let mut key_segments = key.split('/').filter(|s| !s.is_empty());
    for expected in base {
        if key_segments.next()? != *expected {
            return None;
        }
    }
    let tail: Vec<&str> = key_segments.collect();
    (!tail.is_empty()).then_some(tail)
}

/// Children of `dir_path`, recomputed from the store.
///
/// When the directory has descendants spelled with the same leading-slash
/// form as `dir_path`, only those are listed, so a store holding both
/// `/site/x` and `site/x` lists `x` once. Otherwise every descendant counts.
fn list_children(store: &AssetStore, dir_path: &str) -> Vec<FileInfo> {
    let base = segments(dir_path);
    let rooted = dir_path.starts_with('/');
    let descendants: Vec<(&str, &[u8], Vec<&str>)> = store
        .iter()
        .filter_map(|(key, data)| descendant_tail(&base, key).map(|tail| (key, data, tail)))
        .collect();
    let same_form = descendants
        .iter()
        .any(|(key, _, _)| key.starts_with('/') == rooted);

    let mut entries = Vec::new();
    let mut dirs = BTreeSet::new();

    for (key, data, tail) in descendants {
        if same_form && key.starts_with('/') != rooted {
            continue;
        }
        if tail.len() == 1 {
            entries.push(FileInfo::leaf(key, data.len()));
        } else {
            dirs.insert(tail[0]);
        }
    }

    entries.extend(
        dirs.into_iter()
            .map(|name| FileInfo::directory(&join_path(dir_path, name))),
    );
    entries
}

fn join_path(dir: &str, name: &str) -> String {
    if dir.is_empty() || dir.ends_with('/') {
        format!("{}{}", dir, name)
    } else {
        format!("{}/{}", dir, name)
    }
}

fn base_name(path: &str) -> String {
    path.rsplit('/')
        .find(|s| !s.is_empty())
        .unwrap_or("/")
        .to_string()
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::io::{Read, Seek, SeekFrom};

    fn store(keys: &[(&str, &[u8])]) -> AssetStore {
        let mut store = AssetStore::new();
        for (path, data) in keys {
            store.insert(*path, data.to_vec()).unwrap();
        }
        store
    }

    fn paths(entries: &[FileInfo]) -> Vec<(&str, bool)> {
        entries.iter().map(|e| (e.path.as_str(), e.is_dir)).collect()
    }

    #[test]
    fn test_segments() {
        assert_eq!(segments("/a//b/"), vec!["a", "b"]);
        assert!(segments("").is_empty());
        assert!(segments("/").is_empty());
    }

    #[test]
    fn test_resolve() {
        let store = store(&[("/a/b.txt", b"b"), ("/a/c/d.txt", b"d")]);

        assert_eq!(resolve(&store, "/a/b.txt"), Some(Node::Leaf(&b"b"[..])));
        assert_eq!(resolve(&store, "/a"), Some(Node::Directory));
        assert_eq!(resolve(&store, "a"), Some(Node::Directory));
        assert_eq!(resolve(&store, "/a/c/"), Some(Node::Directory));
        assert_eq!(resolve(&store, ""), Some(Node::Directory));
        assert_eq!(resolve(&store, "/"), Some(Node::Directory));
        assert_eq!(resolve(&store, "/a/b.txt/x"), None);
        assert_eq!(resolve(&store, "/a/b"), None);
        // Raw prefix is not a segment prefix
        assert_eq!(resolve(&store, "/a/c/d"), None);
        // Same segments as a key but not the key itself
        assert_eq!(resolve(&store, "a/b.txt"), None);
    }

    #[test]
    fn test_root_of_empty_store_is_not_found() {
        let store = AssetStore::new();
        assert!(resolve(&store, "").is_none());
        assert!(matches!(open(&store, "/"), Err(EmbedError::NotFound(_))));
    }

    #[test]
    fn test_exact_match_wins_over_directory() {
        let store = store(&[("/a", b"leaf"), ("/a/b", b"child")]);
        let file = open(&store, "/a").unwrap();
        assert!(!file.is_dir());
        assert_eq!(file.len(), 4);
    }

    #[test]
    fn test_read_and_eof() {
        let store = store(&[("/f", b"hello world")]);
        let mut file = open(&store, "/f").unwrap();

        let mut buf = [0u8; 5];
        assert_eq!(file.read_bytes(&mut buf).unwrap(), 5);
        assert_eq!(&buf, b"hello");
        assert_eq!(file.read_bytes(&mut []).unwrap(), 0);

        let mut rest = [0u8; 32];
        assert_eq!(file.read_bytes(&mut rest).unwrap(), 6);
        assert_eq!(&rest[..6], b" world");
        assert_eq!(file.position(), 11);

        assert!(matches!(file.read_bytes(&mut rest), Err(EmbedError::EndOfFile)));
        assert_eq!(file.read_bytes(&mut []).unwrap(), 0);
    }

    #[test]
    fn test_empty_blob_reads_eof_immediately() {
        let store = store(&[("/empty", b"")]);
        let mut file = open(&store, "/empty").unwrap();
        assert!(file.is_empty());
        assert!(matches!(file.read_bytes(&mut [0u8; 4]), Err(EmbedError::EndOfFile)));
    }

    #[test]
    fn test_seek_clamps() {
        let store = store(&[("/f", b"0123456789")]);
        let mut file = open(&store, "/f").unwrap();

        assert_eq!(file.seek_to(-100, Whence::Start), 0);
        assert_eq!(file.seek_to(1000, Whence::Start), 10);
        assert_eq!(file.seek_to(-3, Whence::End), 7);
        assert_eq!(file.seek_to(2, Whence::Current), 9);
        assert_eq!(file.seek_to(5, Whence::Current), 10);
        assert_eq!(file.seek_to(-20, Whence::Current), 0);
        assert_eq!(file.seek_to(5, Whence::End), 10);
        assert_eq!(file.seek_to(i64::MIN, Whence::End), 0);
        assert_eq!(file.seek_to(i64::MAX, Whence::Current), 10);

        file.seek_to(4, Whence::Start);
        let mut buf = [0u8; 3];
        file.read_bytes(&mut buf).unwrap();
        assert_eq!(&buf, b"456");
    }

    #[test]
    fn test_io_traits() {
        let store = store(&[("/f", b"streamed content")]);
        let mut file = open(&store, "/f").unwrap();

        let mut text = String::new();
        file.read_to_string(&mut text).unwrap();
        assert_eq!(text, "streamed content");

        assert_eq!(file.seek(SeekFrom::End(-7)).unwrap(), 9);
        assert_eq!(file.seek(SeekFrom::Start(u64::MAX)).unwrap(), 16);
        assert_eq!(file.seek(SeekFrom::Current(-100)).unwrap(), 0);
    }

    #[test]
    fn test_directory_rejects_leaf_operations() {
        let store = store(&[("/d/f", b"x")]);
        let mut dir = open(&store, "/d").unwrap();
        assert!(matches!(dir.read_bytes(&mut [0u8; 1]), Err(EmbedError::IsADirectory(_))));
        let err = Read::read(&mut dir, &mut [0u8; 1]).unwrap_err();
        assert_eq!(err.kind(), io::ErrorKind::Other);
        assert!(err.to_string().contains("Is a directory"));
        assert_eq!(dir.seek_to(5, Whence::Start), 0);
        assert!(dir.data().is_none());

        let mut leaf = open(&store, "/d/f").unwrap();
        assert!(matches!(leaf.read_dir(0), Err(EmbedError::NotADirectory(_))));
    }

    #[test]
    fn test_listing_collapses_nested_keys() {
        let store = store(&[
            ("/a/b.txt", b"b"),
            ("/a/c/d.txt", b"d"),
            ("/a/c/e/f.txt", b"f"),
            ("/ab/x", b"x"),
        ]);
        let mut dir = open(&store, "/a").unwrap();
        let listing = dir.read_dir(0).unwrap();
        assert_eq!(paths(&listing), vec![("/a/b.txt", false), ("/a/c", true)]);
        assert_eq!(listing[0].name, "b.txt");
        assert_eq!(listing[0].size, 1);
        assert_eq!(listing[1].name, "c");
        assert_eq!(listing[1].mode, MODE_DIR | MODE_READ_ONLY);
    }

    #[test]
    fn test_root_listing() {
        let store = store(&[("/a/b", b""), ("/top", b"t"), ("rel/x", b"")]);
        let mut root = open(&store, "/").unwrap();
        let listing = root.read_dir(0).unwrap();
        assert_eq!(paths(&listing), vec![("/top", false), ("/a", true)]);

        // Relative spelling lists the relative keys
        let mut relative = open(&store, "").unwrap();
        assert_eq!(paths(&relative.read_dir(0).unwrap()), vec![("rel", true)]);
    }

    #[test]
    fn test_listing_prefers_matching_slash_form() {
        let store = store(&[
            ("/site/index.html", b"i"),
            ("/site/css/a.css", b"a"),
            ("site/index.html", b"i"),
            ("site/css/a.css", b"a"),
        ]);

        let mut rooted = open(&store, "/site").unwrap();
        assert_eq!(
            paths(&rooted.read_dir(0).unwrap()),
            vec![("/site/index.html", false), ("/site/css", true)]
        );

        let mut relative = open(&store, "site").unwrap();
        assert_eq!(
            paths(&relative.read_dir(0).unwrap()),
            vec![("site/index.html", false), ("site/css", true)]
        );
    }

    #[test]
    fn test_listing_falls_back_to_other_slash_form() {
        let store = store(&[("/only/rooted.txt", b"r")]);
        let mut dir = open(&store, "only").unwrap();
        assert_eq!(paths(&dir.read_dir(0).unwrap()), vec![("/only/rooted.txt", false)]);
    }

    #[test]
    fn test_pagination_cycle() {
        let store = store(&[("/d/1", b""), ("/d/2", b""), ("/d/3", b"")]);
        let mut dir = open(&store, "/d").unwrap();

        let mut seen = Vec::new();
        for _ in 0..3 {
            let page = dir.read_dir(1).unwrap();
            assert_eq!(page.len(), 1);
            seen.push(page[0].path.clone());
        }
        assert_eq!(seen, vec!["/d/1", "/d/2", "/d/3"]);

        assert!(matches!(dir.read_dir(1), Err(EmbedError::EndOfListing)));
        assert_eq!(dir.read_dir(1).unwrap()[0].path, "/d/1");
    }

    #[test]
    fn test_unbounded_listing_after_partial_page() {
        let store = store(&[("/d/1", b""), ("/d/2", b""), ("/d/3", b"")]);
        let mut dir = open(&store, "/d").unwrap();

        assert_eq!(dir.read_dir(2).unwrap().len(), 2);
        assert_eq!(paths(&dir.read_dir(0).unwrap()), vec![("/d/3", false)]);
        assert!(matches!(dir.read_dir(0), Err(EmbedError::EndOfListing)));
    }

    #[test]
    fn test_stat() {
        let store = store(&[("/a/b.txt", b"12345")]);

        let leaf = open(&store, "/a/b.txt").unwrap().stat();
        assert_eq!(leaf.size, 5);
        assert!(!leaf.is_dir);
        assert_eq!(leaf.mode, MODE_READ_ONLY);
        assert_eq!(leaf.name, "b.txt");

        let dir = store.stat("/a").unwrap();
        assert_eq!(dir.size, 0);
        assert!(dir.is_dir);
        assert_eq!(dir.mode & MODE_DIR, MODE_DIR);

        assert!(matches!(store.stat("/nope"), Err(EmbedError::NotFound(_))));
    }

    #[test]
    fn test_independent_cursors() {
        let store = store(&[("/f", b"abcdef")]);
        let mut first = open(&store, "/f").unwrap();
        let mut second = open(&store, "/f").unwrap();

        first.seek_to(3, Whence::Start);
        let mut buf = [0u8; 2];
        second.read_bytes(&mut buf).unwrap();
        assert_eq!(&buf, b"ab");
        first.read_bytes(&mut buf).unwrap();
        assert_eq!(&buf, b"de");
    }
}
