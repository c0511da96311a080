//! embedfs: pack a file tree into an in-memory asset store
//!
//! This library provides:
//! - An [`AssetStore`] mapping slash-separated paths to byte blobs
//! - Per-blob authenticated encryption (AES-CBC + HMAC-SHA256)
//! - A read-only virtual filesystem with synthesized directories and paged listings
//! - A packer that builds a store from disk and a writer that emits it as Rust source
//!
//! # Example
//!
//! ```
//! use embedfs::{cipher, AssetStore};
//!
//! let key = [0x42u8; 32];
//! let mut store = AssetStore::new();
//! store.insert("/site/index.html", cipher::encrypt(&key, b"<h1>hi</h1>")?)?;
//! store.insert("/site/css/main.css", cipher::encrypt(&key, b"body{}")?)?;
//!
//! // Decrypt once, before handing the store to readers
//! store.decrypt(&key)?;
//!
//! let mut dir = store.open("/site")?;
//! let children = dir.read_dir(0)?;
//! assert_eq!(children.len(), 2);
//!
//! let mut page = String::new();
//! std::io::Read::read_to_string(&mut store.open("/site/index.html")?, &mut page)?;
//! assert_eq!(page, "<h1>hi</h1>");
//! # Ok::<(), Box<dyn std::error::Error>>(())
//! ```

// Core modules
pub mod cipher;
pub mod error;
pub mod store;
pub mod vfs;

// Packing
pub mod config;
pub mod packer;
pub mod writer;

// Re-export commonly used types
pub use config::{EncryptionKey, KeyStyle, PackConfig};
pub use error::{EmbedError, Result};
pub use packer::Packer;
pub use store::AssetStore;
pub use vfs::{FileInfo, Node, VirtualFile, Whence};
pub use writer::SourceWriter;
