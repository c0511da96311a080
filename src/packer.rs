//! Build an [`AssetStore`] from files on disk
//!
//! A single source file is stored under its own name. A source directory is
//! walked recursively and each regular file is stored under the directory's
//! name followed by its relative path, in the forms selected by
//! [`KeyStyle`](crate::config::KeyStyle):
//!
//! ```text
//! public/                 /public/index.html   (rooted)
//! ├── index.html          public/index.html    (relative)
//! └── css/main.css        /public/css/main.css
//!                         public/css/main.css
//! ```

use crate::cipher;
use crate::config::PackConfig;
use crate::error::{EmbedError, Result};
use crate::store::AssetStore;
use std::fs;
use std::path::Path;
use tracing::{debug, info};
use walkdir::WalkDir;

/// Packs files described by a [`PackConfig`]
pub struct Packer {
    config: PackConfig,
    store: AssetStore,
}

impl Packer {
    pub fn new(config: PackConfig) -> Self {
        Self {
            config,
            store: AssetStore::new(),
        }
    }

    pub fn config(&self) -> &PackConfig {
        &self.config
    }

    /// Read the source into the store, replacing anything packed before
    pub fn pack(&mut self) -> Result<&AssetStore> {
        self.config.validate()?;
        self.store = AssetStore::new();

        let source = self.config.source.clone();
        let metadata = fs::metadata(&source)?;
        let root_name = root_name(&source)?;

        if metadata.is_dir() {
            self.pack_dir(&source, root_name.as_deref())?;
        } else {
            let name = root_name.ok_or_else(|| {
                EmbedError::InvalidPath(source.to_string_lossy().into_owned())
            })?;
            let data = fs::read(&source)?;
            self.add(name, &data)?;
        }

        info!(
            source = %source.display(),
            entries = self.store.len(),
            bytes = self.store.total_size(),
            encrypted = self.config.encryption_key.is_some(),
            "Packed assets"
        );
        Ok(&self.store)
    }

    /// The packed store
    pub fn store(&self) -> &AssetStore {
        &self.store
    }

    pub fn into_store(self) -> AssetStore {
        self.store
    }

    fn pack_dir(&mut self, source: &Path, root_name: Option<&str>) -> Result<()> {
        let prefixes = self.config.key_style.prefixes();

        for entry in WalkDir::new(source).follow_links(true).sort_by_file_name() {
            let entry = entry?;
            if !entry.file_type().is_file() {
                continue;
            }

            let relative = entry
                .path()
                .strip_prefix(source)
                .map_err(|_| EmbedError::InvalidPath(entry.path().display().to_string()))?;
            let mut segments = Vec::new();
            if let Some(name) = root_name {
                segments.push(name.to_string());
            }
            for component in relative.components() {
                let segment = component.as_os_str().to_str().ok_or_else(|| {
                    EmbedError::InvalidPath(entry.path().to_string_lossy().into_owned())
                })?;
                segments.push(segment.to_string());
            }
            let joined = segments.join("/");

            let data = fs::read(entry.path())?;
            for prefix in prefixes {
                self.add(format!("{}{}", prefix, joined), &data)?;
            }
        }
        Ok(())
    }

    fn add(&mut self, key: String, data: &[u8]) -> Result<()> {
        let blob = match &self.config.encryption_key {
            Some(secret) => cipher::encrypt(secret.as_bytes(), data)?,
            None => data.to_vec(),
        };
        debug!(path = %key, size = data.len(), stored = blob.len(), "Packed file");
        self.store.insert(key, blob)?;
        Ok(())
    }
}

/// Last component of the source path, resolving `.` and similar through the
/// canonical path. `None` for a filesystem root.
fn root_name(source: &Path) -> Result<Option<String>> {
    let canonical = fs::canonicalize(source)?;
    match canonical.file_name() {
        Some(name) => name
            .to_str()
            .map(|s| Some(s.to_string()))
            .ok_or_else(|| EmbedError::InvalidPath(canonical.to_string_lossy().into_owned())),
        None => Ok(None),
    }
}

/// Pack `config.source` in one call
pub fn pack(config: PackConfig) -> Result<AssetStore> {
    let mut packer = Packer::new(config);
    packer.pack()?;
    Ok(packer.into_store())
}
