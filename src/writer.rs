//! Generate a Rust module that rebuilds an [`AssetStore`]
//!
//! The output is a single constructor function, so the assets are compiled into
//! whatever crate includes the file:
//!
//! ```text
//! // @generated by embedfs. Do not edit.
//! use embedfs::AssetStore;
//!
//! pub fn assets() -> AssetStore {
//!     let mut store = AssetStore::new();
//!     store.insert_unchecked("/site/index.html", b"\x3c\x68\x31...".to_vec());
//!     store
//! }
//! ```

use crate::config::PackConfig;
use crate::error::{EmbedError, Result};
use crate::store::AssetStore;
use std::fs;
use std::path::{Path, PathBuf};
use tracing::info;

/// Escaped bytes per line inside a byte string literal
const BYTES_PER_LINE: usize = 32;

/// Renders a store as Rust source
pub struct SourceWriter {
    output: PathBuf,
    function: String,
    crate_path: String,
    encrypted: bool,
}

impl SourceWriter {
    pub fn new(config: &PackConfig) -> Self {
        Self {
            output: config.output.clone(),
            function: config.function.clone(),
            crate_path: config.crate_path.clone(),
            encrypted: config.encryption_key.is_some(),
        }
    }

    /// Target file
    pub fn output(&self) -> &Path {
        &self.output
    }

    /// Produce the module source
    pub fn render(&self, store: &AssetStore) -> String {
        let mut out = String::with_capacity(128 + store.total_size() * 4);

        out.push_str("// @generated by embedfs. Do not edit.\n\n");
        out.push_str(&format!("use {}::AssetStore;\n\n", self.crate_path));

        out.push_str(&format!("/// Packed assets ({} entries).\n", store.len()));
        if self.encrypted {
            out.push_str("///\n");
            out.push_str("/// Every blob is encrypted. Call `AssetStore::decrypt` with the packing key\n");
            out.push_str("/// before opening any path.\n");
        }
        out.push_str(&format!("pub fn {}() -> AssetStore {{\n", self.function));
        out.push_str("    let mut store = AssetStore::new();\n");
        for (path, data) in store.iter() {
            out.push_str(&format!(
                "    store.insert_unchecked({:?}, {}.to_vec());\n",
                path,
                byte_string_literal(data)
            ));
        }
        out.push_str("    store\n");
        out.push_str("}\n");
        out
    }

    /// Render and write to the configured output path
    pub fn write(&self, store: &AssetStore) -> Result<()> {
        if self.output.extension().and_then(|ext| ext.to_str()) != Some("rs") {
            return Err(EmbedError::InvalidOutputPath(self.output.clone()));
        }
        let source = self.render(store);
        fs::write(&self.output, &source)?;
        info!(
            output = %self.output.display(),
            entries = store.len(),
            bytes = source.len(),
            "Wrote asset module"
        );
        Ok(())
    }
}

/// `b"\x.."` literal, continued across lines for long blobs
fn byte_string_literal(data: &[u8]) -> String {
    let encoded = hex::encode(data);
    let mut literal = String::with_capacity(3 + data.len() * 4 + data.len() / BYTES_PER_LINE * 8);
    literal.push_str("b\"");
    for (i, pair) in encoded.as_bytes().chunks(2).enumerate() {
        if i > 0 && i % BYTES_PER_LINE == 0 {
            literal.push_str("\\\n        ");
        }
        literal.push_str("\\x");
        literal.push(pair[0] as char);
        literal.push(pair[1] as char);
    }
    literal.push('"');
    literal
}
