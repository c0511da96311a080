//! Packing configuration
//!
//! A [`PackConfig`] can be built in code, parsed from TOML, or assembled by the
//! command-line tool from a TOML file plus flag overrides:
//!
//! ```toml
//! source = "public"
//! output = "src/assets.rs"
//! function = "assets"
//! crate_path = "embedfs"
//! encryption_key = "000102030405060708090a0b0c0d0e0f"
//! key_style = "both"
//! ```

use crate::cipher;
use crate::error::{EmbedError, Result};
use serde::{Deserialize, Deserializer, Serialize, Serializer};
use std::fmt;
use std::path::{Path, PathBuf};
use std::str::FromStr;

/// Default name of the generated constructor function
pub const DEFAULT_FUNCTION: &str = "assets";

/// Default path the generated code imports `AssetStore` from
pub const DEFAULT_CRATE_PATH: &str = "embedfs";

/// How keys are formed for files found under a source directory
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum KeyStyle {
    /// `/site/css/main.css`
    Rooted,
    /// `site/css/main.css`
    Relative,
    /// Both forms, each stored separately
    #[default]
    Both,
}

impl KeyStyle {
    /// Prefixes to emit keys under
    pub fn prefixes(self) -> &'static [&'static str] {
        match self {
            KeyStyle::Rooted => &["/"],
            KeyStyle::Relative => &[""],
            KeyStyle::Both => &["/", ""],
        }
    }
}

impl FromStr for KeyStyle {
    type Err = EmbedError;

    fn from_str(s: &str) -> Result<Self> {
        match s.to_ascii_lowercase().as_str() {
            "rooted" => Ok(KeyStyle::Rooted),
            "relative" => Ok(KeyStyle::Relative),
            "both" => Ok(KeyStyle::Both),
            other => Err(EmbedError::InvalidConfig(format!(
                "unknown key style {:?} (expected rooted, relative or both)",
                other
            ))),
        }
    }
}

/// Symmetric key of 16, 24 or 32 bytes
#[derive(Clone, PartialEq, Eq)]
pub struct EncryptionKey(Vec<u8>);

impl EncryptionKey {
    pub fn new(bytes: Vec<u8>) -> Result<Self> {
        cipher::check_key(&bytes)?;
        Ok(Self(bytes))
    }

    /// Parse a hex-encoded key
    pub fn from_hex(hex_key: &str) -> Result<Self> {
        let bytes = hex::decode(hex_key.trim())?;
        Self::new(bytes)
    }

    pub fn as_bytes(&self) -> &[u8] {
        &self.0
    }

    pub fn to_hex(&self) -> String {
        hex::encode(&self.0)
    }
}

impl fmt::Debug for EncryptionKey {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "EncryptionKey(<{} bytes redacted>)", self.0.len())
    }
}

impl FromStr for EncryptionKey {
    type Err = EmbedError;

    fn from_str(s: &str) -> Result<Self> {
        Self::from_hex(s)
    }
}

impl Serialize for EncryptionKey {
    fn serialize<S: Serializer>(&self, serializer: S) -> std::result::Result<S::Ok, S::Error> {
        serializer.serialize_str(&self.to_hex())
    }
}

impl<'de> Deserialize<'de> for EncryptionKey {
    fn deserialize<D: Deserializer<'de>>(deserializer: D) -> std::result::Result<Self, D::Error> {
        let encoded = String::deserialize(deserializer)?;
        Self::from_hex(&encoded).map_err(serde::de::Error::custom)
    }
}

/// Parameters for packing a source tree and writing generated code
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(deny_unknown_fields)]
pub struct PackConfig {
    /// File or directory to read assets from
    #[serde(default)]
    pub source: PathBuf,

    /// Generated `.rs` file
    #[serde(default)]
    pub output: PathBuf,

    /// Name of the generated constructor function
    #[serde(default = "default_function")]
    pub function: String,

    /// Path the generated code imports `AssetStore` from (for re-exports or vendoring)
    #[serde(default = "default_crate_path")]
    pub crate_path: String,

    /// Encrypt every blob with this key when set
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub encryption_key: Option<EncryptionKey>,

    #[serde(default)]
    pub key_style: KeyStyle,
}

fn default_function() -> String {
    DEFAULT_FUNCTION.to_string()
}

fn default_crate_path() -> String {
    DEFAULT_CRATE_PATH.to_string()
}

impl Default for PackConfig {
    fn default() -> Self {
        Self {
            source: PathBuf::new(),
            output: PathBuf::new(),
            function: default_function(),
            crate_path: default_crate_path(),
            encryption_key: None,
            key_style: KeyStyle::default(),
        }
    }
}

impl PackConfig {
    /// Configuration with defaults for everything but the two paths
    pub fn new(source: impl Into<PathBuf>, output: impl Into<PathBuf>) -> Self {
        Self {
            source: source.into(),
            output: output.into(),
            ..Self::default()
        }
    }

    /// Builder-style key setter
    pub fn with_encryption_key(mut self, key: EncryptionKey) -> Self {
        self.encryption_key = Some(key);
        self
    }

    pub fn with_key_style(mut self, key_style: KeyStyle) -> Self {
        self.key_style = key_style;
        self
    }

    /// Parse from TOML text
    pub fn from_toml_str(text: &str) -> Result<Self> {
        Ok(toml::from_str(text)?)
    }

    /// Load from a TOML file
    pub fn from_file<P: AsRef<Path>>(path: P) -> Result<Self> {
        let text = std::fs::read_to_string(path)?;
        Self::from_toml_str(&text)
    }

    /// Check the fields shared by packing and code generation
    pub fn validate(&self) -> Result<()> {
        if self.source.as_os_str().is_empty() {
            return Err(EmbedError::InvalidConfig("missing source path".to_string()));
        }
        if !is_identifier(&self.function) || is_keyword(&self.function) {
            return Err(EmbedError::InvalidConfig(format!(
                "function name {:?} is not a Rust identifier",
                self.function
            )));
        }
        if !is_crate_path(&self.crate_path) {
            return Err(EmbedError::InvalidConfig(format!(
                "crate path {:?} is not a Rust path",
                self.crate_path
            )));
        }
        Ok(())
    }
}

/// Strict and reserved Rust keywords
const KEYWORDS: &[&str] = &[
    "Self", "abstract", "as", "async", "await", "become", "box", "break", "const", "continue",
    "crate", "do", "dyn", "else", "enum", "extern", "false", "final", "fn", "for", "gen", "if",
    "impl", "in", "let", "loop", "macro", "match", "mod", "move", "mut", "override", "priv",
    "pub", "ref", "return", "self", "static", "struct", "super", "trait", "true", "try", "type",
    "typeof", "unsafe", "unsized", "use", "virtual", "where", "while", "yield",
];

fn is_keyword(name: &str) -> bool {
    KEYWORDS.contains(&name)
}

/// A `use` path: `crate`, `self` or `super` may lead, `super` may repeat,
/// every other segment is a non-keyword identifier.
fn is_crate_path(path: &str) -> bool {
    let (global, rest) = match path.strip_prefix("::") {
        Some(rest) => (true, rest),
        None => (false, path),
    };
    rest.split("::").enumerate().all(|(i, segment)| {
        if !is_identifier(segment) {
            return false;
        }
        match segment {
            "super" => !global,
            "crate" | "self" => !global && i == 0,
            _ => !is_keyword(segment),
        }
    })
}

fn is_identifier(name: &str) -> bool {
    let mut chars = name.chars();
    match chars.next() {
        Some(c) if c == '_' || c.is_ascii_alphabetic() => {}
        _ => return false,
    }
    name != "_" && chars.all(|c| c == '_' || c.is_ascii_alphanumeric())
}
