use std::io;
use std::path::PathBuf;
use thiserror::Error;

/// Result type for embedfs operations
pub type Result<T> = std::result::Result<T, EmbedError>;

/// Unified error type for all embedfs operations
#[derive(Debug, Error)]
pub enum EmbedError {
    // Cipher errors
    #[error("Invalid key length: {0} bytes (expected 16, 24 or 32)")]
    InvalidKeyLength(usize),

    #[error("Invalid ciphertext length: {0} bytes")]
    InvalidCiphertextLength(usize),

    #[error("Authentication failed: HMAC mismatch")]
    AuthenticationFailed,

    #[error("Malformed PKCS#7 padding")]
    MalformedPadding,

    #[error("Failed to decrypt {path}: {source}")]
    DecryptEntry {
        path: String,
        #[source]
        source: Box<EmbedError>,
    },

    // Filesystem errors
    #[error("Path not found: {0}")]
    NotFound(String),

    #[error("Not a directory: {0}")]
    NotADirectory(String),

    #[error("Is a directory: {0}")]
    IsADirectory(String),

    #[error("Invalid asset path: {0:?}")]
    InvalidPath(String),

    /// Sentinel: the cursor of a leaf reached the end of its blob.
    #[error("End of file")]
    EndOfFile,

    /// Sentinel: a directory listing has no entries left.
    #[error("End of directory listing")]
    EndOfListing,

    // Packing and configuration errors
    #[error("Invalid output path (must be a .rs file): {0}")]
    InvalidOutputPath(PathBuf),

    #[error("Invalid configuration: {0}")]
    InvalidConfig(String),

    #[error("Invalid encryption key encoding: {0}")]
    InvalidKeyEncoding(String),

    // I/O errors
    #[error("I/O error: {0}")]
    Io(#[from] io::Error),

    #[error("TOML error: {0}")]
    TomlError(String),
}

impl EmbedError {
    /// True for `EndOfFile` and `EndOfListing`, which mark exhaustion rather than failure.
    pub fn is_sentinel(&self) -> bool {
        matches!(self, EmbedError::EndOfFile | EmbedError::EndOfListing)
    }
}

impl From<toml::de::Error> for EmbedError {
    fn from(err: toml::de::Error) -> Self {
        EmbedError::TomlError(err.to_string())
    }
}

impl From<hex::FromHexError> for EmbedError {
    fn from(err: hex::FromHexError) -> Self {
        EmbedError::InvalidKeyEncoding(err.to_string())
    }
}

impl From<walkdir::Error> for EmbedError {
    fn from(err: walkdir::Error) -> Self {
        match err.into_io_error() {
            Some(io_err) => EmbedError::Io(io_err),
            None => EmbedError::Io(io::Error::other(
                "filesystem loop detected while walking source tree",
            )),
        }
    }
}
