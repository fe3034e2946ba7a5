//! Bigram next-word dictionary.
//!
//! `BigramIndex` maps a lowercase previous word to its follow-up words ranked
//! by frequency. It is built from the bundled JSON asset or from a compiled
//! snapshot (`MKBG`) produced by `moodtool compile`.
//! `DictionaryIndex` is the shared, lazily-filled handle the session queries.

mod bigram;
mod bigram_io;
mod index;
#[cfg(test)]
mod tests;

pub use bigram::BigramIndex;
pub use index::DictionaryIndex;

use std::io;

#[derive(Debug, thiserror::Error)]
pub enum DictError {
    #[error("IO error: {0}")]
    Io(#[from] io::Error),

    #[error("JSON error: {0}")]
    Json(#[from] serde_json::Error),

    #[error("invalid header (too short)")]
    InvalidHeader,

    #[error("invalid magic bytes (expected MKBG)")]
    InvalidMagic,

    #[error("unsupported version: {0}")]
    UnsupportedVersion(u8),

    #[error("checksum mismatch (expected {expected:08x}, found {found:08x})")]
    ChecksumMismatch { expected: u32, found: u32 },

    #[error("serialization error: {0}")]
    Serialize(bincode::Error),

    #[error("deserialization error: {0}")]
    Deserialize(bincode::Error),

    #[error("parse error: {0}")]
    Parse(String),
}
