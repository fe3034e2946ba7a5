use std::fs::{self, File};
use std::path::Path;

use memmap2::Mmap;
use serde::{Deserialize, Serialize};

use super::bigram::BigramIndex;
use super::DictError;

pub(super) const MAGIC: &[u8; 4] = b"MKBG";
pub(super) const VERSION: u8 = 1;
/// magic(4) + version(1) + reserved(3) + crc32(4)
pub(super) const HEADER_SIZE: usize = 12;

#[derive(Serialize, Deserialize)]
struct CompiledBigrams {
    entries: Vec<(String, Vec<(String, u32)>)>,
}

impl BigramIndex {
    /// Serialize to the compiled `MKBG` format. Keys are sorted so the
    /// output is byte-identical across runs.
    pub fn to_bytes(&self) -> Result<Vec<u8>, DictError> {
        let mut entries: Vec<(String, Vec<(String, u32)>)> = self
            .entries
            .iter()
            .map(|(k, v)| (k.clone(), v.clone()))
            .collect();
        entries.sort_by(|a, b| a.0.cmp(&b.0));

        let body =
            bincode::serialize(&CompiledBigrams { entries }).map_err(DictError::Serialize)?;
        let crc = crc32fast::hash(&body);

        let mut buf = Vec::with_capacity(HEADER_SIZE + body.len());
        buf.extend_from_slice(MAGIC);
        buf.push(VERSION);
        buf.extend_from_slice(&[0u8; 3]); // reserved
        buf.extend_from_slice(&crc.to_le_bytes());
        buf.extend_from_slice(&body);
        Ok(buf)
    }

    pub fn from_bytes(data: &[u8]) -> Result<Self, DictError> {
        if data.len() < 5 {
            return Err(DictError::InvalidHeader);
        }
        if &data[..4] != MAGIC {
            return Err(DictError::InvalidMagic);
        }
        if data[4] != VERSION {
            return Err(DictError::UnsupportedVersion(data[4]));
        }
        if data.len() < HEADER_SIZE {
            return Err(DictError::InvalidHeader);
        }

        let mut crc_bytes = [0u8; 4];
        crc_bytes.copy_from_slice(&data[8..12]);
        let expected = u32::from_le_bytes(crc_bytes);
        let body = &data[HEADER_SIZE..];
        let found = crc32fast::hash(body);
        if expected != found {
            return Err(DictError::ChecksumMismatch { expected, found });
        }

        let compiled: CompiledBigrams =
            bincode::deserialize(body).map_err(DictError::Deserialize)?;
        Ok(Self::from_pairs(compiled.entries))
    }

    /// Open either a compiled snapshot or the JSON asset, detected by magic bytes.
    pub fn open(path: &Path) -> Result<Self, DictError> {
        let file = File::open(path)?;
        // SAFETY: The file is opened read-only and the mapping is immutable.
        let mmap = unsafe { Mmap::map(&file)? };

        if mmap.starts_with(MAGIC) {
            return Self::from_bytes(&mmap);
        }
        let json = std::str::from_utf8(&mmap)
            .map_err(|e| DictError::Parse(format!("{}: {e}", path.display())))?;
        Self::from_json(json)
    }

    /// Atomic write: write to .tmp then rename.
    pub fn save(&self, path: &Path) -> Result<(), DictError> {
        let bytes = self.to_bytes()?;
        let tmp = path.with_extension("tmp");
        if let Some(parent) = path.parent() {
            fs::create_dir_all(parent)?;
        }
        fs::write(&tmp, &bytes)?;
        fs::rename(&tmp, path)?;
        Ok(())
    }
}
