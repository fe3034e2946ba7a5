use std::path::{Path, PathBuf};
use std::sync::Arc;
use std::thread;

use moodkey_core::dict::{BigramIndex, DictError, DictionaryIndex};
use tracing::warn;

use super::MkError;

#[derive(uniffi::Object)]
pub struct MkDictionary {
    pub(crate) inner: Arc<DictionaryIndex>,
}

#[uniffi::export]
impl MkDictionary {
    /// An empty dictionary, to be filled by `load_in_background`.
    #[uniffi::constructor]
    fn new() -> Arc<Self> {
        Arc::new(Self {
            inner: Arc::new(DictionaryIndex::new()),
        })
    }

    /// Load synchronously, reporting failures.
    #[uniffi::constructor]
    fn open(path: String) -> Result<Arc<Self>, MkError> {
        let index = BigramIndex::open(Path::new(&path)).map_err(|e: DictError| match e {
            DictError::Io(_) => MkError::Io {
                msg: format!("{path}: {e}"),
            },
            other => MkError::InvalidData {
                msg: other.to_string(),
            },
        })?;
        let inner = DictionaryIndex::new();
        inner.install(index);
        Ok(Arc::new(Self {
            inner: Arc::new(inner),
        }))
    }

    /// Load on a background thread. Suggestions stay empty until it finishes,
    /// and stay empty for good if it fails.
    fn load_in_background(&self, path: String) {
        let inner = Arc::clone(&self.inner);
        let path = PathBuf::from(path);
        let spawned = thread::Builder::new()
            .name("moodkey-dict-load".into())
            .spawn(move || {
                inner.load(&path);
            });
        if let Err(e) = spawned {
            warn!(error = %e, "failed to spawn dictionary loader");
        }
    }

    fn is_loaded(&self) -> bool {
        self.inner.is_loaded()
    }

    fn suggest(&self, previous_word: String, limit: u32) -> Vec<String> {
        self.inner.suggest(&previous_word, limit as usize)
    }
}
