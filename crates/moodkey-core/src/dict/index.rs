use std::path::Path;
use std::sync::OnceLock;

use tracing::{debug, info, warn};

use super::bigram::BigramIndex;

/// Shared dictionary handle, filled once by a background load.
///
/// Queries before the load completes (or after it failed) return no
/// suggestions instead of blocking.
#[derive(Default)]
pub struct DictionaryIndex {
    inner: OnceLock<BigramIndex>,
}

impl DictionaryIndex {
    pub fn new() -> Self {
        Self::default()
    }

    /// Load from a JSON asset or compiled snapshot. Failures are logged and
    /// leave the index empty; a later call may retry.
    pub fn load(&self, path: &Path) -> bool {
        let _span = tracing::debug_span!("dict_load", path = %path.display()).entered();
        match BigramIndex::open(path) {
            Ok(index) => self.install(index),
            Err(e) => {
                warn!(error = %e, "bigram dictionary load failed");
                false
            }
        }
    }

    pub fn load_json(&self, json: &str) -> bool {
        match BigramIndex::from_json(json) {
            Ok(index) => self.install(index),
            Err(e) => {
                warn!(error = %e, "bigram dictionary parse failed");
                false
            }
        }
    }

    /// Install an already-built index. Returns false if one was installed before.
    pub fn install(&self, index: BigramIndex) -> bool {
        let words = index.len();
        if self.inner.set(index).is_err() {
            debug!("bigram dictionary already loaded, ignoring");
            return false;
        }
        info!(words, "bigram dictionary loaded");
        true
    }

    pub fn is_loaded(&self) -> bool {
        self.inner.get().is_some()
    }

    pub fn suggest(&self, previous_word: &str, limit: usize) -> Vec<String> {
        self.inner
            .get()
            .map(|index| index.suggest(previous_word, limit))
            .unwrap_or_default()
    }
}
