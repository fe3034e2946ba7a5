use std::collections::HashMap;
use std::fmt;
use std::marker::PhantomData;

use serde::de::{Deserializer, MapAccess, Visitor};
use serde::{Deserialize, Serialize};

use super::DictError;

/// Previous word → follow-up words, each list sorted by descending count.
/// Equal counts keep the order in which the words appeared in the source.
#[derive(Debug, Default, Clone, PartialEq, Serialize, Deserialize)]
pub struct BigramIndex {
    pub(super) entries: HashMap<String, Vec<(String, u32)>>,
}

impl BigramIndex {
    pub fn new() -> Self {
        Self::default()
    }

    /// Build from `(previous, [(next, count)])` pairs in source order.
    ///
    /// Previous words are lowercased; lists that collide after lowercasing are
    /// merged. A repeated follow-up word keeps its first position and takes
    /// the last count seen.
    pub fn from_pairs<I>(pairs: I) -> Self
    where
        I: IntoIterator<Item = (String, Vec<(String, u32)>)>,
    {
        // Per previous word: follow-ups in first-seen order plus their positions.
        type Building = (Vec<(String, u32)>, HashMap<String, usize>);
        let mut building: HashMap<String, Building> = HashMap::new();
        for (prev, counts) in pairs {
            let (list, positions) = building.entry(prev.to_lowercase()).or_default();
            for (word, count) in counts {
                match positions.get(&word) {
                    Some(&at) => list[at].1 = count,
                    None => {
                        positions.insert(word.clone(), list.len());
                        list.push((word, count));
                    }
                }
            }
        }
        let mut entries: HashMap<String, Vec<(String, u32)>> = building
            .into_iter()
            .map(|(prev, (list, _))| (prev, list))
            .collect();
        // sort_by is stable: ties stay in source order.
        for list in entries.values_mut() {
            list.sort_by(|a, b| b.1.cmp(&a.1));
        }
        entries.retain(|_, list| !list.is_empty());
        Self { entries }
    }

    /// Parse the bundled asset format `{"bigrams": {prev: {next: count}}}`.
    pub fn from_json(json: &str) -> Result<Self, DictError> {
        let asset: BigramAsset = serde_json::from_str(json)?;
        Ok(Self::from_pairs(
            asset
                .bigrams
                .0
                .into_iter()
                .map(|(prev, counts)| (prev, counts.0)),
        ))
    }

    /// Top `limit` follow-up words for `previous_word` (case-insensitive).
    pub fn suggest(&self, previous_word: &str, limit: usize) -> Vec<String> {
        let key = previous_word.trim().to_lowercase();
        if key.is_empty() {
            return Vec::new();
        }
        self.entries
            .get(&key)
            .map(|list| list.iter().take(limit).map(|(w, _)| w.clone()).collect())
            .unwrap_or_default()
    }

    /// Number of distinct previous words.
    pub fn len(&self) -> usize {
        self.entries.len()
    }

    pub fn is_empty(&self) -> bool {
        self.entries.is_empty()
    }

    /// Total number of (previous, next) pairs.
    pub fn pair_count(&self) -> usize {
        self.entries.values().map(Vec::len).sum()
    }
}

#[derive(Deserialize)]
struct BigramAsset {
    #[serde(default)]
    bigrams: OrderedEntries<OrderedEntries<u32>>,
}

/// A JSON object read as a list of pairs, preserving document order.
struct OrderedEntries<V>(Vec<(String, V)>);

impl<V> Default for OrderedEntries<V> {
    fn default() -> Self {
        Self(Vec::new())
    }
}

impl<'de, V: Deserialize<'de>> Deserialize<'de> for OrderedEntries<V> {
    fn deserialize<D: Deserializer<'de>>(deserializer: D) -> Result<Self, D::Error> {
        struct EntriesVisitor<V>(PhantomData<V>);

        impl<'de, V: Deserialize<'de>> Visitor<'de> for EntriesVisitor<V> {
            type Value = OrderedEntries<V>;

            fn expecting(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
                f.write_str("a JSON object")
            }

            fn visit_map<A: MapAccess<'de>>(self, mut map: A) -> Result<Self::Value, A::Error> {
                let mut out = Vec::with_capacity(map.size_hint().unwrap_or(0));
                while let Some((key, value)) = map.next_entry::<String, V>()? {
                    out.push((key, value));
                }
                Ok(OrderedEntries(out))
            }
        }

        deserializer.deserialize_map(EntriesVisitor(PhantomData))
    }
}
