use std::sync::Arc;
use std::thread;

use super::*;

const HELLO_JSON: &str = r#"{"bigrams": {"hello": {"world": 5, "there": 3, "friend": 1}}}"#;

#[test]
fn suggest_orders_by_descending_count() {
    let index = BigramIndex::from_json(HELLO_JSON).unwrap();
    assert_eq!(index.suggest("hello", 3), vec!["world", "there", "friend"]);
}

#[test]
fn suggest_respects_limit() {
    let index = BigramIndex::from_json(HELLO_JSON).unwrap();
    assert_eq!(index.suggest("hello", 2), vec!["world", "there"]);
    assert!(index.suggest("hello", 0).is_empty());
}

#[test]
fn suggest_is_case_insensitive() {
    let index = BigramIndex::from_json(HELLO_JSON).unwrap();
    assert_eq!(index.suggest("HeLLo", 1), vec!["world"]);
}

#[test]
fn uppercase_source_keys_are_lowercased() {
    let index = BigramIndex::from_json(r#"{"bigrams": {"Good": {"morning": 2}}}"#).unwrap();
    assert_eq!(index.suggest("good", 3), vec!["morning"]);
}

#[test]
fn ties_keep_source_order() {
    let json = r#"{"bigrams": {"i": {"zebra": 2, "am": 2, "can": 2, "will": 7}}}"#;
    let index = BigramIndex::from_json(json).unwrap();
    assert_eq!(index.suggest("i", 4), vec!["will", "zebra", "am", "can"]);
}

#[test]
fn duplicate_follow_up_takes_last_count() {
    let json = r#"{"bigrams": {"a": {"x": 1, "y": 2, "x": 9}}}"#;
    let index = BigramIndex::from_json(json).unwrap();
    assert_eq!(index.suggest("a", 3), vec!["x", "y"]);
}

#[test]
fn merged_lists_keep_first_position_for_repeats() {
    let common: Vec<(String, u32)> = (0..5000).map(|i| (format!("w{i}"), 1)).collect();
    let index = BigramIndex::from_pairs([
        ("The".to_string(), common),
        (
            "the".to_string(),
            vec![("w10".into(), 7), ("w0".into(), 1), ("z".into(), 1)],
        ),
    ]);
    assert_eq!(index.len(), 1);
    assert_eq!(index.pair_count(), 5001);
    assert_eq!(index.suggest("the", 3), vec!["w10", "w0", "w1"]);
}

#[test]
fn unknown_and_blank_words_yield_nothing() {
    let index = BigramIndex::from_json(HELLO_JSON).unwrap();
    assert!(index.suggest("goodbye", 3).is_empty());
    assert!(index.suggest("", 3).is_empty());
    assert!(index.suggest("   ", 3).is_empty());
}

#[test]
fn missing_bigrams_field_is_empty_index() {
    let index = BigramIndex::from_json("{}").unwrap();
    assert!(index.is_empty());
}

#[test]
fn malformed_json_is_error() {
    assert!(matches!(
        BigramIndex::from_json(r#"{"bigrams": {"a": {"b": -1}}}"#),
        Err(DictError::Json(_))
    ));
    assert!(BigramIndex::from_json("not json").is_err());
}

#[test]
fn compiled_snapshot_preserves_rankings() {
    let json = r#"{"bigrams": {"i": {"zebra": 2, "am": 2, "will": 7}, "hello": {"world": 5}}}"#;
    let index = BigramIndex::from_json(json).unwrap();
    let bytes = index.to_bytes().unwrap();
    let restored = BigramIndex::from_bytes(&bytes).unwrap();
    assert_eq!(restored.suggest("i", 3), vec!["will", "zebra", "am"]);
    assert_eq!(restored.pair_count(), 4);
}

#[test]
fn compiled_snapshot_rejects_corruption() {
    let index = BigramIndex::from_json(HELLO_JSON).unwrap();
    let mut bytes = index.to_bytes().unwrap();
    let last = bytes.len() - 1;
    bytes[last] ^= 0xff;
    assert!(matches!(
        BigramIndex::from_bytes(&bytes),
        Err(DictError::ChecksumMismatch { .. })
    ));

    assert!(matches!(
        BigramIndex::from_bytes(b"NOPE\x01"),
        Err(DictError::InvalidMagic)
    ));
    assert!(matches!(
        BigramIndex::from_bytes(b"MKBG\x09\0\0\0\0\0\0\0"),
        Err(DictError::UnsupportedVersion(9))
    ));
    assert!(matches!(
        BigramIndex::from_bytes(b"MK"),
        Err(DictError::InvalidHeader)
    ));
}

#[test]
fn open_detects_json_and_compiled_files() {
    let dir = tempfile::tempdir().unwrap();
    let json_path = dir.path().join("dictionary.json");
    std::fs::write(&json_path, HELLO_JSON).unwrap();
    let from_json = BigramIndex::open(&json_path).unwrap();

    let bin_path = dir.path().join("dictionary.mkbg");
    from_json.save(&bin_path).unwrap();
    let from_bin = BigramIndex::open(&bin_path).unwrap();

    assert_eq!(from_json, from_bin);
}

#[test]
fn dictionary_index_is_empty_until_loaded() {
    let index = DictionaryIndex::new();
    assert!(!index.is_loaded());
    assert!(index.suggest("hello", 3).is_empty());

    assert!(index.load_json(HELLO_JSON));
    assert!(index.is_loaded());
    assert_eq!(index.suggest("hello", 1), vec!["world"]);

    // Second load is ignored.
    assert!(!index.load_json(r#"{"bigrams": {"hello": {"kitty": 99}}}"#));
    assert_eq!(index.suggest("hello", 1), vec!["world"]);
}

#[test]
fn failed_load_leaves_index_empty_and_retryable() {
    let dir = tempfile::tempdir().unwrap();
    let index = DictionaryIndex::new();
    assert!(!index.load(&dir.path().join("missing.json")));
    assert!(!index.load_json("{broken"));
    assert!(index.suggest("hello", 3).is_empty());

    assert!(index.load_json(HELLO_JSON));
    assert_eq!(index.suggest("hello", 3).len(), 3);
}

#[test]
fn concurrent_queries_during_background_load() {
    let index = Arc::new(DictionaryIndex::new());
    let loader = {
        let index = Arc::clone(&index);
        thread::spawn(move || index.load_json(HELLO_JSON))
    };
    let readers: Vec<_> = (0..4)
        .map(|_| {
            let index = Arc::clone(&index);
            thread::spawn(move || {
                for _ in 0..100 {
                    let got = index.suggest("hello", 3);
                    assert!(got.is_empty() || got == vec!["world", "there", "friend"]);
                }
            })
        })
        .collect();
    assert!(loader.join().unwrap());
    for r in readers {
        r.join().unwrap();
    }
    assert_eq!(index.suggest("hello", 3), vec!["world", "there", "friend"]);
}
