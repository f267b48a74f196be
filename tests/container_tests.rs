//! Container round-trips and reader validation.

use std::fs;

use wordgraph::prelude::*;

fn save_sample(dir: &tempfile::TempDir, name: &str, words: &[&str]) -> std::path::PathBuf {
    let path = dir.path().join(name);
    let mut dawg = Dawg::from_iter(words.iter().copied());
    dawg.minimize().unwrap();
    dawg.save_binary(&path).unwrap();
    path
}

#[test]
fn test_round_trip_ascii() {
    let dir = tempfile::tempdir().unwrap();
    let words = ["apple", "application", "apply", "banana", "band"];
    let path = save_sample(&dir, "ascii.dawg", &words);

    let reader = MappedDawg::open(&path).unwrap();
    assert_eq!(reader.mode(), EncodingMode::Ascii);
    for word in words {
        assert!(reader.contains(word), "missing {word}");
    }
    assert!(!reader.contains("appl"));
    assert!(!reader.contains("bandana"));
    let keys: Vec<String> = reader.all_keys().collect();
    let mut expected: Vec<String> = words.iter().map(|w| w.to_string()).collect();
    expected.sort();
    assert_eq!(keys, expected);
}

#[test]
fn test_round_trip_compressed() {
    let dir = tempfile::tempdir().unwrap();
    let path = dir.path().join("compressed.dawg");
    let words = ["дом", "дома", "домой", "hello"];
    let mut dawg = Dawg::from_iter(words);
    dawg.minimize().unwrap();
    assert!(dawg.stats().is_compressed);
    dawg.save_binary(&path).unwrap();

    let reader = MappedDawg::open(&path).unwrap();
    assert_eq!(reader.mode(), EncodingMode::Compressed);
    for word in words {
        assert!(reader.contains(word), "missing {word}");
    }
    assert!(!reader.contains("дом0"));
    let found: Vec<String> = reader.find_prefixes("дом").collect();
    assert_eq!(found, vec!["дом", "дома", "домой"]);
}

#[test]
fn test_round_trip_wide() {
    let dir = tempfile::tempdir().unwrap();
    let path = dir.path().join("wide.dawg");
    let mut dawg = Dawg::with_mode(EncodingMode::Wide);
    for word in ["你好", "你好世界", "wide"] {
        dawg.add(word);
    }
    dawg.save_binary(&path).unwrap();

    let reader = MappedDawg::open(&path).unwrap();
    assert_eq!(reader.mode(), EncodingMode::Wide);
    assert!(reader.contains("你好"));
    assert!(reader.contains("你好世界"));
    assert!(reader.contains("wide"));
    let found: Vec<String> = reader.find_prefixes("你好").collect();
    assert_eq!(found, vec!["你好", "你好世界"]);
}

#[test]
fn test_string_and_int_values_round_trip() {
    let dir = tempfile::tempdir().unwrap();
    let path = dir.path().join("values.dawg");
    let mut dawg = Dawg::new();
    dawg.add_with_value("count", Value::Int(42));
    dawg.add_with_value("color", Value::Str("red".into()));
    dawg.add("plain");
    dawg.minimize().unwrap();
    dawg.save_binary(&path).unwrap();

    let reader = MappedDawg::open(&path).unwrap();
    assert_eq!(reader.lookup("count").unwrap().value, Some(Value::Int(42)));
    assert_eq!(
        reader.lookup("color").unwrap().value,
        Some(Value::Str("red".into()))
    );
    assert_eq!(reader.lookup("plain").unwrap().value, None);
}

#[test]
fn test_unicode_values_round_trip() {
    let dir = tempfile::tempdir().unwrap();
    let path = dir.path().join("uvalues.dawg");
    let mut dawg = Dawg::new();
    dawg.add_with_value("greeting", Value::Str("привет".into()));
    dawg.save_binary(&path).unwrap();

    let reader = MappedDawg::open(&path).unwrap();
    assert_eq!(
        reader.lookup("greeting").unwrap().value,
        Some(Value::Str("привет".into()))
    );
}

#[test]
fn test_overwritten_values_compact_on_save() {
    let dir = tempfile::tempdir().unwrap();
    let path = dir.path().join("overwrite.dawg");
    let mut dawg = Dawg::new();
    for round in 0..10u64 {
        dawg.add_with_value("key", Value::Int(round));
    }
    dawg.save_binary(&path).unwrap();

    let bytes = fs::read(&path).unwrap();
    // Header value count: only the live entry is written.
    assert_eq!(u32::from_le_bytes(bytes[28..32].try_into().unwrap()), 1);
    let reader = MappedDawg::open(&path).unwrap();
    assert_eq!(reader.lookup("key").unwrap().value, Some(Value::Int(9)));
}

#[test]
fn test_reader_search_surface_matches_live() {
    let dir = tempfile::tempdir().unwrap();
    let words = ["apple", "application", "apply", "banana"];
    let path = save_sample(&dir, "search.dawg", &words);
    let live = Dawg::from_iter(words);
    let reader = MappedDawg::open(&path).unwrap();

    assert_eq!(reader.wildcard("a?p*"), live.wildcard("a?p*"));
    assert_eq!(reader.wildcard("*tion"), live.wildcard("*tion"));
    let reader_fuzzy: Vec<(String, usize)> = reader
        .fuzzy("aple", 2)
        .into_iter()
        .map(|c| (c.term, c.distance))
        .collect();
    let live_fuzzy: Vec<(String, usize)> = live
        .fuzzy("aple", 2)
        .into_iter()
        .map(|c| (c.term, c.distance))
        .collect();
    assert_eq!(reader_fuzzy, live_fuzzy);
    assert_eq!(
        reader.spell_check("aplpy").len(),
        live.spell_check("aplpy").len()
    );
}

#[test]
fn test_empty_graph_round_trips() {
    let dir = tempfile::tempdir().unwrap();
    let path = dir.path().join("empty.dawg");
    Dawg::new().save_binary(&path).unwrap();

    let reader = MappedDawg::open(&path).unwrap();
    assert_eq!(reader.node_count(), 1);
    assert_eq!(reader.edge_count(), 0);
    assert!(!reader.contains(""));
    assert_eq!(reader.all_keys().count(), 0);
}

#[test]
fn test_rejects_bad_magic() {
    let dir = tempfile::tempdir().unwrap();
    let path = save_sample(&dir, "magic.dawg", &["word"]);
    let mut bytes = fs::read(&path).unwrap();
    bytes[0] = b'X';
    fs::write(&path, &bytes).unwrap();
    assert!(matches!(
        MappedDawg::open(&path),
        Err(DawgError::BadContainer(_))
    ));
}

#[test]
fn test_rejects_unknown_version() {
    let dir = tempfile::tempdir().unwrap();
    let path = save_sample(&dir, "version.dawg", &["word"]);
    let mut bytes = fs::read(&path).unwrap();
    bytes[4..8].copy_from_slice(&2u32.to_le_bytes());
    fs::write(&path, &bytes).unwrap();
    assert!(matches!(
        MappedDawg::open(&path),
        Err(DawgError::BadContainer(_))
    ));
}

#[test]
fn test_rejects_contradictory_flags() {
    let dir = tempfile::tempdir().unwrap();
    let path = save_sample(&dir, "flags.dawg", &["word"]);
    let mut bytes = fs::read(&path).unwrap();
    // ascii-only | compressed-unicode together are invalid.
    bytes[8..12].copy_from_slice(&0b1100u32.to_le_bytes());
    fs::write(&path, &bytes).unwrap();
    assert!(matches!(
        MappedDawg::open(&path),
        Err(DawgError::BadContainer(_))
    ));
}

#[test]
fn test_rejects_truncated_header() {
    let dir = tempfile::tempdir().unwrap();
    let path = save_sample(&dir, "short.dawg", &["word"]);
    let bytes = fs::read(&path).unwrap();
    fs::write(&path, &bytes[..40]).unwrap();
    assert!(matches!(
        MappedDawg::open(&path),
        Err(DawgError::BadContainer(_))
    ));
}

#[test]
fn test_rejects_truncated_regions() {
    let dir = tempfile::tempdir().unwrap();
    let path = save_sample(&dir, "trunc.dawg", &["word"]);
    let bytes = fs::read(&path).unwrap();
    fs::write(&path, &bytes[..bytes.len() - 5]).unwrap();
    assert!(matches!(
        MappedDawg::open(&path),
        Err(DawgError::BadContainer(_))
    ));
}

#[test]
fn test_rejects_out_of_range_target() {
    let dir = tempfile::tempdir().unwrap();
    let path = save_sample(&dir, "target.dawg", &["ab"]);
    let mut bytes = fs::read(&path).unwrap();
    // First edge record sits right after the node table; bytes 1..4 are
    // the narrow 24-bit target.
    let node_count = u32::from_le_bytes(bytes[12..16].try_into().unwrap()) as usize;
    let edge = 64 + node_count * 32;
    bytes[edge + 1] = 0xFF;
    bytes[edge + 2] = 0xFF;
    bytes[edge + 3] = 0xFF;
    fs::write(&path, &bytes).unwrap();
    assert!(matches!(
        MappedDawg::open(&path),
        Err(DawgError::BadContainer(_))
    ));
}

#[test]
fn test_rejects_value_count_mismatch() {
    let dir = tempfile::tempdir().unwrap();
    let path = save_sample(&dir, "values.dawg", &["word"]);
    let mut bytes = fs::read(&path).unwrap();
    bytes[28..32].copy_from_slice(&7u32.to_le_bytes());
    fs::write(&path, &bytes).unwrap();
    assert!(matches!(
        MappedDawg::open(&path),
        Err(DawgError::BadContainer(_))
    ));
}

#[test]
fn test_narrow_zero_target_names_the_root() {
    // A 24-bit zero target names node 0, never "absent"; a reader must
    // accept it.
    let dir = tempfile::tempdir().unwrap();
    let path = save_sample(&dir, "zero.dawg", &["ab", "b"]);
    let mut bytes = fs::read(&path).unwrap();
    let node_count = u32::from_le_bytes(bytes[12..16].try_into().unwrap()) as usize;
    let edge = 64 + node_count * 32;
    bytes[edge + 1] = 0;
    bytes[edge + 2] = 0;
    bytes[edge + 3] = 0;
    fs::write(&path, &bytes).unwrap();
    let reader = MappedDawg::open(&path).expect("zero target must be accepted as node 0");
    // Following the rewritten edge lands back on the root record.
    assert!(reader.node_count() >= 2);
}
