//! End-to-end scenarios over the public surface.

use wordgraph::prelude::*;

#[test]
fn test_minimized_prefix_share() {
    let mut dawg = Dawg::from_iter(["car", "cars", "cat", "cats"]);
    dawg.minimize().unwrap();

    let stats = dawg.stats();
    assert!(stats.minimized);
    assert!(stats.node_count <= 7, "got {} nodes", stats.node_count);

    let found: Vec<String> = dawg.find_prefixes("ca").collect();
    assert_eq!(found, vec!["car", "cars", "cat", "cats"]);
}

#[test]
fn test_value_overwrite() {
    let mut dawg = Dawg::new();
    dawg.add_with_value("duplicate", Value::Int(1));
    dawg.add_with_value("duplicate", Value::Int(100));

    assert_eq!(
        dawg.lookup("duplicate").unwrap().value,
        Some(Value::Int(100))
    );
    assert_eq!(dawg.all_keys().collect::<Vec<_>>(), vec!["duplicate"]);
}

#[test]
fn test_auto_compress_then_auto_widen() {
    let mut dawg = Dawg::new();

    dawg.add("hello");
    assert!(dawg.stats().is_ascii_only);

    dawg.add("привет");
    let stats = dawg.stats();
    assert!(!stats.is_ascii_only);
    assert!(stats.is_compressed);

    dawg.add("你好世界");
    // Enough Greek to push the distinct unit count past 89.
    for cp in 0x391..0x3C9u32 {
        if let Some(ch) = char::from_u32(cp) {
            dawg.add(&format!("g{ch}"));
        }
    }
    for cp in 0x4E00..0x4E30u32 {
        dawg.add(&char::from_u32(cp).unwrap().to_string());
    }
    let stats = dawg.stats();
    assert!(!stats.is_ascii_only);
    assert!(!stats.is_compressed);

    assert!(dawg.lookup("hello").is_some());
    assert!(dawg.lookup("привет").is_some());
    assert!(dawg.lookup("你好世界").is_some());
}

#[test]
fn test_binary_round_trip_with_values() {
    let dir = tempfile::tempdir().unwrap();
    let path = dir.path().join("fruit.dawg");

    let mut dawg = Dawg::new();
    dawg.add_with_value("apple", Value::Int(1));
    dawg.add_with_value("banana", Value::Int(2));
    dawg.add_with_value("cherry", Value::Int(3));
    dawg.minimize().unwrap();
    dawg.save_binary(&path).unwrap();

    let bytes = std::fs::read(&path).unwrap();
    assert_eq!(&bytes[0..4], &[0x44, 0x41, 0x57, 0x47]);

    let reader = MappedDawg::open(&path).unwrap();
    for (key, expected) in [("apple", 1u64), ("banana", 2), ("cherry", 3)] {
        let entry = reader.lookup(key).unwrap();
        assert_eq!(entry.key, key);
        assert_eq!(entry.value, Some(Value::Int(expected)));
    }
    assert!(!reader.contains("durian"));
    reader.close();
}

#[test]
fn test_wildcards() {
    let dawg = Dawg::from_iter(["apple", "application", "apply", "banana"]);
    assert_eq!(
        dawg.wildcard("a?p*"),
        vec!["apple", "application", "apply"]
    );
    assert_eq!(dawg.wildcard("*tion"), vec!["application"]);
}

#[test]
fn test_fuzzy() {
    let dawg = Dawg::from_iter(["apple", "apply", "hello", "world"]);

    let results: Vec<(String, usize)> = dawg
        .fuzzy("aple", 2)
        .into_iter()
        .map(|c| (c.term, c.distance))
        .collect();
    assert_eq!(
        results,
        vec![("apple".to_string(), 1), ("apply".to_string(), 1)]
    );

    let results: Vec<(String, usize)> = dawg
        .fuzzy("wrld", 1)
        .into_iter()
        .map(|c| (c.term, c.distance))
        .collect();
    assert_eq!(results, vec![("world".to_string(), 1)]);
}

#[test]
fn test_load_sniffs_binary_and_text() {
    let dir = tempfile::tempdir().unwrap();
    let binary = dir.path().join("words.dawg");
    let text = dir.path().join("words.json");

    let mut dawg = Dawg::new();
    dawg.add_with_value("alpha", Value::Int(1));
    dawg.add("beta");
    dawg.minimize().unwrap();
    dawg.save_binary(&binary).unwrap();
    dawg.save_text(&text).unwrap();

    for path in [&binary, &text] {
        let loaded = Dawg::load(path).unwrap();
        assert!(loaded.contains("alpha"));
        assert_eq!(loaded.lookup("alpha").unwrap().value, Some(Value::Int(1)));
        assert_eq!(loaded.lookup("beta").unwrap().value, None);
        assert_eq!(loaded.len(), 2);
    }
}

#[test]
fn test_empty_key_round_trip() {
    let dir = tempfile::tempdir().unwrap();
    let path = dir.path().join("empty-key.dawg");

    let mut dawg = Dawg::new();
    dawg.add("");
    dawg.add("a");
    dawg.save_binary(&path).unwrap();

    let reader = MappedDawg::open(&path).unwrap();
    assert!(reader.contains(""));
    assert!(reader.contains("a"));
    assert_eq!(reader.all_keys().collect::<Vec<_>>(), vec!["", "a"]);
}

#[test]
fn test_search_after_minimize_matches_before() {
    let words = [
        "apple", "application", "apply", "appliance", "banana", "band", "bandana",
    ];
    let mut dawg = Dawg::from_iter(words);
    let wildcard_before = dawg.wildcard("*an*");
    let fuzzy_before: Vec<(String, usize)> = dawg
        .fuzzy("aplly", 2)
        .into_iter()
        .map(|c| (c.term, c.distance))
        .collect();

    dawg.minimize().unwrap();

    assert_eq!(dawg.wildcard("*an*"), wildcard_before);
    let fuzzy_after: Vec<(String, usize)> = dawg
        .fuzzy("aplly", 2)
        .into_iter()
        .map(|c| (c.term, c.distance))
        .collect();
    assert_eq!(fuzzy_after, fuzzy_before);
}

#[test]
fn test_spell_check_flow() {
    let dawg = Dawg::from_iter(["their", "there", "these", "where"]);
    assert!(dawg.spell_check("their").is_empty());

    let suggestions = dawg.spell_check("thier");
    assert!(suggestions.iter().any(|c| c.term == "their"));
    let limit = "thier".chars().count().div_ceil(3);
    assert!(suggestions.iter().all(|c| c.distance <= limit));
}

#[test]
fn test_closest_prefers_near_matches() {
    let dawg = Dawg::from_iter(["cat", "cart", "card", "dog"]);
    let results = dawg.closest("cat", 3);
    assert_eq!(results[0].term, "cat");
    assert_eq!(results[0].distance, 0);
    assert_eq!(results.len(), 3);
    assert!(results[1].distance <= results[2].distance);
}

#[test]
fn test_unicode_query_semantics_identical_across_modes() {
    let words = ["schön", "schon", "straße", "strasse"];
    for choice in [
        EncodingChoice::Compressed,
        EncodingChoice::Wide,
        EncodingChoice::Auto,
    ] {
        let mut dawg = Dawg::from_iter(words);
        dawg.rebuild(choice, false).unwrap();
        dawg.minimize().unwrap();
        for word in words {
            assert!(dawg.contains(word));
        }
        assert!(!dawg.contains("schoen"));
        assert_eq!(
            dawg.find_prefixes("sch").count(),
            2,
            "mode {choice:?} changed prefix results"
        );
        let fuzz = dawg.fuzzy("schon", 1);
        assert!(fuzz.iter().any(|c| c.term == "schön" && c.distance == 1));
    }
}
