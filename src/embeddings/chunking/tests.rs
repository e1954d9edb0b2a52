use super::chunk as chunk_impl;
use super::*;

#[test]
fn empty_text_has_no_chunks() {
    assert!(chunk_impl("", 500).is_empty());
    assert!(chunk_document("", &ChunkingConfig::default()).is_empty());
}

#[test]
fn concatenation_reconstructs_text() {
    let samples = [
        "a",
        "Cash is $5",
        "Revenue grew 12% year over year. ",
        "Überschuss € 1.000 — 利益 ¥200 📈",
        "line one\nline two\r\nline three\t",
    ];

    for sample in samples {
        let text = sample.repeat(37);
        for size in [1, 2, 7, 64, 500, 10_000] {
            let pieces = chunk_impl(&text, size);
            assert_eq!(pieces.concat(), text, "size {} broke {:?}", size, sample);
        }
    }
}

#[test]
fn all_but_last_chunk_are_full() {
    let text = "0123456789".repeat(123);
    let size = 97;

    let pieces = chunk_impl(&text, size);
    let (last, full) = pieces.split_last().expect("non-empty text has chunks");

    assert!(full.iter().all(|piece| piece.chars().count() == size));
    assert!((1..=size).contains(&last.chars().count()));
}

#[test]
fn exact_multiple_has_full_last_chunk() {
    let text = "x".repeat(1000);
    let pieces = chunk_impl(&text, 500);
    assert_eq!(pieces.len(), 2);
    assert!(pieces.iter().all(|piece| piece.len() == 500));
}

#[test]
fn twelve_hundred_characters_make_three_chunks() {
    let text = "f".repeat(1200);
    let chunks = chunk_document(&text, &ChunkingConfig::default());

    let lengths: Vec<usize> = chunks.iter().map(|c| c.text.len()).collect();
    assert_eq!(lengths, vec![500, 500, 200]);

    let ids: Vec<String> = chunks.iter().map(Chunk::id).collect();
    assert_eq!(ids, vec!["chunk-0", "chunk-1", "chunk-2"]);
}

#[test]
fn text_shorter_than_size_is_single_chunk() {
    let pieces = chunk_impl("Cash is $5", 500);
    assert_eq!(pieces, vec!["Cash is $5".to_string()]);
}

#[test]
fn boundaries_count_characters_not_bytes() {
    // Each of these is several bytes in UTF-8
    let text = "€€€€€";
    let pieces = chunk_impl(text, 2);
    assert_eq!(pieces, vec!["€€", "€€", "€"]);
}

#[test]
fn rechunking_is_stable() {
    let text = "The quarterly filing shows assets of $4.2M. ".repeat(40);
    let config = ChunkingConfig { chunk_size: 128 };

    let first = chunk_document(&text, &config);
    let second = chunk_document(&text, &config);
    assert_eq!(first, second);

    for (position, chunk) in first.iter().enumerate() {
        assert_eq!(chunk.index, position);
        assert_eq!(chunk.id(), format!("chunk-{}", position));
    }
}

#[test]
fn zero_size_is_treated_as_one() {
    let pieces = chunk_impl("abc", 0);
    assert_eq!(pieces, vec!["a", "b", "c"]);
}
