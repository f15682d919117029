//! Property and scenario tests for the recursive chunker.

use proptest::prelude::*;
use ragline::{Chunker, Document, RagConfig, RecursiveChunker};

/// Text made of short words separated by single spaces, sometimes with
/// sentence and paragraph breaks.
fn arb_prose() -> impl Strategy<Value = String> {
    proptest::collection::vec(("[a-z]{1,8}", 0u8..10), 0..120).prop_map(|words| {
        let mut text = String::new();
        for (i, (word, kind)) in words.into_iter().enumerate() {
            if i > 0 {
                text.push_str(match kind {
                    0 => ". ",
                    1 => "\n\n",
                    2 => "\n",
                    _ => " ",
                });
            }
            text.push_str(&word);
        }
        text
    })
}

/// **Property: size bound**
/// *For any* text whose words are shorter than `chunk_size`, every chunk is
/// at most `chunk_size` chars long.
mod prop_size_bound {
    use super::*;

    proptest! {
        #![proptest_config(ProptestConfig::with_cases(200))]

        #[test]
        fn chunks_fit(text in arb_prose(), size in 12usize..80, overlap_pct in 0usize..90) {
            let overlap = size * overlap_pct / 100;
            let chunks = RecursiveChunker::new(size, overlap).split_text(&text);
            for chunk in &chunks {
                prop_assert!(chunk.chars().count() <= size, "{} > {size}: {chunk:?}", chunk.chars().count());
                prop_assert!(!chunk.trim().is_empty());
                prop_assert!(text.contains(chunk.as_str()));
            }
        }

        #[test]
        fn oversize_tokens_are_kept_whole(
            long in "[a-z]{30,40}",
            prefix in "[a-z]{1,5}",
            suffix in "[a-z]{1,5}",
        ) {
            let chunker = RecursiveChunker::new(10, 2).with_separators(["\n\n", " "]);
            let text = format!("{prefix} {long} {suffix}");
            let chunks = chunker.split_text(&text);
            prop_assert!(chunks.contains(&long));
            for chunk in chunks.iter().filter(|c| **c != long) {
                prop_assert!(chunk.chars().count() <= 10);
            }
        }
    }
}

/// A short word, or (one time in four) a URL-like token longer than any
/// chunk size used below, so it can only be cut at char boundaries.
fn arb_token() -> impl Strategy<Value = String> {
    prop_oneof![3 => "[a-j]{1,8}", 1 => "[a-z/:.-]{40,60}[a-z]"]
}

/// **Property: overlap**
/// *For any* space-separated text, consecutive chunks share a non-empty
/// boundary-aligned span of at most `chunk_overlap` chars: a suffix of
/// chunk *i* that is also a prefix of chunk *i+1*.
mod prop_overlap {
    use super::*;

    fn shared_boundary(prev: &str, next: &str, overlap: usize) -> bool {
        let chars: Vec<char> = prev.chars().collect();
        (1..=overlap.min(chars.len())).any(|n| {
            let suffix: String = chars[chars.len() - n..].iter().collect();
            next.starts_with(&suffix)
        })
    }

    proptest! {
        #![proptest_config(ProptestConfig::with_cases(200))]

        #[test]
        fn consecutive_chunks_overlap(
            words in proptest::collection::vec("[a-z]{1,8}", 1..150),
        ) {
            let text = words.join(" ");
            let chunks = RecursiveChunker::new(50, 10).split_text(&text);
            for pair in chunks.windows(2) {
                prop_assert!(
                    shared_boundary(&pair[0], &pair[1], 10),
                    "no overlap between {:?} and {:?}", pair[0], pair[1]
                );
            }
        }

        #[test]
        fn long_tokens_overlap_at_char_boundaries(
            tokens in proptest::collection::vec(arb_token(), 1..40),
            size in 20usize..=40,
            overlap_pct in 1usize..50,
        ) {
            let overlap = (size * overlap_pct / 100).max(1);
            let text = tokens.join(" ");
            let chunks = RecursiveChunker::new(size, overlap).split_text(&text);
            for pair in chunks.windows(2) {
                prop_assert!(
                    shared_boundary(&pair[0], &pair[1], overlap),
                    "no overlap between {:?} and {:?}", pair[0], pair[1]
                );
            }
        }

        /// With every separator in play, a chunk may open without overlap
        /// only when its first piece fills the budget: at most two trimmed
        /// `"\n\n"` separators short of `size`.
        #[test]
        fn mixed_separators_overlap_unless_full(
            tokens in proptest::collection::vec((arb_token(), 0u8..5), 1..40),
            size in 20usize..=40,
            overlap_pct in 1usize..50,
        ) {
            let overlap = (size * overlap_pct / 100).max(1);
            let mut text = String::new();
            for (i, (token, kind)) in tokens.iter().enumerate() {
                if i > 0 {
                    text.push_str(match kind {
                        0 => ". ",
                        1 => "\n\n",
                        2 => "\n",
                        _ => " ",
                    });
                }
                text.push_str(token);
            }
            let chunks = RecursiveChunker::new(size, overlap).split_text(&text);
            for pair in chunks.windows(2) {
                prop_assert!(pair[1].chars().count() <= size);
                prop_assert!(
                    shared_boundary(&pair[0], &pair[1], overlap) || pair[1].chars().count() + 4 >= size,
                    "no overlap between {:?} and {:?}", pair[0], pair[1]
                );
            }
        }

        #[test]
        fn zero_overlap_shares_nothing(
            words in proptest::collection::vec("[a-z]{1,8}", 1..150),
        ) {
            let text = words.join(" ");
            let chunks = RecursiveChunker::new(50, 0).split_text(&text);
            prop_assert_eq!(chunks.join(" "), text);
        }
    }
}

/// **Property: determinism**
/// *For any* `(text, size, overlap)`, two runs produce identical chunks.
mod prop_determinism {
    use super::*;

    proptest! {
        #![proptest_config(ProptestConfig::with_cases(100))]

        #[test]
        fn repeated_runs_agree(text in arb_prose(), size in 5usize..60, overlap in 0usize..5) {
            let a = RecursiveChunker::new(size, overlap).split_text(&text);
            let b = RecursiveChunker::new(size, overlap).split_text(&text);
            prop_assert_eq!(a, b);
        }
    }
}

const SENTENCE: &str = "The quick brown fox jumps over the lazy dog. ";

/// 22 sentences of 45 chars plus a 10-char tail: exactly 1000 chars.
fn sample_text() -> String {
    let mut text = SENTENCE.repeat(22);
    text.push_str("The end...");
    text
}

#[test]
fn three_documents_of_a_thousand_chars() {
    let config = RagConfig::builder().chunk_size(200).chunk_overlap(50).build().unwrap();
    let chunker = RecursiveChunker::from_config(&config);
    let text = sample_text();
    assert_eq!(text.chars().count(), 1000);

    let documents: Vec<Document> =
        (0..3).map(|i| Document::new(format!("unit-{i}"), text.clone())).collect();
    let chunks: Vec<_> = documents.iter().flat_map(|d| chunker.chunk(d)).collect();

    // four sentences per chunk; the last sentence repeats as overlap
    assert_eq!(chunks.len(), 21);
    for doc_chunks in chunks.chunks(7) {
        let starts: Vec<i64> =
            doc_chunks.iter().map(|c| c.metadata["start_index"].as_i64().unwrap()).collect();
        assert_eq!(starts, [0, 135, 270, 405, 540, 675, 810]);

        for chunk in doc_chunks {
            assert!(chunk.text.chars().count() <= 200);
            assert!(chunk.text.starts_with("The quick"));
            assert!(chunk.text.ends_with('.'));
        }
        for pair in doc_chunks.windows(2) {
            assert!(pair[1].text.starts_with(SENTENCE.trim_end()));
            assert!(pair[0].text.ends_with(SENTENCE.trim_end()));
        }
        assert!(doc_chunks[6].text.ends_with("The end..."));
    }

    assert_eq!(chunks[7].id, "unit-1_0");
    assert_eq!(chunks[7].document_id, "unit-1");
}
