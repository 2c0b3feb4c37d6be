// tests/property_checks.rs

use proptest::prelude::*;

use flashrun::log_buffer::LogBuffer;
use flashrun::tools::{quote_word, split_words};

proptest! {
    #[test]
    fn log_buffer_never_exceeds_its_cap(
        cap in 1usize..50,
        messages in proptest::collection::vec("[a-z ]{0,12}", 0..200),
    ) {
        let mut log = LogBuffer::new(cap, false);
        for message in &messages {
            log.push(message);
            prop_assert!(log.len() <= cap);
        }

        let kept: Vec<&str> = messages
            .iter()
            .map(String::as_str)
            .filter(|m| !m.trim().is_empty())
            .collect();
        let expected = &kept[kept.len().saturating_sub(cap)..];
        prop_assert_eq!(log.lines().collect::<Vec<_>>(), expected.to_vec());
    }

    #[test]
    fn quoted_words_split_back_unchanged(
        words in proptest::collection::vec("[ -~]{0,16}", 1..8),
    ) {
        let line = words.iter().map(|w| quote_word(w)).collect::<Vec<_>>().join(" ");
        prop_assert_eq!(split_words(&line).unwrap(), words);
    }
}
