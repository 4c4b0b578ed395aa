use crate::config::ReservedTokens;

/// Decide whether a vocabulary is made of single characters (as for
/// Chinese) rather than whitespace-delimited words.
///
/// Reserved tokens are ignored.  A single entry longer than one code
/// point makes the vocabulary word-based.
pub fn is_character_based<S: AsRef<str>>(vocabulary: &[S], reserved: &ReservedTokens) -> bool {
    let mut character_based = true;
    for word in vocabulary.iter().map(|w| w.as_ref()) {
        if character_based && !reserved.contains(word) && word.chars().count() > 1 {
            character_based = false;
        }
    }
    character_based
}

/// Split text into its code points, one `String` each.
pub fn split_utf8(text: &str) -> Vec<String> {
    text.chars().map(String::from).collect()
}

/// Split text on a delimiter, dropping empty pieces.
pub fn split_words(text: &str, delimiter: &str) -> Vec<String> {
    text.split(delimiter)
        .filter(|piece| !piece.is_empty())
        .map(String::from)
        .collect()
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn it_detects_character_vocabularies() {
        let reserved = ReservedTokens::default();
        let vocab = ["<unk>", "<s>", "</s>", "你", "好", "a"];
        assert!(is_character_based(&vocab, &reserved));
        let vocab = ["<unk>", "<s>", "</s>", "a", "b"];
        assert!(is_character_based(&vocab, &reserved));
    }

    #[test]
    fn it_detects_word_vocabularies() {
        let reserved = ReservedTokens::default();
        let vocab = ["<unk>", "<s>", "</s>", "a", "ab", "b"];
        assert!(!is_character_based(&vocab, &reserved));
        // Code points are counted, not bytes
        assert!(is_character_based(&["é", "你"], &reserved));
        assert!(!is_character_based(&["é", "你好"], &reserved));
    }

    #[test]
    fn it_honours_alternate_reserved_tokens() {
        let reserved = ReservedTokens {
            unk: "[UNK]".into(),
            start: "[BOS]".into(),
            end: "[EOS]".into(),
        };
        let vocab = ["[UNK]", "[BOS]", "[EOS]", "x", "y"];
        assert!(is_character_based(&vocab, &reserved));
        let vocab = ["<unk>", "x"];
        assert!(!is_character_based(&vocab, &reserved));
    }

    #[test]
    fn it_splits() {
        assert_eq!(split_utf8("añ好"), vec!["a", "ñ", "好"]);
        assert_eq!(split_words(" he  was ", " "), vec!["he", "was"]);
        assert!(split_words("", " ").is_empty());
    }
}
