//! String utilities for the domain layer.

/// Truncate a string to at most `max_chars` characters, appending an
/// ellipsis when anything was cut.
///
/// Counts Unicode scalar values, not bytes, so multi-byte text is never
/// split inside a character.
pub fn truncate_chars(s: &str, max_chars: usize) -> String {
    match s.char_indices().nth(max_chars) {
        None => s.to_string(),
        Some((end, _)) => format!("{}...", &s[..end]),
    }
}

/// Lowercase and split text into alphanumeric word tokens.
///
/// Apostrophes inside words are dropped so that "don't" becomes "dont".
pub fn word_tokens(s: &str) -> Vec<String> {
    s.to_lowercase()
        .split(|c: char| !(c.is_alphanumeric() || c == '\''))
        .map(|w| w.replace('\'', ""))
        .filter(|w| !w.is_empty())
        .collect()
}

/// Whether `phrase` (already tokenized) occurs as a contiguous run in `tokens`.
pub fn contains_phrase(tokens: &[String], phrase: &[String]) -> bool {
    if phrase.is_empty() || phrase.len() > tokens.len() {
        return false;
    }
    tokens.windows(phrase.len()).any(|w| w == phrase)
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_truncate_ascii() {
        assert_eq!(truncate_chars("hello", 10), "hello");
        assert_eq!(truncate_chars("hello world", 5), "hello...");
        assert_eq!(truncate_chars("hello", 5), "hello");
    }

    #[test]
    fn test_truncate_multibyte() {
        assert_eq!(truncate_chars("あのね", 2), "あの...");
        assert_eq!(truncate_chars("👋🌍🎉", 1), "👋...");
    }

    #[test]
    fn test_word_tokens() {
        assert_eq!(
            word_tokens("I Agree, we SHOULD NOT wait!"),
            vec!["i", "agree", "we", "should", "not", "wait"]
        );
        assert_eq!(word_tokens("don't"), vec!["dont"]);
    }

    #[test]
    fn test_contains_phrase() {
        let tokens = word_tokens("we should not implement this");
        assert!(contains_phrase(&tokens, &word_tokens("should not")));
        assert!(contains_phrase(&tokens, &word_tokens("implement")));
        assert!(!contains_phrase(&tokens, &word_tokens("not recommend")));
        assert!(!contains_phrase(&tokens, &[]));
    }

    #[test]
    fn test_whole_word_only() {
        let tokens = word_tokens("I disagree and I know it");
        assert!(!contains_phrase(&tokens, &word_tokens("agree")));
        assert!(!contains_phrase(&tokens, &word_tokens("no")));
    }
}
