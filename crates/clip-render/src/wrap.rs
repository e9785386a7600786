//! Greedy word wrap against a pixel measure.
//!
//! Words accumulate into a line while the projected pixel width stays within
//! the maximum; a word that does not fit starts a new line. A single word
//! wider than the maximum is placed on its own line unclipped — no input word
//! is ever dropped.

/// Wrap `text` into lines no wider than `max_width` pixels, as measured by
/// `measure`. Whitespace runs collapse to single spaces.
pub fn wrap_words<F>(text: &str, max_width: f32, measure: F) -> Vec<String>
where
    F: Fn(&str) -> f32,
{
    let mut lines: Vec<String> = Vec::new();
    let mut current = String::new();

    for word in text.split_whitespace() {
        if current.is_empty() {
            if measure(word) <= max_width {
                current.push_str(word);
            } else {
                // Over-wide word: its own line, never dropped.
                lines.push(word.to_string());
            }
            continue;
        }

        let projected = format!("{} {}", current, word);
        if measure(&projected) <= max_width {
            current = projected;
        } else {
            lines.push(std::mem::take(&mut current));
            if measure(word) <= max_width {
                current.push_str(word);
            } else {
                lines.push(word.to_string());
            }
        }
    }

    if !current.is_empty() {
        lines.push(current);
    }
    lines
}

#[cfg(test)]
mod tests {
    use super::*;

    /// 10px per character, like a monospace face.
    fn mono(s: &str) -> f32 {
        s.chars().count() as f32 * 10.0
    }

    fn joined_words(lines: &[String]) -> Vec<String> {
        lines
            .iter()
            .flat_map(|l| l.split_whitespace().map(str::to_string))
            .collect()
    }

    #[test]
    fn test_fits_on_one_line() {
        let lines = wrap_words("two words", 200.0, mono);
        assert_eq!(lines, vec!["two words"]);
    }

    #[test]
    fn test_breaks_at_width() {
        let lines = wrap_words("aaaa bbbb cccc", 90.0, mono);
        assert_eq!(lines, vec!["aaaa bbbb", "cccc"]);
    }

    #[test]
    fn test_overwide_word_own_line() {
        let lines = wrap_words("hi supercalifragilistic yo", 80.0, mono);
        assert_eq!(lines, vec!["hi", "supercalifragilistic", "yo"]);
    }

    #[test]
    fn test_never_drops_words() {
        let inputs = [
            "one",
            "a b c d e f g",
            "   leading  and   trailing   ",
            "word word word word word word word word",
            "x aaaaaaaaaaaaaaaaaaaaaaaaaaaaa y",
        ];
        for text in inputs {
            for max in [1.0_f32, 35.0, 80.0, 500.0] {
                let lines = wrap_words(text, max, mono);
                let expected: Vec<String> =
                    text.split_whitespace().map(str::to_string).collect();
                assert_eq!(joined_words(&lines), expected, "max={max} text={text:?}");
            }
        }
    }

    #[test]
    fn test_empty_input() {
        assert!(wrap_words("", 100.0, mono).is_empty());
        assert!(wrap_words("   ", 100.0, mono).is_empty());
    }
}
