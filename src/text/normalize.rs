//! Transcript finishing touches.
//!
//! [`fast_punctuate`] is the lightweight polish applied once to every final
//! transcript: whitespace collapse, leading capital, terminal punctuation.
//! [`collapse_doubling`] guards the batch path against the model's habit of
//! emitting an utterance twice back-to-back on some inputs.

/// Normalize whitespace, capitalize a leading alphabetic character, and
/// append a terminal `.` when the text does not already end in `.`, `!` or
/// `?`.  Empty input stays empty.
pub fn fast_punctuate(text: &str) -> String {
    let t = text.split_whitespace().collect::<Vec<_>>().join(" ");
    if t.is_empty() {
        return t;
    }

    let mut chars = t.chars();
    let first = chars.next().unwrap_or_default();
    let mut out = if first.is_alphabetic() {
        let mut s: String = first.to_uppercase().collect();
        s.push_str(chars.as_str());
        s
    } else {
        t
    };

    if !matches!(out.chars().last(), Some('.') | Some('!') | Some('?')) {
        out.push('.');
    }
    out
}

/// Collapse an exact doubled transcript to a single copy.
///
/// Two patterns are checked, in order:
/// 1. character-level doubling — an even-length string of at least 10
///    characters whose halves are identical;
/// 2. word-level doubling — an even word count of at least 4 whose word
///    halves are identical.
///
/// Anything else passes through untouched.
pub fn collapse_doubling(text: &str) -> String {
    let text = text.trim();

    let len = text.chars().count();
    if len >= 10 && len % 2 == 0 {
        let half: String = text.chars().take(len / 2).collect();
        let second: String = text.chars().skip(len / 2).collect();
        if half == second {
            log::info!("collapsed exact character-level doubling");
            return half.trim().to_string();
        }
    }

    let words: Vec<&str> = text.split_whitespace().collect();
    if words.len() >= 4 && words.len() % 2 == 0 {
        let half = words.len() / 2;
        if words[..half] == words[half..] {
            log::info!("collapsed exact word-level doubling");
            return words[..half].join(" ");
        }
    }

    text.to_string()
}

// ---------------------------------------------------------------------------
// Tests
// ---------------------------------------------------------------------------
