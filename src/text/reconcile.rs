//! Transcript stitching.
//!
//! Overlapping decode windows produce overlapping text: the tail of one
//! partial result repeats as the head of the next.  [`merge_transcript`]
//! folds a fresh decode into the running transcript by finding the largest
//! word-level suffix/prefix overlap and collapsing it once, so the committed
//! text grows continuously instead of stuttering at window boundaries.
//!
//! The merge is purely textual — it knows nothing about audio or timing —
//! and deterministic, and re-merging text that is already contained in the
//! base is a no-op.

/// Longest word overlap considered between the base's suffix and the
/// incoming fragment's prefix.  Decode windows are under a second of audio,
/// so anything past a dozen words cannot be a genuine overlap.
const MAX_OVERLAP_WORDS: usize = 12;

/// Merge a freshly decoded `incoming` fragment into the running `base`
/// transcript.
///
/// Both sides are whitespace-normalized first.  The rules, in order:
///
/// 1. Empty `incoming` → `base` unchanged; empty `base` → `incoming`.
/// 2. `incoming` already a substring of `base` → `base` unchanged (the
///    decode was fully redundant).
/// 3. Largest `n ≤ 12` where the last `n` words of `base` equal the first
///    `n` words of `incoming` → base words followed by incoming words after
///    position `n`.
/// 4. No overlap → plain concatenation with a single space.
///
/// # Example
///
/// ```rust
/// use streamscribe::text::merge_transcript;
///
/// assert_eq!(
///     merge_transcript("the quick brown", "brown fox jumps"),
///     "the quick brown fox jumps"
/// );
/// ```
pub fn merge_transcript(base: &str, incoming: &str) -> String {
    let base = normalize_ws(base);
    let incoming = normalize_ws(incoming);

    if incoming.is_empty() {
        return base;
    }
    if base.is_empty() {
        return incoming;
    }
    if base.contains(&incoming) {
        return base;
    }

    let base_words: Vec<&str> = base.split_whitespace().collect();
    let in_words: Vec<&str> = incoming.split_whitespace().collect();
    let max_overlap = base_words.len().min(in_words.len()).min(MAX_OVERLAP_WORDS);

    for n in (1..=max_overlap).rev() {
        if base_words[base_words.len() - n..] == in_words[..n] {
            let mut merged = base_words.clone();
            merged.extend_from_slice(&in_words[n..]);
            return merged.join(" ");
        }
    }

    format!("{base} {incoming}")
}

/// Collapse whitespace runs and trim.
fn normalize_ws(text: &str) -> String {
    text.split_whitespace().collect::<Vec<_>>().join(" ")
}

// ---------------------------------------------------------------------------
// Tests
// ---------------------------------------------------------------------------

#[cfg(test)]
mod tests {
    use super::*;

    // ---- identities --------------------------------------------------------

    #[test]
    fn empty_incoming_returns_base() {
        assert_eq!(merge_transcript("hello world", ""), "hello world");
    }

    #[test]
    fn empty_base_returns_incoming() {
        assert_eq!(merge_transcript("", "hello world"), "hello world");
    }

    #[test]
    fn both_empty_returns_empty() {
        assert_eq!(merge_transcript("", ""), "");
    }

    #[test]
    fn whitespace_only_sides_are_treated_as_empty() {
        assert_eq!(merge_transcript("   ", "hello"), "hello");
        assert_eq!(merge_transcript("hello", "  \t "), "hello");
    }

    // ---- substring absorption ---------------------------------------------

    #[test]
    fn contained_incoming_is_absorbed() {
        let base = "the quick brown fox";
        assert_eq!(merge_transcript(base, "quick brown"), base);
    }

    #[test]
    fn identical_incoming_is_absorbed() {
        let base = "the quick brown fox";
        assert_eq!(merge_transcript(base, base), base);
    }

    #[test]
    fn merge_is_idempotent_for_contained_input() {
        let once = merge_transcript("the quick brown", "brown fox");
        let twice = merge_transcript(&once, "brown fox");
        assert_eq!(once, twice);
    }

    // ---- overlap collapsing -----------------------------------------------

    #[test]
    fn single_word_overlap_collapsed() {
        assert_eq!(
            merge_transcript("it was a dark", "dark and stormy night"),
            "it was a dark and stormy night"
        );
    }

    #[test]
    fn three_word_overlap_collapsed() {
        assert_eq!(
            merge_transcript("the quick brown", "brown fox jumps"),
            "the quick brown fox jumps"
        );
        assert_eq!(
            merge_transcript("one two three four", "two three four five"),
            "one two three four five"
        );
    }

    #[test]
    fn largest_overlap_wins() {
        // Both a 1-word ("b") and a 2-word ("b b") overlap exist; the larger
        // must be collapsed.
        assert_eq!(merge_transcript("a b b", "b b c"), "a b b c");
    }

    #[test]
    fn overlap_longer_than_cap_falls_back_to_concatenation() {
        let words: Vec<String> = (0..13).map(|i| format!("w{i}")).collect();
        let sentence = words.join(" ");
        // incoming = full 13-word suffix of base + one new word; the 13-word
        // overlap exceeds the cap, and no shorter suffix matches, so the two
        // are concatenated.
        let incoming = format!("{sentence} extra");
        let base = format!("lead {sentence}");
        let merged = merge_transcript(&base, &incoming);
        assert_eq!(merged, format!("{base} {incoming}"));
    }

    // ---- concatenation -----------------------------------------------------

    #[test]
    fn no_overlap_concatenates() {
        assert_eq!(
            merge_transcript("hello world", "goodbye moon"),
            "hello world goodbye moon"
        );
    }

    #[test]
    fn messy_whitespace_is_normalized_before_merging() {
        assert_eq!(
            merge_transcript("  the   quick ", " quick  brown "),
            "the quick brown"
        );
    }
}
