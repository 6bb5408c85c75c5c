//! Order-insensitive comparison of analyzer answers.
//!
//! Answers are comma-separated token lists. Both sides are split, trimmed and sorted
//! before an element-wise comparison, so the comparison is over multisets: order does
//! not matter, multiplicity does.
//!
//! Tokens made only of ASCII digits sort by numeric value (`2` before `10`), all other
//! tokens sort as strings. When a list holds both kinds there is no common key, and both
//! lists fall back to plain string order instead.

use std::cmp::Ordering;

/// Splits an answer line into trimmed tokens, keeping duplicates and empty fields.
pub fn tokens(answer: &str) -> Vec<String> {
    answer.split(',').map(|t| t.trim().to_string()).collect()
}

fn is_numeric(token: &str) -> bool {
    !token.is_empty() && token.bytes().all(|b| b.is_ascii_digit())
}

// Magnitude comparison that never overflows: strip leading zeros, then the longer
// digit string is the bigger number. Equal values order by spelling (`007` < `7`).
fn cmp_numeric(a: &str, b: &str) -> Ordering {
    let sa = a.trim_start_matches('0');
    let sb = b.trim_start_matches('0');
    sa.len()
        .cmp(&sb.len())
        .then_with(|| sa.cmp(sb))
        .then_with(|| a.cmp(b))
}

fn cmp_key(a: &str, b: &str) -> Ordering {
    match (is_numeric(a), is_numeric(b)) {
        (true, true) => cmp_numeric(a, b),
        _ => a.cmp(b),
    }
}

/// A list has no consistent key when numeric and non-numeric tokens would have to be
/// compared with each other.
fn is_mixed(tokens: &[String]) -> bool {
    tokens.len() > 1
        && tokens.iter().any(|t| is_numeric(t))
        && tokens.iter().any(|t| !is_numeric(t))
}

/// Sorts both sides the way they are compared: numeric-aware when both lists allow it,
/// plain string order for both otherwise. Numerically equal tokens such as `7` and `007`
/// are ordered by their spelling, so the result never depends on input order.
pub fn normalize_pair(expected: &str, actual: &str) -> (Vec<String>, Vec<String>) {
    let mut expected = tokens(expected);
    let mut actual = tokens(actual);
    if is_mixed(&expected) || is_mixed(&actual) {
        expected.sort();
        actual.sort();
    } else {
        expected.sort_by(|a, b| cmp_key(a, b));
        actual.sort_by(|a, b| cmp_key(a, b));
    }
    (expected, actual)
}

/// Whether `actual` is an acceptable answer for `expected`.
pub fn answers_match(expected: &str, actual: &str) -> bool {
    let (expected, actual) = normalize_pair(expected, actual);
    expected == actual
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn permutations_are_equal() {
        assert!(answers_match("a, b, c", "c,a,b"));
        assert!(answers_match("1,2,3,4", "4, 3, 2, 1"));
    }

    #[test]
    fn multiplicity_matters() {
        assert!(!answers_match("1,1,2", "1,2,2"));
        assert!(!answers_match("x,x", "x"));
        assert!(!answers_match("5", "5,5"));
    }

    #[test]
    fn numeric_tokens_sort_by_value() {
        let (expected, actual) = normalize_pair("10,2", "2,10");
        assert_eq!(expected, vec!["2", "10"]);
        assert_eq!(actual, vec!["2", "10"]);
        // plain string order would put "10" first
        let mut raw = vec!["2".to_string(), "10".to_string()];
        raw.sort();
        assert_eq!(raw, vec!["10", "2"]);
        assert!(answers_match("10,2", "2,10"));
    }

    #[test]
    fn huge_numbers_do_not_overflow() {
        let (sorted, _) = normalize_pair("123456789012345678901234567890,9", "");
        assert_eq!(sorted, vec!["9", "123456789012345678901234567890"]);
    }

    #[test]
    fn mixed_lists_fall_back_to_string_order() {
        let (expected, actual) = normalize_pair("3,foo", "foo,3");
        assert_eq!(expected, vec!["3", "foo"]);
        assert_eq!(actual, vec!["3", "foo"]);
        assert!(answers_match("3,foo", "foo,3"));

        // one mixed side switches both sides to string order
        let (expected, actual) = normalize_pair("10,9,a", "10,9");
        assert_eq!(expected, vec!["10", "9", "a"]);
        assert_eq!(actual, vec!["10", "9"]);
    }

    #[test]
    fn numerically_equal_tokens_are_order_insensitive() {
        assert!(answers_match("7,007", "007,7"));
        assert!(answers_match("10, 010, 2", "010,2,10"));
        let (sorted, _) = normalize_pair("7,007,3", "");
        assert_eq!(sorted, vec!["3", "007", "7"]);
        assert!(!answers_match("7,007", "7,7"));
    }

    #[test]
    fn single_tokens_compare_after_trimming() {
        assert!(answers_match(" none ", "none"));
        assert!(!answers_match("none", "None"));
        assert!(answers_match("", "  "));
    }
}
