//! Computational question classifier.
//!
//! Questions that are obviously arithmetic, Fibonacci or factorization
//! requests skip document search and go straight to the calculation chain.

use regex::Regex;
use std::sync::LazyLock;

/// Question shapes that are computational on their own.
pub const SHAPE_PATTERNS: &[&str] = &[
    r"^\d+\s*[+\-*/]\s*\d+",
    r"^\d+$",
    r"\bfibonacci\s+\d+",
    r"\bfib\s+\d+",
    r"\bfactors?\s+of\s+\d+",
    r"what\s+is\s+factors?\s+of\s+\d+",
    r"find\s+factors?\s+of\s+\d+",
    r"factorize\s+\d+",
];

/// Keywords that make a question computational when it also holds a digit.
pub const COMPUTATIONAL_KEYWORDS: &[&str] = &[
    "fibonacci",
    "fib",
    "factor",
    "factors",
    "factorize",
    "calculate",
    "math",
];

static SHAPES: LazyLock<Vec<Regex>> = LazyLock::new(|| {
    SHAPE_PATTERNS
        .iter()
        .filter_map(|p| Regex::new(p).ok())
        .collect()
});

/// Whether `question` should bypass document search.
pub fn is_computational(question: &str) -> bool {
    let lower = question.trim().to_lowercase();

    if SHAPES.iter().any(|re| re.is_match(&lower)) {
        return true;
    }

    COMPUTATIONAL_KEYWORDS.iter().any(|k| lower.contains(k))
        && lower.chars().any(|c| c.is_ascii_digit())
}
