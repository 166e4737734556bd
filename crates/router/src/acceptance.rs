//! Acceptance filter for generated answers.
//!
//! An answer is trusted only when it shows no denial, no hedging and carries
//! some substance.

/// Phrases that mean the generator did not find the answer.
pub const DENIAL_PHRASES: &[&str] = &[
    "not found in knowledge base",
    "information not available",
    "not in the context",
    "cannot find",
    "no information",
    "not provided",
    "unable to answer",
    "insufficient information",
    "not mentioned",
    "i don't know",
    "i cannot",
    "i'm not sure",
    "unclear",
    "uncertain",
    "not sure",
    "partially",
    "might be",
    "could be",
    "seems like",
    "appears to",
];

/// Words that mark a guess.
pub const HEDGING_WORDS: &[&str] = &["maybe", "possibly", "likely", "probably"];

/// Why an answer was rejected.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum RejectReason {
    Denial(&'static str),
    Hedging(&'static str),
    TooShort,
}

impl std::fmt::Display for RejectReason {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        match self {
            RejectReason::Denial(p) => write!(f, "denial phrase \"{}\"", p),
            RejectReason::Hedging(w) => write!(f, "hedging word \"{}\"", w),
            RejectReason::TooShort => write!(f, "single word without a digit"),
        }
    }
}

#[derive(Debug, Clone, PartialEq, Eq)]
pub enum Acceptance {
    Accepted,
    Rejected(RejectReason),
}

impl Acceptance {
    pub fn is_accepted(&self) -> bool {
        matches!(self, Acceptance::Accepted)
    }
}

/// Judge a generated answer.
pub fn accept(answer: &str) -> Acceptance {
    let lower = answer.trim().to_lowercase();

    if let Some(phrase) = DENIAL_PHRASES.iter().find(|p| lower.contains(*p)) {
        return Acceptance::Rejected(RejectReason::Denial(phrase));
    }

    if let Some(word) = HEDGING_WORDS.iter().find(|w| lower.contains(*w)) {
        return Acceptance::Rejected(RejectReason::Hedging(word));
    }

    if lower.split_whitespace().count() < 2 && !lower.chars().any(|c| c.is_ascii_digit()) {
        return Acceptance::Rejected(RejectReason::TooShort);
    }

    Acceptance::Accepted
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_sentinel_rejected() {
        assert_eq!(
            accept("Not Found in Knowledge Base"),
            Acceptance::Rejected(RejectReason::Denial("not found in knowledge base"))
        );
    }

    #[test]
    fn test_numeric_answer_accepted() {
        assert!(accept("42").is_accepted());
        assert!(accept("  100.0 ").is_accepted());
    }

    #[test]
    fn test_short_answer_rejected() {
        assert_eq!(accept("ok"), Acceptance::Rejected(RejectReason::TooShort));
        assert_eq!(accept(""), Acceptance::Rejected(RejectReason::TooShort));
    }

    #[test]
    fn test_hedging_rejected() {
        assert_eq!(
            accept("It is probably 29 degrees"),
            Acceptance::Rejected(RejectReason::Hedging("probably"))
        );
    }

    #[test]
    fn test_denial_inside_sentence() {
        let verdict = accept("The document does not say; I cannot tell the value.");
        assert_eq!(verdict, Acceptance::Rejected(RejectReason::Denial("i cannot")));
    }

    #[test]
    fn test_plain_answer_accepted() {
        assert!(accept("Gallium melts at 29.76 degrees Celsius.").is_accepted());
        assert!(accept("North region").is_accepted());
    }
}
