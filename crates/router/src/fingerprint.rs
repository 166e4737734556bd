//! Question fingerprints: the answer cache key.

use sha2::{Digest, Sha256};

/// Lower-case, trim and collapse internal whitespace runs to one space.
pub fn normalize(question: &str) -> String {
    question
        .split_whitespace()
        .map(str::to_lowercase)
        .collect::<Vec<_>>()
        .join(" ")
}

/// SHA-256 hex digest of the normalized question.
pub fn fingerprint(question: &str) -> String {
    let mut hasher = Sha256::new();
    hasher.update(normalize(question).as_bytes());
    format!("{:x}", hasher.finalize())
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_case_and_whitespace_invariance() {
        let base = fingerprint("What is the melting point of gallium?");
        assert_eq!(base, fingerprint("  what IS the melting point of GALLIUM?  "));
        assert_eq!(base, fingerprint("what is\tthe  melting\npoint of gallium?"));
        assert_ne!(base, fingerprint("what is the melting point of indium?"));
    }

    #[test]
    fn test_digest_shape() {
        let key = fingerprint("9");
        assert_eq!(key.len(), 64);
        assert!(key.chars().all(|c| c.is_ascii_hexdigit()));
        assert_eq!(fingerprint(""), fingerprint("   "));
    }
}
