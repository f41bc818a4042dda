//! Card key generation and validation.
//!
//! Keys are 16 characters in 4 dash-separated groups over A-Z + 2-9; the
//! ambiguous glyphs 0/O/1/I are excluded so keys survive being read aloud
//! or retyped from a screenshot.

use rand::Rng;
use rand::seq::IndexedRandom;

pub const CARD_KEY_CHARSET: &[u8] = b"ABCDEFGHJKLMNPQRSTUVWXYZ23456789";

const SEGMENTS: usize = 4;
const SEGMENT_LEN: usize = 4;

/// Generates a single card key, e.g. `A3KD-Q7LM-P2E8-W9RZ`.
#[must_use]
pub fn generate_card_key() -> String {
    let mut rng = rand::rng();
    let mut segments = Vec::with_capacity(SEGMENTS);

    for _ in 0..SEGMENTS {
        let segment: String = (0..SEGMENT_LEN)
            .map(|_| {
                let c = *CARD_KEY_CHARSET
                    .choose(&mut rng)
                    .unwrap_or(&CARD_KEY_CHARSET[0]);
                c as char
            })
            .collect();
        segments.push(segment);
    }

    segments.join("-")
}

/// Generates `count` keys that are unique among themselves and against
/// `existing`. Errors if the space is too contended to satisfy the request
/// within a bounded number of draws.
pub fn generate_batch(
    count: usize,
    existing: &std::collections::HashSet<String>,
) -> anyhow::Result<Vec<String>> {
    let mut keys = Vec::with_capacity(count);
    let mut seen = std::collections::HashSet::with_capacity(count);

    let max_attempts = count.saturating_mul(10).max(10);
    let mut attempts = 0;

    while keys.len() < count && attempts < max_attempts {
        attempts += 1;
        let key = generate_card_key();
        if !existing.contains(&key) && seen.insert(key.clone()) {
            keys.push(key);
        }
    }

    if keys.len() < count {
        anyhow::bail!(
            "card key generation exhausted after {max_attempts} attempts ({} of {count} generated)",
            keys.len()
        );
    }

    Ok(keys)
}

/// Whether `card_key` is a well-formed key (`XXXX-XXXX-XXXX-XXXX` over the
/// restricted charset, case-insensitive).
#[must_use]
pub fn validate_card_key_format(card_key: &str) -> bool {
    let upper = card_key.to_uppercase();
    let parts: Vec<&str> = upper.split('-').collect();

    parts.len() == SEGMENTS
        && parts.iter().all(|part| {
            part.len() == SEGMENT_LEN && part.bytes().all(|b| CARD_KEY_CHARSET.contains(&b))
        })
}

/// Canonicalizes user input: uppercase, dashes re-inserted every four
/// characters. Input whose stripped length is not 16 is returned as-is so
/// the subsequent "card not found" lookup reports on what the user typed.
#[must_use]
pub fn normalize_card_key(card_key: &str) -> String {
    let stripped: String = card_key
        .to_uppercase()
        .chars()
        .filter(|c| *c != '-' && *c != ' ')
        .collect();

    if stripped.len() != SEGMENTS * SEGMENT_LEN {
        return card_key.to_string();
    }

    stripped
        .as_bytes()
        .chunks(SEGMENT_LEN)
        .map(|chunk| String::from_utf8_lossy(chunk).into_owned())
        .collect::<Vec<_>>()
        .join("-")
}

/// Generates a random lowercase hex string, used for app key suffixes.
#[must_use]
pub fn random_hex(bytes: usize) -> String {
    let mut rng = rand::rng();
    (0..bytes)
        .map(|_| {
            let b: u8 = rng.random();
            format!("{b:02x}")
        })
        .collect()
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn generated_keys_are_well_formed() {
        for _ in 0..50 {
            let key = generate_card_key();
            assert!(validate_card_key_format(&key), "bad key: {key}");
        }
    }

    #[test]
    fn batch_is_unique_and_avoids_existing() {
        let mut existing = std::collections::HashSet::new();
        existing.insert("AAAA-AAAA-AAAA-AAAA".to_string());

        let keys = generate_batch(100, &existing).unwrap();
        assert_eq!(keys.len(), 100);

        let unique: std::collections::HashSet<_> = keys.iter().collect();
        assert_eq!(unique.len(), 100);
        assert!(!keys.contains(&"AAAA-AAAA-AAAA-AAAA".to_string()));
    }

    #[test]
    fn format_rejects_ambiguous_chars() {
        assert!(validate_card_key_format("A3KD-Q7LM-P2E8-W9RZ"));
        assert!(validate_card_key_format("a3kd-q7lm-p2e8-w9rz"));
        assert!(!validate_card_key_format("A0CD-EFGH-JKLM-NPQR")); // contains 0
        assert!(!validate_card_key_format("ABCD-EFGH-JKLM"));
        assert!(!validate_card_key_format(""));
    }

    #[test]
    fn normalization_restores_canonical_form() {
        assert_eq!(normalize_card_key("a3kdq7lmp2e8w9rz"), "A3KD-Q7LM-P2E8-W9RZ");
        assert_eq!(normalize_card_key("A3KD-Q7LM-P2E8-W9RZ"), "A3KD-Q7LM-P2E8-W9RZ");
        assert_eq!(normalize_card_key("a3kd q7lm p2e8 w9rz"), "A3KD-Q7LM-P2E8-W9RZ");
        // Wrong length passes through untouched.
        assert_eq!(normalize_card_key("short"), "short");
    }

    #[test]
    fn random_hex_length() {
        assert_eq!(random_hex(3).len(), 6);
    }
}
