//! Transcription similarity.

use strsim::{levenshtein, normalized_levenshtein};

/// Levenshtein distance over Unicode scalar values.
pub fn edit_distance(a: &str, b: &str) -> usize {
    levenshtein(a, b)
}

/// Edit distance divided by the longer string's length (at least 1).
pub fn normalized_edit_distance(a: &str, b: &str) -> f64 {
    1.0 - similarity(a, b)
}

/// `1 - NED`, the per-match recognition score. Two empty strings score 1.0.
pub fn similarity(a: &str, b: &str) -> f64 {
    normalized_levenshtein(a, b)
}
