//! Layered fuzzy scoring.
//!
//! A query is scored against an entity by a fixed priority of signals:
//! exact name match short-circuits at 1.0, then prefix/substring bonuses
//! on the whole name, then token-level overlap with edit-distance
//! tolerance, then weaker observation and type signals. The total is
//! clamped to [0, 1].

use crate::storage::tokenize;
use kgraph_common::config::{DEFAULT_SEARCH_LIMIT, DEFAULT_SEARCH_THRESHOLD};
use kgraph_common::Entity;
use serde::Serialize;

const PREFIX_BONUS: f64 = 0.8;
const CONTAINS_BONUS: f64 = 0.6;
const TOKEN_WEIGHT: f64 = 0.4;
const OBSERVATION_BONUS: f64 = 0.15;
const TYPE_BONUS: f64 = 0.1;
const EDIT_DISTANCE_MAX: usize = 2;
const EDIT_DISTANCE_MIN_TOKEN_LEN: usize = 4;

#[derive(Debug, Clone)]
pub struct SearchOptions {
    pub limit: usize,
    /// Minimum score to keep, in [0, 1].
    pub threshold: f64,
    /// Optional allow-list of entity types (case-insensitive).
    pub types: Option<Vec<String>>,
    pub fuzzy: bool,
}

impl Default for SearchOptions {
    fn default() -> Self {
        Self {
            limit: DEFAULT_SEARCH_LIMIT,
            threshold: DEFAULT_SEARCH_THRESHOLD,
            types: None,
            fuzzy: true,
        }
    }
}

#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct SearchHit {
    pub entity: Entity,
    pub score: f64,
}

#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct Suggestion {
    pub text: String,
    #[serde(rename = "type")]
    pub entity_type: String,
    pub score: f64,
}

pub(crate) fn fuzzy_score(query_lower: &str, query_tokens: &[String], entity: &Entity) -> f64 {
    let name_lower = entity.name.to_lowercase();
    if name_lower == query_lower {
        return 1.0;
    }

    let mut score = 0.0;
    if name_lower.starts_with(query_lower) {
        score += PREFIX_BONUS;
    } else if name_lower.contains(query_lower) {
        score += CONTAINS_BONUS;
    }

    let name_tokens = tokenize(&entity.name);
    if !query_tokens.is_empty() {
        let mut token_matches = 0.0;
        for qt in query_tokens {
            for nt in &name_tokens {
                if nt == qt {
                    token_matches += 1.0;
                } else if nt.starts_with(qt.as_str()) {
                    token_matches += 0.7;
                } else if nt.contains(qt.as_str()) {
                    token_matches += 0.4;
                } else {
                    let dist = levenshtein(qt, nt);
                    if dist <= EDIT_DISTANCE_MAX && nt.chars().count() >= EDIT_DISTANCE_MIN_TOKEN_LEN
                    {
                        let max_len = qt.chars().count().max(nt.chars().count());
                        token_matches += 0.3 * (1.0 - dist as f64 / max_len as f64);
                    }
                }
            }
        }
        score += token_matches / query_tokens.len() as f64 * TOKEN_WEIGHT;
    }

    if !entity.observations.is_empty() {
        let obs_text = entity.observations.join(" ").to_lowercase();
        if obs_text.contains(query_lower) {
            score += OBSERVATION_BONUS;
        }
    }

    if entity.entity_type.to_lowercase().contains(query_lower) {
        score += TYPE_BONUS;
    }

    score.min(1.0)
}

pub(crate) fn exact_score(query_lower: &str, entity: &Entity) -> f64 {
    let name_lower = entity.name.to_lowercase();
    if name_lower == query_lower {
        1.0
    } else if name_lower.contains(query_lower) {
        0.5
    } else {
        0.0
    }
}

/// Classic Levenshtein edit distance, two-row dynamic programming.
pub fn levenshtein(a: &str, b: &str) -> usize {
    let a: Vec<char> = a.chars().collect();
    let b: Vec<char> = b.chars().collect();
    if a.is_empty() {
        return b.len();
    }
    if b.is_empty() {
        return a.len();
    }

    let mut prev: Vec<usize> = (0..=b.len()).collect();
    let mut curr: Vec<usize> = vec![0; b.len() + 1];

    for (i, ca) in a.iter().enumerate() {
        curr[0] = i + 1;
        for (j, cb) in b.iter().enumerate() {
            let cost = if ca == cb { 0 } else { 1 };
            curr[j + 1] = (prev[j + 1] + 1).min(curr[j] + 1).min(prev[j] + cost);
        }
        std::mem::swap(&mut prev, &mut curr);
    }

    prev[b.len()]
}

/// Normalized edit-distance similarity in [0, 1]. Used for command
/// "did you mean" ranking with the same distance function the fuzzy
/// scorer relies on.
pub fn similarity(a: &str, b: &str) -> f64 {
    if a == b {
        return 1.0;
    }
    if a.is_empty() || b.is_empty() {
        return 0.0;
    }
    let longer = a.chars().count().max(b.chars().count());
    (longer - levenshtein(a, b)) as f64 / longer as f64
}

#[cfg(test)]
mod tests {
    use super::*;
    use chrono::Utc;
    use std::collections::HashMap;

    fn entity(name: &str, entity_type: &str, observations: &[&str]) -> Entity {
        Entity {
            id: kgraph_common::derive_entity_id(name),
            name: name.into(),
            entity_type: entity_type.into(),
            observations: observations.iter().map(|s| s.to_string()).collect(),
            metadata: HashMap::new(),
            created_at: Utc::now(),
        }
    }

    fn score(query: &str, entity: &Entity) -> f64 {
        fuzzy_score(&query.to_lowercase(), &tokenize(query), entity)
    }

    #[test]
    fn test_levenshtein_basic() {
        assert_eq!(levenshtein("", ""), 0);
        assert_eq!(levenshtein("abc", ""), 3);
        assert_eq!(levenshtein("", "abc"), 3);
        assert_eq!(levenshtein("kitten", "sitting"), 3);
        assert_eq!(levenshtein("arfoundaton", "arfoundation"), 1);
    }

    #[test]
    fn test_similarity_normalized() {
        assert_eq!(similarity("search", "search"), 1.0);
        assert_eq!(similarity("", "search"), 0.0);
        let s = similarity("serach", "search");
        assert!(s > 0.6 && s < 1.0);
    }

    #[test]
    fn test_exact_name_short_circuits() {
        let e = entity("Unity", "Technology", &["unity is everywhere"]);
        assert_eq!(score("unity", &e), 1.0);
        assert_eq!(score("UNITY", &e), 1.0);
    }

    #[test]
    fn test_prefix_beats_contains() {
        let prefixed = entity("ARFoundation", "Technology", &[]);
        let containing = entity("OpenARFoundry", "Technology", &[]);
        assert!(score("arfound", &prefixed) > score("arfound", &containing));
    }

    #[test]
    fn test_prefix_query_scores_high() {
        let e = entity("ARFoundation", "Technology", &[]);
        assert!(score("arfound", &e) > 0.6);
    }

    #[test]
    fn test_typo_tolerance_on_long_tokens() {
        let e = entity("ARFoundation", "Technology", &[]);
        let s = score("ARFoundaton", &e);
        assert!(s > 0.0, "single-char typo should still contribute, got {}", s);
        // Distance 1 against a 12-char token: 0.3 * (1 - 1/12) * 0.4.
        assert!((s - 0.11).abs() < 0.001);
    }

    #[test]
    fn test_no_typo_tolerance_on_short_tokens() {
        let e = entity("arc", "Technology", &[]);
        assert_eq!(score("ark", &e), 0.0);
    }

    #[test]
    fn test_observation_signal() {
        let e = entity("Unity", "Technology", &["supports occlusion meshes"]);
        let s = score("occlusion", &e);
        assert!((s - OBSERVATION_BONUS).abs() < 1e-9);
    }

    #[test]
    fn test_type_signal() {
        let e = entity("Unity", "GameTechnology", &[]);
        let s = score("technology", &e);
        assert!((s - TYPE_BONUS).abs() < 1e-9);
    }

    #[test]
    fn test_score_clamped_to_one() {
        let e = entity("unity engine", "unity", &["unity engine docs"]);
        assert!(score("unity engine docs and more unity", &e) <= 1.0);
        assert!(score("unity eng", &e) <= 1.0);
    }

    #[test]
    fn test_exact_mode() {
        let e = entity("ARFoundation", "Technology", &[]);
        assert_eq!(exact_score("arfoundation", &e), 1.0);
        assert_eq!(exact_score("found", &e), 0.5);
        assert_eq!(exact_score("unrelated", &e), 0.0);
    }
}
