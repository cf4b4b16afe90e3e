use kgraph_common::Entity;
use std::collections::{HashMap, HashSet};

/// Split text into lowercase tokens on whitespace and `- _ . / \`,
/// dropping tokens of length <= 1. Shared by the index and the fuzzy
/// scorer so both sides agree on token boundaries.
pub fn tokenize(text: &str) -> Vec<String> {
    text.to_lowercase()
        .split(|c: char| c.is_whitespace() || matches!(c, '-' | '_' | '.' | '/' | '\\'))
        .filter(|t| t.chars().count() > 1)
        .map(|t| t.to_string())
        .collect()
}

/// Token and type indexes over entities, maintained synchronously on
/// every write. There is no lazy rebuild pass; an entity is searchable
/// the moment `index_entity` returns.
#[derive(Debug, Default)]
pub struct InvertedIndex {
    tokens: HashMap<String, HashSet<String>>, // token -> entity ids
    types: HashMap<String, Vec<String>>,      // lowercased type -> entity ids
}

impl InvertedIndex {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn index_entity(&mut self, entity: &Entity) {
        for token in tokenize(&entity.name) {
            self.tokens.entry(token).or_default().insert(entity.id.clone());
        }
        let type_key = entity.entity_type.to_lowercase();
        let ids = self.types.entry(type_key).or_default();
        if !ids.contains(&entity.id) {
            ids.push(entity.id.clone());
        }
    }

    /// Drop all postings for an entity. Called before re-indexing on
    /// upsert so stale tokens and the old type entry disappear.
    pub fn remove_entity(&mut self, entity: &Entity) {
        for token in tokenize(&entity.name) {
            if let Some(ids) = self.tokens.get_mut(&token) {
                ids.remove(&entity.id);
                if ids.is_empty() {
                    self.tokens.remove(&token);
                }
            }
        }
        let type_key = entity.entity_type.to_lowercase();
        if let Some(ids) = self.types.get_mut(&type_key) {
            ids.retain(|id| id != &entity.id);
            if ids.is_empty() {
                self.types.remove(&type_key);
            }
        }
    }

    pub fn ids_for_token(&self, token: &str) -> Option<&HashSet<String>> {
        self.tokens.get(token)
    }

    /// O(1) lookup of entity ids by lowercased type.
    pub fn ids_for_type(&self, entity_type: &str) -> &[String] {
        self.types
            .get(&entity_type.to_lowercase())
            .map(|v| v.as_slice())
            .unwrap_or(&[])
    }

    /// Entity types with their member counts.
    pub fn type_counts(&self) -> Vec<(String, usize)> {
        let mut counts: Vec<(String, usize)> = self
            .types
            .iter()
            .map(|(t, ids)| (t.clone(), ids.len()))
            .collect();
        counts.sort_by(|a, b| b.1.cmp(&a.1).then_with(|| a.0.cmp(&b.0)));
        counts
    }

    pub fn clear(&mut self) {
        self.tokens.clear();
        self.types.clear();
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use chrono::Utc;
    use std::collections::HashMap;

    fn entity(id: &str, name: &str, entity_type: &str) -> Entity {
        Entity {
            id: id.into(),
            name: name.into(),
            entity_type: entity_type.into(),
            observations: Vec::new(),
            metadata: HashMap::new(),
            created_at: Utc::now(),
        }
    }

    #[test]
    fn test_tokenize_separators() {
        assert_eq!(
            tokenize("AR-Foundation/XR_Toolkit.v2"),
            vec!["ar", "foundation", "xr", "toolkit", "v2"]
        );
    }

    #[test]
    fn test_tokenize_drops_short_tokens() {
        assert_eq!(tokenize("a to b Unity"), vec!["to", "unity"]);
        assert!(tokenize("x").is_empty());
    }

    #[test]
    fn test_index_and_lookup() {
        let mut index = InvertedIndex::new();
        index.index_entity(&entity("e1", "AR Foundation", "Technology"));
        assert!(index.ids_for_token("foundation").unwrap().contains("e1"));
        assert_eq!(index.ids_for_type("technology"), &["e1".to_string()]);
        assert_eq!(index.ids_for_type("TECHNOLOGY"), &["e1".to_string()]);
    }

    #[test]
    fn test_remove_entity_drops_postings() {
        let mut index = InvertedIndex::new();
        let e = entity("e1", "AR Foundation", "Technology");
        index.index_entity(&e);
        index.remove_entity(&e);
        assert!(index.ids_for_token("foundation").is_none());
        assert!(index.ids_for_type("technology").is_empty());
    }

    #[test]
    fn test_reindex_after_type_change() {
        let mut index = InvertedIndex::new();
        let old = entity("e1", "Unity", "Technology");
        index.index_entity(&old);
        index.remove_entity(&old);
        index.index_entity(&entity("e1", "Unity", "Engine"));
        assert!(index.ids_for_type("technology").is_empty());
        assert_eq!(index.ids_for_type("engine"), &["e1".to_string()]);
    }

    #[test]
    fn test_type_counts_sorted() {
        let mut index = InvertedIndex::new();
        index.index_entity(&entity("e1", "Unity", "Technology"));
        index.index_entity(&entity("e2", "ARFoundation", "Technology"));
        index.index_entity(&entity("e3", "Occlusion", "Concept"));
        let counts = index.type_counts();
        assert_eq!(counts[0], ("technology".to_string(), 2));
        assert_eq!(counts[1], ("concept".to_string(), 1));
    }
}
