use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};
use sha2::{Digest, Sha256};
use std::collections::HashMap;
use thiserror::Error;

pub mod config;

pub const DEFAULT_ENTITY_TYPE: &str = "Unknown";
pub const DEFAULT_RELATION_TYPE: &str = "related_to";
pub const DEFAULT_RELATION_WEIGHT: f64 = 1.0;

fn default_weight() -> f64 {
    DEFAULT_RELATION_WEIGHT
}

/// A named, typed node in the graph, keyed by a stable id.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct Entity {
    pub id: String,
    pub name: String,
    pub entity_type: String,
    pub observations: Vec<String>,
    pub metadata: HashMap<String, serde_json::Value>,
    pub created_at: DateTime<Utc>,
}

/// Caller-supplied entity record. Missing fields are normalized by the
/// store: the id is derived from the name, the type defaults to `Unknown`,
/// and lists/maps default to empty.
#[derive(Debug, Clone, Default, Serialize, Deserialize)]
pub struct EntitySpec {
    #[serde(default)]
    pub id: Option<String>,
    pub name: String,
    #[serde(default, alias = "type")]
    pub entity_type: Option<String>,
    #[serde(default)]
    pub observations: Vec<String>,
    #[serde(default)]
    pub metadata: HashMap<String, serde_json::Value>,
}

impl EntitySpec {
    pub fn new(name: impl Into<String>, entity_type: impl Into<String>) -> Self {
        Self {
            name: name.into(),
            entity_type: Some(entity_type.into()),
            ..Default::default()
        }
    }
}

/// A directed, typed edge. Endpoints reference entities by *name*, not id;
/// the store does not validate that either endpoint exists.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct Relation {
    pub id: String,
    pub from: String,
    pub to: String,
    pub relation_type: String,
    pub weight: f64,
    pub metadata: HashMap<String, serde_json::Value>,
}

/// Caller-supplied relation record. The store assigns a sequential id when
/// absent; the relation type defaults to `related_to` and the weight to 1.
#[derive(Debug, Clone, Default, Serialize, Deserialize)]
pub struct RelationSpec {
    #[serde(default)]
    pub id: Option<String>,
    pub from: String,
    pub to: String,
    #[serde(default, alias = "type")]
    pub relation_type: Option<String>,
    #[serde(default = "default_weight")]
    pub weight: f64,
    #[serde(default)]
    pub metadata: HashMap<String, serde_json::Value>,
}

impl RelationSpec {
    pub fn new(from: impl Into<String>, to: impl Into<String>) -> Self {
        Self {
            from: from.into(),
            to: to.into(),
            weight: DEFAULT_RELATION_WEIGHT,
            ..Default::default()
        }
    }

    pub fn with_type(mut self, relation_type: impl Into<String>) -> Self {
        self.relation_type = Some(relation_type.into());
        self
    }
}

/// Counters maintained by the graph, returned by stats queries and
/// embedded in the JSON export snapshot.
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
pub struct GraphStats {
    pub entity_count: usize,
    pub relation_count: usize,
    pub search_count: u64,
    pub last_modified: Option<DateTime<Utc>>,
}

/// Payload for `bulk_import`.
#[derive(Debug, Clone, Default, Serialize, Deserialize)]
pub struct ImportData {
    #[serde(default)]
    pub entities: Vec<EntitySpec>,
    #[serde(default)]
    pub relations: Vec<RelationSpec>,
}

/// Counts and wall time reported after a bulk import.
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
pub struct ImportReport {
    pub entities: usize,
    pub relations: usize,
    pub duration_ms: f64,
}

#[derive(Debug, Error)]
pub enum GraphError {
    #[error("unknown export format: {0}")]
    UnknownExportFormat(String),
    #[error("entity not found: \"{0}\"")]
    EntityNotFound(String),
}

/// Derive a stable entity id from a name. Same name, same id, so loaders
/// that omit ids stay idempotent across imports.
pub fn derive_entity_id(name: &str) -> String {
    let hash = Sha256::digest(name.as_bytes());
    let hex: String = hash[..8].iter().map(|b| format!("{:02x}", b)).collect();
    format!("kg_{}", hex)
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_derive_entity_id_deterministic() {
        let a = derive_entity_id("ARFoundation");
        let b = derive_entity_id("ARFoundation");
        assert_eq!(a, b);
        assert!(a.starts_with("kg_"));
        assert_eq!(a.len(), 3 + 16);
    }

    #[test]
    fn test_derive_entity_id_distinct() {
        assert_ne!(derive_entity_id("Unity"), derive_entity_id("unity"));
        assert_ne!(derive_entity_id("Unity"), derive_entity_id("Unreal"));
    }

    #[test]
    fn test_entity_spec_defaults_from_json() {
        // Loaders may send only a name; everything else is optional.
        let spec: EntitySpec = serde_json::from_str(r#"{"name":"Unity"}"#).unwrap();
        assert_eq!(spec.name, "Unity");
        assert!(spec.id.is_none());
        assert!(spec.entity_type.is_none());
        assert!(spec.observations.is_empty());
        assert!(spec.metadata.is_empty());
    }

    #[test]
    fn test_entity_spec_type_alias() {
        let spec: EntitySpec =
            serde_json::from_str(r#"{"name":"Unity","type":"Technology"}"#).unwrap();
        assert_eq!(spec.entity_type.as_deref(), Some("Technology"));
    }

    #[test]
    fn test_relation_spec_defaults_from_json() {
        let spec: RelationSpec =
            serde_json::from_str(r#"{"from":"Unity","to":"ARFoundation"}"#).unwrap();
        assert!(spec.relation_type.is_none());
        assert_eq!(spec.weight, 1.0);
    }

    #[test]
    fn test_entity_roundtrip() {
        let entity = Entity {
            id: derive_entity_id("Unity"),
            name: "Unity".into(),
            entity_type: "Technology".into(),
            observations: vec!["game engine".into()],
            metadata: HashMap::new(),
            created_at: Utc::now(),
        };
        let json = serde_json::to_string(&entity).unwrap();
        let back: Entity = serde_json::from_str(&json).unwrap();
        assert_eq!(entity, back);
    }
}
