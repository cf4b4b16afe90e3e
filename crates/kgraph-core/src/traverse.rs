//! Breadth-first expansion over the relation list.
//!
//! Relations may reference entities by id or by name, and endpoints are
//! allowed to dangle. The frontier therefore tracks endpoint keys as
//! strings (ids plus lowercased names) and each hop resolves the far
//! endpoint back to an entity when one exists. An endpoint is recorded
//! at most once, on the first relation that reaches it; later relations
//! into an already-visited endpoint are skipped.

use std::collections::HashSet;

use serde::Serialize;

use crate::storage::{EntityStore, RelationStore};
use kgraph_common::{Entity, Relation};

#[derive(Debug, Clone, Serialize)]
pub struct RelatedEntity {
    /// `None` when the relation endpoint does not resolve to a stored entity.
    pub entity: Option<Entity>,
    pub relation: Relation,
    pub depth: usize,
}

fn endpoint_keys(entity: &Entity) -> [String; 2] {
    [entity.id.clone(), entity.name.to_lowercase()]
}

pub(crate) fn related_entities(
    entities: &EntityStore,
    relations: &RelationStore,
    start: &Entity,
    max_depth: usize,
) -> Vec<RelatedEntity> {
    let mut results = Vec::new();
    let mut visited: HashSet<String> = endpoint_keys(start).into_iter().collect();
    let mut frontier: Vec<String> = endpoint_keys(start).to_vec();

    for depth in 1..=max_depth {
        let mut next_frontier: Vec<String> = Vec::new();
        for relation in relations.iter() {
            let from_key = relation.from.to_lowercase();
            let to_key = relation.to.to_lowercase();

            let other = if frontier.contains(&relation.from) || frontier.contains(&from_key) {
                &relation.to
            } else if frontier.contains(&relation.to) || frontier.contains(&to_key) {
                &relation.from
            } else {
                continue;
            };

            let resolved = entities
                .get(other)
                .or_else(|| entities.get_by_name(other));

            let keys = match resolved {
                Some(entity) => endpoint_keys(entity).to_vec(),
                None => vec![other.to_lowercase()],
            };
            if keys.iter().any(|k| visited.contains(k)) {
                continue;
            }
            for key in &keys {
                visited.insert(key.clone());
            }
            next_frontier.extend(keys);

            results.push(RelatedEntity {
                entity: resolved.cloned(),
                relation: relation.clone(),
                depth,
            });
        }

        if next_frontier.is_empty() {
            break;
        }
        frontier = next_frontier;
    }

    results
}

#[cfg(test)]
mod tests {
    use super::*;
    use kgraph_common::{EntitySpec, RelationSpec};

    fn seed(names: &[(&str, &str)]) -> EntityStore {
        let mut store = EntityStore::default();
        for (name, entity_type) in names {
            let spec = EntitySpec::new(*name, *entity_type);
            let entity = Entity {
                id: kgraph_common::derive_entity_id(name),
                name: spec.name,
                entity_type: spec.entity_type.unwrap_or_default(),
                observations: vec![],
                metadata: Default::default(),
                created_at: chrono::Utc::now(),
            };
            store.upsert(entity);
        }
        store
    }

    fn relate(store: &mut RelationStore, from: &str, to: &str, relation_type: &str) {
        store.append(RelationSpec::new(from, to).with_type(relation_type));
    }

    #[test]
    fn test_single_hop() {
        let entities = seed(&[("Unity", "Technology"), ("ARFoundation", "Technology")]);
        let mut relations = RelationStore::default();
        relate(&mut relations, "Unity", "ARFoundation", "uses");

        let start = entities.get_by_name("unity").unwrap().clone();
        let related = related_entities(&entities, &relations, &start, 1);
        assert_eq!(related.len(), 1);
        assert_eq!(related[0].depth, 1);
        assert_eq!(related[0].entity.as_ref().unwrap().name, "ARFoundation");
        assert_eq!(related[0].relation.relation_type, "uses");
    }

    #[test]
    fn test_depth_limits_expansion() {
        let entities = seed(&[("A1", "T"), ("B2", "T"), ("C3", "T")]);
        let mut relations = RelationStore::default();
        relate(&mut relations, "A1", "B2", "related_to");
        relate(&mut relations, "B2", "C3", "related_to");

        let start = entities.get_by_name("a1").unwrap().clone();
        assert_eq!(related_entities(&entities, &relations, &start, 1).len(), 1);

        let two = related_entities(&entities, &relations, &start, 2);
        assert_eq!(two.len(), 2);
        assert_eq!(two[1].depth, 2);
        assert_eq!(two[1].entity.as_ref().unwrap().name, "C3");
    }

    #[test]
    fn test_cycle_records_each_entity_once() {
        let entities = seed(&[("A1", "T"), ("B2", "T"), ("C3", "T")]);
        let mut relations = RelationStore::default();
        relate(&mut relations, "A1", "B2", "related_to");
        relate(&mut relations, "B2", "C3", "related_to");
        relate(&mut relations, "C3", "A1", "related_to");

        let start = entities.get_by_name("a1").unwrap().clone();
        let related = related_entities(&entities, &relations, &start, 10);
        // Both B2 and C3 are one hop from A1; the B2-C3 edge reaches an
        // already-visited entity and is not recorded again.
        assert_eq!(related.len(), 2);
        assert!(related.iter().all(|r| r.depth == 1));
        let mut names: Vec<_> = related
            .iter()
            .map(|r| r.entity.as_ref().unwrap().name.clone())
            .collect();
        names.sort();
        assert_eq!(names, vec!["B2", "C3"]);
    }

    #[test]
    fn test_no_duplicate_entities_across_depths() {
        // Diamond: A reaches D through both B and C; D is recorded on
        // the first level-2 relation only.
        let entities = seed(&[("A1", "T"), ("B2", "T"), ("C3", "T"), ("D4", "T")]);
        let mut relations = RelationStore::default();
        relate(&mut relations, "A1", "B2", "related_to");
        relate(&mut relations, "A1", "C3", "related_to");
        relate(&mut relations, "B2", "D4", "related_to");
        relate(&mut relations, "C3", "D4", "related_to");

        let start = entities.get_by_name("a1").unwrap().clone();
        let related = related_entities(&entities, &relations, &start, 10);
        let mut ids: Vec<_> = related
            .iter()
            .filter_map(|r| r.entity.as_ref().map(|e| e.id.clone()))
            .collect();
        let total = ids.len();
        ids.sort();
        ids.dedup();
        assert_eq!(ids.len(), total, "an entity id was recorded twice");
        assert_eq!(total, 3);
    }

    #[test]
    fn test_dangling_endpoint_reported_without_entity() {
        let entities = seed(&[("A1", "T")]);
        let mut relations = RelationStore::default();
        relate(&mut relations, "A1", "Ghost", "related_to");

        let start = entities.get_by_name("a1").unwrap().clone();
        let related = related_entities(&entities, &relations, &start, 2);
        assert_eq!(related.len(), 1);
        assert!(related[0].entity.is_none());
        assert_eq!(related[0].relation.to, "Ghost");
    }

    #[test]
    fn test_incoming_relations_are_followed() {
        let entities = seed(&[("A1", "T"), ("B2", "T")]);
        let mut relations = RelationStore::default();
        relate(&mut relations, "B2", "A1", "depends_on");

        let start = entities.get_by_name("a1").unwrap().clone();
        let related = related_entities(&entities, &relations, &start, 1);
        assert_eq!(related.len(), 1);
        assert_eq!(related[0].entity.as_ref().unwrap().name, "B2");
    }

    #[test]
    fn test_edge_back_to_start_not_recorded() {
        let entities = seed(&[("A1", "T"), ("B2", "T")]);
        let mut relations = RelationStore::default();
        relate(&mut relations, "A1", "B2", "related_to");
        relate(&mut relations, "B2", "A1", "related_to");

        let start = entities.get_by_name("a1").unwrap().clone();
        let related = related_entities(&entities, &relations, &start, 10);
        assert_eq!(related.len(), 1);
        assert_eq!(related[0].entity.as_ref().unwrap().name, "B2");
    }
}
