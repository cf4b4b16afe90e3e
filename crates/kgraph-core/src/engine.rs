//! The in-memory knowledge graph.
//!
//! Owns the entity and relation stores, the inverted index, the search
//! result cache and the event bus, and keeps them consistent on every
//! write. All operations are synchronous; callers needing concurrency
//! wrap the graph in their own lock.

use std::time::Instant;

use chrono::Utc;
use tracing::{debug, info};

use crate::cache::{CacheKey, ResultCache};
use crate::events::{EventBus, GraphEvent};
use crate::search::{exact_score, fuzzy_score, SearchHit, SearchOptions, Suggestion};
use crate::storage::{tokenize, EntityStore, InvertedIndex, RelationStore};
use crate::traverse::{self, RelatedEntity};
use kgraph_common::config::SearchConfig;
use kgraph_common::{
    derive_entity_id, Entity, EntitySpec, GraphError, GraphStats, ImportData, ImportReport,
    Relation, RelationSpec, DEFAULT_ENTITY_TYPE,
};

const SUGGESTION_MIN_CHARS: usize = 2;
const SUGGESTION_SEARCH_THRESHOLD: f64 = 0.2;

pub struct KnowledgeGraph {
    entities: EntityStore,
    relations: RelationStore,
    index: InvertedIndex,
    cache: ResultCache,
    events: EventBus,
    stats: GraphStats,
    config: SearchConfig,
}

impl Default for KnowledgeGraph {
    fn default() -> Self {
        Self::new()
    }
}

impl KnowledgeGraph {
    pub fn new() -> Self {
        Self::with_config(SearchConfig::default())
    }

    pub fn with_config(config: SearchConfig) -> Self {
        Self {
            entities: EntityStore::new(),
            relations: RelationStore::new(),
            index: InvertedIndex::new(),
            cache: ResultCache::new(config.cache_size),
            events: EventBus::default(),
            stats: GraphStats::default(),
            config,
        }
    }

    /// Add or overwrite an entity. The id is derived from the name when
    /// absent, so importing the same record twice updates in place.
    pub fn add_entity(&mut self, spec: EntitySpec) -> Entity {
        let entity = Entity {
            id: spec
                .id
                .unwrap_or_else(|| derive_entity_id(&spec.name)),
            name: spec.name,
            entity_type: spec
                .entity_type
                .unwrap_or_else(|| DEFAULT_ENTITY_TYPE.to_string()),
            observations: spec.observations,
            metadata: spec.metadata,
            created_at: Utc::now(),
        };

        if let Some(old) = self.entities.upsert(entity.clone()) {
            self.index.remove_entity(&old);
        }
        self.index.index_entity(&entity);
        self.touch();

        self.events.publish(&GraphEvent::EntityAdded(entity.clone()));
        entity
    }

    /// Append a relation without validating its endpoints. The natural
    /// language layer resolves endpoints before calling this; direct API
    /// callers own referential integrity themselves.
    pub fn add_relation(&mut self, spec: RelationSpec) -> Relation {
        let relation = self.relations.append(spec);
        self.touch();
        self.events
            .publish(&GraphEvent::RelationAdded(relation.clone()));
        relation
    }

    /// Load entities then relations in one pass. Individual add events
    /// are not published; subscribers get a single `BulkImport`.
    pub fn bulk_import(&mut self, data: ImportData) -> ImportReport {
        let started = Instant::now();
        let entity_count = data.entities.len();
        let relation_count = data.relations.len();

        for spec in data.entities {
            let entity = Entity {
                id: spec
                    .id
                    .unwrap_or_else(|| derive_entity_id(&spec.name)),
                name: spec.name,
                entity_type: spec
                    .entity_type
                    .unwrap_or_else(|| DEFAULT_ENTITY_TYPE.to_string()),
                observations: spec.observations,
                metadata: spec.metadata,
                created_at: Utc::now(),
            };
            if let Some(old) = self.entities.upsert(entity.clone()) {
                self.index.remove_entity(&old);
            }
            self.index.index_entity(&entity);
        }
        for spec in data.relations {
            self.relations.append(spec);
        }
        self.touch();

        let report = ImportReport {
            entities: entity_count,
            relations: relation_count,
            duration_ms: started.elapsed().as_secs_f64() * 1000.0,
        };
        info!(
            entities = report.entities,
            relations = report.relations,
            duration_ms = report.duration_ms,
            "bulk import complete"
        );
        self.events.publish(&GraphEvent::BulkImport(report.clone()));
        report
    }

    pub fn get_entity(&self, id: &str) -> Option<&Entity> {
        self.entities.get(id)
    }

    /// Case-insensitive exact-name lookup.
    pub fn get_entity_by_name(&self, name: &str) -> Option<&Entity> {
        self.entities.get_by_name(name)
    }

    /// Entities of a type (case-insensitive), via the type index.
    pub fn entities_by_type(&self, entity_type: &str) -> Vec<&Entity> {
        self.index
            .ids_for_type(entity_type)
            .iter()
            .filter_map(|id| self.entities.get(id))
            .collect()
    }

    /// Relations touching an entity, matched by id or stored name.
    pub fn relations_for(&self, id: &str) -> Vec<&Relation> {
        match self.entities.get(id) {
            Some(entity) => self.relations.matching(&[id, entity.name.as_str()]),
            None => self.relations.matching(&[id]),
        }
    }

    pub fn all_entities(&self) -> Vec<&Entity> {
        self.entities.iter().collect()
    }

    pub fn all_relations(&self) -> Vec<&Relation> {
        self.relations.iter().collect()
    }

    /// Entity types with member counts, largest first.
    pub fn type_counts(&self) -> Vec<(String, usize)> {
        self.index.type_counts()
    }

    /// Rank entities against a query. Results are cached per full option
    /// set until the next mutation.
    pub fn search(&mut self, query: &str, options: &SearchOptions) -> Vec<SearchHit> {
        self.stats.search_count += 1;

        let key = CacheKey::new(query, options);
        if let Some(hits) = self.cache.get(&key) {
            return hits;
        }

        let query_lower = query.to_lowercase();
        let query_tokens = tokenize(query);
        let type_filter: Option<Vec<String>> = options
            .types
            .as_ref()
            .map(|ts| ts.iter().map(|t| t.to_lowercase()).collect());

        let mut hits: Vec<SearchHit> = Vec::new();
        for entity in self.entities.iter() {
            if let Some(allowed) = &type_filter {
                if !allowed.contains(&entity.entity_type.to_lowercase()) {
                    continue;
                }
            }
            let score = if options.fuzzy {
                fuzzy_score(&query_lower, &query_tokens, entity)
            } else {
                exact_score(&query_lower, entity)
            };
            if score >= options.threshold {
                hits.push(SearchHit {
                    entity: entity.clone(),
                    score,
                });
            }
        }

        hits.sort_by(|a, b| {
            b.score
                .partial_cmp(&a.score)
                .unwrap_or(std::cmp::Ordering::Equal)
        });
        hits.truncate(options.limit);

        debug!(query, hits = hits.len(), "search complete");
        self.cache.insert(key, hits.clone());
        hits
    }

    /// Search options seeded from this graph's configuration.
    pub fn default_options(&self) -> SearchOptions {
        SearchOptions {
            limit: self.config.default_limit,
            threshold: self.config.default_threshold,
            types: None,
            fuzzy: true,
        }
    }

    /// Up to `limit` autocomplete candidates for a partial query.
    /// Inputs shorter than two characters return nothing.
    pub fn suggestions(&mut self, partial: &str, limit: usize) -> Vec<Suggestion> {
        let partial = partial.trim();
        if partial.chars().count() < SUGGESTION_MIN_CHARS {
            return Vec::new();
        }
        let options = SearchOptions {
            limit,
            threshold: SUGGESTION_SEARCH_THRESHOLD,
            types: None,
            fuzzy: true,
        };
        self.search(partial, &options)
            .into_iter()
            .map(|hit| Suggestion {
                text: hit.entity.name,
                entity_type: hit.entity.entity_type,
                score: hit.score,
            })
            .collect()
    }

    /// Breadth-first neighborhood of an entity, by id or name.
    pub fn related_entities(
        &self,
        id_or_name: &str,
        max_depth: usize,
    ) -> Result<Vec<RelatedEntity>, GraphError> {
        let start = self
            .entities
            .get(id_or_name)
            .or_else(|| self.entities.get_by_name(id_or_name))
            .ok_or_else(|| GraphError::EntityNotFound(id_or_name.to_string()))?;
        Ok(traverse::related_entities(
            &self.entities,
            &self.relations,
            start,
            max_depth,
        ))
    }

    /// Drop all data and counters.
    pub fn clear(&mut self) {
        self.entities.clear();
        self.relations.clear();
        self.index.clear();
        self.cache.clear();
        self.stats = GraphStats::default();
        self.events.publish(&GraphEvent::Cleared);
    }

    pub fn stats(&self) -> GraphStats {
        self.stats.clone()
    }

    pub fn subscribe(&mut self, callback: Box<dyn Fn(&GraphEvent) + Send>) -> u64 {
        self.events.subscribe(callback)
    }

    pub fn unsubscribe(&mut self, id: u64) -> bool {
        self.events.unsubscribe(id)
    }

    fn touch(&mut self) {
        self.cache.clear();
        self.stats.entity_count = self.entities.len();
        self.stats.relation_count = self.relations.len();
        self.stats.last_modified = Some(Utc::now());
    }
}
