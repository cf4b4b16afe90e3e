use kgraph_common::Entity;
use std::collections::HashMap;

/// Id-keyed entity records with stable insertion order and a
/// case-insensitive name lookup.
///
/// Adding an entity whose id already exists overwrites the prior record
/// (upsert). The insertion-order slot is kept on overwrite so exports see
/// a stable entity sequence across repeated calls.
#[derive(Debug, Default)]
pub struct EntityStore {
    entities: HashMap<String, Entity>,
    order: Vec<String>,
    names: HashMap<String, String>, // lowercased name -> id
}

impl EntityStore {
    pub fn new() -> Self {
        Self::default()
    }

    /// Insert or overwrite by id. Returns the entity that was replaced,
    /// if any, so the caller can drop its index postings.
    pub fn upsert(&mut self, entity: Entity) -> Option<Entity> {
        let previous = self.entities.insert(entity.id.clone(), entity.clone());
        match &previous {
            Some(old) => {
                // Renaming under the same id leaves edges that reference
                // the old name orphaned; that is the documented contract.
                if !old.name.eq_ignore_ascii_case(&entity.name) {
                    self.names.remove(&old.name.to_lowercase());
                }
            }
            None => self.order.push(entity.id.clone()),
        }
        self.names.insert(entity.name.to_lowercase(), entity.id);
        previous
    }

    pub fn get(&self, id: &str) -> Option<&Entity> {
        self.entities.get(id)
    }

    pub fn get_by_name(&self, name: &str) -> Option<&Entity> {
        self.names
            .get(&name.to_lowercase())
            .and_then(|id| self.entities.get(id))
    }

    pub fn contains(&self, id: &str) -> bool {
        self.entities.contains_key(id)
    }

    /// Entities in stable insertion order.
    pub fn iter(&self) -> impl Iterator<Item = &Entity> {
        self.order.iter().filter_map(|id| self.entities.get(id))
    }

    pub fn len(&self) -> usize {
        self.entities.len()
    }

    pub fn is_empty(&self) -> bool {
        self.entities.is_empty()
    }

    pub fn clear(&mut self) {
        self.entities.clear();
        self.order.clear();
        self.names.clear();
    }
}
