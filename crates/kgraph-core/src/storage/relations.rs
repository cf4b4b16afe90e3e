use kgraph_common::{Relation, RelationSpec, DEFAULT_RELATION_TYPE};

/// Ordered list of directed, typed edges.
///
/// Endpoints are entity names and are deliberately not validated against
/// the entity store; an edge may reference a name that does not (yet)
/// exist. Traversal tolerates such dangling endpoints.
#[derive(Debug, Default)]
pub struct RelationStore {
    relations: Vec<Relation>,
    next_id: u64,
}

impl RelationStore {
    pub fn new() -> Self {
        Self::default()
    }

    /// Append an edge, assigning a sequential `rel_<n>` id when absent.
    pub fn append(&mut self, spec: RelationSpec) -> Relation {
        let id = match spec.id {
            Some(id) => id,
            None => {
                let id = format!("rel_{}", self.next_id);
                self.next_id += 1;
                id
            }
        };
        let relation = Relation {
            id,
            from: spec.from,
            to: spec.to,
            relation_type: spec
                .relation_type
                .unwrap_or_else(|| DEFAULT_RELATION_TYPE.to_string()),
            weight: spec.weight,
            metadata: spec.metadata,
        };
        self.relations.push(relation.clone());
        relation
    }

    /// Edges where either endpoint equals one of the given keys.
    pub fn matching<'a>(&'a self, keys: &[&str]) -> Vec<&'a Relation> {
        self.relations
            .iter()
            .filter(|r| keys.contains(&r.from.as_str()) || keys.contains(&r.to.as_str()))
            .collect()
    }

    pub fn iter(&self) -> impl Iterator<Item = &Relation> {
        self.relations.iter()
    }

    pub fn len(&self) -> usize {
        self.relations.len()
    }

    pub fn is_empty(&self) -> bool {
        self.relations.is_empty()
    }

    pub fn clear(&mut self) {
        self.relations.clear();
        self.next_id = 0;
    }
}
