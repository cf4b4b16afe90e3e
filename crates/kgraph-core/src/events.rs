//! Synchronous notification of graph mutations.
//!
//! Subscribers run inline on the mutating call. Callbacks must not
//! mutate the graph they observe; reentrant mutation is unsupported.

use kgraph_common::{Entity, ImportReport, Relation};

#[derive(Debug, Clone)]
pub enum GraphEvent {
    EntityAdded(Entity),
    RelationAdded(Relation),
    BulkImport(ImportReport),
    Cleared,
}

type Callback = Box<dyn Fn(&GraphEvent) + Send>;

#[derive(Default)]
pub(crate) struct EventBus {
    subscribers: Vec<(u64, Callback)>,
    next_id: u64,
}

impl EventBus {
    pub(crate) fn subscribe(&mut self, callback: Callback) -> u64 {
        let id = self.next_id;
        self.next_id += 1;
        self.subscribers.push((id, callback));
        id
    }

    pub(crate) fn unsubscribe(&mut self, id: u64) -> bool {
        let before = self.subscribers.len();
        self.subscribers.retain(|(sub_id, _)| *sub_id != id);
        self.subscribers.len() != before
    }

    pub(crate) fn publish(&self, event: &GraphEvent) {
        for (_, callback) in &self.subscribers {
            callback(event);
        }
    }
}
