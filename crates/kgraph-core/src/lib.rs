mod cache;
pub mod command;
pub mod engine;
pub mod events;
pub mod export;
pub mod llm;
pub mod search;
pub mod storage;
pub mod traverse;

pub use command::classifier::CommandClassifier;
pub use command::dispatcher::CommandDispatcher;
pub use command::{Command, CommandType, Envelope};
pub use engine::KnowledgeGraph;
pub use events::GraphEvent;
pub use export::{ExportEngine, ExportFormat};
pub use llm::{HttpLlmHandler, LlmCommand, LlmHandler};
pub use search::{SearchHit, SearchOptions, Suggestion};
pub use traverse::RelatedEntity;

// Re-export common types for convenience
pub use kgraph_common::{
    Entity, EntitySpec, GraphError, GraphStats, ImportData, ImportReport, Relation, RelationSpec,
};
