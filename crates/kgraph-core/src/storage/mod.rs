pub mod entities;
pub mod index;
pub mod relations;

pub use entities::EntityStore;
pub use index::{tokenize, InvertedIndex};
pub use relations::RelationStore;
