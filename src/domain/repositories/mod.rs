pub mod definition_store;
pub mod resource_registry;

pub use definition_store::{prefetch_valid_schedules, DefinitionStore};
pub use resource_registry::ResourceRegistry;
