pub mod in_memory_definition_store;
pub mod in_memory_resource_registry;
pub mod sqlite_definition_store;
pub mod sqlite_resource_registry;

pub use in_memory_definition_store::InMemoryDefinitionStore;
pub use in_memory_resource_registry::InMemoryResourceRegistry;
pub use sqlite_definition_store::SqliteDefinitionStore;
pub use sqlite_resource_registry::SqliteResourceRegistry;
