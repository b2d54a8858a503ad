//! Domain layer: entities, value objects, and repository ports for the
//! scheduling engine. No module here depends on `application`,
//! `infrastructure`, or `presentation`.

pub mod entities;
pub mod error;
pub mod repositories;
pub mod value_objects;

pub use error::{SchedulerError, SchedulerResult};
