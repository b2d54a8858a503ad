pub mod desired_state;
pub mod period;
pub mod registry_record;
pub mod resource_runtime;
pub mod schedule;

pub use desired_state::DesiredStateTriple;
pub use period::Period;
pub use registry_record::{LastConfigured, RegistryRecord};
pub use resource_runtime::{ObservedState, ResourceDetails, ResourceKind, ResourceRuntimeInfo};
pub use schedule::{PeriodLookup, PeriodRef, Schedule};
