pub mod application;
pub mod domain;
pub mod infrastructure;
pub mod presentation;

pub use application::ports;
pub use application::use_cases;
pub use domain::entities;
pub use domain::value_objects;
pub use infrastructure::output;
