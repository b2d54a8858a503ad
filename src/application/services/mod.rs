pub mod bisect_retry;
pub mod desired_state_evaluator;
pub mod maintenance_window;
pub mod set_expression_parser;
pub mod tag_reconciler;
pub mod usage_accounting;

pub use bisect_retry::bisect_retry;
pub use maintenance_window::MaintenanceWindow;
pub use set_expression_parser::{monthday_builder, month_builder, weekday_builder, SetBuilder};
pub use tag_reconciler::{reconcile, TagPlan};
pub use usage_accounting::{compute as compute_usage, DayUsage, RunningInterval, UsageReport};
